//! Migration inspector - read-only view over audit history and pending files
//!
//! Merges the persisted audit trail with the discovered unit files so a
//! host can render a status listing without mutating anything.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::SchemaResult;

use super::definitions::MigrationStatus;
use super::manager::{MigrationManager, SortOrder};

/// One line of the status listing
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub name: String,
    pub status: MigrationStatus,
    /// Batch the unit last ran in, if it ever ran
    pub batch_id: Option<i64>,
    pub ran_at: Option<DateTime<Utc>>,
}

/// Read-only reporting over the migration state. Calling `status()`
/// repeatedly observes the same facts and changes nothing.
pub struct MigrationInspector {
    manager: MigrationManager,
}

impl MigrationInspector {
    pub fn new(manager: MigrationManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    /// Persisted history merged with discovered unit files. The latest
    /// audit row per name wins; discovered files with no history show as
    /// pending, ordered after the persisted entries.
    pub async fn status(&self) -> SchemaResult<Vec<StatusEntry>> {
        let repository = self.manager.open_repository().await?;
        let history = repository.all().await?;

        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, StatusEntry> = HashMap::new();
        for row in history {
            if !latest.contains_key(&row.name) {
                order.push(row.name.clone());
            }
            latest.insert(
                row.name.clone(),
                StatusEntry {
                    name: row.name,
                    status: row.status,
                    batch_id: Some(row.batch_id),
                    ran_at: Some(row.timestamp),
                },
            );
        }

        let mut entries: Vec<StatusEntry> = order
            .into_iter()
            .filter_map(|name| latest.remove(&name))
            .collect();

        for file in self.manager.discover(SortOrder::Ascending)? {
            if entries.iter().any(|e| e.name == file.name) {
                continue;
            }
            entries.push(StatusEntry {
                name: file.name,
                status: MigrationStatus::Pending,
                batch_id: None,
                ran_at: None,
            });
        }

        Ok(entries)
    }
}
