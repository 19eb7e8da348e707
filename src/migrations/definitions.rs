//! Migration definitions - core types for the migration system
//!
//! Discovered unit metadata, audit rows, and the batch report returned by
//! the runner.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

/// Computed status of one migration unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    /// Discovered, never persisted
    Pending,
    /// Newer than the last persisted success, selected for this run. Not
    /// produced by the runner itself (the outstanding subset is held as a
    /// unit list, not per-row state); kept so hosts that write the status
    /// into their own tooling can round-trip it through `parse`.
    Outstanding,
    Success,
    Error,
    Skip,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Pending => "pending",
            MigrationStatus::Outstanding => "outstanding",
            MigrationStatus::Success => "success",
            MigrationStatus::Error => "error",
            MigrationStatus::Skip => "skip",
        }
    }

    pub fn parse(value: &str) -> SchemaResult<Self> {
        match value {
            "pending" => Ok(MigrationStatus::Pending),
            "outstanding" => Ok(MigrationStatus::Outstanding),
            "success" => Ok(MigrationStatus::Success),
            "error" => Ok(MigrationStatus::Error),
            "skip" => Ok(MigrationStatus::Skip),
            other => Err(SchemaError::Execution(format!(
                "unknown migration status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction recorded for one audit row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationAction {
    Migrate,
    Rollback,
}

impl MigrationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationAction::Migrate => "migrate",
            MigrationAction::Rollback => "rollback",
        }
    }

    pub fn parse(value: &str) -> SchemaResult<Self> {
        match value {
            "migrate" => Ok(MigrationAction::Migrate),
            "rollback" => Ok(MigrationAction::Rollback),
            other => Err(SchemaError::Execution(format!(
                "unknown migration action '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for MigrationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discovered unit metadata parsed from a migration filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationFile {
    /// Leading numeric millisecond timestamp
    pub ordering_key: i64,
    /// Unit name with the timestamp stripped (e.g. `CreateUsersMigration`)
    pub name: String,
    /// Locator handed to the loader capability
    pub path: PathBuf,
}

impl MigrationFile {
    /// Parse `<millis>_<PascalCase>Migration.<ext>` file names. Returns
    /// `None` for files that do not follow the unit convention.
    pub fn from_path(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let (timestamp, name) = stem.split_once('_')?;
        let ordering_key = timestamp.parse::<i64>().ok()?;
        if !name.ends_with("Migration") {
            return None;
        }
        Some(Self {
            ordering_key,
            name: name.to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// One audit row: the persisted record of a unit's attempted action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    pub name: String,
    /// Shared across every unit processed by one run/rollback invocation
    pub batch_id: i64,
    pub action: MigrationAction,
    pub status: MigrationStatus,
    pub error: Option<String>,
    /// Concatenated DDL text compiled for this unit, kept for forensics
    pub statement: Option<String>,
    /// When the unit was processed
    pub timestamp: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Structured report returned by `run()` and `rollback()`
#[derive(Debug)]
pub struct MigrationReport {
    pub batch_id: i64,
    /// Forward results, in application order (includes skips and the
    /// culprit's error row on failure)
    pub results: Vec<MigrationResult>,
    /// Compensating rollback outcomes, in the order they were attempted
    pub rollback_results: Vec<MigrationResult>,
    /// Name of the failing unit, if the batch failed
    pub culprit: Option<String>,
}

impl MigrationReport {
    pub fn succeeded(&self) -> bool {
        self.culprit.is_none()
    }

    /// Number of units that completed successfully in this batch
    pub fn applied_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == MigrationStatus::Success)
            .count()
    }
}
