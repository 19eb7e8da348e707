//! Migration runner - batch application with compensating rollback
//!
//! `run()` applies every unit ordered after the last persisted success and
//! answers with a structured report instead of raising mid-batch errors.
//! On failure the already-applied units of the batch are compensated in
//! reverse order before the report is returned. `rollback()` reverts the
//! discovered units in descending order.

use chrono::Utc;
use std::time::Instant;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::Schema;

use super::definitions::{MigrationAction, MigrationReport, MigrationResult, MigrationStatus};
use super::manager::{LoadedUnit, MigrationManager, SortOrder};
use super::repository::MigrationRepository;
use super::unit::BOOTSTRAP_UNIT_NAME;

enum Direction {
    Up,
    Down,
}

/// Applies and reverts migration units against their bound connections
pub struct MigrationRunner {
    manager: MigrationManager,
}

impl MigrationRunner {
    pub fn new(manager: MigrationManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    /// Apply every unit ordered after the last persisted success.
    ///
    /// The returned report always resolves once discovery and connection
    /// resolution succeed; per-unit failures are carried in the report
    /// rather than raised. The audit-table bootstrap unit participates in
    /// the first batch with ordering key 0.
    pub async fn run(&self) -> SchemaResult<MigrationReport> {
        let batch_id = Utc::now().timestamp_millis();
        let repository = self.manager.open_repository().await?;

        let mut units = self.manager.load(SortOrder::Ascending).await?;
        units.insert(0, self.manager.bootstrap().await?);

        let cutoff = match repository.last_success().await? {
            None => i64::MIN,
            Some(last) => units
                .iter()
                .find(|u| u.file.name == last.name)
                .map(|u| u.file.ordering_key)
                .ok_or_else(|| {
                    SchemaError::Discovery(format!(
                        "last successful migration '{}' has no matching unit file",
                        last.name
                    ))
                })?,
        };

        let outstanding: Vec<&LoadedUnit> = units
            .iter()
            .filter(|u| u.file.ordering_key > cutoff)
            .collect();
        tracing::info!(
            batch_id,
            outstanding = outstanding.len(),
            "starting migration batch"
        );

        let mut report = MigrationReport {
            batch_id,
            results: Vec::new(),
            rollback_results: Vec::new(),
            culprit: None,
        };
        let mut applied: Vec<&LoadedUnit> = Vec::new();

        for loaded in outstanding {
            if !loaded.unit.should_run() {
                tracing::info!(unit = %loaded.file.name, "skipping gated migration");
                report.results.push(audit_row(
                    loaded,
                    batch_id,
                    MigrationAction::Migrate,
                    MigrationStatus::Skip,
                    None,
                    None,
                    0,
                ));
                continue;
            }

            let started = Instant::now();
            let (outcome, statement) = self.execute_unit(loaded, Direction::Up).await;
            let duration_ms = started.elapsed().as_millis() as i64;

            match outcome {
                Ok(()) => {
                    tracing::info!(unit = %loaded.file.name, duration_ms, "migration applied");
                    report.results.push(audit_row(
                        loaded,
                        batch_id,
                        MigrationAction::Migrate,
                        MigrationStatus::Success,
                        None,
                        statement,
                        duration_ms,
                    ));
                    applied.push(loaded);
                }
                Err(err) => {
                    tracing::error!(unit = %loaded.file.name, error = %err, "migration failed, compensating batch");
                    let culprit_row = audit_row(
                        loaded,
                        batch_id,
                        MigrationAction::Migrate,
                        MigrationStatus::Error,
                        Some(err.to_string()),
                        statement,
                        duration_ms,
                    );
                    report.results.push(culprit_row.clone());
                    report.culprit = Some(loaded.file.name.clone());

                    self.compensate(&applied, batch_id, &mut report).await;

                    // The culprit row is the only persisted trace of a failed
                    // batch. When the bootstrap itself failed there is no
                    // audit table to write it to.
                    if loaded.file.name != BOOTSTRAP_UNIT_NAME {
                        persist(&repository, std::slice::from_ref(&culprit_row)).await;
                    }
                    return Ok(report);
                }
            }
        }

        persist(&repository, &report.results).await;
        tracing::info!(batch_id, applied = report.applied_count(), "migration batch complete");
        Ok(report)
    }

    /// Revert the discovered units in descending order. The bootstrap unit
    /// never participates; the audit table survives rollbacks.
    pub async fn rollback(&self) -> SchemaResult<MigrationReport> {
        let batch_id = Utc::now().timestamp_millis();
        let repository = self.manager.open_repository().await?;
        let units = self.manager.load(SortOrder::Descending).await?;

        tracing::info!(batch_id, units = units.len(), "starting rollback batch");

        let mut report = MigrationReport {
            batch_id,
            results: Vec::new(),
            rollback_results: Vec::new(),
            culprit: None,
        };

        for loaded in &units {
            let started = Instant::now();
            let (outcome, statement) = self.execute_unit(loaded, Direction::Down).await;
            let duration_ms = started.elapsed().as_millis() as i64;
            let (status, error) = match outcome {
                Ok(()) => (MigrationStatus::Success, None),
                Err(err) => {
                    tracing::error!(unit = %loaded.file.name, error = %err, "rollback step failed");
                    (MigrationStatus::Error, Some(err.to_string()))
                }
            };
            report.results.push(audit_row(
                loaded,
                batch_id,
                MigrationAction::Rollback,
                status,
                error,
                statement,
                duration_ms,
            ));
        }

        persist(&repository, &report.results).await;
        Ok(report)
    }

    /// Revert this batch's already-applied units in reverse order. A
    /// failing compensation step is recorded and never aborts the sweep.
    async fn compensate(
        &self,
        applied: &[&LoadedUnit],
        batch_id: i64,
        report: &mut MigrationReport,
    ) {
        for loaded in applied.iter().rev() {
            let started = Instant::now();
            let (outcome, statement) = self.execute_unit(loaded, Direction::Down).await;
            let duration_ms = started.elapsed().as_millis() as i64;
            let (status, error) = match outcome {
                Ok(()) => (MigrationStatus::Success, None),
                Err(err) => {
                    tracing::error!(unit = %loaded.file.name, error = %err, "compensation step failed");
                    (MigrationStatus::Error, Some(err.to_string()))
                }
            };
            report.rollback_results.push(audit_row(
                loaded,
                batch_id,
                MigrationAction::Rollback,
                status,
                error,
                statement,
                duration_ms,
            ));
        }
    }

    /// Run one direction of a unit: collect its declarations into a fresh
    /// schema, compile, then execute each statement. The compiled SQL is
    /// returned even when execution fails so the audit row can carry it.
    async fn execute_unit(
        &self,
        loaded: &LoadedUnit,
        direction: Direction,
    ) -> (SchemaResult<()>, Option<String>) {
        let mut schema = Schema::with_connection(loaded.dialect, loaded.connection.clone());
        schema.set_auto_execute(false);

        let declared = match direction {
            Direction::Up => loaded.unit.up(&mut schema).await,
            Direction::Down => loaded.unit.down(&mut schema).await,
        };

        let statement = if schema.statements().is_empty() {
            None
        } else {
            Some(schema.statements().join(";\n"))
        };

        if let Err(err) = declared {
            return (Err(err), statement);
        }

        for sql in schema.statements() {
            if let Err(err) = loaded.connection.execute(sql, &[]).await {
                return (Err(err), statement);
            }
        }
        (Ok(()), statement)
    }
}

fn audit_row(
    loaded: &LoadedUnit,
    batch_id: i64,
    action: MigrationAction,
    status: MigrationStatus,
    error: Option<String>,
    statement: Option<String>,
    duration_ms: i64,
) -> MigrationResult {
    MigrationResult {
        name: loaded.file.name.clone(),
        batch_id,
        action,
        status,
        error,
        statement,
        timestamp: Utc::now(),
        duration_ms,
    }
}

/// Audit persistence is best-effort on the reporting path: a write failure
/// is logged, not raised, so the report still reaches the caller.
async fn persist(repository: &MigrationRepository, rows: &[MigrationResult]) {
    if rows.is_empty() {
        return;
    }
    if let Err(err) = repository.append(rows).await {
        tracing::error!(error = %err, "failed to persist audit rows");
    }
}
