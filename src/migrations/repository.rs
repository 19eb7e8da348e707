//! Audit repository - narrow interface over the audit table
//!
//! The runner and inspector only ever need three operations: the most
//! recent success, appending rows, and reading the full history. A missing
//! audit table reads as empty history, which is exactly the state before
//! the bootstrap unit has run.

use std::sync::Arc;

use chrono::Utc;

use crate::database::{DatabaseConnection, DatabaseValue, Row};
use crate::error::SchemaResult;
use crate::schema::Dialect;

use super::definitions::{MigrationAction, MigrationResult, MigrationStatus};

/// Persisted audit-table access, opened once per run invocation
pub struct MigrationRepository {
    connection: Arc<dyn DatabaseConnection>,
    dialect: Dialect,
    table: String,
}

impl MigrationRepository {
    pub fn new(
        connection: Arc<dyn DatabaseConnection>,
        dialect: Dialect,
        table: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            dialect,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Most recent successfully persisted forward migration, if any.
    /// A failing query means the audit table does not exist yet, which
    /// reads as no history.
    pub async fn last_success(&self) -> SchemaResult<Option<MigrationResult>> {
        let q = |ident: &str| self.dialect.quote(ident);
        let sql = format!(
            "SELECT {batch}, {action}, {duration}, {name}, {status}, {error}, {statement}, {created} \
             FROM {table} \
             WHERE {status} = 'success' AND {action} = 'migrate' \
             ORDER BY {created} DESC, {id} DESC LIMIT 1",
            batch = q("batchId"),
            action = q("action"),
            duration = q("duration"),
            name = q("name"),
            status = q("status"),
            error = q("error"),
            statement = q("statement"),
            created = q("created_at"),
            id = q("id"),
            table = q(&self.table),
        );
        match self.connection.query(&sql).await {
            Ok(rows) => rows.first().map(result_from_row).transpose(),
            Err(err) if is_missing_table(&err) => {
                tracing::debug!("audit table not created yet, treating history as empty: {}", err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Append audit rows; success rows are never mutated afterwards
    pub async fn append(&self, rows: &[MigrationResult]) -> SchemaResult<()> {
        for row in rows {
            let (sql, params) = self.insert_sql(row);
            self.connection.execute(&sql, &params).await?;
        }
        Ok(())
    }

    /// Full persisted history, oldest first. Missing table reads as empty.
    pub async fn all(&self) -> SchemaResult<Vec<MigrationResult>> {
        let q = |ident: &str| self.dialect.quote(ident);
        let sql = format!(
            "SELECT {batch}, {action}, {duration}, {name}, {status}, {error}, {statement}, {created} \
             FROM {table} ORDER BY {created} ASC, {id} ASC",
            batch = q("batchId"),
            action = q("action"),
            duration = q("duration"),
            name = q("name"),
            status = q("status"),
            error = q("error"),
            statement = q("statement"),
            created = q("created_at"),
            id = q("id"),
            table = q(&self.table),
        );
        match self.connection.query(&sql).await {
            Ok(rows) => rows.iter().map(result_from_row).collect(),
            Err(err) if is_missing_table(&err) => {
                tracing::debug!("audit table not created yet, treating history as empty: {}", err);
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    fn insert_sql(&self, row: &MigrationResult) -> (String, Vec<DatabaseValue>) {
        let q = |ident: &str| self.dialect.quote(ident);
        let columns = [
            "batchId",
            "action",
            "duration",
            "name",
            "status",
            "error",
            "statement",
        ];
        let column_list: Vec<String> = columns.iter().map(|c| q(c)).collect();
        let placeholders: Vec<String> = (0..columns.len())
            .map(|i| self.dialect.placeholder(i))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            q(&self.table),
            column_list.join(", "),
            placeholders.join(", "),
        );
        let params = vec![
            DatabaseValue::Int64(row.batch_id),
            DatabaseValue::String(row.action.as_str().to_string()),
            DatabaseValue::Int64(row.duration_ms),
            DatabaseValue::String(row.name.clone()),
            DatabaseValue::String(row.status.as_str().to_string()),
            row.error
                .as_ref()
                .map(|e| DatabaseValue::String(e.clone()))
                .unwrap_or(DatabaseValue::Null),
            row.statement
                .as_ref()
                .map(|s| DatabaseValue::String(s.clone()))
                .unwrap_or(DatabaseValue::Null),
        ];
        (sql, params)
    }
}

/// Whether a query error means the audit table has not been created yet.
/// Only this case reads as empty history; anything else (a dropped
/// connection, a permission error) propagates so a transient outage is
/// not mistaken for a fresh database.
fn is_missing_table(err: &crate::error::SchemaError) -> bool {
    let text = err.to_string().to_lowercase();
    // Postgres, SQLite, MySQL, SQL Server respectively
    text.contains("does not exist")
        || text.contains("no such table")
        || text.contains("doesn't exist")
        || text.contains("invalid object name")
}

fn result_from_row(row: &Row) -> SchemaResult<MigrationResult> {
    Ok(MigrationResult {
        name: row.get_string("name")?,
        batch_id: row.get_i64("batchId")?,
        action: MigrationAction::parse(&row.get_string("action")?)?,
        status: MigrationStatus::parse(&row.get_string("status")?)?,
        error: row.get_optional_string("error"),
        statement: row.get_optional_string("statement"),
        timestamp: row.get_datetime("created_at").unwrap_or_else(Utc::now),
        duration_ms: row.get_i64("duration").unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CapturingConnection {
        executed: Mutex<Vec<(String, Vec<DatabaseValue>)>>,
        query_error: Option<String>,
    }

    #[async_trait]
    impl DatabaseConnection for CapturingConnection {
        async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> SchemaResult<u64> {
            self.executed
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(1)
        }

        async fn query(&self, _sql: &str) -> SchemaResult<Vec<Row>> {
            match &self.query_error {
                Some(message) => Err(SchemaError::Execution(message.clone())),
                None => Ok(Vec::new()),
            }
        }

        async fn close(&self) -> SchemaResult<()> {
            Ok(())
        }
    }

    fn sample_result() -> MigrationResult {
        MigrationResult {
            name: "CreateUsersMigration".to_string(),
            batch_id: 1714000000000,
            action: MigrationAction::Migrate,
            status: MigrationStatus::Success,
            error: None,
            statement: Some("CREATE TABLE \"users\" (\n  \"id\" SERIAL PRIMARY KEY\n)".to_string()),
            timestamp: Utc::now(),
            duration_ms: 12,
        }
    }

    #[tokio::test]
    async fn append_binds_positional_parameters() {
        let connection = Arc::new(CapturingConnection {
            executed: Mutex::new(Vec::new()),
            query_error: None,
        });
        let repository =
            MigrationRepository::new(connection.clone(), Dialect::Postgres, "elegant_migrations");
        repository.append(&[sample_result()]).await.unwrap();

        let executed = connection.executed.lock().unwrap();
        let (sql, params) = &executed[0];
        assert!(sql.starts_with("INSERT INTO \"elegant_migrations\""));
        assert!(sql.contains("$1"));
        assert!(sql.contains("$7"));
        assert_eq!(params[0], DatabaseValue::Int64(1714000000000));
        assert_eq!(
            params[3],
            DatabaseValue::String("CreateUsersMigration".to_string())
        );
        assert_eq!(params[5], DatabaseValue::Null);
    }

    #[tokio::test]
    async fn missing_audit_table_reads_as_empty_history() {
        let connection = Arc::new(CapturingConnection {
            executed: Mutex::new(Vec::new()),
            query_error: Some("relation \"elegant_migrations\" does not exist".to_string()),
        });
        let repository =
            MigrationRepository::new(connection, Dialect::Postgres, "elegant_migrations");

        assert!(repository.last_success().await.unwrap().is_none());
        assert!(repository.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_query_errors_propagate_instead_of_reading_empty() {
        let connection = Arc::new(CapturingConnection {
            executed: Mutex::new(Vec::new()),
            query_error: Some("connection reset by peer".to_string()),
        });
        let repository =
            MigrationRepository::new(connection, Dialect::Postgres, "elegant_migrations");

        assert!(repository.last_success().await.is_err());
        assert!(repository.all().await.is_err());
    }
}
