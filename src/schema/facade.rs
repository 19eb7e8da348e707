//! Schema facade - sequences table operations for one unit of work
//!
//! Each operation builds a [`Table`], compiles it, and either executes the
//! statement against the bound connection (auto-execute, the ad-hoc
//! default) or only accumulates it for later retrieval (preview mode, and
//! the mode the migration runner uses to keep batch control).

use std::sync::Arc;

use super::compiler::{Dialect, TableCompiler};
use super::table::Table;
use crate::database::DatabaseConnection;
use crate::error::{SchemaError, SchemaResult};

/// Per-run schema operation sequencer
pub struct Schema {
    dialect: Dialect,
    connection: Option<Arc<dyn DatabaseConnection>>,
    auto_execute: bool,
    tables: Vec<Table>,
    statements: Vec<String>,
}

impl Schema {
    /// Unbound schema: operations only accumulate compiled statements
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            connection: None,
            auto_execute: false,
            tables: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Schema bound to a live connection, auto-executing each operation
    pub fn with_connection(dialect: Dialect, connection: Arc<dyn DatabaseConnection>) -> Self {
        Self {
            dialect,
            connection: Some(connection),
            auto_execute: true,
            tables: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Toggle auto-execution. Off, operations compile and accumulate only.
    pub fn set_auto_execute(&mut self, auto_execute: bool) -> &mut Self {
        self.auto_execute = auto_execute;
        self
    }

    pub fn auto_execute(&self) -> bool {
        self.auto_execute
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The bound connection, if any
    pub fn connection(&self) -> Option<&Arc<dyn DatabaseConnection>> {
        self.connection.as_ref()
    }

    /// Every table touched by this schema, in operation order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Every compiled statement, in operation order
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Create a table, configured through the callback
    pub async fn create_table<F>(&mut self, name: &str, configure: F) -> SchemaResult<()>
    where
        F: FnOnce(&mut Table),
    {
        let mut table = Table::create(name, self.dialect);
        configure(&mut table);
        self.finish(table).await
    }

    /// Alter a table, configured through the callback
    pub async fn alter_table<F>(&mut self, name: &str, configure: F) -> SchemaResult<()>
    where
        F: FnOnce(&mut Table),
    {
        let mut table = Table::alter(name, self.dialect);
        configure(&mut table);
        self.finish(table).await
    }

    /// Drop a table
    pub async fn drop_table(&mut self, name: &str) -> SchemaResult<()> {
        let table = Table::drop(name, self.dialect);
        self.finish(table).await
    }

    /// Drop a table if it exists
    pub async fn drop_table_if_exists(&mut self, name: &str) -> SchemaResult<()> {
        let mut table = Table::drop(name, self.dialect);
        table.if_exists();
        self.finish(table).await
    }

    async fn finish(&mut self, table: Table) -> SchemaResult<()> {
        let sql = TableCompiler::new(self.dialect).compile(&table)?;
        self.statements.push(sql.clone());
        self.tables.push(table);

        if self.auto_execute {
            let connection = self.connection.as_ref().ok_or_else(|| {
                SchemaError::Configuration(
                    "schema has auto-execute enabled but no bound connection".to_string(),
                )
            })?;
            connection.execute(&sql, &[]).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DatabaseValue, Row};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingConnection {
        executed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DatabaseConnection for RecordingConnection {
        async fn execute(&self, sql: &str, _params: &[DatabaseValue]) -> SchemaResult<u64> {
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(0)
        }

        async fn query(&self, _sql: &str) -> SchemaResult<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn close(&self) -> SchemaResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn accumulates_without_executing() {
        let mut schema = Schema::new(Dialect::Postgres);
        schema
            .create_table("users", |table| {
                table.increments("id");
                table.string("email").unique();
            })
            .await
            .unwrap();
        schema.drop_table_if_exists("sessions").await.unwrap();

        assert_eq!(schema.tables().len(), 2);
        assert_eq!(schema.statements().len(), 2);
        assert!(schema.statements()[0].starts_with("CREATE TABLE \"users\""));
        assert_eq!(schema.statements()[1], "DROP TABLE IF EXISTS \"sessions\"");
    }

    #[tokio::test]
    async fn auto_execute_runs_each_statement() {
        let connection = Arc::new(RecordingConnection::default());
        let mut schema = Schema::with_connection(Dialect::MySql, connection.clone());
        schema
            .create_table("users", |table| {
                table.string("name");
            })
            .await
            .unwrap();
        schema.drop_table("users").await.unwrap();

        let executed = connection.executed.lock().unwrap();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].starts_with("CREATE TABLE `users`"));
        assert_eq!(executed[1], "DROP TABLE `users`");
    }

    #[tokio::test]
    async fn batch_control_mode_defers_execution() {
        let connection = Arc::new(RecordingConnection::default());
        let mut schema = Schema::with_connection(Dialect::MySql, connection.clone());
        schema.set_auto_execute(false);
        schema
            .create_table("users", |table| {
                table.string("name");
            })
            .await
            .unwrap();

        assert!(connection.executed.lock().unwrap().is_empty());
        assert_eq!(schema.statements().len(), 1);
    }
}
