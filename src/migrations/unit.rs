//! Migration unit contract
//!
//! A unit is one versioned change: a forward `up` and a compensating
//! `down`, both declaring intent through a schema facade. Units are
//! supplied by the host through the loader capability; the audit-table
//! bootstrap unit below is the one unit the crate ships itself, built
//! through the same compiler it audits for.

use async_trait::async_trait;

use crate::error::SchemaResult;
use crate::schema::{DefaultValue, Schema};

/// One versioned migration: forward `up`, compensating `down`
#[async_trait]
pub trait MigrationUnit: Send + Sync {
    /// Unit name, matching the discovered file name
    fn name(&self) -> &str;

    /// Declare the forward end-state
    async fn up(&self, schema: &mut Schema) -> SchemaResult<()>;

    /// Declare the compensating change
    async fn down(&self, schema: &mut Schema) -> SchemaResult<()>;

    /// Unit-level gate; returning false records a skip
    fn should_run(&self) -> bool {
        true
    }

    /// Connection override; the configured default applies when `None`
    fn connection(&self) -> Option<&str> {
        None
    }
}

/// Ordering key of the bootstrap unit; sorts before every real timestamp
pub const BOOTSTRAP_ORDERING_KEY: i64 = 0;

/// Name the bootstrap unit reports and the audit table is keyed under
pub const BOOTSTRAP_UNIT_NAME: &str = "CreateMigrationsTableMigration";

/// Built-in unit that creates the audit table itself
pub struct CreateMigrationsTable {
    table: String,
}

impl CreateMigrationsTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

#[async_trait]
impl MigrationUnit for CreateMigrationsTable {
    fn name(&self) -> &str {
        BOOTSTRAP_UNIT_NAME
    }

    async fn up(&self, schema: &mut Schema) -> SchemaResult<()> {
        schema
            .create_table(&self.table, |table| {
                table.increments("id");
                table.big_integer("batchId").not_null();
                table.char("action", 8).not_null();
                table.integer("duration").not_null();
                table.string("name").not_null();
                table.string("status").not_null();
                table.text("error").nullable();
                table.text("statement").nullable();
                table
                    .timestamp("created_at")
                    .default_to(DefaultValue::CurrentTimestamp)
                    .on_update(DefaultValue::CurrentTimestamp);
            })
            .await
    }

    async fn down(&self, schema: &mut Schema) -> SchemaResult<()> {
        schema.drop_table_if_exists(&self.table).await
    }
}
