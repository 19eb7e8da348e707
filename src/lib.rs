//! Schema definition and migration execution for relational databases.
//!
//! The crate is split into two layers. The schema layer models tables and
//! columns as typed Rust values and compiles them to dialect-specific DDL
//! for MySQL, MariaDB, PostgreSQL, SQLite, and SQL Server. The migration
//! layer discovers versioned migration units, applies the outstanding ones
//! as a batch with compensating rollback on failure, and records every
//! outcome in an audit table.
//!
//! ```no_run
//! use elegant_schema::schema::{DefaultValue, Dialect, Schema};
//!
//! # async fn demo() -> elegant_schema::error::SchemaResult<()> {
//! let mut schema = Schema::new(Dialect::Postgres);
//! schema
//!     .create_table("users", |table| {
//!         table.increments("id");
//!         table.string("email").unique();
//!         table.timestamp("created_at").default_to(DefaultValue::CurrentTimestamp);
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod migrations;
pub mod schema;

pub use config::{ConnectionConfig, ConnectionResolver, DatabaseConfig, StaticResolver};
pub use database::{DatabaseConnection, DatabaseValue, PostgresConnection, Row};
pub use error::{SchemaError, SchemaResult};
pub use migrations::{
    MigrationInspector, MigrationManager, MigrationReport, MigrationRunner, MigrationUnit,
};
pub use schema::{ColumnDefinition, ColumnType, Dialect, Schema, Table, TableCompiler};
