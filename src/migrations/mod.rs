//! Migration subsystem: discovery, execution, audit trail, and inspection

pub mod definitions;
pub mod inspector;
pub mod manager;
pub mod repository;
pub mod runner;
pub mod unit;

pub use definitions::{
    MigrationAction, MigrationFile, MigrationReport, MigrationResult, MigrationStatus,
};
pub use inspector::{MigrationInspector, StatusEntry};
pub use manager::{LoadedUnit, MigrationLoader, MigrationManager, RegistryLoader, SortOrder};
pub use repository::MigrationRepository;
pub use runner::MigrationRunner;
pub use unit::{CreateMigrationsTable, MigrationUnit};
