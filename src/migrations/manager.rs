//! Migration manager - discovery and loading of migration units
//!
//! Scans the migrations directory for files following the unit convention,
//! orders them by their leading timestamp, and instantiates each unit
//! bound to a live connection through the injected loader capability.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use crate::config::{ConnectionResolver, DatabaseConfig};
use crate::database::DatabaseConnection;
use crate::error::{SchemaError, SchemaResult};
use crate::schema::Dialect;

use super::definitions::MigrationFile;
use super::repository::MigrationRepository;
use super::unit::{CreateMigrationsTable, MigrationUnit, BOOTSTRAP_ORDERING_KEY, BOOTSTRAP_UNIT_NAME};

/// Direction of the discovery sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Capability that turns a discovered file into a unit instance. The core
/// never embeds a loader; hosts supply one (the registry below covers the
/// common case of units compiled into the host binary).
pub trait MigrationLoader: Send + Sync {
    fn load(&self, file: &MigrationFile) -> SchemaResult<Box<dyn MigrationUnit>>;
}

type UnitFactory = Box<dyn Fn() -> Box<dyn MigrationUnit> + Send + Sync>;

/// Loader backed by a name-to-factory registry
#[derive(Default)]
pub struct RegistryLoader {
    factories: HashMap<String, UnitFactory>,
}

impl RegistryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a unit name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn MigrationUnit> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }
}

impl MigrationLoader for RegistryLoader {
    fn load(&self, file: &MigrationFile) -> SchemaResult<Box<dyn MigrationUnit>> {
        let factory = self.factories.get(&file.name).ok_or_else(|| {
            SchemaError::Discovery(format!(
                "no migration unit registered for '{}' (discovered at {})",
                file.name,
                file.path.display()
            ))
        })?;
        Ok(factory())
    }
}

/// A discovered unit bound to its connection
pub struct LoadedUnit {
    pub file: MigrationFile,
    pub unit: Box<dyn MigrationUnit>,
    pub dialect: Dialect,
    pub connection: Arc<dyn DatabaseConnection>,
}

impl std::fmt::Debug for LoadedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedUnit")
            .field("file", &self.file)
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

/// Turns a directory of migration unit files into loaded, connection-bound
/// instances
pub struct MigrationManager {
    config: DatabaseConfig,
    loader: Arc<dyn MigrationLoader>,
    resolver: Arc<dyn ConnectionResolver>,
}

impl MigrationManager {
    pub fn new(
        config: DatabaseConfig,
        loader: Arc<dyn MigrationLoader>,
        resolver: Arc<dyn ConnectionResolver>,
    ) -> Self {
        Self {
            config,
            loader,
            resolver,
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// List unit files in the migrations directory, sorted by ordering
    /// key. Ordering-key collisions are rejected here rather than
    /// surfacing as nondeterministic apply order later.
    pub fn discover(&self, order: SortOrder) -> SchemaResult<Vec<MigrationFile>> {
        let dir = &self.config.migrations_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(file) = MigrationFile::from_path(&entry.path()) {
                files.push(file);
            }
        }
        files.sort_by_key(|f| f.ordering_key);

        for pair in files.windows(2) {
            if pair[0].ordering_key == pair[1].ordering_key {
                return Err(SchemaError::Discovery(format!(
                    "duplicate ordering key {} shared by '{}' and '{}'",
                    pair[0].ordering_key, pair[0].name, pair[1].name
                )));
            }
        }

        if order == SortOrder::Descending {
            files.reverse();
        }
        Ok(files)
    }

    /// Discover and instantiate every unit, each bound to its resolved
    /// connection
    pub async fn load(&self, order: SortOrder) -> SchemaResult<Vec<LoadedUnit>> {
        let mut units = Vec::new();
        for file in self.discover(order)? {
            let unit = self.loader.load(&file)?;
            let connection_name = unit
                .connection()
                .unwrap_or(&self.config.default_connection)
                .to_string();
            let (dialect, connection) = self.resolve(&connection_name).await?;
            units.push(LoadedUnit {
                file,
                unit,
                dialect,
                connection,
            });
        }
        Ok(units)
    }

    /// The built-in audit-table bootstrap unit, bound to the default
    /// connection with ordering key 0
    pub async fn bootstrap(&self) -> SchemaResult<LoadedUnit> {
        let (dialect, connection) = self.resolve(&self.config.default_connection).await?;
        Ok(LoadedUnit {
            file: MigrationFile {
                ordering_key: BOOTSTRAP_ORDERING_KEY,
                name: BOOTSTRAP_UNIT_NAME.to_string(),
                path: Default::default(),
            },
            unit: Box::new(CreateMigrationsTable::new(&self.config.migrations_table)),
            dialect,
            connection,
        })
    }

    /// Open the audit repository on the default connection
    pub async fn open_repository(&self) -> SchemaResult<MigrationRepository> {
        let (dialect, connection) = self.resolve(&self.config.default_connection).await?;
        Ok(MigrationRepository::new(
            connection,
            dialect,
            self.config.migrations_table.clone(),
        ))
    }

    async fn resolve(&self, name: &str) -> SchemaResult<(Dialect, Arc<dyn DatabaseConnection>)> {
        self.resolver.resolve(name).await.map_err(|err| match err {
            SchemaError::UnknownConnection { connection, .. } => SchemaError::UnknownConnection {
                connection,
                config_source: self.config.source_name(),
            },
            other => other,
        })
    }
}
