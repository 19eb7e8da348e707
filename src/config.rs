//! Configuration collaborator
//!
//! Exposes the default connection name, per-connection dialect, and the
//! migrations directory. Loading configuration files is the host's job;
//! this module only defines the serde-ready shape and the resolver seam
//! that turns a connection name into a live handle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::database::DatabaseConnection;
use crate::error::{SchemaError, SchemaResult};
use crate::schema::Dialect;

/// One named connection: its dialect and database URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub dialect: Dialect,
    pub url: String,
}

/// Database and migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection used when a unit does not declare an override
    pub default_connection: String,
    /// Named connections
    pub connections: HashMap<String, ConnectionConfig>,
    /// Directory holding the migration unit files
    pub migrations_dir: PathBuf,
    /// Audit table name
    pub migrations_table: String,
    /// Where this configuration came from, used for error context
    #[serde(default)]
    pub source: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            default_connection: "default".to_string(),
            connections: HashMap::new(),
            migrations_dir: PathBuf::from("migrations"),
            migrations_table: "elegant_migrations".to_string(),
            source: None,
        }
    }
}

impl DatabaseConfig {
    /// Name of the configuration source, for error messages
    pub fn source_name(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "the database configuration".to_string())
    }

    /// Look up a named connection, erroring with context when missing
    pub fn connection(&self, name: &str) -> SchemaResult<&ConnectionConfig> {
        self.connections
            .get(name)
            .ok_or_else(|| SchemaError::UnknownConnection {
                connection: name.to_string(),
                config_source: self.source_name(),
            })
    }
}

/// Capability that turns a connection name into a dialect and a live handle
#[async_trait]
pub trait ConnectionResolver: Send + Sync {
    async fn resolve(&self, name: &str)
        -> SchemaResult<(Dialect, Arc<dyn DatabaseConnection>)>;
}

/// Resolver over a fixed set of pre-built handles. Hosts register each
/// connection once; tests register mocks.
#[derive(Default)]
pub struct StaticResolver {
    connections: HashMap<String, (Dialect, Arc<dyn DatabaseConnection>)>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named connection
    pub fn register(
        &mut self,
        name: impl Into<String>,
        dialect: Dialect,
        connection: Arc<dyn DatabaseConnection>,
    ) -> &mut Self {
        self.connections.insert(name.into(), (dialect, connection));
        self
    }
}

#[async_trait]
impl ConnectionResolver for StaticResolver {
    async fn resolve(
        &self,
        name: &str,
    ) -> SchemaResult<(Dialect, Arc<dyn DatabaseConnection>)> {
        self.connections
            .get(name)
            .map(|(dialect, connection)| (*dialect, connection.clone()))
            .ok_or_else(|| SchemaError::UnknownConnection {
                connection: name.to_string(),
                config_source: "the registered connections".to_string(),
            })
    }
}
