//! Error types for schema compilation and migration execution
//!
//! One structured error enum covers the whole taxonomy: configuration
//! problems are fatal and surface before any unit runs, compilation and
//! execution errors are caught at the runner boundary and turned into
//! result records.

/// Result type alias for schema and migration operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Error types for schema and migration operations
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A connection name could not be resolved against the configuration
    #[error("Configuration error: unknown connection '{connection}' (check {config_source})")]
    UnknownConnection {
        connection: String,
        config_source: String,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A dialect compiler was asked to render an unsupported construct
    #[error("Compilation error: {0}")]
    Compilation(String),

    /// The database engine rejected a compiled statement
    #[error("Execution error: {0}")]
    Execution(String),

    /// Migration discovery failed (unreadable directory, bad filename,
    /// duplicate ordering key, missing unit for a persisted row)
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Filesystem error while scanning the migrations directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for SchemaError {
    fn from(err: sqlx::Error) -> Self {
        SchemaError::Execution(err.to_string())
    }
}
