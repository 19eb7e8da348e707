//! Database collaborator interfaces
//!
//! Abstracts the live database handle away from the schema compiler and the
//! migration runner. The core only ever talks to `DatabaseConnection`; a
//! sqlx-backed PostgreSQL adapter ships as the default implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as SqlxRow, TypeInfo};

use crate::error::{SchemaError, SchemaResult};

/// Database value enumeration for type-safe parameter binding and row access
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Uuid(uuid::Uuid),
    DateTime(DateTime<Utc>),
    Json(JsonValue),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Borrow the value as a string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read the value as a 64-bit integer if it carries an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DatabaseValue::Int32(i) => Some(*i as i64),
            DatabaseValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Read the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DatabaseValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read the value as a UTC timestamp
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            DatabaseValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int32(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<uuid::Uuid> for DatabaseValue {
    fn from(value: uuid::Uuid) -> Self {
        DatabaseValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for DatabaseValue {
    fn from(value: DateTime<Utc>) -> Self {
        DatabaseValue::DateTime(value)
    }
}

impl From<JsonValue> for DatabaseValue {
    fn from(value: JsonValue) -> Self {
        DatabaseValue::Json(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// One result row, keyed by column name
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: HashMap<String, DatabaseValue>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value
    pub fn insert(&mut self, name: impl Into<String>, value: DatabaseValue) {
        self.values.insert(name.into(), value);
    }

    /// Get a column value by name
    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.values.get(name)
    }

    /// Get a required string column
    pub fn get_string(&self, name: &str) -> SchemaResult<String> {
        self.get(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| SchemaError::Execution(format!("missing string column '{}'", name)))
    }

    /// Get an optional string column (null reads as `None`)
    pub fn get_optional_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str()).map(str::to_string)
    }

    /// Get a required integer column
    pub fn get_i64(&self, name: &str) -> SchemaResult<i64> {
        self.get(name)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| SchemaError::Execution(format!("missing integer column '{}'", name)))
    }

    /// Get an optional timestamp column
    pub fn get_datetime(&self, name: &str) -> Option<DateTime<Utc>> {
        self.get(name).and_then(|v| v.as_datetime())
    }

    /// Column names present in this row
    pub fn column_names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }
}

/// Abstract database handle used by the schema facade and migration runner
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Execute a statement and return the affected row count
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> SchemaResult<u64>;

    /// Run a query and return the result rows (catalog introspection,
    /// audit-table reads)
    async fn query(&self, sql: &str) -> SchemaResult<Vec<Row>>;

    /// Close the underlying connection
    async fn close(&self) -> SchemaResult<()>;
}

/// sqlx-backed PostgreSQL implementation of [`DatabaseConnection`]
pub struct PostgresConnection {
    pool: PgPool,
}

impl PostgresConnection {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to a database URL
    pub async fn connect(database_url: &str) -> SchemaResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| SchemaError::Execution(format!("failed to connect to database: {}", e)))?;
        Ok(Self::new(pool))
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseConnection for PostgresConnection {
    async fn execute(&self, sql: &str, params: &[DatabaseValue]) -> SchemaResult<u64> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| SchemaError::Execution(format!("{}", e)))?;
        Ok(result.rows_affected())
    }

    async fn query(&self, sql: &str) -> SchemaResult<Vec<Row>> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SchemaError::Execution(format!("{}", e)))?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn close(&self) -> SchemaResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &DatabaseValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        DatabaseValue::Null => query.bind(Option::<String>::None),
        DatabaseValue::Bool(b) => query.bind(*b),
        DatabaseValue::Int32(i) => query.bind(*i),
        DatabaseValue::Int64(i) => query.bind(*i),
        DatabaseValue::Float64(f) => query.bind(*f),
        DatabaseValue::String(s) => query.bind(s.clone()),
        DatabaseValue::Uuid(u) => query.bind(*u),
        DatabaseValue::DateTime(dt) => query.bind(*dt),
        DatabaseValue::Json(j) => query.bind(j.clone()),
    }
}

fn decode_row(row: &PgRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let name = column.name();
        let value = match column.type_info().name() {
            "BOOL" => row
                .try_get::<Option<bool>, _>(name)
                .ok()
                .flatten()
                .map(DatabaseValue::Bool),
            "INT2" | "INT4" => row
                .try_get::<Option<i32>, _>(name)
                .ok()
                .flatten()
                .map(DatabaseValue::Int32),
            "INT8" => row
                .try_get::<Option<i64>, _>(name)
                .ok()
                .flatten()
                .map(DatabaseValue::Int64),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(name)
                .ok()
                .flatten()
                .map(|f| DatabaseValue::Float64(f as f64)),
            "FLOAT8" | "NUMERIC" => row
                .try_get::<Option<f64>, _>(name)
                .ok()
                .flatten()
                .map(DatabaseValue::Float64),
            "UUID" => row
                .try_get::<Option<uuid::Uuid>, _>(name)
                .ok()
                .flatten()
                .map(DatabaseValue::Uuid),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(name)
                .ok()
                .flatten()
                .map(DatabaseValue::DateTime),
            "TIMESTAMP" => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(name)
                .ok()
                .flatten()
                .map(|naive| DatabaseValue::DateTime(DateTime::from_naive_utc_and_offset(naive, Utc))),
            "JSON" | "JSONB" => row
                .try_get::<Option<JsonValue>, _>(name)
                .ok()
                .flatten()
                .map(DatabaseValue::Json),
            _ => row
                .try_get::<Option<String>, _>(name)
                .ok()
                .flatten()
                .map(DatabaseValue::String),
        };
        out.insert(name, value.unwrap_or(DatabaseValue::Null));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_value_conversions() {
        assert_eq!(DatabaseValue::from(42i64), DatabaseValue::Int64(42));
        assert_eq!(
            DatabaseValue::from("hello"),
            DatabaseValue::String("hello".to_string())
        );
        assert_eq!(DatabaseValue::from(Option::<i32>::None), DatabaseValue::Null);
        assert!(DatabaseValue::Null.is_null());
    }

    #[test]
    fn row_typed_access() {
        let mut row = Row::new();
        row.insert("name", DatabaseValue::String("users".to_string()));
        row.insert("batchId", DatabaseValue::Int64(1714000000000));
        row.insert("error", DatabaseValue::Null);

        assert_eq!(row.get_string("name").unwrap(), "users");
        assert_eq!(row.get_i64("batchId").unwrap(), 1714000000000);
        assert_eq!(row.get_optional_string("error"), None);
        assert!(row.get_string("missing").is_err());
    }
}
