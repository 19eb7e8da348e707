//! Reverse compilation - live table introspection
//!
//! Queries the engine's column catalog and reconstructs column definitions,
//! normalizing engine-reported type strings (`int(11) unsigned`,
//! `character varying(255)`) back into the semantic model. The inverse of
//! the forward compiler: round-tripping a forward-compiled column yields a
//! definition with the same type, length, nullability, and key flags.

use super::column::{ColumnDefinition, ColumnType, DefaultValue};
use super::compiler::Dialect;
use crate::database::{DatabaseConnection, Row};
use crate::error::{SchemaError, SchemaResult};

/// Reads a live table's columns back into [`ColumnDefinition`]s
#[derive(Debug, Clone, Copy)]
pub struct TableIntrospector {
    dialect: Dialect,
}

impl TableIntrospector {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Catalog query for one table's columns, in declaration order
    pub fn columns_query(&self, table: &str) -> String {
        match self.dialect {
            Dialect::MySql | Dialect::MariaDb => format!(
                "SELECT column_name, column_type, is_nullable, column_key, column_default, extra \
                 FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = '{}' \
                 ORDER BY ordinal_position",
                table
            ),
            Dialect::Postgres | Dialect::SqlServer => format!(
                "SELECT c.column_name, c.data_type, c.character_maximum_length, \
                 c.numeric_precision, c.numeric_scale, c.is_nullable, c.column_default, \
                 (SELECT COUNT(*) FROM information_schema.table_constraints tc \
                  JOIN information_schema.key_column_usage kcu \
                    ON kcu.constraint_name = tc.constraint_name \
                  WHERE tc.table_name = c.table_name \
                    AND kcu.column_name = c.column_name \
                    AND tc.constraint_type = 'PRIMARY KEY') AS primary_count, \
                 (SELECT COUNT(*) FROM information_schema.table_constraints tc \
                  JOIN information_schema.key_column_usage kcu \
                    ON kcu.constraint_name = tc.constraint_name \
                  WHERE tc.table_name = c.table_name \
                    AND kcu.column_name = c.column_name \
                    AND tc.constraint_type = 'UNIQUE') AS unique_count \
                 FROM information_schema.columns c \
                 WHERE c.table_name = '{}' \
                 ORDER BY c.ordinal_position",
                table
            ),
            Dialect::Sqlite => format!("PRAGMA table_info({})", self.dialect.quote(table)),
        }
    }

    /// Introspect a live table into column definitions
    pub async fn introspect(
        &self,
        connection: &dyn DatabaseConnection,
        table: &str,
    ) -> SchemaResult<Vec<ColumnDefinition>> {
        let rows = connection.query(&self.columns_query(table)).await?;
        rows.iter().map(|row| self.column_from_row(row)).collect()
    }

    /// Reconstruct one column definition from a catalog row
    pub fn column_from_row(&self, row: &Row) -> SchemaResult<ColumnDefinition> {
        match self.dialect {
            Dialect::MySql | Dialect::MariaDb => self.mysql_column(row),
            Dialect::Postgres | Dialect::SqlServer => self.standard_column(row),
            Dialect::Sqlite => self.sqlite_column(row),
        }
    }

    fn mysql_column(&self, row: &Row) -> SchemaResult<ColumnDefinition> {
        let name = row.get_string("column_name")?;
        let raw_type = row.get_string("column_type")?;
        let (column_type, unsigned) = normalize_type(&raw_type)?;

        let mut column = ColumnDefinition::new(name, column_type);
        if unsigned {
            column.unsigned();
        }
        match row.get_optional_string("is_nullable").as_deref() {
            Some("YES") => {
                column.nullable();
            }
            Some("NO") => {
                column.not_null();
            }
            _ => {}
        }
        match row.get_optional_string("column_key").as_deref() {
            Some("PRI") => {
                column.primary();
            }
            Some("UNI") => {
                column.unique();
            }
            _ => {}
        }
        if let Some(extra) = row.get_optional_string("extra") {
            if extra.to_lowercase().contains("auto_increment") {
                column.auto_increment();
            }
        }
        if let Some(default) = row.get_optional_string("column_default") {
            column.default_to(parse_default(&default));
        }
        Ok(column)
    }

    fn standard_column(&self, row: &Row) -> SchemaResult<ColumnDefinition> {
        let name = row.get_string("column_name")?;
        let data_type = row.get_string("data_type")?;

        let column_type = match data_type.as_str() {
            "character varying" | "varchar" => ColumnType::String {
                length: row.get_i64("character_maximum_length").unwrap_or(255) as u32,
            },
            "character" | "char" => ColumnType::Char {
                length: row.get_i64("character_maximum_length").unwrap_or(1) as u32,
            },
            "text" => ColumnType::Text,
            "smallint" => ColumnType::SmallInteger { length: None },
            "integer" | "int" => ColumnType::Integer { length: None },
            "bigint" => ColumnType::BigInteger { length: None },
            "real" => ColumnType::Float,
            "double precision" | "float" => ColumnType::Double,
            "numeric" | "decimal" => ColumnType::Decimal {
                precision: row.get_i64("numeric_precision").unwrap_or(10) as u32,
                scale: row.get_i64("numeric_scale").unwrap_or(0) as u32,
            },
            "boolean" | "bit" => ColumnType::Boolean,
            "timestamp without time zone" | "timestamp with time zone" | "timestamp"
            | "datetime2" => ColumnType::Timestamp,
            "date" => ColumnType::Date,
            "time without time zone" | "time" => ColumnType::Time,
            "json" | "jsonb" => ColumnType::Json,
            other => {
                return Err(SchemaError::Compilation(format!(
                    "cannot reverse-compile catalog type '{}'",
                    other
                )))
            }
        };

        let mut column = ColumnDefinition::new(name, column_type);
        match row.get_optional_string("is_nullable").as_deref() {
            Some("YES") => {
                column.nullable();
            }
            Some("NO") => {
                column.not_null();
            }
            _ => {}
        }
        if row.get_i64("primary_count").unwrap_or(0) > 0 {
            column.primary();
        } else if row.get_i64("unique_count").unwrap_or(0) > 0 {
            column.unique();
        }
        if let Some(default) = row.get_optional_string("column_default") {
            // serial columns report a nextval() default; that is the
            // auto-increment marker, not a literal default
            if default.starts_with("nextval(") {
                column.auto_increment();
            } else {
                column.default_to(parse_default(&default));
            }
        }
        Ok(column)
    }

    fn sqlite_column(&self, row: &Row) -> SchemaResult<ColumnDefinition> {
        let name = row.get_string("name")?;
        let raw_type = row.get_string("type")?;
        let (column_type, _) = normalize_type(&raw_type)?;

        let mut column = ColumnDefinition::new(name, column_type);
        match row.get_i64("notnull") {
            Ok(0) => {
                column.nullable();
            }
            Ok(_) => {
                column.not_null();
            }
            Err(_) => {}
        }
        if row.get_i64("pk").unwrap_or(0) > 0 {
            column.primary();
        }
        if let Some(default) = row.get_optional_string("dflt_value") {
            column.default_to(parse_default(&default));
        }
        Ok(column)
    }
}

/// Normalize an engine-reported type string like `int(11) unsigned` or
/// `varchar(255)` into a semantic type plus the unsigned flag.
pub(crate) fn normalize_type(raw: &str) -> SchemaResult<(ColumnType, bool)> {
    let lowered = raw.trim().to_lowercase();
    let unsigned = lowered.ends_with(" unsigned");
    let without_modifier = lowered.trim_end_matches(" unsigned").trim();

    let (base, args) = match without_modifier.split_once('(') {
        Some((base, rest)) => (
            base.trim(),
            rest.trim_end_matches(')')
                .split(',')
                .filter_map(|a| a.trim().parse::<u32>().ok())
                .collect::<Vec<u32>>(),
        ),
        None => (without_modifier, Vec::new()),
    };

    let first = args.first().copied();
    let column_type = match base {
        "char" | "character" => ColumnType::Char {
            length: first.unwrap_or(1),
        },
        "varchar" | "character varying" => ColumnType::String {
            length: first.unwrap_or(255),
        },
        "tinytext" => ColumnType::TinyText,
        "text" => ColumnType::Text,
        "mediumtext" => ColumnType::MediumText,
        "longtext" => ColumnType::LongText,
        // MySQL reports boolean columns as tinyint(1)
        "tinyint" if first == Some(1) => ColumnType::Boolean,
        "tinyint" => ColumnType::TinyInteger { length: first },
        "smallint" => ColumnType::SmallInteger { length: first },
        "int" | "integer" => ColumnType::Integer { length: first },
        "bigint" => ColumnType::BigInteger { length: first },
        "float" | "real" => ColumnType::Float,
        "double" | "double precision" => ColumnType::Double,
        "decimal" | "numeric" => ColumnType::Decimal {
            precision: first.unwrap_or(10),
            scale: args.get(1).copied().unwrap_or(0),
        },
        "bool" | "boolean" => ColumnType::Boolean,
        "timestamp" => ColumnType::Timestamp,
        "datetime" => ColumnType::DateTime,
        "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "json" => ColumnType::Json,
        other => {
            return Err(SchemaError::Compilation(format!(
                "cannot reverse-compile engine type '{}'",
                other
            )))
        }
    };
    Ok((column_type, unsigned))
}

fn parse_default(raw: &str) -> DefaultValue {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("current_timestamp")
        || trimmed.eq_ignore_ascii_case("current_timestamp()")
        || trimmed.eq_ignore_ascii_case("now()")
    {
        return DefaultValue::CurrentTimestamp;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return DefaultValue::Int(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        return DefaultValue::Float(float);
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return DefaultValue::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return DefaultValue::Bool(false);
    }
    // Postgres reports typed literals like 'active'::character varying
    let stripped = trimmed
        .split("::")
        .next()
        .unwrap_or(trimmed)
        .trim_matches('\'');
    DefaultValue::String(stripped.to_string())
}
