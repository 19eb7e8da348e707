//! Dialect-aware DDL compiler
//!
//! Renders a [`Table`] into statement text deterministically: the same
//! table always compiles to the same bytes. Dialect variation is a closed
//! set of tagged variants; constructs a dialect does not support are
//! silently dropped from the output.

use serde::{Deserialize, Serialize};

use super::column::{ColumnAction, ColumnDefinition, ColumnType, DefaultValue};
use super::table::{Table, TableAction};
use crate::error::{SchemaError, SchemaResult};

/// SQL dialect selected at table construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySql,
    MariaDb,
    Postgres,
    Sqlite,
    SqlServer,
}

impl Dialect {
    /// Quote an identifier with this dialect's quoting character
    pub fn quote(&self, identifier: &str) -> String {
        match self {
            Dialect::MySql | Dialect::MariaDb => format!("`{}`", identifier),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", identifier),
            Dialect::SqlServer => format!("[{}]", identifier),
        }
    }

    /// Positional parameter placeholder for this dialect
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index + 1),
            _ => "?".to_string(),
        }
    }

    /// MariaDB shares the MySQL syntax family
    pub fn is_mysql_family(&self) -> bool {
        matches!(self, Dialect::MySql | Dialect::MariaDb)
    }

    /// Whether unsigned integer modifiers exist in this dialect
    pub fn supports_unsigned(&self) -> bool {
        self.is_mysql_family()
    }

    /// Whether ON UPDATE column clauses exist in this dialect
    pub fn supports_on_update(&self) -> bool {
        self.is_mysql_family()
    }

    /// Whether inline COMMENT column clauses exist in this dialect
    pub fn supports_column_comments(&self) -> bool {
        self.is_mysql_family()
    }

    /// Whether ENGINE/CHARSET/COLLATE/COMMENT table options exist
    pub fn supports_table_options(&self) -> bool {
        self.is_mysql_family()
    }

    /// Auto-increment keyword, where the dialect uses one. Postgres uses
    /// the SERIAL type family instead and returns `None` here.
    pub fn auto_increment_keyword(&self) -> Option<&'static str> {
        match self {
            Dialect::MySql | Dialect::MariaDb => Some("AUTO_INCREMENT"),
            Dialect::Sqlite => Some("AUTOINCREMENT"),
            Dialect::SqlServer => Some("IDENTITY(1,1)"),
            Dialect::Postgres => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dialect::MySql => "mysql",
            Dialect::MariaDb => "mariadb",
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::SqlServer => "sqlserver",
        };
        write!(f, "{}", name)
    }
}

/// Compiles tables into dialect-correct DDL text
#[derive(Debug, Clone, Copy)]
pub struct TableCompiler {
    dialect: Dialect,
}

impl TableCompiler {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Render the table into one SQL statement
    pub fn compile(&self, table: &Table) -> SchemaResult<String> {
        match table.action() {
            TableAction::Create => self.compile_create(table),
            TableAction::Alter => self.compile_alter(table),
            TableAction::Drop => Ok(self.compile_drop(table)),
        }
    }

    fn compile_create(&self, table: &Table) -> SchemaResult<String> {
        let columns: Vec<&ColumnDefinition> = table
            .columns()
            .iter()
            .filter(|c| c.action() == &ColumnAction::Add)
            .collect();
        if columns.is_empty() {
            return Err(SchemaError::Compilation(format!(
                "cannot create table '{}' with no columns",
                table.name()
            )));
        }

        // More than one primary column switches to a single trailing
        // composite PRIMARY KEY clause.
        let primary_columns: Vec<&ColumnDefinition> =
            columns.iter().copied().filter(|c| c.is_primary()).collect();
        let composite = primary_columns.len() > 1;

        let mut lines = Vec::with_capacity(columns.len() + 1);
        for column in &columns {
            lines.push(format!("  {}", self.column_sql(column, composite)?));
        }
        if composite {
            let names: Vec<String> = primary_columns
                .iter()
                .map(|c| self.dialect.quote(c.name()))
                .collect();
            lines.push(format!("PRIMARY KEY({})", names.join(", ")));
        }

        let mut sql = format!(
            "CREATE {temporary}TABLE {if_not_exists}{name} (\n{body}\n)",
            temporary = if table.options().temporary {
                "TEMPORARY "
            } else {
                ""
            },
            if_not_exists = if table.options().if_not_exists {
                "IF NOT EXISTS "
            } else {
                ""
            },
            name = self.dialect.quote(table.name()),
            body = lines.join(",\n"),
        );

        if self.dialect.supports_table_options() {
            let mut options = Vec::new();
            if let Some(engine) = &table.options().engine {
                options.push(format!("ENGINE={}", engine));
            }
            if let Some(charset) = &table.options().charset {
                options.push(format!("DEFAULT CHARSET={}", charset));
            }
            if let Some(collation) = &table.options().collation {
                options.push(format!("COLLATE={}", collation));
            }
            if let Some(comment) = &table.options().comment {
                options.push(format!("COMMENT='{}'", escape_literal(comment)));
            }
            for option in options {
                sql.push('\n');
                sql.push_str(&option);
            }
        }

        Ok(sql)
    }

    fn compile_alter(&self, table: &Table) -> SchemaResult<String> {
        let mut clauses = Vec::new();
        for column in table.columns() {
            let clause = match column.action() {
                ColumnAction::Add => format!("ADD COLUMN {}", self.column_sql(column, false)?),
                ColumnAction::Change => {
                    format!("MODIFY COLUMN {}", self.column_sql(column, false)?)
                }
                ColumnAction::Drop => format!("DROP COLUMN {}", self.dialect.quote(column.name())),
                ColumnAction::Rename { to } => format!(
                    "RENAME COLUMN {} TO {}",
                    self.dialect.quote(column.name()),
                    self.dialect.quote(to)
                ),
            };
            clauses.push(clause);
        }
        if clauses.is_empty() {
            return Err(SchemaError::Compilation(format!(
                "alter of table '{}' declares no changes",
                table.name()
            )));
        }
        Ok(format!(
            "ALTER TABLE {}\n{}",
            self.dialect.quote(table.name()),
            clauses.join(",\n")
        ))
    }

    fn compile_drop(&self, table: &Table) -> String {
        format!(
            "DROP TABLE {if_exists}{name}",
            if_exists = if table.options().if_exists {
                "IF EXISTS "
            } else {
                ""
            },
            name = self.dialect.quote(table.name()),
        )
    }

    /// Render one column clause. Clause order is fixed:
    /// name type [UNSIGNED] [NULL|NOT NULL] [AUTO_INCREMENT]
    /// [PRIMARY KEY | UNIQUE] [DEFAULT v] [ON UPDATE v] [COMMENT 't']
    pub fn column_sql(
        &self,
        column: &ColumnDefinition,
        suppress_primary: bool,
    ) -> SchemaResult<String> {
        let mut parts = vec![
            self.dialect.quote(column.name()),
            self.type_sql(column),
        ];

        if column.is_unsigned() && self.dialect.supports_unsigned() {
            parts.push("UNSIGNED".to_string());
        }

        match column.nullability() {
            Some(true) => parts.push("NULL".to_string()),
            Some(false) => parts.push("NOT NULL".to_string()),
            None => {}
        }

        if column.is_auto_increment() {
            if let Some(keyword) = self.dialect.auto_increment_keyword() {
                parts.push(keyword.to_string());
            }
        }

        if column.is_primary() && !suppress_primary {
            parts.push("PRIMARY KEY".to_string());
        } else if column.is_unique() {
            parts.push("UNIQUE".to_string());
        }

        if let Some(default) = column.default_value() {
            parts.push(format!("DEFAULT {}", self.value_sql(default)));
        }

        if let Some(on_update) = column.on_update_value() {
            if self.dialect.supports_on_update() {
                parts.push(format!("ON UPDATE {}", self.value_sql(on_update)));
            }
        }

        if let Some(comment) = column.column_comment() {
            if self.dialect.supports_column_comments() {
                parts.push(format!("COMMENT '{}'", escape_literal(comment)));
            }
        }

        Ok(parts.join(" "))
    }

    fn type_sql(&self, column: &ColumnDefinition) -> String {
        let dialect = self.dialect;
        match column.column_type() {
            ColumnType::Char { length } => format!("CHAR({})", length),
            ColumnType::String { length } => format!("VARCHAR({})", length),
            ColumnType::TinyText if dialect.is_mysql_family() => "TINYTEXT".to_string(),
            ColumnType::MediumText if dialect.is_mysql_family() => "MEDIUMTEXT".to_string(),
            ColumnType::LongText if dialect.is_mysql_family() => "LONGTEXT".to_string(),
            ColumnType::TinyText
            | ColumnType::Text
            | ColumnType::MediumText
            | ColumnType::LongText => "TEXT".to_string(),
            ColumnType::TinyInteger { length } => match dialect {
                Dialect::MySql | Dialect::MariaDb => with_length("TINYINT", *length),
                Dialect::Sqlite => "INTEGER".to_string(),
                Dialect::SqlServer => "TINYINT".to_string(),
                Dialect::Postgres => "SMALLINT".to_string(),
            },
            ColumnType::SmallInteger { length } => match dialect {
                Dialect::MySql | Dialect::MariaDb => with_length("SMALLINT", *length),
                Dialect::Sqlite => "INTEGER".to_string(),
                Dialect::Postgres if column.is_auto_increment() => "SMALLSERIAL".to_string(),
                _ => "SMALLINT".to_string(),
            },
            ColumnType::Integer { length } => match dialect {
                Dialect::MySql | Dialect::MariaDb => with_length("INT", *length),
                Dialect::Sqlite => "INTEGER".to_string(),
                Dialect::SqlServer => "INT".to_string(),
                Dialect::Postgres if column.is_auto_increment() => "SERIAL".to_string(),
                Dialect::Postgres => "INTEGER".to_string(),
            },
            ColumnType::BigInteger { length } => match dialect {
                Dialect::MySql | Dialect::MariaDb => with_length("BIGINT", *length),
                Dialect::Sqlite => "INTEGER".to_string(),
                Dialect::Postgres if column.is_auto_increment() => "BIGSERIAL".to_string(),
                _ => "BIGINT".to_string(),
            },
            ColumnType::Float => match dialect {
                Dialect::Postgres | Dialect::Sqlite => "REAL".to_string(),
                Dialect::SqlServer => "REAL".to_string(),
                _ => "FLOAT".to_string(),
            },
            ColumnType::Double => match dialect {
                Dialect::Postgres => "DOUBLE PRECISION".to_string(),
                Dialect::Sqlite => "REAL".to_string(),
                Dialect::SqlServer => "FLOAT".to_string(),
                _ => "DOUBLE".to_string(),
            },
            ColumnType::Decimal { precision, scale } => {
                format!("DECIMAL({},{})", precision, scale)
            }
            ColumnType::Boolean => match dialect {
                Dialect::MySql | Dialect::MariaDb => "TINYINT(1)".to_string(),
                Dialect::SqlServer => "BIT".to_string(),
                _ => "BOOLEAN".to_string(),
            },
            ColumnType::Timestamp => match dialect {
                Dialect::SqlServer => "DATETIME2".to_string(),
                _ => "TIMESTAMP".to_string(),
            },
            ColumnType::DateTime => match dialect {
                Dialect::Postgres => "TIMESTAMP".to_string(),
                Dialect::SqlServer => "DATETIME2".to_string(),
                _ => "DATETIME".to_string(),
            },
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Time => "TIME".to_string(),
            ColumnType::Json => match dialect {
                Dialect::Sqlite => "TEXT".to_string(),
                Dialect::SqlServer => "NVARCHAR(MAX)".to_string(),
                _ => "JSON".to_string(),
            },
        }
    }

    fn value_sql(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
            DefaultValue::String(s) => format!("'{}'", escape_literal(s)),
            DefaultValue::Int(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Bool(b) => match self.dialect {
                Dialect::Postgres | Dialect::Sqlite => {
                    if *b { "TRUE" } else { "FALSE" }.to_string()
                }
                _ => if *b { "1" } else { "0" }.to_string(),
            },
            DefaultValue::Instant(instant) => format!(
                "'{}'",
                instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            ),
        }
    }
}

fn with_length(base: &str, length: Option<u32>) -> String {
    match length {
        Some(length) => format!("{}({})", base, length),
        None => base.to_string(),
    }
}

fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::table::Table;
    use chrono::TimeZone;

    fn compile(table: &Table) -> String {
        TableCompiler::new(table.dialect()).compile(table).unwrap()
    }

    #[test]
    fn default_length_string_mysql() {
        let mut table = Table::create("users", Dialect::MySql);
        table.string("name");
        let compiler = TableCompiler::new(Dialect::MySql);
        let sql = compiler.column_sql(&table.columns()[0], false).unwrap();
        assert_eq!(sql, "`name` VARCHAR(255)");
    }

    #[test]
    fn default_length_string_double_quote_dialects() {
        for dialect in [Dialect::Postgres, Dialect::Sqlite] {
            let mut table = Table::create("users", dialect);
            table.string("name");
            let compiler = TableCompiler::new(dialect);
            let sql = compiler.column_sql(&table.columns()[0], false).unwrap();
            assert_eq!(sql, "\"name\" VARCHAR(255)");
        }
    }

    #[test]
    fn bracket_quoting_for_sql_server() {
        let mut table = Table::create("users", Dialect::SqlServer);
        table.string("name");
        let compiler = TableCompiler::new(Dialect::SqlServer);
        let sql = compiler.column_sql(&table.columns()[0], false).unwrap();
        assert_eq!(sql, "[name] VARCHAR(255)");
    }

    #[test]
    fn create_table_shape() {
        let mut table = Table::create("users", Dialect::MySql);
        table.string("name");
        table.string("email").unique();

        assert_eq!(
            compile(&table),
            "CREATE TABLE `users` (\n  `name` VARCHAR(255),\n  `email` VARCHAR(255) UNIQUE\n)"
        );
    }

    #[test]
    fn composite_primary_key_suppresses_inline_markers() {
        let mut table = Table::create("members", Dialect::MySql);
        table.integer("id").primary();
        table.string("username").primary();

        let sql = compile(&table);
        assert_eq!(
            sql,
            "CREATE TABLE `members` (\n  `id` INT,\n  `username` VARCHAR(255),\nPRIMARY KEY(`id`, `username`)\n)"
        );
        assert!(!sql.contains("INT PRIMARY KEY"));
    }

    #[test]
    fn single_primary_key_stays_inline() {
        let mut table = Table::create("users", Dialect::MySql);
        table.integer("id").primary();

        assert_eq!(
            compile(&table),
            "CREATE TABLE `users` (\n  `id` INT PRIMARY KEY\n)"
        );
    }

    #[test]
    fn timestamp_default_and_on_update() {
        let mut table = Table::create("audit", Dialect::MySql);
        table
            .timestamp("created_at")
            .default_to(DefaultValue::CurrentTimestamp)
            .on_update(DefaultValue::CurrentTimestamp);

        let compiler = TableCompiler::new(Dialect::MySql);
        let sql = compiler.column_sql(&table.columns()[0], false).unwrap();
        assert_eq!(
            sql,
            "`created_at` TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn on_update_is_dropped_outside_mysql_family() {
        let mut table = Table::create("audit", Dialect::Postgres);
        table
            .timestamp("created_at")
            .default_to(DefaultValue::CurrentTimestamp)
            .on_update(DefaultValue::CurrentTimestamp);

        let compiler = TableCompiler::new(Dialect::Postgres);
        let sql = compiler.column_sql(&table.columns()[0], false).unwrap();
        assert_eq!(sql, "\"created_at\" TIMESTAMP DEFAULT CURRENT_TIMESTAMP");
    }

    #[test]
    fn unsigned_is_dropped_on_postgres_and_sqlite() {
        for dialect in [Dialect::Postgres, Dialect::Sqlite] {
            let mut table = Table::create("counters", dialect);
            table.integer("hits").unsigned();
            let sql = compile(&table);
            assert!(!sql.contains("UNSIGNED"), "{}", sql);
        }

        let mut table = Table::create("counters", Dialect::MySql);
        table.integer("hits").unsigned();
        assert!(compile(&table).contains("`hits` INT UNSIGNED"));
    }

    #[test]
    fn nullability_renders_presence_only() {
        let mut table = Table::create("t", Dialect::MySql);
        table.string("unset");
        table.string("yes").nullable();
        table.string("no").not_null();

        let compiler = TableCompiler::new(Dialect::MySql);
        assert_eq!(
            compiler.column_sql(&table.columns()[0], false).unwrap(),
            "`unset` VARCHAR(255)"
        );
        assert_eq!(
            compiler.column_sql(&table.columns()[1], false).unwrap(),
            "`yes` VARCHAR(255) NULL"
        );
        assert_eq!(
            compiler.column_sql(&table.columns()[2], false).unwrap(),
            "`no` VARCHAR(255) NOT NULL"
        );
    }

    #[test]
    fn same_definition_differs_only_in_quoting_across_dialects() {
        let render = |dialect: Dialect| {
            let mut table = Table::create("t", dialect);
            table.decimal("price", 8, 2).not_null();
            TableCompiler::new(dialect)
                .column_sql(&table.columns()[0], false)
                .unwrap()
        };
        assert_eq!(render(Dialect::MySql), "`price` DECIMAL(8,2) NOT NULL");
        assert_eq!(render(Dialect::Postgres), "\"price\" DECIMAL(8,2) NOT NULL");
        assert_eq!(render(Dialect::Sqlite), "\"price\" DECIMAL(8,2) NOT NULL");
    }

    #[test]
    fn auto_increment_per_dialect() {
        let render = |dialect: Dialect| {
            let mut table = Table::create("t", dialect);
            table.big_integer("id").unsigned().auto_increment().primary();
            TableCompiler::new(dialect)
                .column_sql(&table.columns()[0], false)
                .unwrap()
        };
        assert_eq!(
            render(Dialect::MySql),
            "`id` BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY"
        );
        // Postgres folds auto-increment into the SERIAL type family
        assert_eq!(render(Dialect::Postgres), "\"id\" BIGSERIAL PRIMARY KEY");
    }

    #[test]
    fn instant_default_renders_quoted_iso8601() {
        let instant = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut table = Table::create("t", Dialect::MySql);
        table.timestamp("seen_at").default_to(instant);

        let compiler = TableCompiler::new(Dialect::MySql);
        assert_eq!(
            compiler.column_sql(&table.columns()[0], false).unwrap(),
            "`seen_at` TIMESTAMP DEFAULT '2024-05-01T12:00:00Z'"
        );
    }

    #[test]
    fn string_default_escapes_quotes() {
        let mut table = Table::create("t", Dialect::MySql);
        table.string("label").default_to("it's");
        let compiler = TableCompiler::new(Dialect::MySql);
        assert_eq!(
            compiler.column_sql(&table.columns()[0], false).unwrap(),
            "`label` VARCHAR(255) DEFAULT 'it''s'"
        );
    }

    #[test]
    fn boolean_default_per_dialect() {
        let render = |dialect: Dialect| {
            let mut table = Table::create("t", dialect);
            table.boolean("active").default_to(true);
            TableCompiler::new(dialect)
                .column_sql(&table.columns()[0], false)
                .unwrap()
        };
        assert_eq!(render(Dialect::MySql), "`active` TINYINT(1) DEFAULT 1");
        assert_eq!(render(Dialect::Postgres), "\"active\" BOOLEAN DEFAULT TRUE");
    }

    #[test]
    fn table_options_only_for_mysql_family() {
        let mut table = Table::create("posts", Dialect::MySql);
        table.string("title");
        table
            .engine("InnoDB")
            .charset("utf8mb4")
            .collation("utf8mb4_unicode_ci")
            .table_comment("blog posts");

        assert_eq!(
            compile(&table),
            "CREATE TABLE `posts` (\n  `title` VARCHAR(255)\n)\nENGINE=InnoDB\nDEFAULT CHARSET=utf8mb4\nCOLLATE=utf8mb4_unicode_ci\nCOMMENT='blog posts'"
        );

        let mut table = Table::create("posts", Dialect::Postgres);
        table.string("title");
        table.engine("InnoDB");
        assert!(!compile(&table).contains("ENGINE"));
    }

    #[test]
    fn temporary_and_if_not_exists() {
        let mut table = Table::create("scratch", Dialect::Postgres);
        table.integer("n");
        table.temporary();
        assert!(compile(&table).starts_with("CREATE TEMPORARY TABLE \"scratch\""));

        let mut table = Table::create("maybe", Dialect::Postgres);
        table.integer("n");
        table.if_not_exists();
        assert!(compile(&table).starts_with("CREATE TABLE IF NOT EXISTS \"maybe\""));
    }

    #[test]
    fn alter_clauses() {
        let mut table = Table::alter("users", Dialect::MySql);
        table.string("email").change();
        table.drop_column("legacy");
        table.rename_column("login", "username");

        assert_eq!(
            compile(&table),
            "ALTER TABLE `users`\nMODIFY COLUMN `email` VARCHAR(255),\nDROP COLUMN `legacy`,\nRENAME COLUMN `login` TO `username`"
        );
    }

    #[test]
    fn drop_statements() {
        let table = Table::drop("users", Dialect::MySql);
        assert_eq!(compile(&table), "DROP TABLE `users`");

        let mut table = Table::drop("users", Dialect::Postgres);
        table.if_exists();
        assert_eq!(compile(&table), "DROP TABLE IF EXISTS \"users\"");
    }

    #[test]
    fn empty_create_is_a_compilation_error() {
        let table = Table::create("empty", Dialect::MySql);
        let err = TableCompiler::new(Dialect::MySql)
            .compile(&table)
            .unwrap_err();
        assert!(matches!(err, SchemaError::Compilation(_)));
    }

    #[test]
    fn compile_is_deterministic() {
        let build = || {
            let mut table = Table::create("users", Dialect::Postgres);
            table.increments("id");
            table.string("email").unique().not_null();
            table.json("settings").nullable();
            table
        };
        assert_eq!(compile(&build()), compile(&build()));
    }
}
