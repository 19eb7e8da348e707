//! Table model - pending DDL intent for one table
//!
//! A table is created by the schema facade, configured through the fluent
//! column constructors, compiled to text, and discarded. Column insertion
//! order is significant: it fixes the column order in CREATE output and the
//! clause order in ALTER output.

use super::column::{ColumnAction, ColumnDefinition, ColumnType};
use super::compiler::{Dialect, TableCompiler};
use crate::error::SchemaResult;

/// Statement kind the table compiles to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    Create,
    Alter,
    Drop,
}

/// Table-level options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
    pub temporary: bool,
    pub if_exists: bool,
    pub if_not_exists: bool,
}

/// One table's pending DDL intent
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    dialect: Dialect,
    action: TableAction,
    columns: Vec<ColumnDefinition>,
    options: TableOptions,
}

impl Table {
    /// Start a CREATE TABLE intent
    pub fn create(name: impl Into<String>, dialect: Dialect) -> Self {
        Self::with_action(name, dialect, TableAction::Create)
    }

    /// Start an ALTER TABLE intent
    pub fn alter(name: impl Into<String>, dialect: Dialect) -> Self {
        Self::with_action(name, dialect, TableAction::Alter)
    }

    /// Start a DROP TABLE intent
    pub fn drop(name: impl Into<String>, dialect: Dialect) -> Self {
        Self::with_action(name, dialect, TableAction::Drop)
    }

    fn with_action(name: impl Into<String>, dialect: Dialect, action: TableAction) -> Self {
        Self {
            name: name.into(),
            dialect,
            action,
            columns: Vec::new(),
            options: TableOptions::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn action(&self) -> TableAction {
        self.action
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    /// Compile this table with its own dialect
    pub fn to_sql(&self) -> SchemaResult<String> {
        TableCompiler::new(self.dialect).compile(self)
    }

    fn push(&mut self, column: ColumnDefinition) -> &mut ColumnDefinition {
        self.columns.push(column);
        self.columns.last_mut().expect("column was just pushed")
    }

    /// VARCHAR column with the default length of 255
    pub fn string(&mut self, name: &str) -> &mut ColumnDefinition {
        self.string_with_length(name, 255)
    }

    /// VARCHAR column with an explicit length
    pub fn string_with_length(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::String { length }))
    }

    /// CHAR column
    pub fn char(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::Char { length }))
    }

    pub fn tiny_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::TinyText))
    }

    pub fn text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::Text))
    }

    pub fn medium_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::MediumText))
    }

    pub fn long_text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::LongText))
    }

    pub fn tiny_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(
            name,
            ColumnType::TinyInteger { length: None },
        ))
    }

    pub fn small_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(
            name,
            ColumnType::SmallInteger { length: None },
        ))
    }

    pub fn integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(
            name,
            ColumnType::Integer { length: None },
        ))
    }

    /// Integer column with a display length (MySQL-family rendering)
    pub fn integer_with_length(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(
            name,
            ColumnType::Integer {
                length: Some(length),
            },
        ))
    }

    pub fn big_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(
            name,
            ColumnType::BigInteger { length: None },
        ))
    }

    pub fn float(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::Float))
    }

    pub fn double(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::Double))
    }

    /// Exact numeric column; precision and scale are both required here so
    /// an incomplete decimal cannot reach the compiler.
    pub fn decimal(&mut self, name: &str, precision: u32, scale: u32) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(
            name,
            ColumnType::Decimal { precision, scale },
        ))
    }

    pub fn boolean(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::Boolean))
    }

    pub fn timestamp(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::Timestamp))
    }

    pub fn datetime(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::DateTime))
    }

    pub fn date(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::Date))
    }

    pub fn time(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::Time))
    }

    pub fn json(&mut self, name: &str) -> &mut ColumnDefinition {
        self.push(ColumnDefinition::new(name, ColumnType::Json))
    }

    /// Auto-incrementing unsigned integer primary key
    pub fn increments(&mut self, name: &str) -> &mut ColumnDefinition {
        let column = self.integer(name);
        column.unsigned().auto_increment().primary();
        column
    }

    /// Auto-incrementing unsigned big-integer primary key
    pub fn big_increments(&mut self, name: &str) -> &mut ColumnDefinition {
        let column = self.big_integer(name);
        column.unsigned().auto_increment().primary();
        column
    }

    /// ALTER: drop a column
    pub fn drop_column(&mut self, name: &str) -> &mut Self {
        let mut column = ColumnDefinition::new(name, ColumnType::Integer { length: None });
        column.set_action(ColumnAction::Drop);
        self.columns.push(column);
        self
    }

    /// ALTER: rename a column
    pub fn rename_column(&mut self, from: &str, to: &str) -> &mut Self {
        let mut column = ColumnDefinition::new(from, ColumnType::Integer { length: None });
        column.set_action(ColumnAction::Rename { to: to.to_string() });
        self.columns.push(column);
        self
    }

    pub fn engine(&mut self, engine: impl Into<String>) -> &mut Self {
        self.options.engine = Some(engine.into());
        self
    }

    pub fn charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.options.charset = Some(charset.into());
        self
    }

    pub fn collation(&mut self, collation: impl Into<String>) -> &mut Self {
        self.options.collation = Some(collation.into());
        self
    }

    pub fn table_comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.options.comment = Some(comment.into());
        self
    }

    pub fn temporary(&mut self) -> &mut Self {
        self.options.temporary = true;
        self
    }

    pub fn if_exists(&mut self) -> &mut Self {
        self.options.if_exists = true;
        self
    }

    pub fn if_not_exists(&mut self) -> &mut Self {
        self.options.if_not_exists = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_keep_insertion_order() {
        let mut table = Table::create("users", Dialect::Postgres);
        table.increments("id");
        table.string("email");
        table.boolean("active");

        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["id", "email", "active"]);
    }

    #[test]
    fn increments_sets_key_flags() {
        let mut table = Table::create("users", Dialect::MySql);
        table.increments("id");

        let column = &table.columns()[0];
        assert!(column.is_primary());
        assert!(column.is_unsigned());
        assert!(column.is_auto_increment());
    }

    #[test]
    fn alter_helpers_set_actions() {
        let mut table = Table::alter("users", Dialect::MySql);
        table.drop_column("legacy");
        table.rename_column("login", "username");

        assert_eq!(table.columns()[0].action(), &ColumnAction::Drop);
        assert_eq!(
            table.columns()[1].action(),
            &ColumnAction::Rename {
                to: "username".to_string()
            }
        );
    }

    #[test]
    fn dialect_is_fixed_at_construction() {
        let table = Table::create("users", Dialect::Sqlite);
        assert_eq!(table.dialect(), Dialect::Sqlite);
    }
}
