//! Column definitions - typed descriptors for table columns
//!
//! A column's semantic type is fixed when the definition is constructed;
//! only the flag set, default, and on-update value may be changed afterwards
//! through the chained setters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic column type, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Fixed-length character column
    Char { length: u32 },
    /// Variable-length string column (default length 255)
    String { length: u32 },
    TinyText,
    Text,
    MediumText,
    LongText,
    TinyInteger { length: Option<u32> },
    SmallInteger { length: Option<u32> },
    Integer { length: Option<u32> },
    BigInteger { length: Option<u32> },
    Float,
    Double,
    /// Exact numeric; precision and scale are both required
    Decimal { precision: u32, scale: u32 },
    Boolean,
    Timestamp,
    DateTime,
    Date,
    Time,
    Json,
}

impl ColumnType {
    /// Whether this is one of the unbounded text variants (length is never
    /// rendered for these)
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyText | ColumnType::Text | ColumnType::MediumText | ColumnType::LongText
        )
    }

    /// Whether this is an integer-family type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::TinyInteger { .. }
                | ColumnType::SmallInteger { .. }
                | ColumnType::Integer { .. }
                | ColumnType::BigInteger { .. }
        )
    }
}

/// Default (or on-update) value for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// The engine's "current time" keyword, rendered unquoted
    CurrentTimestamp,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A concrete instant, rendered as a quoted ISO-8601 string
    Instant(DateTime<Utc>),
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        DefaultValue::String(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        DefaultValue::String(value)
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        DefaultValue::Int(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        DefaultValue::Int(value as i64)
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        DefaultValue::Float(value)
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        DefaultValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for DefaultValue {
    fn from(value: DateTime<Utc>) -> Self {
        DefaultValue::Instant(value)
    }
}

/// What an alter-mode column does to the live table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnAction {
    /// Add the column (the only action valid in CREATE mode)
    #[default]
    Add,
    /// Modify the column in place to this definition
    Change,
    /// Drop the column
    Drop,
    /// Rename the column
    Rename { to: String },
}

/// One column's declared shape: type plus constraint flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    name: String,
    column_type: ColumnType,
    nullable: Option<bool>,
    primary: bool,
    unique: bool,
    unsigned: bool,
    auto_increment: bool,
    default: Option<DefaultValue>,
    on_update: Option<DefaultValue>,
    comment: Option<String>,
    action: ColumnAction,
}

impl ColumnDefinition {
    /// Create a column with the given semantic type
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: None,
            primary: false,
            unique: false,
            unsigned: false,
            auto_increment: false,
            default: None,
            on_update: None,
            comment: None,
            action: ColumnAction::Add,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    /// Tri-state nullability: `None` means unset and the clause is omitted
    pub fn nullability(&self) -> Option<bool> {
        self.nullable
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn on_update_value(&self) -> Option<&DefaultValue> {
        self.on_update.as_ref()
    }

    pub fn column_comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn action(&self) -> &ColumnAction {
        &self.action
    }

    /// Mark the column as explicitly nullable
    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = Some(true);
        self
    }

    /// Mark the column as NOT NULL
    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = Some(false);
        self
    }

    /// Mark the column as a primary key. When more than one column in a
    /// table carries this flag the compiler emits a single trailing
    /// composite PRIMARY KEY clause instead of inline markers.
    pub fn primary(&mut self) -> &mut Self {
        self.primary = true;
        self
    }

    /// Add a UNIQUE constraint
    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    /// Mark the column unsigned. Dialects without unsigned integers drop
    /// the modifier from the compiled output.
    pub fn unsigned(&mut self) -> &mut Self {
        self.unsigned = true;
        self
    }

    /// Mark the column auto-incrementing
    pub fn auto_increment(&mut self) -> &mut Self {
        self.auto_increment = true;
        self
    }

    /// Set the column default
    pub fn default_to(&mut self, value: impl Into<DefaultValue>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    /// Set the on-update value (auto-refreshing timestamp columns)
    pub fn on_update(&mut self, value: impl Into<DefaultValue>) -> &mut Self {
        self.on_update = Some(value.into());
        self
    }

    /// Attach a column comment
    pub fn comment(&mut self, text: impl Into<String>) -> &mut Self {
        self.comment = Some(text.into());
        self
    }

    /// Switch the column to change mode (ALTER: MODIFY COLUMN)
    pub fn change(&mut self) -> &mut Self {
        self.action = ColumnAction::Change;
        self
    }

    pub(crate) fn set_action(&mut self, action: ColumnAction) {
        self.action = action;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_flags() {
        let mut column = ColumnDefinition::new("id", ColumnType::Integer { length: None });
        column.unsigned().auto_increment().primary();

        assert!(column.is_unsigned());
        assert!(column.is_auto_increment());
        assert!(column.is_primary());
        assert_eq!(column.nullability(), None);
    }

    #[test]
    fn nullability_is_tri_state() {
        let mut column = ColumnDefinition::new("bio", ColumnType::Text);
        assert_eq!(column.nullability(), None);

        column.nullable();
        assert_eq!(column.nullability(), Some(true));

        column.not_null();
        assert_eq!(column.nullability(), Some(false));
    }

    #[test]
    fn default_value_conversions() {
        let mut column = ColumnDefinition::new("count", ColumnType::Integer { length: None });
        column.default_to(0);
        assert_eq!(column.default_value(), Some(&DefaultValue::Int(0)));

        let mut column = ColumnDefinition::new("created_at", ColumnType::Timestamp);
        column.default_to(DefaultValue::CurrentTimestamp);
        assert_eq!(
            column.default_value(),
            Some(&DefaultValue::CurrentTimestamp)
        );
    }

    #[test]
    fn change_switches_action() {
        let mut column = ColumnDefinition::new("email", ColumnType::String { length: 255 });
        assert_eq!(column.action(), &ColumnAction::Add);
        column.change();
        assert_eq!(column.action(), &ColumnAction::Change);
    }
}
