//! Schema definition and DDL compilation
//!
//! Typed column descriptors, the per-table DDL intent model, the
//! dialect-aware compiler, catalog introspection, and the schema facade
//! that sequences table operations for one unit of work.

pub mod column;
pub mod compiler;
pub mod facade;
pub mod introspect;
pub mod table;

pub use column::{ColumnAction, ColumnDefinition, ColumnType, DefaultValue};
pub use compiler::{Dialect, TableCompiler};
pub use facade::Schema;
pub use introspect::TableIntrospector;
pub use table::{Table, TableAction, TableOptions};
