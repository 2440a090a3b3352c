//! Schema catalog, attach-name mapping, and DDL-driven catalog construction

mod attach;
mod builder;
mod catalog;

pub use attach::AttachNameMap;
pub use builder::SchemaBuilder;
pub use catalog::{
    Catalog, ColumnDef, DatabaseSchema, SchemaCatalog, SchemaObjectKind, TableDef, ViewDef,
};
