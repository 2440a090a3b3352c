//! sqlorigin-core: column-origin resolution for SQLite SELECT statements
//!
//! Given a parsed SELECT and access to a schema, the resolver determines for
//! every result column of every compound arm where it comes from: database,
//! table or derivation, underlying column, and the aliases in play. Schema
//! access goes through the [`schema::SchemaCatalog`] and [`database::Database`]
//! traits, so resolution works against parsed DDL without a live connection.

pub mod analyzer;
pub mod database;
pub mod dialect;
pub mod error;
pub mod schema;
pub mod types;

pub use analyzer::{Column, ColumnFlags, ColumnKind, SelectResolver, Table};
pub use database::{AliasedColumn, Database, DatabaseError, OfflineDatabase};
pub use dialect::SqlDialect;
pub use error::{Diagnostic, DiagnosticKind, Severity, Span};
pub use schema::{AttachNameMap, Catalog, SchemaBuilder, SchemaCatalog};
pub use types::{DataType, DataTypeKind};
