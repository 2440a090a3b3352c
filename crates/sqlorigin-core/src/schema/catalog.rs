//! Schema catalog - stores table, view and column definitions

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;

use crate::types::DataType;

/// Kinds of named schema objects a resolver may ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaObjectKind {
    Table,
    View,
}

/// Read access to a database schema, as needed during SELECT resolution.
///
/// Implementations may be backed by a live connection or, like [`Catalog`],
/// by parsed DDL. All name parameters compare case-insensitively; a `None`
/// database means the default (`main`) database.
pub trait SchemaCatalog {
    /// Column names of a table, in declaration order. Unknown tables yield
    /// an empty list.
    fn table_columns(&self, database: Option<&str>, table: &str) -> Vec<String>;

    /// Names of all views in a database
    fn views(&self, database: Option<&str>) -> Vec<String>;

    /// The parsed DDL statement of a named object, if available
    fn parsed_object(
        &self,
        database: Option<&str>,
        name: &str,
        kind: SchemaObjectKind,
    ) -> Option<Statement>;
}

/// Schema catalog - holds per-database table and view information
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Database name -> schema; SQLite's `main` plus any attached databases
    pub databases: IndexMap<String, DatabaseSchema>,
    /// Default database name
    pub default_database: String,
}

impl Catalog {
    pub fn new() -> Self {
        let mut catalog = Self {
            databases: IndexMap::new(),
            default_database: "main".to_string(),
        };
        catalog.databases.insert(
            "main".to_string(),
            DatabaseSchema {
                name: "main".to_string(),
                tables: IndexMap::new(),
                views: IndexMap::new(),
            },
        );
        catalog
    }

    /// Get or create a database schema
    pub fn get_or_create_database(&mut self, name: &str) -> &mut DatabaseSchema {
        let key = self
            .databases
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string());
        self.databases
            .entry(key)
            .or_insert_with(|| DatabaseSchema {
                name: name.to_string(),
                tables: IndexMap::new(),
                views: IndexMap::new(),
            })
    }

    /// Add a table to the given (or default) database
    pub fn add_table(&mut self, database: Option<&str>, table: TableDef) {
        let db_name = database.unwrap_or(&self.default_database).to_string();
        let schema = self.get_or_create_database(&db_name);
        schema.tables.insert(table.name.clone(), table);
    }

    /// Add a view to the given (or default) database
    pub fn add_view(&mut self, database: Option<&str>, view: ViewDef) {
        let db_name = database.unwrap_or(&self.default_database).to_string();
        let schema = self.get_or_create_database(&db_name);
        schema.views.insert(view.name.clone(), view);
    }

    /// Look up a database schema by name (case-insensitive)
    pub fn database(&self, name: Option<&str>) -> Option<&DatabaseSchema> {
        let name = name.unwrap_or(&self.default_database);
        self.databases
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Look up a table by name (case-insensitive)
    pub fn get_table(&self, database: Option<&str>, name: &str) -> Option<&TableDef> {
        self.database(database)?.get_table(name)
    }

    /// Look up a view by name (case-insensitive)
    pub fn get_view(&self, database: Option<&str>, name: &str) -> Option<&ViewDef> {
        self.database(database)?.get_view(name)
    }

    /// Check if a table exists
    pub fn table_exists(&self, database: Option<&str>, name: &str) -> bool {
        self.get_table(database, name).is_some()
    }
}

impl SchemaCatalog for Catalog {
    fn table_columns(&self, database: Option<&str>, table: &str) -> Vec<String> {
        self.get_table(database, table)
            .map(|t| t.column_names().iter().map(|s| s.to_string()).collect())
            .unwrap_or_default()
    }

    fn views(&self, database: Option<&str>) -> Vec<String> {
        self.database(database)
            .map(|db| db.views.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn parsed_object(
        &self,
        database: Option<&str>,
        name: &str,
        kind: SchemaObjectKind,
    ) -> Option<Statement> {
        match kind {
            SchemaObjectKind::View => self
                .get_view(database, name)
                .map(|view| view.statement.clone()),
            // Table DDL is not retained; callers use table_columns() instead
            SchemaObjectKind::Table => None,
        }
    }
}

/// A single database schema (the `main` database or an attached one)
#[derive(Debug, Clone, Default)]
pub struct DatabaseSchema {
    pub name: String,
    pub tables: IndexMap<String, TableDef>,
    pub views: IndexMap<String, ViewDef>,
}

impl DatabaseSchema {
    pub fn get_table(&self, name: &str) -> Option<&TableDef> {
        self.tables
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn get_view(&self, name: &str) -> Option<&ViewDef> {
        self.views
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

/// Table definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: IndexMap<String, ColumnDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
        }
    }

    /// Get a column by name (case-insensitive)
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Check if a column exists
    pub fn column_exists(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Get all column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|s| s.as_str()).collect()
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// View definition; keeps the parsed `CREATE VIEW` so the resolver can
/// descend into the view body.
#[derive(Debug, Clone)]
pub struct ViewDef {
    pub name: String,
    /// Explicit column aliases from `CREATE VIEW v (a, b) AS ...`, if any
    pub column_aliases: Vec<String>,
    pub statement: Statement,
}
