//! Schema builder - converts SQL DDL to a Catalog

use sqlparser::ast::{ColumnOption, ObjectName, Statement, TableConstraint};
use sqlparser::parser::Parser;

use crate::dialect::SqlDialect;
use crate::error::{Diagnostic, DiagnosticKind, Severity};
use crate::schema::{Catalog, ColumnDef, TableDef, ViewDef};
use crate::types::DataType;

/// Builder for constructing a [`Catalog`] from SQL schema definitions
pub struct SchemaBuilder {
    catalog: Catalog,
    diagnostics: Vec<Diagnostic>,
    dialect: SqlDialect,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::with_dialect(SqlDialect::default())
    }

    pub fn with_dialect(dialect: SqlDialect) -> Self {
        Self {
            catalog: Catalog::new(),
            diagnostics: Vec::new(),
            dialect,
        }
    }

    /// Parse SQL schema definitions and collect them into the catalog
    pub fn parse(&mut self, sql: &str) -> Result<(), Vec<Diagnostic>> {
        let dialect = self.dialect.parser_dialect();

        // Try parsing the entire SQL first (fast path)
        match Parser::parse_sql(dialect.as_ref(), sql) {
            Ok(statements) => {
                for stmt in statements {
                    self.process_statement(&stmt);
                }
            }
            Err(_) => {
                // Fall back to statement-by-statement parsing so schema dumps
                // containing triggers or other unsupported syntax still load
                self.parse_statements_individually(sql);
            }
        }

        if self
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
        {
            Err(std::mem::take(&mut self.diagnostics))
        } else {
            Ok(())
        }
    }

    /// Finish building; returns the catalog and any non-fatal diagnostics
    pub fn build(self) -> (Catalog, Vec<Diagnostic>) {
        (self.catalog, self.diagnostics)
    }

    fn parse_statements_individually(&mut self, sql: &str) {
        let dialect = self.dialect.parser_dialect();

        for raw_stmt in split_sql_statements(sql) {
            let trimmed = raw_stmt.trim();
            if trimmed.is_empty() {
                continue;
            }

            match Parser::parse_sql(dialect.as_ref(), trimmed) {
                Ok(stmts) => {
                    for stmt in stmts {
                        self.process_statement(&stmt);
                    }
                }
                Err(e) => {
                    tracing::debug!(statement = trimmed, error = %e, "skipping unparseable DDL statement");
                    self.diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::ParseError,
                        format!("Skipped unparseable statement: {}", e),
                    ));
                }
            }
        }
    }

    fn process_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::CreateTable(create) => {
                self.process_create_table(create);
            }
            Statement::CreateView { name, columns, .. } => {
                self.process_create_view(stmt, name, columns);
            }
            _ => {}
        }
    }

    fn process_create_table(&mut self, create: &sqlparser::ast::CreateTable) {
        let (database, table_name) = object_name_to_db_table(&create.name);
        let mut table = TableDef::new(&table_name);

        for column in &create.columns {
            let col_name = column.name.value.clone();
            let data_type = DataType::parse(&column.data_type.to_string());

            let mut col_def = ColumnDef::new(&col_name, data_type);
            for option in &column.options {
                match &option.option {
                    ColumnOption::NotNull => col_def.nullable = false,
                    ColumnOption::Unique { is_primary: true, .. } => {
                        col_def.primary_key = true;
                        col_def.nullable = false;
                    }
                    _ => {}
                }
            }

            table.columns.insert(col_name, col_def);
        }

        for constraint in &create.constraints {
            if let TableConstraint::PrimaryKey { columns, .. } = constraint {
                for pk_col in columns {
                    if let Some(col) = table.columns.get_mut(&pk_col.value) {
                        col.primary_key = true;
                    }
                }
            }
        }

        self.catalog.add_table(database.as_deref(), table);
    }

    fn process_create_view(
        &mut self,
        stmt: &Statement,
        name: &ObjectName,
        columns: &[sqlparser::ast::ViewColumnDef],
    ) {
        let (database, view_name) = object_name_to_db_table(name);
        let column_aliases = columns.iter().map(|c| c.name.value.clone()).collect();

        self.catalog.add_view(
            database.as_deref(),
            ViewDef {
                name: view_name,
                column_aliases,
                statement: stmt.clone(),
            },
        );
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a `(database, object)` pair out of a possibly qualified name
fn object_name_to_db_table(name: &ObjectName) -> (Option<String>, String) {
    match name.0.as_slice() {
        [table] => (None, table.value.clone()),
        [database, table] => (Some(database.value.clone()), table.value.clone()),
        _ => (None, name.to_string()),
    }
}

/// Split raw SQL into statements on top-level semicolons, respecting string
/// and identifier quoting.
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (i, ch) in sql.char_indices() {
        match quote {
            Some(q) => {
                let closer = if q == '[' { ']' } else { q };
                if ch == closer {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' | '`' | '[' => quote = Some(ch),
                ';' => {
                    statements.push(&sql[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }

    if start < sql.len() {
        statements.push(&sql[start..]);
    }

    statements
}
