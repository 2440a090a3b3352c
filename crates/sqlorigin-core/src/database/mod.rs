//! Database access used for column probes
//!
//! The resolver needs a database only for the two probe shapes it cannot
//! answer from the schema catalog: result-column metadata of a synthesized
//! CTE query, and the column names of a table-valued function. Both are
//! behind the [`Database`] trait so tests and offline tooling can answer
//! them without a live connection.

use std::cell::RefCell;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlparser::ast::{Query, SelectItem, SetExpr, Statement, TableFactor};
use sqlparser::parser::Parser;
use thiserror::Error;

use crate::analyzer::{Column, SelectResolver};
use crate::dialect::SqlDialect;
use crate::schema::Catalog;

/// Error reported by a database backend, carrying its own message text
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct DatabaseError(pub String);

impl DatabaseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result-column metadata reported for a probe query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasedColumn {
    pub database: Option<String>,
    pub table: Option<String>,
    /// The name the column is reported under, alias or plain name alike
    pub alias: String,
}

/// Synchronous query access for resolver probes
pub trait Database {
    /// Result-column metadata of a query, one entry per projected column
    fn columns_for_query(&self, sql: &str) -> Result<Vec<AliasedColumn>, DatabaseError>;

    /// Execute a query and report its result-column names
    fn exec(&self, sql: &str) -> Result<Vec<String>, DatabaseError>;
}

/// Answers probe queries from a [`Catalog`] alone, with no live connection.
///
/// Probe SELECTs are resolved structurally with a fresh [`SelectResolver`]
/// over the same catalog. The `WITH ... SELECT * FROM <cte>` probe shape is
/// answered from the CTE body directly; table-valued functions genuinely
/// require execution and fail with an error.
pub struct OfflineDatabase<'a> {
    catalog: &'a Catalog,
    dialect: SqlDialect,
    /// Probe texts currently being answered; a repeat indicates a cycle
    in_flight: RefCell<HashSet<String>>,
}

impl<'a> OfflineDatabase<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            dialect: SqlDialect::default(),
            in_flight: RefCell::new(HashSet::new()),
        }
    }

    fn resolve_probe(&self, sql: &str) -> Result<Vec<Column>, DatabaseError> {
        if !self.in_flight.borrow_mut().insert(sql.to_string()) {
            return Err(DatabaseError::new(format!(
                "circular reference while probing query: {}",
                sql
            )));
        }

        let result = self.resolve_probe_inner(sql);
        self.in_flight.borrow_mut().remove(sql);
        result
    }

    fn resolve_probe_inner(&self, sql: &str) -> Result<Vec<Column>, DatabaseError> {
        let query = self.parse_probe(sql)?;

        if let Some(cte_query) = cte_probe_body(&query) {
            let mut resolver = SelectResolver::new(self.catalog, self, sql);
            return Ok(resolver.resolve_first(&cte_query));
        }

        if let Some(function) = first_table_function(&query) {
            return Err(DatabaseError::new(format!(
                "cannot execute table-valued function without a live database: {}",
                function
            )));
        }

        let mut resolver = SelectResolver::new(self.catalog, self, sql);
        Ok(resolver.resolve_first(&query))
    }

    fn parse_probe(&self, sql: &str) -> Result<Query, DatabaseError> {
        let dialect = self.dialect.parser_dialect();
        let statements = Parser::parse_sql(dialect.as_ref(), sql)
            .map_err(|e| DatabaseError::new(format!("near \"{}\": {}", sql, e)))?;

        statements
            .into_iter()
            .find_map(|stmt| match stmt {
                Statement::Query(query) => Some(*query),
                _ => None,
            })
            .ok_or_else(|| DatabaseError::new("probe query is not a SELECT"))
    }
}

impl Database for OfflineDatabase<'_> {
    fn columns_for_query(&self, sql: &str) -> Result<Vec<AliasedColumn>, DatabaseError> {
        let columns = self.resolve_probe(sql)?;
        Ok(columns
            .into_iter()
            .map(|col| AliasedColumn {
                alias: col
                    .display_name
                    .clone()
                    .or_else(|| col.alias.clone())
                    .or_else(|| col.column.clone())
                    .unwrap_or_default(),
                database: col.database,
                table: col.table,
            })
            .collect())
    }

    fn exec(&self, sql: &str) -> Result<Vec<String>, DatabaseError> {
        let columns = self.resolve_probe(sql)?;
        Ok(columns
            .into_iter()
            .map(|col| {
                col.display_name
                    .or(col.alias)
                    .or(col.column)
                    .unwrap_or_default()
            })
            .collect())
    }
}

/// Detect the resolver's CTE probe shape `WITH <cte> SELECT * FROM <name>`
/// and return the CTE body to resolve instead, so the probe does not chase
/// its own tail through the resolver.
fn cte_probe_body(query: &Query) -> Option<Query> {
    let with = query.with.as_ref()?;

    let SetExpr::Select(select) = query.body.as_ref() else {
        return None;
    };
    if select.projection.len() != 1
        || !matches!(select.projection[0], SelectItem::Wildcard(_))
        || select.from.len() != 1
        || !select.from[0].joins.is_empty()
    {
        return None;
    }

    let TableFactor::Table { name, args: None, .. } = &select.from[0].relation else {
        return None;
    };
    let [table] = name.0.as_slice() else {
        return None;
    };

    with.cte_tables
        .iter()
        .find(|cte| cte.alias.name.value.eq_ignore_ascii_case(&table.value))
        .map(|cte| (*cte.query).clone())
}

/// First table-valued function name in the probe's FROM clause, if any
fn first_table_function(query: &Query) -> Option<String> {
    let SetExpr::Select(select) = query.body.as_ref() else {
        return None;
    };

    for table_with_joins in &select.from {
        let mut factors = vec![&table_with_joins.relation];
        factors.extend(table_with_joins.joins.iter().map(|j| &j.relation));
        for factor in factors {
            if let TableFactor::Table { name, args: Some(_), .. } = factor {
                return Some(name.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn catalog() -> Catalog {
        let mut builder = SchemaBuilder::new();
        builder
            .parse("CREATE TABLE t (a INTEGER, b TEXT);")
            .unwrap();
        builder.build().0
    }

    #[test]
    fn test_columns_for_query_reports_origin() {
        let catalog = catalog();
        let db = OfflineDatabase::new(&catalog);

        let columns = db.columns_for_query("SELECT a, b FROM t").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].alias, "a");
        assert_eq!(columns[0].table.as_deref(), Some("t"));
    }

    #[test]
    fn test_cte_probe_answers_from_body() {
        let catalog = catalog();
        let db = OfflineDatabase::new(&catalog);

        let columns = db
            .columns_for_query("WITH c AS (SELECT a AS x FROM t) SELECT * FROM c")
            .unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].alias, "x");
        assert_eq!(columns[0].table.as_deref(), Some("t"));
    }

    #[test]
    fn test_table_function_exec_fails_without_live_database() {
        let catalog = catalog();
        let db = OfflineDatabase::new(&catalog);

        let err = db
            .exec("SELECT * FROM json_each('[1,2]') LIMIT 0")
            .unwrap_err();
        assert!(err.0.contains("json_each"));
    }

    #[test]
    fn test_non_select_probe_is_an_error() {
        let catalog = catalog();
        let db = OfflineDatabase::new(&catalog);

        assert!(db.columns_for_query("DELETE FROM t").is_err());
        assert!(db.exec("not sql at all").is_err());
    }

    #[test]
    fn test_recursive_probe_terminates() {
        let catalog = catalog();
        let db = OfflineDatabase::new(&catalog);

        // A self-referencing CTE must not send the probe into a loop; any
        // terminating outcome is acceptable.
        let _ = db.columns_for_query("WITH c AS (SELECT a FROM c) SELECT * FROM c");
    }
}
