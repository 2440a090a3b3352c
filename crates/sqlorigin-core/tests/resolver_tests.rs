// Integration tests for the SELECT resolver
use sqlorigin_core::analyzer::{Column, ColumnFlags, ColumnKind, SelectResolver, Table};
use sqlorigin_core::database::{AliasedColumn, Database, DatabaseError, OfflineDatabase};
use sqlorigin_core::dialect::SqlDialect;
use sqlorigin_core::error::DiagnosticKind;
use sqlorigin_core::schema::{AttachNameMap, Catalog, SchemaBuilder};

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, TokenWithSpan, Tokenizer};

fn build_catalog(ddl: &str) -> Catalog {
    let mut builder = SchemaBuilder::new();
    builder.parse(ddl).expect("schema parses");
    builder.build().0
}

fn setup_catalog() -> Catalog {
    build_catalog(
        r#"
        CREATE TABLE t (a INTEGER, b TEXT, c BLOB);
        CREATE TABLE u (x INTEGER, y TEXT);
        "#,
    )
}

fn parse_query(sql: &str) -> Query {
    let dialect = SqlDialect::default().parser_dialect();
    let mut statements = Parser::parse_sql(dialect.as_ref(), sql).expect("query parses");
    match statements.remove(0) {
        Statement::Query(query) => *query,
        other => panic!("not a query: {}", other),
    }
}

fn tokens_for(sql: &str) -> Vec<TokenWithSpan> {
    let dialect = SqlDialect::default().parser_dialect();
    Tokenizer::new(dialect.as_ref(), sql)
        .tokenize_with_location()
        .expect("query tokenizes")
}

fn word_token(tokens: &[TokenWithSpan], value: &str) -> TokenWithSpan {
    tokens
        .iter()
        .find(|t| matches!(&t.token, Token::Word(w) if w.value == value))
        .cloned()
        .unwrap_or_else(|| panic!("no token {:?}", value))
}

fn display_names(columns: &[Column]) -> Vec<&str> {
    columns
        .iter()
        .map(|c| c.display_name.as_deref().unwrap_or(""))
        .collect()
}

/// The identifier a result stays addressable by: declared alias, else name
fn effective_aliases(columns: &[Column]) -> Vec<&str> {
    columns
        .iter()
        .map(|c| {
            c.alias
                .as_deref()
                .or(c.column.as_deref())
                .unwrap_or("")
        })
        .collect()
}

/// Canned probe answers, standing in for a live connection
struct MockDatabase {
    query_columns: Vec<AliasedColumn>,
    exec_names: Vec<String>,
}

impl MockDatabase {
    fn empty() -> Self {
        Self {
            query_columns: Vec::new(),
            exec_names: Vec::new(),
        }
    }
}

impl Database for MockDatabase {
    fn columns_for_query(&self, _sql: &str) -> Result<Vec<AliasedColumn>, DatabaseError> {
        Ok(self.query_columns.clone())
    }

    fn exec(&self, _sql: &str) -> Result<Vec<String>, DatabaseError> {
        Ok(self.exec_names.clone())
    }
}

// ---- basic result resolution ----

#[test]
fn test_bare_table_columns() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT a, b FROM t");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns.len(), 2);
    for col in &columns {
        assert_eq!(col.kind, ColumnKind::Column);
        assert_eq!(col.table.as_deref(), Some("t"));
    }
    assert_eq!(columns[0].column.as_deref(), Some("a"));
    assert_eq!(columns[1].column.as_deref(), Some("b"));
    assert_eq!(display_names(&columns), vec!["a", "b"]);
}

#[test]
fn test_unqualified_star_expands_in_from_order() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT * FROM t, u");

    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(display_names(&columns), vec!["a", "b", "c", "x", "y"]);
    assert_eq!(columns[3].table.as_deref(), Some("u"));
}

#[test]
fn test_result_count_matches_expanded_declaration() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT *, a, 1 + 2 FROM t");

    let columns = resolver.resolve_columns_from_first_core();
    // star expands to three source columns, plus the identifier and the
    // expression
    assert_eq!(columns.len(), 5);
    assert_eq!(columns[4].kind, ColumnKind::Other);
}

#[test]
fn test_expression_with_alias() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT a + 1 AS s FROM t");

    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].kind, ColumnKind::Other);
    assert_eq!(columns[0].column.as_deref(), Some("a + 1"));
    assert_eq!(columns[0].alias.as_deref(), Some("s"));
    assert_eq!(columns[0].display_name.as_deref(), Some("s"));
    assert_eq!(columns[0].table, None);
}

#[test]
fn test_cast_alias_is_stripped_but_inner_as_kept() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver =
        SelectResolver::new(&catalog, &db, "SELECT CAST(a AS INTEGER) AS n FROM t");

    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(columns[0].column.as_deref(), Some("CAST(a AS INTEGER)"));
    assert_eq!(columns[0].alias.as_deref(), Some("n"));
}

#[test]
fn test_duplicate_names_get_sequenced() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT a, a FROM t");

    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(display_names(&columns), vec!["a", "a:1"]);
    assert_eq!(effective_aliases(&columns), vec!["a", "a:1"]);
}

#[test]
fn test_display_names_and_aliases_are_unique() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(
        &catalog,
        &db,
        "SELECT a, b AS a, a, x FROM t, u",
    );

    let columns = resolver.resolve_columns_from_first_core();
    let names = display_names(&columns);
    let mut unique_names = names.clone();
    unique_names.sort();
    unique_names.dedup();
    assert_eq!(names.len(), unique_names.len(), "duplicated display name in {:?}", names);

    let aliases = effective_aliases(&columns);
    let mut unique_aliases = aliases.clone();
    unique_aliases.sort();
    unique_aliases.dedup();
    assert_eq!(aliases.len(), unique_aliases.len(), "duplicated alias in {:?}", aliases);
}

// ---- table prefix and alias precedence ----

#[test]
fn test_alias_replaces_table_name_for_matching() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);

    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT a2.c FROM t AS a2");
    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors());
    assert_eq!(columns[0].table.as_deref(), Some("t"));
    assert_eq!(columns[0].table_alias.as_deref(), Some("a2"));

    // The alias replaces the name; the underlying name no longer matches
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT t.c FROM t AS a2");
    resolver.resolve_columns_from_first_core();
    assert!(resolver.has_errors());
    assert_eq!(resolver.errors()[0].kind, DiagnosticKind::UnresolvedColumn);
}

#[test]
fn test_qualified_star_alias_shadowing() {
    let catalog = build_catalog(
        "CREATE TABLE phys (x INTEGER); CREATE TABLE other (y INTEGER);",
    );
    let db = OfflineDatabase::new(&catalog);
    let mut resolver =
        SelectResolver::new(&catalog, &db, "SELECT t.* FROM phys t, other AS t");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns.len(), 1, "later alias should shadow: {:?}", columns);
    assert_eq!(columns[0].column.as_deref(), Some("y"));
    assert_eq!(columns[0].table.as_deref(), Some("other"));
    assert_eq!(columns[0].table_alias.as_deref(), Some("t"));
}

#[test]
fn test_unresolved_star_prefix_is_an_error() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT z.* FROM t");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(columns.is_empty());
    assert_eq!(resolver.errors().len(), 1);
    assert_eq!(resolver.errors()[0].kind, DiagnosticKind::UnresolvedDataSource);
    assert!(resolver.errors()[0]
        .message
        .contains("Could not resolve data source for column"));
}

#[test]
fn test_unresolved_column_is_an_error() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT ghost FROM t");

    let columns = resolver.resolve_columns_from_first_core();
    // The result is still produced so the list length matches the
    // declaration
    assert_eq!(columns.len(), 1);
    assert_eq!(resolver.errors().len(), 1);
    assert_eq!(resolver.errors()[0].kind, DiagnosticKind::UnresolvedColumn);
    assert!(resolver.errors()[0]
        .message
        .contains("Could not resolve table for column 'ghost'."));
}

#[test]
fn test_ignore_invalid_names_suppresses_errors() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver =
        SelectResolver::new(&catalog, &db, "SELECT ghost FROM t").ignore_invalid_names(true);

    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(columns.len(), 1);
    assert!(!resolver.has_errors());
}

// ---- row-id pseudo-column ----

#[test]
fn test_rowid_with_table_prefix() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT t.rowid FROM t");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns[0].kind, ColumnKind::Column);
    assert_eq!(columns[0].column.as_deref(), Some("rowid"));
    assert_eq!(columns[0].table.as_deref(), Some("t"));
}

#[test]
fn test_rowid_without_prefix_is_unresolved() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT oid FROM t");

    resolver.resolve_columns_from_first_core();
    assert!(resolver.has_errors());
}

// ---- sub-selects ----

#[test]
fn test_subselect_with_alias_and_compound_inner() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(
        &catalog,
        &db,
        "SELECT s.a FROM (SELECT a FROM t UNION SELECT a FROM u) AS s",
    );

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].column.as_deref(), Some("a"));
    assert_eq!(columns[0].table_alias.as_deref(), Some("s"));
    assert!(columns[0].old_table_aliases.is_empty());
    assert!(columns[0].flags.contains(ColumnFlags::FROM_COMPOUND_SELECT));
    assert!(!columns[0].flags.contains(ColumnFlags::FROM_ANONYMOUS_SELECT));
}

#[test]
fn test_anonymous_subselect_flag() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT * FROM (SELECT a FROM t)");

    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(columns.len(), 1);
    assert!(columns[0].flags.contains(ColumnFlags::FROM_ANONYMOUS_SELECT));
}

#[test]
fn test_subselect_alias_history_grows_outward() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(
        &catalog,
        &db,
        "SELECT * FROM (SELECT * FROM (SELECT a FROM t) AS s1) AS s2",
    );

    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].table_alias.as_deref(), Some("s2"));
    assert_eq!(columns[0].old_table_aliases, vec!["s1"]);
    assert_eq!(columns[0].table.as_deref(), Some("t"));
}

#[test]
fn test_alias_defined_in_sub_query() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(
        &catalog,
        &db,
        "SELECT * FROM (SELECT a AS renamed FROM t) AS s",
    );

    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].alias.as_deref(), Some("renamed"));
    assert!(columns[0].alias_defined_in_sub_query);
    assert_eq!(columns[0].display_name.as_deref(), Some("renamed"));
}

#[test]
fn test_multi_core_subselect_configuration() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let sql = "SELECT * FROM (SELECT a FROM t UNION SELECT x FROM u) AS s";

    let mut resolver = SelectResolver::new(&catalog, &db, sql);
    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(columns.len(), 1, "default resolves the first arm only");

    let mut resolver = SelectResolver::new(&catalog, &db, sql).resolve_multi_core(true);
    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(columns.len(), 2, "multi-core resolves every arm");
    assert!(columns
        .iter()
        .all(|c| c.flags.contains(ColumnFlags::FROM_COMPOUND_SELECT)));
}

// ---- compound queries ----

#[test]
fn test_compound_query_resolves_every_arm() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(
        &catalog,
        &db,
        "SELECT a FROM t UNION SELECT x FROM u UNION SELECT b FROM t",
    );

    let arms = resolver.resolve_columns();
    assert_eq!(arms.len(), 3);
    for arm in &arms {
        assert_eq!(arm.len(), 1);
        assert!(arm[0].flags.contains(ColumnFlags::FROM_COMPOUND_SELECT));
    }
    assert_eq!(arms[1][0].table.as_deref(), Some("u"));
}

#[test]
fn test_first_core_of_compound_is_tagged() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver =
        SelectResolver::new(&catalog, &db, "SELECT a FROM t UNION SELECT x FROM u");

    let columns = resolver.resolve_columns_from_first_core();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].table.as_deref(), Some("t"));
    assert!(columns[0].flags.contains(ColumnFlags::FROM_COMPOUND_SELECT));
}

// ---- flags from enclosing constructs ----

#[test]
fn test_distinct_and_grouped_flags() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver =
        SelectResolver::new(&catalog, &db, "SELECT DISTINCT a FROM t GROUP BY a");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(columns[0].flags.contains(ColumnFlags::FROM_DISTINCT_SELECT));
    assert!(columns[0].flags.contains(ColumnFlags::FROM_GROUPED_SELECT));
}

// ---- CTEs ----

#[test]
fn test_cte_probe_columns() {
    let catalog = setup_catalog();
    let db = MockDatabase {
        query_columns: vec![AliasedColumn {
            database: None,
            table: None,
            alias: "x".to_string(),
        }],
        exec_names: Vec::new(),
    };
    let mut resolver = SelectResolver::new(
        &catalog,
        &db,
        "WITH c AS (SELECT 1 AS x) SELECT x FROM c",
    );

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].kind, ColumnKind::Column);
    assert_eq!(columns[0].column.as_deref(), Some("x"));
    assert_eq!(columns[0].table_alias.as_deref(), Some("c"));
    assert!(columns[0].flags.contains(ColumnFlags::FROM_CTE_SELECT));
}

#[test]
fn test_cte_resolution_against_offline_database() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(
        &catalog,
        &db,
        "WITH c AS (SELECT a, b FROM t) SELECT a FROM c",
    );

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].table_alias.as_deref(), Some("c"));
    assert!(columns[0].flags.contains(ColumnFlags::FROM_CTE_SELECT));
}

#[test]
fn test_cte_probe_failure_contributes_nothing() {
    let catalog = setup_catalog();
    let db = MockDatabase::empty();
    let mut resolver = SelectResolver::new(
        &catalog,
        &db,
        "WITH c AS (SELECT 1 AS x) SELECT * FROM c",
    );

    let columns = resolver.resolve_columns_from_first_core();
    // No CTE columns, so the star has no source; that surfaces as the star
    // error, not as a probe error
    assert!(columns.is_empty());
    assert_eq!(resolver.errors().len(), 1);
    assert_eq!(resolver.errors()[0].kind, DiagnosticKind::UnresolvedDataSource);
}

// ---- views ----

#[test]
fn test_view_resolves_through_its_body() {
    let catalog = build_catalog(
        "CREATE TABLE t (a INTEGER, b TEXT); \
         CREATE VIEW v AS SELECT a FROM t;",
    );
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT * FROM v");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].column.as_deref(), Some("a"));
    assert_eq!(columns[0].table.as_deref(), Some("t"));
    // The view name acts as the alias when none is declared
    assert_eq!(columns[0].table_alias.as_deref(), Some("v"));
    assert!(!columns[0].flags.contains(ColumnFlags::FROM_ANONYMOUS_SELECT));
}

#[test]
fn test_view_with_explicit_alias() {
    let catalog = build_catalog(
        "CREATE TABLE t (a INTEGER); CREATE VIEW v AS SELECT a FROM t;",
    );
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT w.a FROM v AS w");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns[0].table_alias.as_deref(), Some("w"));
    assert_eq!(columns[0].table.as_deref(), Some("t"));
}

// ---- table-valued functions ----

#[test]
fn test_table_function_columns_are_other_kind() {
    let catalog = setup_catalog();
    let db = MockDatabase {
        query_columns: Vec::new(),
        exec_names: vec!["jkey".to_string(), "jvalue".to_string()],
    };
    let mut resolver = SelectResolver::new(
        &catalog,
        &db,
        "SELECT jkey FROM json_each('[1,2]') AS j",
    );

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns.len(), 1);
    // Matched a function output column, so the result is downgraded rather
    // than treated as a table column
    assert_eq!(columns[0].kind, ColumnKind::Other);
    assert_eq!(columns[0].table, None);
}

#[test]
fn test_table_function_probe_error_is_reported() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver =
        SelectResolver::new(&catalog, &db, "SELECT * FROM json_each('[1,2]')");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(columns.is_empty());
    assert!(resolver
        .errors()
        .iter()
        .any(|d| d.kind == DiagnosticKind::ProbeFailure));
}

// ---- databases and attach names ----

#[test]
fn test_database_qualified_column() {
    let catalog = build_catalog(
        "CREATE TABLE t (a INTEGER); CREATE TABLE aux.t2 (z INTEGER);",
    );
    let db = OfflineDatabase::new(&catalog);
    let mut resolver =
        SelectResolver::new(&catalog, &db, "SELECT aux.t2.z FROM aux.t2");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns[0].database.as_deref(), Some("aux"));
    assert_eq!(columns[0].table.as_deref(), Some("t2"));
}

#[test]
fn test_attach_name_translation() {
    let catalog = build_catalog("CREATE TABLE archive.t3 (c INTEGER);");
    let db = OfflineDatabase::new(&catalog);
    let mut attach_names = AttachNameMap::new();
    attach_names.insert("archive", "attached_2");

    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT archive.t3.c FROM archive.t3")
        .with_attach_names(attach_names);

    let columns = resolver.resolve_columns_from_first_core();
    assert!(!resolver.has_errors(), "{:?}", resolver.errors());
    assert_eq!(columns[0].database.as_deref(), Some("archive"));
    assert_eq!(columns[0].original_database.as_deref(), Some("attached_2"));
}

// ---- available columns and tables ----

#[test]
fn test_resolve_tables_for_join() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "");

    let query = parse_query("SELECT t.a, u.x FROM t JOIN u ON t.a = u.x");
    let arms = resolver.resolve_tables(&query);
    assert_eq!(arms.len(), 1);
    assert_eq!(arms[0].len(), 2);

    let expected = Table {
        table: Some("u".to_string()),
        ..Table::default()
    };
    assert!(arms[0].contains(&expected));
}

#[test]
fn test_resolve_tables_sees_through_subselects() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "");

    let query = parse_query("SELECT * FROM (SELECT a FROM t) AS s");
    let arms = resolver.resolve_tables(&query);
    assert_eq!(arms[0].len(), 1);
    let table = arms[0].iter().next().unwrap();
    assert_eq!(table.table.as_deref(), Some("t"));
    assert_eq!(table.table_alias.as_deref(), Some("s"));
}

#[test]
fn test_available_columns_ignore_projection() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "");

    let query = parse_query("SELECT a FROM t, u");
    let arms = resolver.available_columns(&query);
    assert_eq!(arms.len(), 1);
    assert_eq!(arms[0].len(), 5);
}

// ---- idempotence ----

#[test]
fn test_resolution_is_idempotent() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let query = parse_query("SELECT a, b FROM t");
    let SetExpr::Select(select) = query.body.as_ref() else {
        panic!("expected a plain select");
    };

    let mut resolver = SelectResolver::new(&catalog, &db, "");
    let first = resolver.resolve_select(select);
    let second = resolver.resolve_select(select);
    assert_eq!(first, second);
    assert_eq!(display_names(&first), display_names(&second));

    let mut fresh = SelectResolver::new(&catalog, &db, "");
    let third = fresh.resolve_select(select);
    assert_eq!(first, third);
}

// ---- parse failures ----

#[test]
fn test_parse_failure_yields_empty_and_diagnostic() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "SELECT FROM WHERE");

    let arms = resolver.resolve_columns();
    assert!(arms.is_empty());
    assert_eq!(resolver.errors()[0].kind, DiagnosticKind::ParseError);
}

#[test]
fn test_non_select_statement_is_rejected() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let mut resolver = SelectResolver::new(&catalog, &db, "DELETE FROM t");

    let columns = resolver.resolve_columns_from_first_core();
    assert!(columns.is_empty());
    assert_eq!(
        resolver.errors()[0].kind,
        DiagnosticKind::StatementKindMismatch
    );
}

// ---- token translation ----

#[test]
fn test_translate_token_to_column() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let sql = "SELECT a FROM t WHERE b = 1";
    let query = parse_query(sql);
    let tokens = tokens_for(sql);

    let mut resolver = SelectResolver::new(&catalog, &db, sql);
    let column = resolver.translate_token(&query, &word_token(&tokens, "b"));
    assert_eq!(column.kind, ColumnKind::Column);
    assert_eq!(column.column.as_deref(), Some("b"));
    assert_eq!(column.table.as_deref(), Some("t"));
}

#[test]
fn test_translate_token_climbs_out_of_subselect() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let sql = "SELECT (SELECT y FROM u WHERE y = a) FROM t";
    let query = parse_query(sql);
    let tokens = tokens_for(sql);

    let mut resolver = SelectResolver::new(&catalog, &db, sql);
    // `a` is not available in the inner core; the enclosing core provides it
    let column = resolver.translate_token(&query, &word_token(&tokens, "a"));
    assert_eq!(column.kind, ColumnKind::Column);
    assert_eq!(column.table.as_deref(), Some("t"));

    // `y` resolves in the innermost core
    let column = resolver.translate_token(&query, &word_token(&tokens, "y"));
    assert_eq!(column.table.as_deref(), Some("u"));
}

#[test]
fn test_translate_unknown_token_falls_back_to_other() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let sql = "SELECT a FROM t";
    let query = parse_query(sql);
    let tokens = tokens_for(sql);

    let mut resolver = SelectResolver::new(&catalog, &db, sql);
    // `t` names a table, not an available column
    let column = resolver.translate_token(&query, &word_token(&tokens, "t"));
    assert_eq!(column.kind, ColumnKind::Other);
    assert_eq!(column.column.as_deref(), Some("t"));
}

#[test]
fn test_translate_tokens_plural() {
    let catalog = setup_catalog();
    let db = OfflineDatabase::new(&catalog);
    let sql = "SELECT a, b FROM t";
    let query = parse_query(sql);
    let tokens = tokens_for(sql);

    let mut resolver = SelectResolver::new(&catalog, &db, sql);
    let picked = [word_token(&tokens, "a"), word_token(&tokens, "b")];
    let columns = resolver.translate_tokens(&query, &picked);
    assert_eq!(columns.len(), 2);
    assert!(columns.iter().all(|c| c.kind == ColumnKind::Column));
}
