//! SELECT resolver - maps every result column of a SELECT back to its origin
//!
//! Resolution walks a core in two passes: the FROM clause is expanded into
//! the ordered list of columns the join product exposes, then each result
//! column is matched against that list. Sub-selects, views and CTEs recurse
//! through fresh resolver instances sharing the database handle and the
//! original query text.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use sqlparser::ast::{
    Cte, Expr, GroupByExpr, ObjectName, Query, Select, SelectItem, SetExpr, Spanned, Statement,
    TableFactor, TableWithJoins,
};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Location, TokenWithSpan};

use crate::database::Database;
use crate::dialect::SqlDialect;
use crate::error::{Diagnostic, DiagnosticKind, Span};
use crate::schema::{AttachNameMap, SchemaCatalog, SchemaObjectKind};

use super::column::{ieq, opt_ieq, Column, ColumnFlags, ColumnKind, Table};
use super::tokens;

const ROW_ID_KEYWORDS: [&str; 3] = ["ROWID", "OID", "_ROWID_"];

fn is_row_id_keyword(name: &str) -> bool {
    ROW_ID_KEYWORDS.iter().any(|kw| ieq(kw, name))
}

/// A FROM source matches a prefix through its alias when it has one, through
/// its table name otherwise. The alias replaces the name for matching.
fn matches_table_prefix(column: &Column, prefix: &str) -> bool {
    match column.table_alias.as_deref() {
        Some(alias) => ieq(alias, prefix),
        None => column.table.as_deref().map_or(false, |t| ieq(t, prefix)),
    }
}

fn matches_name(value: Option<&str>, wanted: &str) -> bool {
    value.map_or(false, |v| ieq(v, wanted))
}

/// Split a possibly qualified `db.table` name
fn object_name_parts(name: &ObjectName) -> (Option<String>, String) {
    match name.0.as_slice() {
        [table] => (None, table.value.clone()),
        [database, table] => (Some(database.value.clone()), table.value.clone()),
        _ => (None, name.to_string()),
    }
}

/// Flatten the set-operation tree of a compound SELECT into its cores,
/// left to right
fn collect_cores(body: &SetExpr) -> Vec<&Select> {
    fn walk<'q>(body: &'q SetExpr, out: &mut Vec<&'q Select>) {
        match body {
            SetExpr::Select(select) => out.push(select),
            SetExpr::SetOperation { left, right, .. } => {
                walk(left, out);
                walk(right, out);
            }
            SetExpr::Query(query) => walk(&query.body, out),
            _ => {}
        }
    }

    let mut cores = Vec::new();
    walk(body, &mut cores);
    cores
}

fn has_group_by(select: &Select) -> bool {
    match &select.group_by {
        GroupByExpr::All(_) => true,
        GroupByExpr::Expressions(exprs, _) => !exprs.is_empty(),
    }
}

fn tables_of(columns: Vec<Column>) -> IndexSet<Table> {
    columns
        .into_iter()
        .filter(|col| col.kind == ColumnKind::Column)
        .map(|col| col.to_table())
        .collect()
}

/// Resolves the origin of every result column of a SELECT statement.
///
/// One instance serves one resolution; nested sub-selects are handled by
/// fresh internal instances. The schema catalog and database handle are
/// borrowed for the lifetime of the resolver.
pub struct SelectResolver<'a> {
    catalog: &'a dyn SchemaCatalog,
    database: &'a dyn Database,
    /// Original query text, kept for diagnostics and for parsing entry points
    query: String,
    dialect: SqlDialect,
    attach_names: AttachNameMap,
    resolve_multi_core: bool,
    ignore_invalid_names: bool,

    parsed: Option<Query>,
    cte_list: IndexMap<String, Cte>,
    table_columns_cache: HashMap<(String, String, String), Vec<String>>,
    source_columns: Vec<Column>,
    core_results: Vec<Column>,
    errors: Vec<Diagnostic>,
}

impl<'a> SelectResolver<'a> {
    pub fn new(
        catalog: &'a dyn SchemaCatalog,
        database: &'a dyn Database,
        original_query: &str,
    ) -> Self {
        Self {
            catalog,
            database,
            query: original_query.to_string(),
            dialect: SqlDialect::default(),
            attach_names: AttachNameMap::new(),
            resolve_multi_core: false,
            ignore_invalid_names: false,
            parsed: None,
            cte_list: IndexMap::new(),
            table_columns_cache: HashMap::new(),
            source_columns: Vec::new(),
            core_results: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Attach-name translation applied to `original_database` fields
    pub fn with_attach_names(mut self, attach_names: AttachNameMap) -> Self {
        self.attach_names = attach_names;
        self
    }

    /// When enabled, compound sub-selects contribute the columns of every
    /// arm instead of only the first one
    pub fn resolve_multi_core(mut self, enabled: bool) -> Self {
        self.resolve_multi_core = enabled;
        self
    }

    /// When enabled, unresolved identifiers degrade silently instead of
    /// producing errors
    pub fn ignore_invalid_names(mut self, enabled: bool) -> Self {
        self.ignore_invalid_names = enabled;
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    // ---- entry points over the stored original query text ----

    /// Resolve the first core of the original query
    pub fn resolve_columns_from_first_core(&mut self) -> Vec<Column> {
        self.errors.clear();
        let Some(query) = self.parse_original_query() else {
            return Vec::new();
        };
        self.resolve_first(&query)
    }

    /// Resolve every compound arm of the original query
    pub fn resolve_columns(&mut self) -> Vec<Vec<Column>> {
        self.errors.clear();
        let Some(query) = self.parse_original_query() else {
            return Vec::new();
        };
        self.resolve_all(&query)
    }

    // ---- entry points over a borrowed AST ----

    /// Resolve the first core of a parsed SELECT
    pub fn resolve_first(&mut self, query: &Query) -> Vec<Column> {
        self.errors.clear();
        self.extract_cte(query);
        let cores = collect_cores(&query.body);
        let compound = cores.len() > 1;
        match cores.first() {
            Some(core) => self.resolve_core(core, compound),
            None => Vec::new(),
        }
    }

    /// Resolve every arm of a parsed SELECT, one column list per core
    pub fn resolve_all(&mut self, query: &Query) -> Vec<Vec<Column>> {
        self.errors.clear();
        self.extract_cte(query);
        let cores = collect_cores(&query.body);
        let compound = cores.len() > 1;
        cores
            .into_iter()
            .map(|core| self.resolve_core(core, compound))
            .collect()
    }

    /// Resolve a single core that has no enclosing statement; the CTE index
    /// is left as-is
    pub fn resolve_select(&mut self, select: &Select) -> Vec<Column> {
        self.errors.clear();
        self.resolve_core(select, false)
    }

    /// The columns the FROM clause of each arm exposes, prior to projection
    pub fn available_columns(&mut self, query: &Query) -> Vec<Vec<Column>> {
        self.errors.clear();
        self.extract_cte(query);
        collect_cores(&query.body)
            .into_iter()
            .map(|core| self.resolve_available_core(core))
            .collect()
    }

    /// Available columns of a single core; the CTE index is left as-is
    pub fn available_columns_for_select(&mut self, select: &Select) -> Vec<Column> {
        self.errors.clear();
        self.resolve_available_core(select)
    }

    /// The set of tables contributing to each arm
    pub fn resolve_tables(&mut self, query: &Query) -> Vec<IndexSet<Table>> {
        self.available_columns(query)
            .into_iter()
            .map(tables_of)
            .collect()
    }

    /// The set of tables contributing to a single core
    pub fn resolve_tables_for_select(&mut self, select: &Select) -> IndexSet<Table> {
        tables_of(self.available_columns_for_select(select))
    }

    /// Translate tokens inside the statement to the columns they refer to
    pub fn translate_tokens(&mut self, query: &Query, tokens: &[TokenWithSpan]) -> Vec<Column> {
        self.errors.clear();
        self.extract_cte(query);
        tokens
            .iter()
            .map(|token| self.translate_token_inner(query, token))
            .collect()
    }

    /// Translate a single token inside the statement to the column it
    /// refers to
    pub fn translate_token(&mut self, query: &Query, token: &TokenWithSpan) -> Column {
        self.errors.clear();
        self.extract_cte(query);
        self.translate_token_inner(query, token)
    }

    // ---- parsing ----

    fn parse_original_query(&mut self) -> Option<Query> {
        if let Some(parsed) = &self.parsed {
            return Some(parsed.clone());
        }

        let dialect = self.dialect.parser_dialect();
        let statements = match Parser::parse_sql(dialect.as_ref(), &self.query) {
            Ok(statements) => statements,
            Err(e) => {
                tracing::warn!(query = %self.query, error = %e, "could not parse query");
                self.errors.push(
                    Diagnostic::error(DiagnosticKind::ParseError, format!("Parse error: {}", e))
                        .with_span(Span::new(0, self.query.len().min(50))),
                );
                return None;
            }
        };

        let Some(first) = statements.into_iter().next() else {
            self.errors.push(Diagnostic::error(
                DiagnosticKind::ParseError,
                "Query contains no statements",
            ));
            return None;
        };

        let Statement::Query(query) = first else {
            tracing::warn!(query = %self.query, "parsed statement is not a SELECT");
            self.errors.push(Diagnostic::error(
                DiagnosticKind::StatementKindMismatch,
                "Statement is not a SELECT",
            ));
            return None;
        };

        self.parsed = Some(*query);
        self.parsed.clone()
    }

    // ---- CTE index ----

    fn extract_cte(&mut self, query: &Query) {
        self.cte_list.clear();
        let Some(with) = &query.with else {
            return;
        };
        for cte in &with.cte_tables {
            self.cte_list
                .insert(cte.alias.name.value.clone(), cte.clone());
        }
    }

    fn find_cte(&self, name: &str) -> Option<&Cte> {
        self.cte_list
            .iter()
            .find(|(key, _)| ieq(key, name))
            .map(|(_, cte)| cte)
    }

    // ---- per-core resolution ----

    fn resolve_core(&mut self, select: &Select, compound: bool) -> Vec<Column> {
        self.core_results.clear();

        if !select.from.is_empty() {
            self.source_columns = self.resolve_from(&select.from);
        }

        for (idx, item) in select.projection.iter().enumerate() {
            self.resolve_result_column(idx, item);
        }

        if select.distinct.is_some() {
            self.mark_current_columns(ColumnFlags::FROM_DISTINCT_SELECT);
        }
        if has_group_by(select) {
            self.mark_current_columns(ColumnFlags::FROM_GROUPED_SELECT);
        }

        self.fix_column_names();

        if compound {
            self.mark_current_columns(ColumnFlags::FROM_COMPOUND_SELECT);
        }

        std::mem::take(&mut self.core_results)
    }

    fn resolve_available_core(&mut self, select: &Select) -> Vec<Column> {
        if select.from.is_empty() {
            Vec::new()
        } else {
            self.resolve_from(&select.from)
        }
    }

    fn mark_current_columns(&mut self, flag: ColumnFlags) {
        for col in &mut self.core_results {
            col.flags |= flag;
        }
    }

    /// Make display names and aliases pairwise unique, in declaration order.
    /// A duplicated name is also given a sequenced alias, so every result
    /// stays addressable by a stable identifier.
    fn fix_column_names(&mut self) {
        let mut display_names: HashSet<String> = HashSet::new();
        let mut alias_names: HashSet<String> = HashSet::new();

        for col in &mut self.core_results {
            let original = col.display_name.clone().unwrap_or_default();
            let mut name = original.clone();
            let mut i = 1;
            while display_names.contains(&name) {
                name = format!("{}:{}", original, i);
                i += 1;
            }
            display_names.insert(name.clone());
            col.display_name = Some(name);

            let base = col
                .alias
                .clone()
                .or_else(|| col.column.clone())
                .unwrap_or_default();
            let mut alias = base.clone();
            let mut i = 1;
            while alias_names.contains(&alias) {
                alias = format!("{}:{}", base, i);
                i += 1;
            }
            if alias != base {
                col.alias = Some(alias.clone());
            }
            alias_names.insert(alias);
        }
    }

    // ---- FROM clause resolution ----

    fn resolve_from(&mut self, from: &[TableWithJoins]) -> Vec<Column> {
        let mut columns = Vec::new();
        for table_with_joins in from {
            columns.extend(self.resolve_table_with_joins(table_with_joins));
        }
        columns
    }

    fn resolve_table_with_joins(&mut self, table_with_joins: &TableWithJoins) -> Vec<Column> {
        let mut columns = self.resolve_single_source(&table_with_joins.relation);
        for join in &table_with_joins.joins {
            columns.extend(self.resolve_single_source(&join.relation));
        }
        columns
    }

    fn resolve_single_source(&mut self, factor: &TableFactor) -> Vec<Column> {
        match factor {
            TableFactor::Derived {
                subquery, alias, ..
            } => {
                let alias_name = alias.as_ref().map(|a| a.name.value.as_str());
                self.resolve_derived_source(subquery, alias_name)
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.resolve_table_with_joins(table_with_joins),
            TableFactor::Table { args: Some(_), .. } => self.resolve_table_function(factor),
            TableFactor::Table { name, alias, .. } => {
                let (database, table) = object_name_parts(name);
                let alias_name = alias.as_ref().map(|a| a.name.value.as_str());
                if self.is_view(database.as_deref(), &table) {
                    self.resolve_view(database.as_deref(), &table, alias_name)
                } else if database.is_none() && self.find_cte(&table).is_some() {
                    self.resolve_cte_columns(&table)
                } else {
                    self.resolve_plain_table(database.as_deref(), &table, alias_name)
                }
            }
            other => {
                tracing::debug!(source = %other, "unsupported FROM source kind, contributes no columns");
                Vec::new()
            }
        }
    }

    fn resolve_plain_table(
        &mut self,
        database: Option<&str>,
        table: &str,
        alias: Option<&str>,
    ) -> Vec<Column> {
        let names = self.table_columns_cached(database, table, alias);
        let template = Column {
            kind: ColumnKind::Column,
            database: database.map(str::to_string),
            original_database: self.resolve_database(database),
            table: Some(table.to_string()),
            table_alias: alias.map(str::to_string),
            ..Column::default()
        };

        names
            .into_iter()
            .map(|name| {
                let mut col = template.clone();
                col.column = Some(name);
                col
            })
            .collect()
    }

    /// Probe the database for the result columns a CTE exposes. Whatever
    /// name the probe reports, alias or plain column, is what users of the
    /// CTE see as the available column.
    fn resolve_cte_columns(&mut self, name: &str) -> Vec<Column> {
        let Some(cte) = self.find_cte(name) else {
            return Vec::new();
        };
        let cte_name = cte.alias.name.value.clone();
        let probe = format!("WITH {} SELECT * FROM {}", cte, cte_name);

        let query_columns = match self.database.columns_for_query(&probe) {
            Ok(columns) if !columns.is_empty() => columns,
            Ok(_) => {
                tracing::warn!(cte = %cte_name, "could not detect CTE query columns");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(cte = %cte_name, error = %e, "could not detect CTE query columns, probably due to db error");
                return Vec::new();
            }
        };

        query_columns
            .into_iter()
            .map(|query_column| Column {
                kind: ColumnKind::Column,
                flags: ColumnFlags::FROM_CTE_SELECT,
                table_alias: Some(cte_name.clone()),
                database: query_column
                    .database
                    .as_deref()
                    .map(|db| self.attach_names.resolve(db).to_string()),
                table: query_column.table,
                column: Some(query_column.alias.clone()),
                display_name: Some(query_column.alias),
                ..Column::default()
            })
            .collect()
    }

    fn resolve_table_function(&mut self, factor: &TableFactor) -> Vec<Column> {
        let probe = format!("SELECT * FROM {} LIMIT 0", factor);
        let names = match self.database.exec(&probe) {
            Ok(names) => names,
            Err(e) => {
                self.errors.push(Diagnostic::error(
                    DiagnosticKind::ProbeFailure,
                    e.to_string(),
                ));
                Vec::new()
            }
        };

        let TableFactor::Table { name, alias, .. } = factor else {
            return Vec::new();
        };
        let (database, _) = object_name_parts(name);

        // Table function output cannot be treated as real table columns
        let template = Column {
            kind: ColumnKind::Other,
            database: database.clone(),
            original_database: self.resolve_database(database.as_deref()),
            table_alias: alias.as_ref().map(|a| a.name.value.clone()),
            ..Column::default()
        };

        names
            .into_iter()
            .map(|name| {
                let mut col = template.clone();
                col.column = Some(name);
                col
            })
            .collect()
    }

    fn resolve_derived_source(&mut self, subquery: &Query, alias: Option<&str>) -> Vec<Column> {
        let mut columns = self.resolve_sub_select(subquery);
        Self::apply_sub_select_alias(&mut columns, alias);

        for col in &mut columns {
            if col.alias.as_deref().unwrap_or("").is_empty() {
                continue;
            }
            col.alias_defined_in_sub_query = true;
        }

        columns
    }

    /// Resolve a sub-select with a fresh resolver instance. Compound
    /// sub-selects contribute the first arm's columns, every arm when
    /// multi-core resolution is enabled, and tag everything as compound.
    fn resolve_sub_select(&mut self, query: &Query) -> Vec<Column> {
        let cores = collect_cores(&query.body);
        if cores.is_empty() {
            return Vec::new();
        }
        let compound = cores.len() > 1;

        let mut internal = SelectResolver::new(self.catalog, self.database, &self.query)
            .with_dialect(self.dialect);

        let mut columns = if compound && self.resolve_multi_core {
            internal.resolve_all(query).into_iter().flatten().collect()
        } else {
            internal.resolve_first(query)
        };

        if compound {
            for col in &mut columns {
                col.flags |= ColumnFlags::FROM_COMPOUND_SELECT;
            }
        }

        columns
    }

    fn resolve_view(
        &mut self,
        database: Option<&str>,
        name: &str,
        alias: Option<&str>,
    ) -> Vec<Column> {
        let Some(statement) = self
            .catalog
            .parsed_object(database, name, SchemaObjectKind::View)
        else {
            tracing::debug!(view = name, "could not get parsed CREATE VIEW");
            return Vec::new();
        };

        let Statement::CreateView { query, .. } = statement else {
            tracing::debug!(view = name, "parsed object is not a CREATE VIEW as expected");
            return Vec::new();
        };

        let mut columns = self.resolve_sub_select(&query);
        Self::apply_sub_select_alias(&mut columns, Some(alias.unwrap_or(name)));
        columns
    }

    fn is_view(&self, database: Option<&str>, name: &str) -> bool {
        self.catalog
            .views(database)
            .iter()
            .any(|view| ieq(view, name))
    }

    fn table_columns_cached(
        &mut self,
        database: Option<&str>,
        table: &str,
        alias: Option<&str>,
    ) -> Vec<String> {
        let key = (
            database.unwrap_or("").to_ascii_lowercase(),
            table.to_ascii_lowercase(),
            alias.unwrap_or("").to_ascii_lowercase(),
        );
        if let Some(columns) = self.table_columns_cache.get(&key) {
            return columns.clone();
        }

        let columns = self.catalog.table_columns(database, table);
        self.table_columns_cache.insert(key, columns.clone());
        columns
    }

    /// Aliasing a sub-select re-homes its columns under the new alias; the
    /// previous alias goes into the history. An unaliased sub-select marks
    /// its columns as coming from an anonymous select instead.
    fn apply_sub_select_alias(columns: &mut [Column], alias: Option<&str>) {
        match alias {
            Some(alias) => {
                for col in columns {
                    col.push_table_alias();
                    col.table_alias = Some(alias.to_string());
                    col.flags.remove(ColumnFlags::FROM_ANONYMOUS_SELECT);
                }
            }
            None => {
                for col in columns {
                    col.flags |= ColumnFlags::FROM_ANONYMOUS_SELECT;
                }
            }
        }
    }

    fn resolve_database(&self, database: Option<&str>) -> Option<String> {
        database.map(|name| self.attach_names.resolve(name).to_string())
    }

    // ---- result column resolution ----

    fn resolve_result_column(&mut self, idx: usize, item: &SelectItem) {
        match item {
            SelectItem::Wildcard(_) => self.resolve_star(idx, item, None, None),
            SelectItem::QualifiedWildcard(name, _) => {
                let prefix_ident = name.0.last().cloned();
                let prefix = prefix_ident.as_ref().map(|i| i.value.clone());
                let span = prefix_ident.map(|i| Span::from_sqlparser(&i.span));
                self.resolve_star(idx, item, prefix.as_deref(), span)
            }
            SelectItem::UnnamedExpr(expr) => self.resolve_expr_column(idx, item, expr, None),
            SelectItem::ExprWithAlias { expr, alias } => {
                self.resolve_expr_column(idx, item, expr, Some(alias.value.clone()))
            }
        }
    }

    fn resolve_star(
        &mut self,
        idx: usize,
        item: &SelectItem,
        prefix: Option<&str>,
        span: Option<Span>,
    ) {
        let mut matched: Vec<Column> = Vec::new();
        for column in &self.source_columns {
            if let Some(prefix) = prefix {
                if !matches_table_prefix(column, prefix) {
                    continue;
                }
            }

            let mut column = column.clone();
            // An aliased source column is presented under its alias
            column.display_name = Some(
                column
                    .alias
                    .clone()
                    .or_else(|| column.column.clone())
                    .unwrap_or_default(),
            );
            column.result_column = Some(idx);
            matched.push(column);
        }

        // Duplicate FROM aliases shadow: when several sources answer to the
        // same prefix, the one declared last hides the earlier ones.
        if prefix.is_some() && matched.len() > 1 {
            let last = matched.last().cloned();
            if let Some(last) = last {
                matched.retain(|col| {
                    opt_ieq(col.table.as_deref(), last.table.as_deref())
                        && opt_ieq(col.table_alias.as_deref(), last.table_alias.as_deref())
                });
            }
        }

        if matched.is_empty() {
            let mut diagnostic = Diagnostic::error(
                DiagnosticKind::UnresolvedDataSource,
                format!("Could not resolve data source for column: {}", item),
            );
            if let Some(span) = span {
                diagnostic = diagnostic.with_span(span);
            }
            self.errors.push(diagnostic);
        } else {
            self.core_results.extend(matched);
        }
    }

    fn resolve_expr_column(
        &mut self,
        idx: usize,
        item: &SelectItem,
        expr: &Expr,
        alias: Option<String>,
    ) {
        match expr {
            Expr::Identifier(ident) => {
                self.resolve_identifier_column(idx, expr, alias, None, None, &ident.value)
            }
            Expr::CompoundIdentifier(parts) => match parts.as_slice() {
                [table, column] => self.resolve_identifier_column(
                    idx,
                    expr,
                    alias,
                    None,
                    Some(&table.value),
                    &column.value,
                ),
                [database, table, column] => self.resolve_identifier_column(
                    idx,
                    expr,
                    alias,
                    Some(&database.value),
                    Some(&table.value),
                    &column.value,
                ),
                _ => self.resolve_other_expr(idx, item, alias),
            },
            _ => self.resolve_other_expr(idx, item, alias),
        }
    }

    /// A result column that is not a plain identifier: record the expression
    /// text with the alias stripped off
    fn resolve_other_expr(&mut self, idx: usize, item: &SelectItem, alias: Option<String>) {
        let dialect = self.dialect.parser_dialect();
        let text = match item {
            SelectItem::ExprWithAlias { .. } => {
                tokens::strip_trailing_alias(&item.to_string(), dialect.as_ref())
            }
            _ => item.to_string().trim().to_string(),
        };

        let display_name = alias.clone().unwrap_or_else(|| text.clone());
        self.core_results.push(Column {
            kind: ColumnKind::Other,
            column: Some(text),
            alias,
            display_name: Some(display_name),
            result_column: Some(idx),
            ..Column::default()
        });
    }

    fn resolve_identifier_column(
        &mut self,
        idx: usize,
        expr: &Expr,
        alias: Option<String>,
        database: Option<&str>,
        table: Option<&str>,
        column_name: &str,
    ) {
        let mut col = Column {
            kind: ColumnKind::Column,
            column: Some(column_name.to_string()),
            display_name: Some(alias.clone().unwrap_or_else(|| column_name.to_string())),
            alias,
            result_column: Some(idx),
            ..Column::default()
        };

        let matched = if is_row_id_keyword(column_name) {
            self.find_row_id_source(table)
        } else {
            self.find_source(database, table, column_name)
        }
        .cloned();

        match matched {
            Some(matched) if matched.kind == ColumnKind::Other => {
                col.kind = ColumnKind::Other;
            }
            Some(matched) => {
                col.original_database = self.resolve_database(matched.database.as_deref());
                col.database = matched.database;
                col.table = matched.table;
                col.table_alias = matched.table_alias;
                col.flags = matched.flags;
            }
            None => {
                if !self.ignore_invalid_names {
                    let text = expr.to_string();
                    tracing::debug!(column = %text, query = %self.query, "source table for column not matched while resolving select");
                    self.errors.push(
                        Diagnostic::error(
                            DiagnosticKind::UnresolvedColumn,
                            format!("Could not resolve table for column '{}'.", text),
                        )
                        .with_span(Span::from_sqlparser(&expr.span()))
                        .with_help("Check table names and aliases in the FROM clause"),
                    );
                }
            }
        }

        self.core_results.push(col);
    }

    /// Match a `db.table.column` reference (database and table optional)
    /// against the available source columns, in FROM order. A declared
    /// source alias counts as a column name.
    fn find_source(
        &self,
        database: Option<&str>,
        table: Option<&str>,
        column_name: &str,
    ) -> Option<&Column> {
        self.source_columns.iter().find(|col| {
            if !matches_name(col.column.as_deref(), column_name)
                && !matches_name(col.alias.as_deref(), column_name)
            {
                return false;
            }
            if let Some(table) = table {
                if !matches_table_prefix(col, table) {
                    return false;
                }
            }
            if let Some(database) = database {
                if !opt_ieq(col.database.as_deref(), Some(database)) {
                    return false;
                }
            }
            true
        })
    }

    /// The row-id pseudo-column resolves to the first source that has an
    /// actual table and answers to the given prefix
    fn find_row_id_source(&self, table: Option<&str>) -> Option<&Column> {
        let table = table?;
        self.source_columns
            .iter()
            .find(|col| col.table.is_some() && matches_table_prefix(col, table))
    }

    // ---- token translation ----

    fn translate_token_inner(&mut self, query: &Query, token: &TokenWithSpan) -> Column {
        let stripped = tokens::token_text(&token.token);
        let fallback = Column {
            kind: ColumnKind::Other,
            column: Some(stripped.clone()),
            ..Column::default()
        };

        let mut chain: Vec<(&Query, &Select)> = Vec::new();
        collect_enclosing_cores(query, token.span.start, &mut chain);
        if chain.is_empty() {
            tracing::debug!(token = %stripped, query = %self.query, "could not find select core containing token");
            return fallback;
        }

        // Innermost core first, then climb outward through the sub-selects
        for (owner, core) in chain.into_iter().rev() {
            self.extract_cte(owner);
            for col in self.resolve_available_core(core) {
                if col.kind == ColumnKind::Column
                    && matches_name(col.column.as_deref(), &stripped)
                {
                    return col;
                }
            }
        }

        fallback
    }
}

/// Collect the chain of SELECT cores whose span contains `loc`, outermost
/// first, together with the query each core belongs to
fn collect_enclosing_cores<'q>(
    query: &'q Query,
    loc: Location,
    out: &mut Vec<(&'q Query, &'q Select)>,
) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            if tokens::span_contains(cte.query.span(), loc) {
                collect_enclosing_cores(&cte.query, loc, out);
            }
        }
    }

    for core in collect_cores(&query.body) {
        if !tokens::span_contains(core.span(), loc) {
            continue;
        }
        out.push((query, core));

        for table_with_joins in &core.from {
            collect_factor_cores(&table_with_joins.relation, loc, out);
            for join in &table_with_joins.joins {
                collect_factor_cores(&join.relation, loc, out);
            }
        }
        for item in &core.projection {
            match item {
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                    collect_expr_cores(expr, loc, out);
                }
                _ => {}
            }
        }
        if let Some(selection) = &core.selection {
            collect_expr_cores(selection, loc, out);
        }
        if let Some(having) = &core.having {
            collect_expr_cores(having, loc, out);
        }
    }
}

fn collect_factor_cores<'q>(
    factor: &'q TableFactor,
    loc: Location,
    out: &mut Vec<(&'q Query, &'q Select)>,
) {
    match factor {
        TableFactor::Derived { subquery, .. } => {
            if tokens::span_contains(subquery.span(), loc) {
                collect_enclosing_cores(subquery, loc, out);
            }
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            collect_factor_cores(&table_with_joins.relation, loc, out);
            for join in &table_with_joins.joins {
                collect_factor_cores(&join.relation, loc, out);
            }
        }
        _ => {}
    }
}

fn collect_expr_cores<'q>(
    expr: &'q Expr,
    loc: Location,
    out: &mut Vec<(&'q Query, &'q Select)>,
) {
    match expr {
        Expr::Subquery(subquery)
        | Expr::InSubquery {
            subquery, ..
        } => {
            if tokens::span_contains(subquery.span(), loc) {
                collect_enclosing_cores(subquery, loc, out);
            }
        }
        Expr::Exists { subquery, .. } => {
            if tokens::span_contains(subquery.span(), loc) {
                collect_enclosing_cores(subquery, loc, out);
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            collect_expr_cores(left, loc, out);
            collect_expr_cores(right, loc, out);
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) => {
            collect_expr_cores(expr, loc, out);
        }
        _ => {}
    }
}
