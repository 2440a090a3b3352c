//! sqlorigin CLI - resolves SELECT column origins against schema files

mod args;
mod config;
mod output;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use sqlorigin_core::schema::{Catalog, SchemaBuilder};
use sqlorigin_core::{OfflineDatabase, SelectResolver, Severity, SqlDialect};

use crate::args::{Args, Command, OutputFormat};
use crate::config::Config;
use crate::output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let default_level = if args.verbose > 0 {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    match run(args) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let quiet = args.quiet;

    match args.command {
        Command::Resolve {
            files,
            schema,
            schema_dir,
            config: config_path,
            dialect,
            format,
            disable,
            multi_core,
            ignore_invalid_names,
        } => {
            let dialect: SqlDialect = dialect.parse().map_err(|e: String| miette::miette!(e))?;
            let config = load_config(config_path)?
                .merge_with_args(&schema, &schema_dir, &files, &format, &disable);

            let schema_files = collect_schema_files(&config)?;
            if schema_files.is_empty() {
                miette::bail!(
                    "No schema files specified. Use --schema, --schema-dir, or configure in sqlorigin.toml"
                );
            }

            let output_format = output_format_of(&config);
            let Some(catalog) = build_catalog(&schema_files, dialect, output_format)? else {
                return Ok(true);
            };

            let query_files = collect_query_files(&config)?;
            if query_files.is_empty() {
                miette::bail!(
                    "No query files specified. Use positional arguments or configure in sqlorigin.toml"
                );
            }

            let db = OfflineDatabase::new(&catalog);
            let disabled_codes: HashSet<String> = config.disable.iter().cloned().collect();

            let mut total_errors = 0;
            let mut total_warnings = 0;

            for query_file in &query_files {
                let content = fs::read_to_string(query_file).into_diagnostic()?;
                let formatter =
                    OutputFormatter::new(output_format, query_file.display().to_string());

                let parser_dialect = dialect.parser_dialect();
                let statements =
                    match sqlparser::parser::Parser::parse_sql(parser_dialect.as_ref(), &content) {
                        Ok(statements) => statements,
                        Err(e) => {
                            eprintln!("{}: parse error: {}", query_file.display(), e);
                            total_errors += 1;
                            continue;
                        }
                    };

                let mut statement_index = 0;
                for stmt in &statements {
                    let sqlparser::ast::Statement::Query(query) = stmt else {
                        continue;
                    };
                    statement_index += 1;

                    let mut resolver = SelectResolver::new(&catalog, &db, &content)
                        .with_dialect(dialect)
                        .resolve_multi_core(multi_core)
                        .ignore_invalid_names(ignore_invalid_names);
                    let arms = resolver.resolve_all(query);
                    formatter.print_columns(statement_index, &arms);

                    let filtered: Vec<_> = resolver
                        .errors()
                        .iter()
                        .filter(|d| !disabled_codes.contains(d.code()))
                        .cloned()
                        .collect();
                    if !filtered.is_empty() {
                        formatter.print_diagnostics(&filtered, &content);
                    }
                    for diag in &filtered {
                        match diag.severity {
                            Severity::Error => total_errors += 1,
                            Severity::Warning => total_warnings += 1,
                            _ => {}
                        }
                    }
                }
            }

            if !quiet {
                if total_errors > 0 || total_warnings > 0 {
                    eprintln!();
                    eprintln!(
                        "Found {} error(s), {} warning(s) in {} file(s)",
                        total_errors,
                        total_warnings,
                        query_files.len()
                    );
                } else {
                    eprintln!("All {} file(s) resolved cleanly", query_files.len());
                }
            }

            Ok(total_errors > 0)
        }

        Command::Tables {
            files,
            schema,
            schema_dir,
            config: config_path,
            dialect,
            format,
        } => {
            let dialect: SqlDialect = dialect.parse().map_err(|e: String| miette::miette!(e))?;
            let config =
                load_config(config_path)?.merge_with_args(&schema, &schema_dir, &files, &format, &[]);

            let schema_files = collect_schema_files(&config)?;
            if schema_files.is_empty() {
                miette::bail!(
                    "No schema files specified. Use --schema, --schema-dir, or configure in sqlorigin.toml"
                );
            }

            let output_format = output_format_of(&config);
            let Some(catalog) = build_catalog(&schema_files, dialect, output_format)? else {
                return Ok(true);
            };

            let query_files = collect_query_files(&config)?;
            if query_files.is_empty() {
                miette::bail!(
                    "No query files specified. Use positional arguments or configure in sqlorigin.toml"
                );
            }

            let db = OfflineDatabase::new(&catalog);
            let mut total_errors = 0;

            for query_file in &query_files {
                let content = fs::read_to_string(query_file).into_diagnostic()?;
                let formatter =
                    OutputFormatter::new(output_format, query_file.display().to_string());

                let parser_dialect = dialect.parser_dialect();
                let statements =
                    match sqlparser::parser::Parser::parse_sql(parser_dialect.as_ref(), &content) {
                        Ok(statements) => statements,
                        Err(e) => {
                            eprintln!("{}: parse error: {}", query_file.display(), e);
                            total_errors += 1;
                            continue;
                        }
                    };

                let mut statement_index = 0;
                for stmt in &statements {
                    let sqlparser::ast::Statement::Query(query) = stmt else {
                        continue;
                    };
                    statement_index += 1;

                    let mut resolver =
                        SelectResolver::new(&catalog, &db, &content).with_dialect(dialect);
                    let arms: Vec<Vec<_>> = resolver
                        .resolve_tables(query)
                        .into_iter()
                        .map(|set| set.into_iter().collect())
                        .collect();
                    formatter.print_tables(statement_index, &arms);

                    if resolver.has_errors() {
                        formatter.print_diagnostics(resolver.errors(), &content);
                        total_errors += resolver.errors().len();
                    }
                }
            }

            Ok(total_errors > 0)
        }

        Command::Schema { files } => {
            let mut builder = SchemaBuilder::new();
            for schema_file in &files {
                let content = fs::read_to_string(schema_file).into_diagnostic()?;
                let _ = builder.parse(&content);
            }
            let (catalog, _) = builder.build();

            println!("Schema Information:");
            println!("==================");
            for (db_name, db_schema) in &catalog.databases {
                println!("\nDatabase: {}", db_name);
                for (table_name, table) in &db_schema.tables {
                    println!("  Table: {}", table_name);
                    for (col_name, col) in &table.columns {
                        let type_str = col.data_type.to_full_string();
                        let nullable = if col.nullable { "NULL" } else { "NOT NULL" };
                        let pk = if col.primary_key { " PRIMARY KEY" } else { "" };
                        println!("    - {} {} {}{}", col_name, type_str, nullable, pk);
                    }
                }
                for (view_name, view) in &db_schema.views {
                    if view.column_aliases.is_empty() {
                        println!("  View: {}", view_name);
                    } else {
                        println!("  View: {} ({})", view_name, view.column_aliases.join(", "));
                    }
                }
            }

            Ok(false)
        }

        Command::Parse { file } => {
            let content = fs::read_to_string(&file).into_diagnostic()?;

            let dialect = SqlDialect::default().parser_dialect();
            match sqlparser::parser::Parser::parse_sql(dialect.as_ref(), &content) {
                Ok(statements) => {
                    for (i, stmt) in statements.iter().enumerate() {
                        println!("Statement {}:", i + 1);
                        println!("{:#?}", stmt);
                        println!();
                    }
                }
                Err(e) => {
                    eprintln!("Parse error: {}", e);
                    return Ok(true);
                }
            }

            Ok(false)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path),
        None => Ok(Config::find_and_load()?.unwrap_or_default()),
    }
}

fn output_format_of(config: &Config) -> OutputFormat {
    match config.format.as_deref() {
        Some("json") => OutputFormat::Json,
        _ => OutputFormat::Human,
    }
}

fn collect_schema_files(config: &Config) -> Result<Vec<PathBuf>> {
    let mut schema_files: Vec<PathBuf> = config.schema.iter().map(PathBuf::from).collect();

    if let Some(dir) = &config.schema_dir {
        let pattern = format!("{}/**/*.sql", dir);
        for path in glob::glob(&pattern).into_diagnostic()?.flatten() {
            schema_files.push(path);
        }
    }

    Ok(schema_files)
}

fn collect_query_files(config: &Config) -> Result<Vec<PathBuf>> {
    let mut query_files = Vec::new();

    for pattern in &config.files {
        if pattern.contains('*') {
            for path in glob::glob(pattern).into_diagnostic()?.flatten() {
                query_files.push(path);
            }
        } else {
            query_files.push(PathBuf::from(pattern));
        }
    }

    Ok(query_files)
}

/// Parse every schema file into a catalog; `None` means diagnostics were
/// already printed and the run should fail
fn build_catalog(
    schema_files: &[PathBuf],
    dialect: SqlDialect,
    output_format: OutputFormat,
) -> Result<Option<Catalog>> {
    let mut builder = SchemaBuilder::with_dialect(dialect);
    for schema_file in schema_files {
        let content = fs::read_to_string(schema_file).into_diagnostic()?;
        if let Err(diags) = builder.parse(&content) {
            let formatter = OutputFormatter::new(output_format, schema_file.display().to_string());
            formatter.print_diagnostics(&diags, &content);
            return Ok(None);
        }
    }

    let (catalog, schema_diags) = builder.build();
    if !schema_diags.is_empty() {
        eprintln!(
            "Warning: schema parsing produced {} warning(s)",
            schema_diags.len()
        );
    }

    Ok(Some(catalog))
}
