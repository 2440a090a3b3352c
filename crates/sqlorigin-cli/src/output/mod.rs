//! Output formatting

use sqlorigin_core::{Column, Diagnostic, Severity, Table};

use crate::args::OutputFormat;

/// Output formatter for resolved columns and diagnostics
pub struct OutputFormatter {
    format: OutputFormat,
    file_name: String,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, file_name: String) -> Self {
        Self { format, file_name }
    }

    /// Print the resolved columns of one statement, one block per compound
    /// arm
    pub fn print_columns(&self, statement: usize, arms: &[Vec<Column>]) {
        match self.format {
            OutputFormat::Human => self.print_columns_human(statement, arms),
            OutputFormat::Json => self.print_columns_json(statement, arms),
        }
    }

    fn print_columns_human(&self, statement: usize, arms: &[Vec<Column>]) {
        for (arm_index, arm) in arms.iter().enumerate() {
            if arms.len() > 1 {
                println!(
                    "{}: statement {}, arm {} ({} columns)",
                    self.file_name,
                    statement,
                    arm_index + 1,
                    arm.len()
                );
            } else {
                println!(
                    "{}: statement {} ({} columns)",
                    self.file_name,
                    statement,
                    arm.len()
                );
            }

            for (i, col) in arm.iter().enumerate() {
                let origin = origin_of(col);
                let display = col.display_name.as_deref().unwrap_or("");
                let mut line = format!(
                    "  {:>3}  {:<24} {:<8} {}",
                    i + 1,
                    display,
                    kind_str(col),
                    origin
                );
                if let Some(alias) = &col.table_alias {
                    line.push_str(&format!(" (as {})", alias));
                }
                let flags = col.flags.names();
                if !flags.is_empty() {
                    line.push_str(&format!(" [{}]", flags.join(", ")));
                }
                println!("{}", line);
            }
        }
    }

    fn print_columns_json(&self, statement: usize, arms: &[Vec<Column>]) {
        let output = serde_json::json!({
            "file": self.file_name,
            "statement": statement,
            "arms": arms,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
    }

    /// Print the contributing tables of one statement
    pub fn print_tables(&self, statement: usize, arms: &[Vec<Table>]) {
        match self.format {
            OutputFormat::Human => {
                for (arm_index, arm) in arms.iter().enumerate() {
                    if arms.len() > 1 {
                        println!("{}: statement {}, arm {}", self.file_name, statement, arm_index + 1);
                    } else {
                        println!("{}: statement {}", self.file_name, statement);
                    }
                    for table in arm {
                        let name = match (&table.database, &table.table) {
                            (Some(db), Some(t)) => format!("{}.{}", db, t),
                            (None, Some(t)) => t.clone(),
                            _ => "(derived)".to_string(),
                        };
                        match &table.table_alias {
                            Some(alias) => println!("  {} (as {})", name, alias),
                            None => println!("  {}", name),
                        }
                    }
                }
            }
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "file": self.file_name,
                    "statement": statement,
                    "arms": arms,
                });
                println!("{}", serde_json::to_string_pretty(&output).unwrap());
            }
        }
    }

    /// Print diagnostics in the configured format
    pub fn print_diagnostics(&self, diagnostics: &[Diagnostic], source: &str) {
        match self.format {
            OutputFormat::Human => self.print_diagnostics_human(diagnostics, source),
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "file": self.file_name,
                    "diagnostics": diagnostics,
                });
                println!("{}", serde_json::to_string_pretty(&output).unwrap());
            }
        }
    }

    fn print_diagnostics_human(&self, diagnostics: &[Diagnostic], source: &str) {
        for diag in diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "\x1b[31merror\x1b[0m",
                Severity::Warning => "\x1b[33mwarning\x1b[0m",
                Severity::Info => "\x1b[34minfo\x1b[0m",
            };

            eprintln!("{}[{}]: {}", severity_str, diag.code(), diag.message);

            if let Some(span) = &diag.span {
                if span.line > 0 {
                    eprintln!("  --> {}:{}:{}", self.file_name, span.line, span.column);

                    if let Some(source_line) = get_source_line(source, span.line) {
                        eprintln!("   |");
                        eprintln!("{:>3} | {}", span.line, source_line);

                        let padding = " ".repeat(span.column.saturating_sub(1));
                        let underline = "^".repeat(span.length.max(1).min(source_line.len() + 1));
                        eprintln!("   | {}{}", padding, underline);
                    }
                }
            }

            if let Some(help) = &diag.help {
                eprintln!("   = help: {}", help);
            }

            eprintln!();
        }
    }
}

fn kind_str(col: &Column) -> &'static str {
    match col.kind {
        sqlorigin_core::ColumnKind::Column => "column",
        sqlorigin_core::ColumnKind::Other => "other",
    }
}

fn origin_of(col: &Column) -> String {
    match (&col.database, &col.table, &col.column) {
        (Some(db), Some(table), Some(name)) => format!("{}.{}.{}", db, table, name),
        (None, Some(table), Some(name)) => format!("{}.{}", table, name),
        (_, None, Some(name)) => name.clone(),
        _ => String::new(),
    }
}

/// Get a specific line from source (1-indexed)
fn get_source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.saturating_sub(1))
}
