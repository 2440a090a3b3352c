//! SQL dialect support

use sqlparser::dialect::{Dialect, SQLiteDialect};
use std::str::FromStr;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SqlDialect {
    #[default]
    Sqlite,
    // Future: DuckDB and other SQLite-compatible engines
}

impl SqlDialect {
    /// Get the sqlparser dialect
    pub fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Sqlite => Box::new(SQLiteDialect {}),
        }
    }

    /// Get the default database name for this dialect
    pub fn default_database(&self) -> &'static str {
        match self {
            SqlDialect::Sqlite => "main",
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(SqlDialect::Sqlite),
            _ => Err(format!("Unknown dialect: {}", s)),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::Sqlite => write!(f, "sqlite"),
        }
    }
}
