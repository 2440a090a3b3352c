//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sqlorigin")]
#[command(author, version, about = "SELECT column-origin resolver")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve the origin of every result column in SQL files
    Resolve {
        /// SQL files to resolve (supports glob patterns)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Schema definition files
        #[arg(short, long = "schema", value_name = "FILE")]
        schema: Vec<PathBuf>,

        /// Directory containing schema files
        #[arg(long = "schema-dir", value_name = "DIR")]
        schema_dir: Option<PathBuf>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// SQL dialect
        #[arg(short, long, default_value = "sqlite")]
        dialect: String,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Diagnostic codes to ignore (e.g., E0002)
        #[arg(long = "disable", value_name = "CODE")]
        disable: Vec<String>,

        /// Resolve every arm of compound sub-selects
        #[arg(long)]
        multi_core: bool,

        /// Degrade unresolved column names silently instead of reporting
        #[arg(long)]
        ignore_invalid_names: bool,
    },

    /// Print the set of tables contributing to each SELECT
    Tables {
        /// SQL files to inspect (supports glob patterns)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Schema definition files
        #[arg(short, long = "schema", value_name = "FILE")]
        schema: Vec<PathBuf>,

        /// Directory containing schema files
        #[arg(long = "schema-dir", value_name = "DIR")]
        schema_dir: Option<PathBuf>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// SQL dialect
        #[arg(short, long, default_value = "sqlite")]
        dialect: String,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Display schema information
    Schema {
        /// Schema definition files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Parse SQL and display AST (for debugging)
    Parse {
        /// SQL file to parse
        file: PathBuf,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}
