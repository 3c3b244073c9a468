//! Command-line interface for sheetsync

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "Change-aware sync of spreadsheet ranges into DuckDB tables")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON configuration file (defaults to $SHEETSYNC_CONFIG, then built-in datasets)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// DuckDB connection string, e.g. "md:", "sync.duckdb" or ":memory:"
    #[arg(long, global = true)]
    pub connection: Option<String>,

    /// Service-account key file
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Read sheets from CSV exports in this directory instead of Google Sheets
    #[arg(long, global = true)]
    pub csv_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize datasets into their destination tables
    Run {
        /// Dataset to run (repeatable; defaults to all, in configured order)
        #[arg(long = "dataset")]
        datasets: Vec<String>,

        /// Compare only; never write the destination
        #[arg(long)]
        dry_run: bool,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,

        /// Show progress bars
        #[arg(long)]
        progress: bool,
    },

    /// Verify the trigger variable, configuration and credentials
    Check,

    /// List configured datasets
    Datasets {
        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Show the stored contents of a destination table
    Show {
        /// Table name
        table: String,

        /// Maximum number of rows to display (must be > 0)
        #[arg(long, default_value = "10", value_parser = validate_limit)]
        limit: usize,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Validate that the preview limit is greater than 0
fn validate_limit(s: &str) -> Result<usize, String> {
    let limit: usize = s
        .parse()
        .map_err(|_| format!("Invalid limit: '{}'. Must be a positive integer.", s))?;

    if limit == 0 {
        return Err("Limit must be greater than 0".to_string());
    }

    Ok(limit)
}
