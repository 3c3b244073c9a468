//! Command implementations for sheetsync CLI

use crate::cli::{Cli, Commands, OutputFormat};
use crate::config::JobConfig;
use crate::credentials::ServiceAccountKey;
use crate::error::{Result, SheetSyncError};
use crate::job::{check_precondition, JobRunner};
use crate::local::LocalExportReader;
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::reconcile::RunMode;
use crate::sheets::SheetsReader;
use crate::source::SourceReader;
use crate::store::SnapshotStore;
use std::path::PathBuf;

/// Global flags that shape the job configuration
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub connection: Option<String>,
    pub credentials: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            connection: cli.connection.clone(),
            credentials: cli.credentials.clone(),
            csv_dir: cli.csv_dir.clone(),
        }
    }

    /// Load the configuration and apply command-line overrides on top
    pub fn load_config(&self) -> Result<JobConfig> {
        let mut config = JobConfig::load(self.config.as_deref())?;
        if let Some(connection) = &self.connection {
            config.connection = connection.clone();
        }
        if let Some(credentials) = &self.credentials {
            config.credentials_path = credentials.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Local exports when `--csv-dir` is given, Google Sheets otherwise
    pub fn source(&self, config: &JobConfig) -> Result<Box<dyn SourceReader>> {
        match &self.csv_dir {
            Some(dir) => Ok(Box::new(LocalExportReader::new(dir.clone()))),
            None => Ok(Box::new(SheetsReader::new(config.credentials_path.clone())?)),
        }
    }
}

/// Execute a command
pub fn execute_command(command: Commands, overrides: &Overrides) -> Result<()> {
    match command {
        Commands::Run {
            datasets,
            dry_run,
            json,
            progress,
        } => run_command(overrides, &datasets, dry_run, json, progress),
        Commands::Check => check_command(overrides),
        Commands::Datasets { format } => datasets_command(overrides, &format),
        Commands::Show { table, limit, format } => show_command(overrides, &table, limit, &format),
    }
}

/// Synchronize the selected datasets
fn run_command(overrides: &Overrides, names: &[String], dry_run: bool, json: bool, progress: bool) -> Result<()> {
    let config = overrides.load_config()?;
    let datasets = config.select(names)?;
    let source = overrides.source(&config)?;

    let mode = if dry_run { RunMode::DryRun } else { RunMode::Apply };
    let report = JobRunner::new(source.as_ref(), &config.connection, &config.trigger_env)
        .mode(mode)
        .show_progress(progress && !json)
        .run(&datasets)?;

    if json {
        println!("{}", JsonFormatter::format(&report)?);
    } else {
        PrettyPrinter::print_job_report(&report);
    }
    Ok(())
}

/// Verify everything a run needs before any sheet is fetched
fn check_command(overrides: &Overrides) -> Result<()> {
    let config = overrides.load_config()?;
    println!("🔍 Checking sheetsync setup...");

    check_precondition(&config.trigger_env)?;
    println!("├─ ✅ {} is set", config.trigger_env);
    println!("├─ ✅ {} datasets configured", config.datasets.len());

    match &overrides.csv_dir {
        Some(dir) => {
            let reader = LocalExportReader::new(dir.clone());
            for dataset in &config.datasets {
                let path = reader.export_path(&dataset.sheet);
                if !path.is_file() {
                    return Err(SheetSyncError::source_unavailable(
                        &dataset.sheet,
                        format!("export not found: {}", path.display()),
                    ));
                }
            }
            println!("├─ ✅ All exports present in {}", dir.display());
        }
        None => {
            let key = ServiceAccountKey::load(&config.credentials_path, "credentials")?;
            println!("├─ ✅ Service account: {}", key.client_email);
        }
    }

    println!("└─ 🎯 Destination: {}", config.connection);
    Ok(())
}

/// List configured datasets
fn datasets_command(overrides: &Overrides, format: &str) -> Result<()> {
    let output_format = OutputFormat::parse(format).map_err(SheetSyncError::invalid_input)?;
    let config = overrides.load_config()?;

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_dataset_list(&config.datasets),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&config.datasets)?),
    }
    Ok(())
}

/// Show what is currently stored in a destination table
fn show_command(overrides: &Overrides, table: &str, limit: usize, format: &str) -> Result<()> {
    let output_format = OutputFormat::parse(format).map_err(SheetSyncError::invalid_input)?;
    let config = overrides.load_config()?;

    let store = SnapshotStore::open_read_only(&config.connection)?;
    let snapshot = store.read_all(table);
    store.close()?;
    let snapshot = snapshot?;

    match output_format {
        OutputFormat::Pretty => PrettyPrinter::print_table_preview(table, &snapshot, limit),
        OutputFormat::Json => println!("{}", JsonFormatter::format_table(table, &snapshot, limit)?),
    }
    Ok(())
}
