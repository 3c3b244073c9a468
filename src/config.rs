//! Job and dataset configuration

use crate::error::{Result, SheetSyncError};
use crate::range::CellRange;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the service-account key
pub const DEFAULT_CREDENTIALS_PATH: &str = "/usr/local/airflow/secret.json";

/// Default destination: the MotherDuck account of the ambient token
pub const DEFAULT_CONNECTION: &str = "md:";

/// Environment variable that must be set before any dataset runs
pub const DEFAULT_TRIGGER_ENV: &str = "MOTHERDUCK_TOKEN";

pub const CONFIG_ENV: &str = "SHEETSYNC_CONFIG";
pub const CONNECTION_ENV: &str = "SHEETSYNC_CONNECTION";
pub const CREDENTIALS_ENV: &str = "SHEETSYNC_CREDENTIALS";

/// One sheet range synchronized into one destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Short identifier used on the command line and in logs
    pub name: String,
    /// Spreadsheet display name
    pub sheet: String,
    pub range: CellRange,
    /// Destination table name
    pub table: String,
    /// Skip the lookup by display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    /// Worksheet tab; the first tab when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worksheet: Option<String>,
    /// Also rewrite when rows were deleted from the sheet
    #[serde(default)]
    pub rewrite_on_removal: bool,
}

impl DatasetConfig {
    pub fn new(name: &str, sheet: &str, range: CellRange, table: &str) -> Self {
        Self {
            name: name.to_string(),
            sheet: sheet.to_string(),
            range,
            table: table.to_string(),
            spreadsheet_id: None,
            worksheet: None,
            rewrite_on_removal: false,
        }
    }
}

/// Everything one scheduled invocation needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_connection")]
    pub connection: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_trigger_env")]
    pub trigger_env: String,
    #[serde(default = "default_datasets")]
    pub datasets: Vec<DatasetConfig>,
}

fn default_connection() -> String {
    DEFAULT_CONNECTION.to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from(DEFAULT_CREDENTIALS_PATH)
}

fn default_trigger_env() -> String {
    DEFAULT_TRIGGER_ENV.to_string()
}

/// The three datasets the job has always synchronized, in run order
pub fn default_datasets() -> Vec<DatasetConfig> {
    vec![
        DatasetConfig::new(
            "exams",
            "Student subject analysis ",
            CellRange::new(0, 1, 32, 41),
            "Student_Exams_record_clean",
        ),
        DatasetConfig::new("profile", "Student Profile", CellRange::new(0, 1, 25, 41), "Student_profile"),
        DatasetConfig::new("teachers", "Teachers Data", CellRange::new(0, 1, 10, 21), "Teachers_data"),
    ]
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            connection: default_connection(),
            credentials_path: default_credentials_path(),
            trigger_env: default_trigger_env(),
            datasets: default_datasets(),
        }
    }
}

impl JobConfig {
    /// Load configuration: explicit path, then `SHEETSYNC_CONFIG`, then
    /// built-in defaults. Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = env::var(CONFIG_ENV).ok().filter(|p| !p.is_empty()).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SheetSyncError::config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            SheetSyncError::config(format!("Invalid config file '{}': {}", path.display(), e))
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(connection) = env::var(CONNECTION_ENV) {
            if !connection.is_empty() {
                self.connection = connection;
            }
        }
        if let Ok(credentials) = env::var(CREDENTIALS_ENV) {
            if !credentials.is_empty() {
                self.credentials_path = PathBuf::from(credentials);
            }
        }
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<()> {
        if self.connection.trim().is_empty() {
            return Err(SheetSyncError::config("connection string is empty"));
        }
        if self.trigger_env.trim().is_empty() {
            return Err(SheetSyncError::config("trigger_env is empty"));
        }
        if self.datasets.is_empty() {
            return Err(SheetSyncError::config("no datasets configured"));
        }

        let mut names = HashSet::new();
        let mut tables = HashSet::new();
        for dataset in &self.datasets {
            if dataset.name.trim().is_empty() || dataset.sheet.trim().is_empty() || dataset.table.trim().is_empty() {
                return Err(SheetSyncError::config(format!(
                    "dataset '{}' needs a name, a sheet and a table",
                    dataset.name
                )));
            }
            if !names.insert(dataset.name.as_str()) {
                return Err(SheetSyncError::config(format!("duplicate dataset name '{}'", dataset.name)));
            }
            if !tables.insert(dataset.table.as_str()) {
                return Err(SheetSyncError::config(format!(
                    "table '{}' is the destination of more than one dataset",
                    dataset.table
                )));
            }
        }
        Ok(())
    }

    /// Datasets to run, in configured order. An empty filter selects all.
    pub fn select(&self, names: &[String]) -> Result<Vec<DatasetConfig>> {
        if names.is_empty() {
            return Ok(self.datasets.clone());
        }
        for name in names {
            if !self.datasets.iter().any(|d| &d.name == name) {
                return Err(SheetSyncError::invalid_input(format!("Unknown dataset: {}", name)));
            }
        }
        Ok(self
            .datasets
            .iter()
            .filter(|d| names.contains(&d.name))
            .cloned()
            .collect())
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }
}
