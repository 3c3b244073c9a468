//! Error types for sheetsync operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SheetSyncError>;

#[derive(Error, Debug)]
pub enum SheetSyncError {
    #[error("Precondition failed: environment variable {name} is missing or empty")]
    PreconditionMissing { name: String },

    #[error("Source unavailable for sheet '{sheet}': {message}")]
    SourceUnavailable { sheet: String, message: String },

    #[error("Range {range} of sheet '{sheet}' returned no rows")]
    RangeEmpty { sheet: String, range: String },

    #[error("Malformed table in sheet '{sheet}': {message}")]
    MalformedTable { sheet: String, message: String },

    #[error("Persistence error on table '{table}': {message}")]
    Persistence { table: String, message: String },

    #[error("Invalid cell range '{range}': {message}")]
    InvalidRange { range: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetSyncError {
    pub fn precondition_missing(name: impl Into<String>) -> Self {
        Self::PreconditionMissing { name: name.into() }
    }

    pub fn source_unavailable(sheet: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            sheet: sheet.into(),
            message: msg.to_string(),
        }
    }

    pub fn range_empty(sheet: impl Into<String>, range: impl Into<String>) -> Self {
        Self::RangeEmpty {
            sheet: sheet.into(),
            range: range.into(),
        }
    }

    pub fn malformed_table(sheet: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedTable {
            sheet: sheet.into(),
            message: msg.into(),
        }
    }

    pub fn persistence(table: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::Persistence {
            table: table.into(),
            message: msg.to_string(),
        }
    }

    pub fn invalid_range(range: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidRange {
            range: range.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Stable label used in run reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PreconditionMissing { .. } => "precondition_missing",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::RangeEmpty { .. } => "range_empty",
            Self::MalformedTable { .. } => "malformed_table",
            Self::Persistence { .. } => "persistence_error",
            Self::InvalidRange { .. } => "invalid_range",
            Self::Config { .. } => "config",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    /// Whether the failure happened while reading the source sheet
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::RangeEmpty { .. } | Self::MalformedTable { .. }
        )
    }
}
