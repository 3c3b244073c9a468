//! In-memory table shapes shared by the source readers, the store and the differ

use crate::error::{Result, SheetSyncError};
use crate::range::CellRange;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Freshly fetched sheet data: a header plus text rows of the same width
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RemoteTable {
    /// Build a table from a raw cell grid whose first row is the header.
    ///
    /// Rows shorter than the header are padded with empty cells (the Sheets
    /// API drops trailing blanks); longer rows are rejected.
    pub fn from_grid(sheet: &str, range: &CellRange, grid: Vec<Vec<String>>) -> Result<Self> {
        let mut grid = grid.into_iter();
        let header = grid
            .next()
            .ok_or_else(|| SheetSyncError::range_empty(sheet, range.to_string()))?;

        if header.is_empty() {
            return Err(SheetSyncError::range_empty(sheet, range.to_string()));
        }

        let mut seen = HashSet::new();
        for (idx, name) in header.iter().enumerate() {
            if name.is_empty() {
                return Err(SheetSyncError::malformed_table(
                    sheet,
                    format!("header cell {} is empty", idx + 1),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(SheetSyncError::malformed_table(
                    sheet,
                    format!("duplicate column name '{}'", name),
                ));
            }
        }

        let width = header.len();
        let mut rows = Vec::new();
        for (idx, mut row) in grid.enumerate() {
            if row.len() > width {
                return Err(SheetSyncError::malformed_table(
                    sheet,
                    format!(
                        "row {} has {} cells but the header has {}",
                        idx + 2,
                        row.len(),
                        width
                    ),
                ));
            }
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { header, rows })
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Last-synchronized contents of a destination table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Snapshot {
    /// Snapshot of a table that does not exist
    pub fn absent() -> Self {
        Self::default()
    }

    /// True when there is nothing to compare against (absent or zero rows)
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
