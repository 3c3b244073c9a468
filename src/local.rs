//! Source reader over local CSV exports of the sheets

use crate::config::DatasetConfig;
use crate::error::{Result, SheetSyncError};
use crate::source::SourceReader;
use crate::table::RemoteTable;
use duckdb::Connection;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads `<dir>/<sheet name>.csv` and applies the dataset's range to it.
///
/// DuckDB's CSV reader skips blank lines in multi-column files, so they are
/// located separately and put back as empty rows to keep A1 row numbers
/// aligned with the sheet.
pub struct LocalExportReader {
    dir: PathBuf,
}

impl LocalExportReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the export for a sheet (surrounding whitespace of the sheet
    /// name is not part of the file name)
    pub fn export_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet.trim()))
    }

    /// Load the whole CSV as text cells without header inference
    fn load_grid(&self, path: &Path, sheet: &str) -> Result<Vec<Vec<String>>> {
        if !path.is_file() {
            return Err(SheetSyncError::source_unavailable(
                sheet,
                format!("export not found: {}", path.display()),
            ));
        }

        let connection = Connection::open_in_memory()
            .map_err(|e| SheetSyncError::source_unavailable(sheet, e))?;

        let path_str = path.to_string_lossy().replace('\'', "''");
        let create_view_sql = format!(
            "CREATE VIEW export_view AS SELECT * FROM read_csv('{}', header = false, all_varchar = true, null_padding = true)",
            path_str
        );
        connection
            .execute_batch(&create_view_sql)
            .map_err(|e| self.convert_duckdb_error(e, path, sheet))?;

        let column_count = {
            let mut describe = connection
                .prepare("DESCRIBE export_view")
                .map_err(|e| SheetSyncError::source_unavailable(sheet, e))?;
            let names = describe
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| SheetSyncError::source_unavailable(sheet, e))?;
            let mut count = 0usize;
            for name in names {
                name.map_err(|e| SheetSyncError::source_unavailable(sheet, e))?;
                count += 1;
            }
            count
        };

        let mut stmt = connection
            .prepare("SELECT * FROM export_view")
            .map_err(|e| SheetSyncError::source_unavailable(sheet, e))?;
        let rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value: Option<String> = row.get(i)?;
                    cells.push(value.unwrap_or_default());
                }
                Ok(cells)
            })
            .map_err(|e| self.convert_duckdb_error(e, path, sheet))?;

        let mut grid = Vec::new();
        for row in rows {
            grid.push(row.map_err(|e| self.convert_duckdb_error(e, path, sheet))?);
        }

        let content = fs::read(path).map_err(|e| SheetSyncError::source_unavailable(sheet, e))?;
        restore_blank_lines(&mut grid, &scan_records(&content));
        Ok(grid)
    }

    /// Turn DuckDB CSV failures into source errors with a readable message
    fn convert_duckdb_error(&self, error: duckdb::Error, path: &Path, sheet: &str) -> SheetSyncError {
        let error_msg = error.to_string();
        let message = if error_msg.contains("CSV Error") || error_msg.contains("Invalid CSV") {
            format!("malformed CSV '{}': {}", path.display(), error_msg)
        } else if error_msg.contains("Permission denied") {
            format!("permission denied reading '{}'", path.display())
        } else if error_msg.contains("UTF-8") || error_msg.contains("encoding") {
            format!("encoding error in '{}': {}", path.display(), error_msg)
        } else {
            error_msg
        };
        SheetSyncError::source_unavailable(sheet, message)
    }
}

/// Line structure of a CSV file, quoted newlines excluded
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RecordScan {
    /// Record positions of blank lines (blank lines count as records)
    pub blank_lines: Vec<usize>,
    /// Total records, blank lines included
    pub records: usize,
}

/// Find blank lines and count records outside quoted fields
pub fn scan_records(content: &[u8]) -> RecordScan {
    let mut scan = RecordScan::default();
    let mut in_quotes = false;
    let mut line_len = 0usize;

    for &byte in content {
        match byte {
            b'"' => {
                in_quotes = !in_quotes;
                line_len += 1;
            }
            b'\n' if !in_quotes => {
                if line_len == 0 {
                    scan.blank_lines.push(scan.records);
                }
                scan.records += 1;
                line_len = 0;
            }
            b'\r' if !in_quotes => {}
            _ => line_len += 1,
        }
    }
    if line_len > 0 {
        scan.records += 1;
    }
    scan
}

/// Put back the blank lines DuckDB skipped.
///
/// Multi-column files lose their blank lines while single-column files keep
/// them as a null row, so rows are only inserted when the grid is short.
fn restore_blank_lines(grid: &mut Vec<Vec<String>>, scan: &RecordScan) {
    if grid.len() >= scan.records {
        return;
    }
    for &position in &scan.blank_lines {
        if position > grid.len() {
            break;
        }
        grid.insert(position, Vec::new());
    }
}

impl SourceReader for LocalExportReader {
    fn fetch(&self, dataset: &DatasetConfig) -> Result<RemoteTable> {
        let path = self.export_path(&dataset.sheet);
        log::info!("Reading export {} for sheet '{}'...", path.display(), dataset.sheet);

        let grid = if std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(false) {
            Vec::new()
        } else {
            self.load_grid(&path, &dataset.sheet)?
        };

        log::info!("Fetching data range {} from the export...", dataset.range);
        RemoteTable::from_grid(&dataset.sheet, &dataset.range, dataset.range.slice_grid(&grid))
    }

    fn describe(&self) -> String {
        format!("local exports in {}", self.dir.display())
    }
}
