//! A1-notation cell ranges

use crate::error::{Result, SheetSyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A bounded rectangular range such as `A1:AG41`.
///
/// Columns are stored zero-based, rows one-based (as written in A1 notation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRange {
    pub start_col: u32,
    pub start_row: u32,
    pub end_col: u32,
    pub end_row: u32,
}

impl CellRange {
    /// Range from zero-based columns and one-based rows
    pub const fn new(start_col: u32, start_row: u32, end_col: u32, end_row: u32) -> Self {
        Self {
            start_col,
            start_row,
            end_col,
            end_row,
        }
    }

    /// Parse a range like `A1:K21` (letters are case-insensitive)
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (start, end) = trimmed
            .split_once(':')
            .ok_or_else(|| SheetSyncError::invalid_range(s, "expected START:END"))?;

        let (start_col, start_row) = parse_cell(start).map_err(|m| SheetSyncError::invalid_range(s, m))?;
        let (end_col, end_row) = parse_cell(end).map_err(|m| SheetSyncError::invalid_range(s, m))?;

        if start_col > end_col || start_row > end_row {
            return Err(SheetSyncError::invalid_range(
                s,
                "start cell must be above and left of end cell",
            ));
        }

        Ok(Self {
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    /// Number of columns covered by the range
    pub fn width(&self) -> usize {
        (self.end_col - self.start_col + 1) as usize
    }

    /// Number of rows covered by the range (header included)
    pub fn height(&self) -> usize {
        (self.end_row - self.start_row + 1) as usize
    }

    /// Cut this range out of a raw sheet grid (row-major, zero-based).
    ///
    /// Trailing empty cells of each row and trailing empty rows are dropped,
    /// which is what the Sheets values API does for the same range.
    pub fn slice_grid(&self, grid: &[Vec<String>]) -> Vec<Vec<String>> {
        let first_row = (self.start_row - 1) as usize;
        let first_col = self.start_col as usize;

        let mut rows: Vec<Vec<String>> = grid
            .iter()
            .skip(first_row)
            .take(self.height())
            .map(|row| {
                let mut cells: Vec<String> = row
                    .iter()
                    .skip(first_col)
                    .take(self.width())
                    .cloned()
                    .collect();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();

        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        rows
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_letters(self.start_col),
            self.start_row,
            column_letters(self.end_col),
            self.end_row
        )
    }
}

impl FromStr for CellRange {
    type Err = SheetSyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CellRange {
    type Error = SheetSyncError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<CellRange> for String {
    fn from(range: CellRange) -> Self {
        range.to_string()
    }
}

fn parse_cell(cell: &str) -> std::result::Result<(u32, u32), String> {
    let cell = cell.trim();
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| format!("cell '{}' has no row number", cell))?;
    let (letters, digits) = cell.split_at(split);

    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(format!("cell '{}' has no column letters", cell));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("cell '{}' has a malformed row number", cell));
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        let value = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        col = col
            .checked_mul(26)
            .and_then(|v| v.checked_add(value))
            .ok_or_else(|| format!("column '{}' is out of range", letters))?;
    }

    let row: u32 = digits
        .parse()
        .map_err(|_| format!("row '{}' is out of range", digits))?;
    if row == 0 {
        return Err("rows start at 1".to_string());
    }

    Ok((col - 1, row))
}

/// Zero-based column index to A1 letters (0 -> A, 26 -> AA)
pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}
