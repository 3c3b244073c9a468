//! Change detection between a fetched table and the stored snapshot
//!
//! Rows are compared by their full value tuple. There is no key column: a row
//! counts as unchanged when an identical tuple exists anywhere in the
//! snapshot, regardless of position.

use crate::table::{RemoteTable, Snapshot};
use blake3::Hasher;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fingerprint of a full row tuple
pub type RowFingerprint = [u8; 32];

/// Why the change set contains the rows it does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    /// Nothing stored yet, every row is new
    Bootstrap,
    /// Stored columns differ from the fetched header
    SchemaDrift,
    /// At least one fetched tuple is missing from the snapshot
    RowsChanged,
    Unchanged,
}

/// Column-level differences between the snapshot and the fetched header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDrift {
    pub columns_added: Vec<String>,
    pub columns_removed: Vec<String>,
    pub reordered: bool,
}

impl SchemaDrift {
    pub fn has_changes(&self) -> bool {
        !self.columns_added.is_empty() || !self.columns_removed.is_empty() || self.reordered
    }
}

/// Rows of the fetched table that have no identical tuple in the snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    pub reason: ChangeReason,
    /// Indices into `RemoteTable::rows`
    pub changed_rows: Vec<usize>,
    /// Snapshot rows whose tuple no longer appears in the fetched table
    pub stale_rows: usize,
    pub schema: SchemaDrift,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed_rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changed_rows.len()
    }
}

/// Compute the change set of `remote` relative to `snapshot`
pub fn detect_changes(remote: &RemoteTable, snapshot: &Snapshot) -> ChangeSet {
    let all_rows: Vec<usize> = (0..remote.rows.len()).collect();

    if snapshot.is_empty() {
        return ChangeSet {
            reason: ChangeReason::Bootstrap,
            changed_rows: all_rows,
            stale_rows: 0,
            schema: detect_schema_drift(&snapshot.columns, &remote.header),
        };
    }

    let schema = detect_schema_drift(&snapshot.columns, &remote.header);
    if schema.has_changes() {
        return ChangeSet {
            reason: ChangeReason::SchemaDrift,
            changed_rows: all_rows,
            stale_rows: snapshot.row_count(),
            schema,
        };
    }

    let stored = fingerprint_set(&snapshot.rows);
    let remote_prints = fingerprint_rows(&remote.rows);

    let changed_rows: Vec<usize> = remote_prints
        .iter()
        .enumerate()
        .filter(|(_, print)| !stored.contains(*print))
        .map(|(idx, _)| idx)
        .collect();

    let fetched: HashSet<&RowFingerprint> = remote_prints.iter().collect();
    let stale_rows = fingerprint_rows(&snapshot.rows)
        .iter()
        .filter(|print| !fetched.contains(print))
        .count();

    ChangeSet {
        reason: if changed_rows.is_empty() {
            ChangeReason::Unchanged
        } else {
            ChangeReason::RowsChanged
        },
        changed_rows,
        stale_rows,
        schema,
    }
}

/// Compare column lists by name
pub fn detect_schema_drift(stored: &[String], fetched: &[String]) -> SchemaDrift {
    let stored_set: HashSet<&str> = stored.iter().map(String::as_str).collect();
    let fetched_set: HashSet<&str> = fetched.iter().map(String::as_str).collect();

    let columns_added = fetched
        .iter()
        .filter(|c| !stored_set.contains(c.as_str()))
        .cloned()
        .collect();
    let columns_removed = stored
        .iter()
        .filter(|c| !fetched_set.contains(c.as_str()))
        .cloned()
        .collect();

    // Relative order of the columns both sides share
    let shared_stored: Vec<&String> = stored.iter().filter(|c| fetched_set.contains(c.as_str())).collect();
    let shared_fetched: Vec<&String> = fetched.iter().filter(|c| stored_set.contains(c.as_str())).collect();

    SchemaDrift {
        columns_added,
        columns_removed,
        reordered: shared_stored != shared_fetched,
    }
}

/// Hash one row tuple. Cells are length-prefixed so that cell boundaries
/// are part of the fingerprint.
pub fn fingerprint_row(row: &[String]) -> RowFingerprint {
    let mut hasher = Hasher::new();
    hasher.update(&(row.len() as u64).to_le_bytes());
    for cell in row {
        hasher.update(&(cell.len() as u64).to_le_bytes());
        hasher.update(cell.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

fn fingerprint_rows(rows: &[Vec<String>]) -> Vec<RowFingerprint> {
    rows.par_iter().map(|row| fingerprint_row(row)).collect()
}

fn fingerprint_set(rows: &[Vec<String>]) -> HashSet<RowFingerprint> {
    rows.par_iter().map(|row| fingerprint_row(row)).collect()
}
