//! One dataset's fetch → compare → rewrite cycle

use crate::config::DatasetConfig;
use crate::diff::{detect_changes, ChangeReason, ChangeSet};
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::source::SourceReader;
use crate::store::SnapshotStore;
use crate::table::{RemoteTable, Snapshot};
use serde::{Deserialize, Serialize};

/// What a run did to the destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Table was absent or empty and has been populated
    Bootstrapped,
    /// Changes were found and the table was rebuilt
    Rewritten,
    /// Nothing changed; the table was not touched
    Unchanged,
    /// Dry run: the table would have been rebuilt
    WouldRewrite,
}

/// Result of one dataset run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub dataset: String,
    pub table: String,
    pub action: SyncAction,
    pub reason: ChangeReason,
    pub fetched_rows: usize,
    pub columns: usize,
    pub changed_rows: usize,
    pub stale_rows: usize,
    pub rows_written: usize,
}

impl SyncOutcome {
    pub fn wrote_table(&self) -> bool {
        matches!(self.action, SyncAction::Bootstrapped | SyncAction::Rewritten)
    }
}

/// Whether the destination is written or only compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Apply,
    DryRun,
}

/// Runs datasets against one source and one destination connection string.
///
/// A fresh connection is opened for every run and closed before `run`
/// returns, whether the run succeeded or not.
pub struct Reconciler<'a, S: SourceReader + ?Sized> {
    source: &'a S,
    connection: &'a str,
    mode: RunMode,
    show_progress: bool,
}

impl<'a, S: SourceReader + ?Sized> Reconciler<'a, S> {
    pub fn new(source: &'a S, connection: &'a str) -> Self {
        Self {
            source,
            connection,
            mode: RunMode::Apply,
            show_progress: false,
        }
    }

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Synchronize one dataset. Failures are logged before being returned.
    pub fn run(&self, dataset: &DatasetConfig) -> Result<SyncOutcome> {
        let result = self.run_inner(dataset);
        if let Err(e) = &result {
            log::error!("[{}] Error occurred: {}", dataset.name, e);
        }
        result
    }

    fn run_inner(&self, dataset: &DatasetConfig) -> Result<SyncOutcome> {
        let mut progress = if self.show_progress {
            ProgressReporter::new_for_sync(&dataset.name)
        } else {
            ProgressReporter::new_minimal()
        };

        // Fetch before touching the database
        log::info!(
            "[{}] Fetching {} from '{}' via {}",
            dataset.name,
            dataset.range,
            dataset.sheet,
            self.source.describe()
        );
        let remote = self.source.fetch(dataset)?;
        progress.finish_fetch(&format!("Fetched {} rows", remote.row_count()));
        log::info!(
            "[{}] Data fetched: {} rows, {} columns",
            dataset.name,
            remote.row_count(),
            remote.column_count()
        );

        log::info!("[{}] Connecting to {}...", dataset.name, self.connection);
        let mut store = SnapshotStore::open(self.connection)?;

        let outcome = self.reconcile(&mut store, dataset, &remote, &mut progress);

        let closed = store.close();
        match (&outcome, closed) {
            (Ok(_), Err(e)) => return Err(e),
            (Err(_), Err(e)) => log::warn!("[{}] Failed to close connection: {}", dataset.name, e),
            (_, Ok(())) => log::info!("[{}] Closed database connection.", dataset.name),
        }
        outcome
    }

    fn reconcile(
        &self,
        store: &mut SnapshotStore,
        dataset: &DatasetConfig,
        remote: &RemoteTable,
        progress: &mut ProgressReporter,
    ) -> Result<SyncOutcome> {
        log::info!("[{}] Checking if '{}' table exists...", dataset.name, dataset.table);
        let snapshot = store.read_all(&dataset.table)?;

        log::info!(
            "[{}] Comparing {} stored rows with {} fetched rows...",
            dataset.name,
            snapshot.row_count(),
            remote.row_count()
        );
        let changes = detect_changes(remote, &snapshot);
        log_changes(dataset, &snapshot, &changes);

        // Drift rebuilds even when the range holds only a header
        let needs_rewrite = snapshot.is_empty()
            || !changes.is_empty()
            || changes.reason == ChangeReason::SchemaDrift
            || (dataset.rewrite_on_removal && changes.stale_rows > 0);

        let mut outcome = SyncOutcome {
            dataset: dataset.name.clone(),
            table: dataset.table.clone(),
            action: SyncAction::Unchanged,
            reason: changes.reason,
            fetched_rows: remote.row_count(),
            columns: remote.column_count(),
            changed_rows: changes.len(),
            stale_rows: changes.stale_rows,
            rows_written: 0,
        };

        if !needs_rewrite {
            log::info!(
                "[{}] No changes detected in the sheet. Table '{}' remains unchanged.",
                dataset.name,
                dataset.table
            );
            return Ok(outcome);
        }

        if self.mode == RunMode::DryRun {
            log::info!(
                "[{}] Dry run: '{}' would be rebuilt with {} rows",
                dataset.name,
                dataset.table,
                remote.row_count()
            );
            outcome.action = SyncAction::WouldRewrite;
            return Ok(outcome);
        }

        log::info!(
            "[{}] Re-creating '{}' with {} rows...",
            dataset.name,
            dataset.table,
            remote.row_count()
        );
        outcome.rows_written = store.replace(&dataset.table, remote, progress)?;
        outcome.action = if snapshot.is_empty() {
            SyncAction::Bootstrapped
        } else {
            SyncAction::Rewritten
        };
        log::info!(
            "[{}] All rows successfully inserted into '{}'.",
            dataset.name,
            dataset.table
        );

        Ok(outcome)
    }
}

fn log_changes(dataset: &DatasetConfig, snapshot: &Snapshot, changes: &ChangeSet) {
    match changes.reason {
        ChangeReason::Bootstrap => log::info!(
            "[{}] No existing data in the database. Inserting all rows.",
            dataset.name
        ),
        ChangeReason::SchemaDrift => log::warn!(
            "[{}] Columns changed (added: {:?}, removed: {:?}, reordered: {}); rebuilding from {} stored rows",
            dataset.name,
            changes.schema.columns_added,
            changes.schema.columns_removed,
            changes.schema.reordered,
            snapshot.row_count()
        ),
        ChangeReason::RowsChanged => log::info!(
            "[{}] Detected {} new or updated rows in the sheet.",
            dataset.name,
            changes.len()
        ),
        ChangeReason::Unchanged => {}
    }

    if changes.reason != ChangeReason::SchemaDrift && changes.stale_rows > 0 {
        if dataset.rewrite_on_removal {
            log::info!(
                "[{}] {} stored rows no longer appear in the sheet",
                dataset.name,
                changes.stale_rows
            );
        } else {
            log::warn!(
                "[{}] {} stored rows no longer appear in the sheet; they are kept until the next rewrite",
                dataset.name,
                changes.stale_rows
            );
        }
    }
}
