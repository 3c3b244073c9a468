//! Sequenced execution of all configured datasets

use crate::config::DatasetConfig;
use crate::error::{Result, SheetSyncError};
use crate::reconcile::{Reconciler, RunMode, SyncOutcome};
use crate::source::SourceReader;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fail unless `name` is set to a non-empty value
pub fn check_precondition(name: &str) -> Result<()> {
    check_trigger(name, std::env::var(name).ok().as_deref())
}

/// Validate the value read for the trigger variable `name`
pub fn check_trigger(name: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) if !value.trim().is_empty() => {
            log::info!("{} is set", name);
            Ok(())
        }
        _ => {
            let err = SheetSyncError::precondition_missing(name);
            log::error!("{}", err);
            Err(err)
        }
    }
}

/// Summary of one invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub run_id: Uuid,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub outcomes: Vec<SyncOutcome>,
}

impl JobReport {
    pub fn tables_written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.wrote_table()).count()
    }
}

/// Runs datasets one after another, stopping at the first failure
pub struct JobRunner<'a, S: SourceReader + ?Sized> {
    source: &'a S,
    connection: &'a str,
    trigger_env: &'a str,
    mode: RunMode,
    show_progress: bool,
}

impl<'a, S: SourceReader + ?Sized> JobRunner<'a, S> {
    pub fn new(source: &'a S, connection: &'a str, trigger_env: &'a str) -> Self {
        Self {
            source,
            connection,
            trigger_env,
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

    /// Check the trigger variable, then run every dataset in order.
    ///
    /// Nothing is fetched or opened when the precondition fails. The first
    /// failing dataset aborts the remaining ones.
    pub fn run(&self, datasets: &[DatasetConfig]) -> Result<JobReport> {
        check_precondition(self.trigger_env)?;

        let run_id = Uuid::new_v4();
        let started = Utc::now();
        log::info!("Starting sync run {} for {} datasets", run_id, datasets.len());

        let reconciler = Reconciler::new(self.source, self.connection)
            .mode(self.mode)
            .show_progress(self.show_progress);

        let mut outcomes = Vec::with_capacity(datasets.len());
        for (idx, dataset) in datasets.iter().enumerate() {
            match reconciler.run(dataset) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    let skipped: Vec<&str> = datasets[idx + 1..].iter().map(|d| d.name.as_str()).collect();
                    if !skipped.is_empty() {
                        log::error!("Run {} aborted; skipping {}", run_id, skipped.join(", "));
                    }
                    return Err(e);
                }
            }
        }

        let report = JobReport {
            run_id,
            started,
            finished: Utc::now(),
            outcomes,
        };
        log::info!(
            "Sync run {} finished: {} datasets, {} tables written",
            run_id,
            report.outcomes.len(),
            report.tables_written()
        );
        Ok(report)
    }
}
