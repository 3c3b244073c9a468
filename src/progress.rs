//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for sync runs
#[derive(Debug)]
pub struct ProgressReporter {
    pub fetch_pb: Option<ProgressBar>,
    pub insert_pb: Option<ProgressBar>,
    show_progress: bool,
}

impl ProgressReporter {
    /// Create progress reporter for a dataset run
    pub fn new_for_sync(dataset: &str) -> Self {
        Self {
            fetch_pb: Some(create_spinner(&format!("Fetching {}...", dataset))),
            insert_pb: None,
            show_progress: true,
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            fetch_pb: None,
            insert_pb: None,
            show_progress: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.show_progress
    }

    /// Finish the fetch spinner
    pub fn finish_fetch(&mut self, message: &str) {
        if let Some(pb) = self.fetch_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    /// Lazily create the insert bar once the row count is known
    pub fn start_inserts(&mut self, total_rows: u64) {
        self.finish_fetch("Fetched");
        if self.show_progress && self.insert_pb.is_none() {
            self.insert_pb = Some(create_progress_bar(total_rows, "Inserting rows"));
        }
    }

    pub fn inc_inserts(&mut self, rows: u64) {
        if let Some(pb) = &self.insert_pb {
            pb.inc(rows);
        }
    }

    pub fn finish_inserts(&mut self, message: &str) {
        if let Some(pb) = self.insert_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(pb) = self.fetch_pb.take() {
            pb.finish_and_clear();
        }
        if let Some(pb) = self.insert_pb.take() {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a progress bar with known total
fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} ({per_sec}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}
