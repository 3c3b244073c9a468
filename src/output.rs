//! Output formatting utilities

use crate::config::DatasetConfig;
use crate::error::Result;
use crate::job::JobReport;
use crate::reconcile::{SyncAction, SyncOutcome};
use crate::table::Snapshot;
use indexmap::IndexMap;
use serde::Serialize;

/// Pretty printer for sheetsync output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print the summary of a sync run
    pub fn print_job_report(report: &JobReport) {
        println!("🔄 Sync run {}", report.run_id);
        println!("├─ Started: {}", report.started.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("├─ Finished: {}", report.finished.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("└─ Datasets:");
        for (i, outcome) in report.outcomes.iter().enumerate() {
            let prefix = if i == report.outcomes.len() - 1 { "   └─" } else { "   ├─" };
            println!("{} {}", prefix, describe_outcome(outcome));
        }
    }

    /// Print configured datasets
    pub fn print_dataset_list(datasets: &[DatasetConfig]) {
        if datasets.is_empty() {
            println!("No datasets configured.");
            return;
        }

        println!("📋 Configured Datasets:");
        for (i, dataset) in datasets.iter().enumerate() {
            let prefix = if i == datasets.len() - 1 { "└─" } else { "├─" };
            println!(
                "{} {}: '{}' {} → {}{}",
                prefix,
                dataset.name,
                dataset.sheet,
                dataset.range,
                dataset.table,
                if dataset.rewrite_on_removal { " (rewrite on removal)" } else { "" }
            );
        }
    }

    /// Print the first `limit` rows of a stored table
    pub fn print_table_preview(table: &str, snapshot: &Snapshot, limit: usize) {
        if snapshot.columns.is_empty() {
            println!("Table '{}' does not exist.", table);
            return;
        }

        println!("📸 Table: {}", table);
        println!("├─ Rows: {}", snapshot.row_count());
        println!("├─ Columns: {}", snapshot.columns.join(", "));
        if snapshot.rows.is_empty() {
            println!("└─ (no rows)");
            return;
        }

        let shown = snapshot.rows.len().min(limit);
        println!("└─ First {} rows:", shown);
        for (i, row) in snapshot.rows.iter().take(shown).enumerate() {
            let prefix = if i == shown - 1 { "   └─" } else { "   ├─" };
            println!("{} {}", prefix, row.join(" | "));
        }
    }
}

/// One line per dataset outcome
pub fn describe_outcome(outcome: &SyncOutcome) -> String {
    match outcome.action {
        SyncAction::Bootstrapped => format!(
            "✅ {} → {}: created with {} rows",
            outcome.dataset, outcome.table, outcome.rows_written
        ),
        SyncAction::Rewritten => format!(
            "✅ {} → {}: {} changed rows, rebuilt with {} rows",
            outcome.dataset, outcome.table, outcome.changed_rows, outcome.rows_written
        ),
        SyncAction::Unchanged => format!(
            "➖ {} → {}: unchanged ({} rows)",
            outcome.dataset, outcome.table, outcome.fetched_rows
        ),
        SyncAction::WouldRewrite => format!(
            "🔍 {} → {}: would rebuild with {} rows ({} changed)",
            outcome.dataset, outcome.table, outcome.fetched_rows, outcome.changed_rows
        ),
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as pretty JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Table contents as a list of column → value objects, columns in
    /// table order
    pub fn format_table(table: &str, snapshot: &Snapshot, limit: usize) -> Result<String> {
        let rows: Vec<IndexMap<&str, &str>> = snapshot
            .rows
            .iter()
            .take(limit)
            .map(|row| {
                snapshot
                    .columns
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(String::as_str))
                    .collect()
            })
            .collect();

        let dump = TableDump {
            table,
            exists: !snapshot.columns.is_empty(),
            row_count: snapshot.row_count(),
            columns: &snapshot.columns,
            rows,
        };
        Ok(serde_json::to_string_pretty(&dump)?)
    }
}

#[derive(Serialize)]
struct TableDump<'a> {
    table: &'a str,
    exists: bool,
    row_count: usize,
    columns: &'a [String],
    rows: Vec<IndexMap<&'a str, &'a str>>,
}
