//! # sheetsync
//!
//! Change-aware synchronization of spreadsheet ranges into DuckDB /
//! MotherDuck tables. Each dataset is fetched, compared row-by-row with the
//! stored table and rewritten only when something changed.

pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod diff;
pub mod error;
pub mod job;
pub mod local;
pub mod output;
pub mod progress;
pub mod range;
pub mod reconcile;
pub mod sheets;
pub mod source;
pub mod store;
pub mod table;

pub use config::{DatasetConfig, JobConfig};
pub use error::{Result, SheetSyncError};
pub use job::{JobReport, JobRunner};
pub use reconcile::{Reconciler, RunMode, SyncAction, SyncOutcome};
pub use source::SourceReader;
pub use store::SnapshotStore;
pub use table::{RemoteTable, Snapshot};
