//! Integration tests for single-dataset reconciliation against a DuckDB file

use crate::common::{dataset, sample_data, table, ScriptedSource, TestFixture};
use sheetsync::diff::ChangeReason;
use sheetsync::{Reconciler, RunMode, SheetSyncError, SyncAction};

const SHEET: &str = "Teachers Data";
const TABLE: &str = "Teachers_data";

#[test]
fn test_bootstrap_creates_table_from_header() {
    let fixture = TestFixture::new().unwrap();
    let source = ScriptedSource::new();
    source.set(SHEET, table(&sample_data::teachers()));

    let outcome = Reconciler::new(&source, &fixture.connection())
        .run(&dataset("teachers", SHEET, "A1:C4", TABLE))
        .unwrap();

    assert_eq!(outcome.action, SyncAction::Bootstrapped);
    assert_eq!(outcome.reason, ChangeReason::Bootstrap);
    assert_eq!(outcome.fetched_rows, 3);
    assert_eq!(outcome.columns, 3);
    assert_eq!(outcome.rows_written, 3);

    let snapshot = fixture.read_table(TABLE).unwrap();
    assert_eq!(snapshot.columns, vec!["id", "name", "subject"]);
    fixture.assert_table_rows(TABLE, &sample_data::teachers()[1..]);
}

#[test]
fn test_changed_row_triggers_full_rewrite() {
    let fixture = TestFixture::new().unwrap();
    let source = ScriptedSource::new();
    let connection = fixture.connection();
    let reconciler = Reconciler::new(&source, &connection);
    let teachers = dataset("teachers", SHEET, "A1:C4", TABLE);

    source.set(SHEET, table(&sample_data::teachers()));
    reconciler.run(&teachers).unwrap();

    source.set(SHEET, table(&sample_data::teachers_updated()));
    let outcome = reconciler.run(&teachers).unwrap();

    assert_eq!(outcome.action, SyncAction::Rewritten);
    assert_eq!(outcome.reason, ChangeReason::RowsChanged);
    assert_eq!(outcome.changed_rows, 1);
    assert_eq!(outcome.stale_rows, 1);
    assert_eq!(outcome.rows_written, 3);

    // Old "Math" row is gone, not appended alongside
    fixture.assert_table_rows(TABLE, &sample_data::teachers_updated()[1..]);
}

#[test]
fn test_removed_row_is_kept_by_default() {
    let fixture = TestFixture::new().unwrap();
    let source = ScriptedSource::new();
    let connection = fixture.connection();
    let reconciler = Reconciler::new(&source, &connection);
    let teachers = dataset("teachers", SHEET, "A1:C4", TABLE);

    source.set(SHEET, table(&sample_data::teachers()));
    reconciler.run(&teachers).unwrap();

    source.set(SHEET, table(&sample_data::teachers_row_removed()));
    let outcome = reconciler.run(&teachers).unwrap();

    assert_eq!(outcome.action, SyncAction::Unchanged);
    assert_eq!(outcome.stale_rows, 1);
    fixture.assert_table_rows(TABLE, &sample_data::teachers()[1..]);
}

#[test]
fn test_removed_row_with_rewrite_on_removal() {
    let fixture = TestFixture::new().unwrap();
    let source = ScriptedSource::new();
    let connection = fixture.connection();
    let reconciler = Reconciler::new(&source, &connection);
    let mut teachers = dataset("teachers", SHEET, "A1:C4", TABLE);
    teachers.rewrite_on_removal = true;

    source.set(SHEET, table(&sample_data::teachers()));
    reconciler.run(&teachers).unwrap();

    source.set(SHEET, table(&sample_data::teachers_row_removed()));
    let outcome = reconciler.run(&teachers).unwrap();

    assert_eq!(outcome.action, SyncAction::Rewritten);
    assert_eq!(outcome.reason, ChangeReason::Unchanged);
    assert_eq!(outcome.rows_written, 2);
    fixture.assert_table_rows(TABLE, &sample_data::teachers_row_removed()[1..]);
}

#[test]
fn test_dry_run_reports_without_writing() {
    let fixture = TestFixture::new().unwrap();
    let source = ScriptedSource::new();
    let teachers = dataset("teachers", SHEET, "A1:C4", TABLE);

    source.set(SHEET, table(&sample_data::teachers()));
    Reconciler::new(&source, &fixture.connection()).run(&teachers).unwrap();

    source.set(SHEET, table(&sample_data::teachers_updated()));
    let outcome = Reconciler::new(&source, &fixture.connection())
        .mode(RunMode::DryRun)
        .run(&teachers)
        .unwrap();

    assert_eq!(outcome.action, SyncAction::WouldRewrite);
    assert_eq!(outcome.changed_rows, 1);
    assert_eq!(outcome.rows_written, 0);
    assert!(!outcome.wrote_table());
    fixture.assert_table_rows(TABLE, &sample_data::teachers()[1..]);
}

#[test]
fn test_existing_empty_table_is_bootstrapped() {
    let fixture = TestFixture::new().unwrap();
    let conn = duckdb::Connection::open(fixture.db_path()).unwrap();
    conn.execute_batch("CREATE TABLE \"Teachers_data\" (\"id\" VARCHAR, \"name\" VARCHAR, \"subject\" VARCHAR);")
        .unwrap();
    drop(conn);

    let source = ScriptedSource::new();
    source.set(SHEET, table(&sample_data::teachers()));
    let outcome = Reconciler::new(&source, &fixture.connection())
        .run(&dataset("teachers", SHEET, "A1:C4", TABLE))
        .unwrap();

    assert_eq!(outcome.action, SyncAction::Bootstrapped);
    fixture.assert_table_rows(TABLE, &sample_data::teachers()[1..]);
}

#[test]
fn test_unreachable_destination_is_persistence_error() {
    let fixture = TestFixture::new().unwrap();
    let source = ScriptedSource::new();
    source.set(SHEET, table(&sample_data::teachers()));

    let bad_connection = fixture.root().join("missing_dir").join("sync.duckdb");
    let err = Reconciler::new(&source, &bad_connection.to_string_lossy())
        .run(&dataset("teachers", SHEET, "A1:C4", TABLE))
        .unwrap_err();

    assert!(matches!(err, SheetSyncError::Persistence { .. }));
    assert_eq!(source.fetch_count(), 1);
}
