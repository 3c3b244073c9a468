//! Edge case tests for cell values and table shapes

use crate::common::{dataset, table, ScriptedSource, TestFixture};
use sheetsync::diff::{detect_changes, fingerprint_row};
use sheetsync::range::CellRange;
use sheetsync::{Reconciler, RemoteTable, SheetSyncError, Snapshot, SyncAction};

const SHEET: &str = "Edge Cases";
const TABLE: &str = "edge_cases";

fn run_twice(data: &[Vec<&str>]) -> (TestFixture, SyncAction) {
    let fixture = TestFixture::new().unwrap();
    let source = ScriptedSource::new();
    source.set(SHEET, table(data));
    let connection = fixture.connection();
    let reconciler = Reconciler::new(&source, &connection);
    let ds = dataset("edge", SHEET, "A1:Z100", TABLE);

    reconciler.run(&ds).unwrap();
    let second = reconciler.run(&ds).unwrap().action;
    (fixture, second)
}

#[test]
fn test_unicode_values_round_trip() {
    let data = vec![
        vec!["id", "name", "description"],
        vec!["1", "Café", "Delicious café ☕"],
        vec!["2", "北京", "Beijing in Chinese 中文"],
        vec!["3", "🚀", "Rocket emoji as name"],
    ];
    let (fixture, second) = run_twice(&data);
    assert_eq!(second, SyncAction::Unchanged);
    fixture.assert_table_rows(TABLE, &data[1..]);
}

#[test]
fn test_whitespace_and_quotes_preserved() {
    let data = vec![
        vec!["id", "note"],
        vec!["1", "  padded  "],
        vec!["2", "say \"hi\""],
        vec!["3", "O'Brien; DROP TABLE x"],
    ];
    let (fixture, second) = run_twice(&data);
    assert_eq!(second, SyncAction::Unchanged);
    fixture.assert_table_rows(TABLE, &data[1..]);
}

#[test]
fn test_empty_cells_are_stable() {
    let data = vec![
        vec!["id", "score", "remark"],
        vec!["1", "", ""],
        vec!["2", "88", ""],
    ];
    let (_fixture, second) = run_twice(&data);
    assert_eq!(second, SyncAction::Unchanged);
}

#[test]
fn test_numeric_looking_text_kept_verbatim() {
    let data = vec![
        vec!["id", "score", "date"],
        vec!["007", "1.50", "01/02/2024"],
        vec!["8", "1e3", "2024-02-01"],
    ];
    let (fixture, _) = run_twice(&data);
    fixture.assert_table_rows(TABLE, &data[1..]);
}

#[test]
fn test_quoted_identifiers() {
    let data = vec![
        vec!["Student Name", "select", "Score \"%\""],
        vec!["Ada", "yes", "99"],
    ];
    let (fixture, second) = run_twice(&data);
    assert_eq!(second, SyncAction::Unchanged);
    let snapshot = fixture.read_table(TABLE).unwrap();
    assert_eq!(snapshot.columns, vec!["Student Name", "select", "Score \"%\""]);
}

#[test]
fn test_header_only_table() {
    let fixture = TestFixture::new().unwrap();
    let source = ScriptedSource::new();
    source.set(SHEET, table(&[vec!["id", "name"]]));

    let outcome = Reconciler::new(&source, &fixture.connection())
        .run(&dataset("edge", SHEET, "A1:B5", TABLE))
        .unwrap();

    assert_eq!(outcome.action, SyncAction::Bootstrapped);
    assert_eq!(outcome.rows_written, 0);
    let snapshot = fixture.read_table(TABLE).unwrap();
    assert_eq!(snapshot.columns, vec!["id", "name"]);
    assert!(snapshot.rows.is_empty());
}

#[test]
fn test_duplicate_rows_do_not_count_twice() {
    let remote = table(&[vec!["a"], vec!["x"], vec!["x"], vec!["y"]]);
    let snapshot = Snapshot {
        columns: vec!["a".to_string()],
        rows: vec![vec!["x".to_string()]],
    };
    let changes = detect_changes(&remote, &snapshot);
    assert_eq!(changes.changed_rows, vec![2]);
}

#[test]
fn test_cell_boundaries_are_part_of_the_tuple() {
    let left = vec!["ab".to_string(), "c".to_string()];
    let right = vec!["a".to_string(), "bc".to_string()];
    assert_ne!(fingerprint_row(&left), fingerprint_row(&right));
}

fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect()
}

#[test]
fn test_grid_shapes() {
    let range = CellRange::parse("A1:C3").unwrap();

    // Short rows are padded
    let padded = RemoteTable::from_grid(SHEET, &range, grid(&[&["a", "b", "c"], &["1"]])).unwrap();
    assert_eq!(padded.rows, vec![vec!["1", "", ""]]);

    // Long rows are malformed
    let err = RemoteTable::from_grid(SHEET, &range, grid(&[&["a", "b"], &["1", "2", "3"]])).unwrap_err();
    assert!(matches!(err, SheetSyncError::MalformedTable { .. }));

    // Gaps in the header are malformed
    let err = RemoteTable::from_grid(SHEET, &range, grid(&[&["a", "", "c"]])).unwrap_err();
    assert!(matches!(err, SheetSyncError::MalformedTable { .. }));

    // Nothing at all is an empty range
    let err = RemoteTable::from_grid(SHEET, &range, Vec::new()).unwrap_err();
    assert!(matches!(err, SheetSyncError::RangeEmpty { .. }));
}

#[test]
fn test_large_sheet() {
    let fixture = TestFixture::new().unwrap();
    let source = ScriptedSource::new();
    let header: Vec<String> = (0..33).map(|c| format!("col_{}", c)).collect();
    let rows: Vec<Vec<String>> = (0..400)
        .map(|r| (0..33).map(|c| format!("value_{}_{}", r, c)).collect())
        .collect();
    source.set(SHEET, RemoteTable { header, rows });

    let connection = fixture.connection();
    let reconciler = Reconciler::new(&source, &connection);
    let ds = dataset("edge", SHEET, "A1:AG401", TABLE);

    assert_eq!(reconciler.run(&ds).unwrap().rows_written, 400);
    assert_eq!(reconciler.run(&ds).unwrap().action, SyncAction::Unchanged);
}
