//! Common test utilities and helpers

use sheetsync::config::DatasetConfig;
use sheetsync::range::CellRange;
use sheetsync::{RemoteTable, Result, SheetSyncError, Snapshot, SnapshotStore, SourceReader};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// Test fixture holding a scratch directory with a DuckDB file and CSV exports
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        fs::create_dir_all(temp_dir.path().join("exports"))?;
        Ok(Self { temp_dir })
    }

    /// Get the root path of the test fixture
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Database file used as the destination connection
    pub fn db_path(&self) -> PathBuf {
        self.root().join("sync.duckdb")
    }

    pub fn connection(&self) -> String {
        self.db_path().to_string_lossy().into_owned()
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.root().join("exports")
    }

    /// Write `<exports>/<sheet>.csv`, quoting cells where needed
    pub fn write_export(&self, sheet: &str, data: &[Vec<&str>]) -> Result<PathBuf> {
        let path = self.exports_dir().join(format!("{}.csv", sheet.trim()));
        let mut content = String::new();
        for row in data {
            let cells: Vec<String> = row.iter().map(|cell| csv_cell(cell)).collect();
            content.push_str(&cells.join(","));
            content.push('\n');
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write an export with raw content
    pub fn write_export_raw(&self, sheet: &str, content: &str) -> Result<PathBuf> {
        let path = self.exports_dir().join(format!("{}.csv", sheet.trim()));
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write a JSON job configuration pointing at this fixture's database
    pub fn write_config(&self, trigger_env: &str, datasets: &[DatasetConfig]) -> Result<PathBuf> {
        let path = self.root().join("sheetsync.json");
        let config = serde_json::json!({
            "connection": self.connection(),
            "credentials_path": self.root().join("secret.json"),
            "trigger_env": trigger_env,
            "datasets": datasets,
        });
        fs::write(&path, serde_json::to_string_pretty(&config)?)?;
        Ok(path)
    }

    pub fn open_store(&self) -> Result<SnapshotStore> {
        SnapshotStore::open(&self.connection())
    }

    /// Read a stored table through a short-lived connection
    pub fn read_table(&self, table: &str) -> Result<Snapshot> {
        let store = self.open_store()?;
        let snapshot = store.read_all(table)?;
        store.close()?;
        Ok(snapshot)
    }

    /// Assert that the stored table holds exactly `rows` (in any order)
    pub fn assert_table_rows(&self, table: &str, rows: &[Vec<&str>]) {
        let snapshot = self.read_table(table).expect("Should read table");
        assertions::assert_same_rows(&snapshot.rows, rows);
    }
}

fn csv_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

enum Scripted {
    Table(RemoteTable),
    Down(String),
}

/// In-memory source whose answers are set per sheet by the test
pub struct ScriptedSource {
    answers: Mutex<HashMap<String, Scripted>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Serve `table` for `sheet` from now on
    pub fn set(&self, sheet: &str, table: RemoteTable) {
        self.answers
            .lock()
            .unwrap()
            .insert(sheet.to_string(), Scripted::Table(table));
    }

    /// Make `sheet` unavailable
    pub fn fail(&self, sheet: &str, message: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(sheet.to_string(), Scripted::Down(message.to_string()));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SourceReader for ScriptedSource {
    fn fetch(&self, dataset: &DatasetConfig) -> Result<RemoteTable> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.answers.lock().unwrap().get(&dataset.sheet) {
            Some(Scripted::Table(table)) => Ok(table.clone()),
            Some(Scripted::Down(message)) => Err(SheetSyncError::source_unavailable(&dataset.sheet, message)),
            None => Err(SheetSyncError::source_unavailable(&dataset.sheet, "spreadsheet not found")),
        }
    }

    fn describe(&self) -> String {
        "scripted source".to_string()
    }
}

/// Helper for running CLI commands against a fixture's config and exports
pub struct CliTestRunner {
    fixture: TestFixture,
    config: PathBuf,
}

impl CliTestRunner {
    pub fn new(trigger_env: &str, datasets: &[DatasetConfig]) -> Result<Self> {
        let fixture = TestFixture::new()?;
        let config = fixture.write_config(trigger_env, datasets)?;
        Ok(Self { fixture, config })
    }

    pub fn fixture(&self) -> &TestFixture {
        &self.fixture
    }

    /// Run a sheetsync command and return the result
    pub fn run_command(&self, args: &[&str]) -> Result<()> {
        use clap::Parser;
        use sheetsync::cli::Cli;
        use sheetsync::commands::{execute_command, Overrides};

        let config = self.config.to_string_lossy().into_owned();
        let exports = self.fixture.exports_dir().to_string_lossy().into_owned();

        // Build command line arguments
        let mut cmd_args = vec!["sheetsync", "--config", config.as_str(), "--csv-dir", exports.as_str()];
        cmd_args.extend(args);

        let cli = Cli::try_parse_from(cmd_args).map_err(|e| SheetSyncError::invalid_input(e.to_string()))?;
        let overrides = Overrides::from_cli(&cli);
        execute_command(cli.command, &overrides)
    }

    /// Run a command and expect it to succeed
    pub fn expect_success(&self, args: &[&str]) {
        self.run_command(args).expect("Command should succeed");
    }

    /// Run a command and expect it to fail
    pub fn expect_failure(&self, args: &[&str]) -> SheetSyncError {
        self.run_command(args).expect_err("Command should fail")
    }
}

/// Trigger variable that is present in every test process. Tests never
/// mutate the environment.
pub const PRESENT_TRIGGER: &str = "PATH";

/// Name of a trigger variable that is never set
pub fn unset_trigger_env(tag: &str) -> String {
    format!("SHEETSYNC_TEST_UNSET_{}", tag.to_uppercase())
}

pub fn dataset(name: &str, sheet: &str, range: &str, table: &str) -> DatasetConfig {
    DatasetConfig::new(name, sheet, CellRange::parse(range).unwrap(), table)
}

/// Build a table from string literals, first row is the header
pub fn table(data: &[Vec<&str>]) -> RemoteTable {
    let mut rows = data.iter().map(|row| row.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    RemoteTable {
        header: rows.next().unwrap_or_default(),
        rows: rows.collect(),
    }
}

/// Sample data generators for testing
pub mod sample_data {
    pub fn teachers() -> Vec<Vec<&'static str>> {
        vec![
            vec!["id", "name", "subject"],
            vec!["1", "Ada", "Math"],
            vec!["2", "Grace", "CS"],
            vec!["3", "Alan", "Logic"],
        ]
    }

    pub fn teachers_updated() -> Vec<Vec<&'static str>> {
        vec![
            vec!["id", "name", "subject"],
            vec!["1", "Ada", "Mathematics"], // Subject changed
            vec!["2", "Grace", "CS"],
            vec!["3", "Alan", "Logic"],
        ]
    }

    pub fn teachers_reordered() -> Vec<Vec<&'static str>> {
        vec![
            vec!["id", "name", "subject"],
            vec!["3", "Alan", "Logic"],
            vec!["1", "Ada", "Math"],
            vec!["2", "Grace", "CS"],
        ]
    }

    pub fn teachers_with_email() -> Vec<Vec<&'static str>> {
        vec![
            vec!["id", "name", "subject", "email"], // New column
            vec!["1", "Ada", "Math", "ada@school.test"],
            vec!["2", "Grace", "CS", "grace@school.test"],
            vec!["3", "Alan", "Logic", ""],
        ]
    }

    pub fn teachers_row_removed() -> Vec<Vec<&'static str>> {
        vec![
            vec!["id", "name", "subject"],
            vec!["1", "Ada", "Math"],
            vec!["2", "Grace", "CS"],
        ]
    }

    pub fn exams() -> Vec<Vec<&'static str>> {
        vec![
            vec!["student", "subject", "score"],
            vec!["S1", "Math", "78"],
            vec!["S2", "Math", "91"],
        ]
    }
}

/// Assertion helpers for test validation
pub mod assertions {
    /// Assert that two row collections hold the same tuples regardless of order
    pub fn assert_same_rows(actual: &[Vec<String>], expected: &[Vec<&str>]) {
        let mut actual: Vec<Vec<String>> = actual.to_vec();
        let mut expected: Vec<Vec<String>> = expected
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();
        actual.sort();
        expected.sort();
        assert_eq!(actual, expected, "Stored rows should match");
    }
}
