//! Snapshot persistence in DuckDB / MotherDuck

use crate::error::{Result, SheetSyncError};
use crate::progress::ProgressReporter;
use crate::table::{RemoteTable, Snapshot};
use duckdb::{AccessMode, Config, Connection};

/// Connection string that opens a throwaway in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// One open database connection holding the synchronized tables
#[derive(Debug)]
pub struct SnapshotStore {
    connection: Connection,
    target: String,
}

impl SnapshotStore {
    /// Open a connection. `:memory:` is in-memory; anything else (a file path
    /// or a `md:` MotherDuck target) is handed to DuckDB as is.
    pub fn open(connection_string: &str) -> Result<Self> {
        let connection = if connection_string == IN_MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(connection_string)
        }
        .map_err(|e| SheetSyncError::persistence(connection_string, format!("failed to connect: {}", e)))?;

        Ok(Self {
            connection,
            target: connection_string.to_string(),
        })
    }

    /// Open an existing database without write access. A missing database
    /// file is an error rather than being created. `:memory:` has nothing to
    /// protect and opens as usual.
    pub fn open_read_only(connection_string: &str) -> Result<Self> {
        if connection_string == IN_MEMORY {
            return Self::open(connection_string);
        }

        let connection = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .and_then(|config| Connection::open_with_flags(connection_string, config))
            .map_err(|e| SheetSyncError::persistence(connection_string, format!("failed to connect: {}", e)))?;

        Ok(Self {
            connection,
            target: connection_string.to_string(),
        })
    }

    /// Connection string this store was opened with
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Check whether a table exists in the current database and schema
    pub fn exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self
            .connection
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables
                 WHERE table_catalog = current_database()
                   AND table_schema = current_schema()
                   AND table_name = ?",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| SheetSyncError::persistence(table, e))?;
        Ok(count > 0)
    }

    /// Column names of a table in ordinal order
    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .connection
            .prepare(
                "SELECT column_name FROM information_schema.columns
                 WHERE table_catalog = current_database()
                   AND table_schema = current_schema()
                   AND table_name = ?
                 ORDER BY ordinal_position",
            )
            .map_err(|e| SheetSyncError::persistence(table, e))?;

        let rows = stmt
            .query_map([table], |row| row.get::<_, String>(0))
            .map_err(|e| SheetSyncError::persistence(table, e))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row.map_err(|e| SheetSyncError::persistence(table, e))?);
        }
        Ok(columns)
    }

    /// Read the whole table; an absent table yields an empty snapshot
    pub fn read_all(&self, table: &str) -> Result<Snapshot> {
        if !self.exists(table)? {
            return Ok(Snapshot::absent());
        }

        let columns = self.columns(table)?;
        if columns.is_empty() {
            return Ok(Snapshot::absent());
        }

        let select_list = columns
            .iter()
            .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM {}", select_list, quote_ident(table));

        let mut stmt = self
            .connection
            .prepare(&sql)
            .map_err(|e| SheetSyncError::persistence(table, e))?;

        let column_count = columns.len();
        let rows = stmt
            .query_map([], |row| {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value: Option<String> = row.get(i)?;
                    values.push(value.unwrap_or_default());
                }
                Ok(values)
            })
            .map_err(|e| SheetSyncError::persistence(table, e))?;

        let mut data = Vec::new();
        for row in rows {
            data.push(row.map_err(|e| SheetSyncError::persistence(table, e))?);
        }

        Ok(Snapshot { columns, rows: data })
    }

    /// Drop and recreate `table` from `remote`, inserting every row in order.
    ///
    /// Runs in a single transaction: on any failure the previous table is
    /// left as it was.
    pub fn replace(
        &mut self,
        table: &str,
        remote: &RemoteTable,
        progress: &mut ProgressReporter,
    ) -> Result<usize> {
        let tx = self
            .connection
            .transaction()
            .map_err(|e| SheetSyncError::persistence(table, e))?;

        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(table)))
            .map_err(|e| SheetSyncError::persistence(table, format!("drop failed: {}", e)))?;
        log::debug!("Dropped table {} (if present)", table);

        tx.execute_batch(&create_table_sql(table, &remote.header))
            .map_err(|e| SheetSyncError::persistence(table, format!("create failed: {}", e)))?;
        log::debug!("Created table {} with {} columns", table, remote.column_count());

        progress.start_inserts(remote.row_count() as u64);
        let mut inserted = 0usize;
        {
            let mut stmt = tx
                .prepare(&insert_sql(table, remote.column_count()))
                .map_err(|e| SheetSyncError::persistence(table, e))?;

            for (idx, row) in remote.rows.iter().enumerate() {
                stmt.execute(duckdb::params_from_iter(row.iter()))
                    .map_err(|e| {
                        SheetSyncError::persistence(table, format!("insert of row {} failed: {}", idx + 1, e))
                    })?;
                inserted += 1;
                progress.inc_inserts(1);
            }
        }

        tx.commit()
            .map_err(|e| SheetSyncError::persistence(table, format!("commit failed: {}", e)))?;
        progress.finish_inserts(&format!("Inserted {} rows into {}", inserted, table));

        Ok(inserted)
    }

    /// Release the connection
    pub fn close(self) -> Result<()> {
        let target = self.target;
        self.connection
            .close()
            .map_err(|(_, e)| SheetSyncError::persistence(target, format!("close failed: {}", e)))
    }
}

/// Quote an identifier for DuckDB
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` statement with one VARCHAR column per header entry
pub fn create_table_sql(table: &str, header: &[String]) -> String {
    let columns_sql = header
        .iter()
        .map(|col| format!("{} VARCHAR", quote_ident(col)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({});", quote_ident(table), columns_sql)
}

fn insert_sql(table: &str, column_count: usize) -> String {
    let placeholders = vec!["?"; column_count].join(", ");
    format!("INSERT INTO {} VALUES ({})", quote_ident(table), placeholders)
}
