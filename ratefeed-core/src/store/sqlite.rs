//! SQLite rate store.
//!
//! Each insert runs in its own transaction: a batch lands whole or not at all,
//! while separate batches stay independent.

use super::{validate_table_name, RateRecord, RateStore, StoreError};
use rusqlite::{params, Connection};
use std::path::Path;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure `table` exists.
    pub fn open(path: &Path, table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connection(format!("{}: {e}", path.display())))?;
        let store = Self { conn };
        store.ensure_table(table)?;
        tracing::info!(path = %path.display(), table, "opened sqlite rate store");
        Ok(store)
    }

    /// In-memory database, for tests.
    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let store = Self { conn };
        store.ensure_table(table)?;
        Ok(store)
    }

    pub fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        validate_table_name(table)?;
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pair TEXT NOT NULL,
                rate REAL NOT NULL,
                timestamp TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_pair_ts ON {table} (pair, timestamp);"
        ))?;
        Ok(())
    }

    /// Row count, optionally for a single pair.
    pub fn count(&self, table: &str, pair: Option<&str>) -> Result<usize, StoreError> {
        validate_table_name(table)?;
        let n: i64 = match pair {
            Some(pair) => self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE pair = ?1"),
                params![pair],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?,
        };
        Ok(n as usize)
    }

    /// Rows for a pair in insertion order.
    pub fn load(&self, table: &str, pair: &str) -> Result<Vec<RateRecord>, StoreError> {
        validate_table_name(table)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT pair, rate, timestamp FROM {table} WHERE pair = ?1 ORDER BY id"
        ))?;
        let rows = stmt
            .query_map(params![pair], |row| {
                Ok(RateRecord {
                    pair: row.get(0)?,
                    rate: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl RateStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn insert(&self, table: &str, rows: &[RateRecord]) -> Result<(), StoreError> {
        validate_table_name(table)?;
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {table} (pair, rate, timestamp) VALUES (?1, ?2, ?3)"
            ))?;
            for row in rows {
                stmt.execute(params![row.pair, row.rate, row.timestamp])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
