//! SQLite-backed store, one database file per actor instance.

use super::DurableStore;
use crate::error::{StorageError, StorageResult};
use durocache_types::Timestamp;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// A [`DurableStore`] persisted in SQLite.
///
/// Entries live in a `kv` table; the alarm lives in a single-row `alarm` table
/// so that it survives restarts together with the data it guards.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens or creates a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // journal_mode returns the resulting mode as a row
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl DurableStore for SqliteStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(changed > 0)
    }

    fn delete_many(&self, keys: &[String]) -> StorageResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM kv WHERE key = ?1")?;
            for key in keys {
                removed += stmt.execute(params![key])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn list_prefix(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM kv WHERE substr(key, 1, ?2) = ?1 ORDER BY key LIMIT ?3",
        )?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let rows = stmt
            .query_map(
                params![prefix, prefix.chars().count() as i64, limit],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM kv WHERE substr(key, 1, ?2) = ?1",
            params![prefix, prefix.chars().count() as i64],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn get_alarm(&self) -> StorageResult<Option<Timestamp>> {
        let conn = self.lock()?;
        let at = conn
            .query_row("SELECT wake_at FROM alarm WHERE slot = 0", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(at)
    }

    fn set_alarm(&self, at: Timestamp) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO alarm (slot, wake_at) VALUES (0, ?1)",
            params![at],
        )?;
        Ok(())
    }

    fn delete_alarm(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM alarm WHERE slot = 0", [])?;
        Ok(())
    }
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY NOT NULL,
            value BLOB NOT NULL
        );

        CREATE TABLE IF NOT EXISTS alarm (
            slot INTEGER PRIMARY KEY CHECK (slot = 0),
            wake_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}
