//! Local durable key-value slot.
//!
//! The note store persists its whole collection as one string under a fixed
//! key. Any string-keyed store that survives restarts will do; this module
//! provides a SQLite-backed one for real use and an in-memory one for tests
//! and ephemeral sessions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{MemoryError, MemoryResult};

/// A durable string-keyed slot.
pub trait KeyValueStore: Send {
    /// Read the value stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> MemoryResult<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> MemoryResult<()>;
}

/// SQLite-backed key-value slot
pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
    /// Open (or create) the slot at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> MemoryResult<Self> {
        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let store = Self { conn };
        store.init_database()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> MemoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_database()?;
        Ok(store)
    }

    fn init_database(&self) -> MemoryResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> MemoryResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> MemoryResult<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, strftime('%s', 'now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-memory key-value slot.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the store wrote. `set_failing(true)` makes every write fail, simulating a
/// full disk or exceeded quota.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyValueStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MemoryResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| MemoryError::storage("in-memory slot poisoned"))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> MemoryResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> MemoryResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MemoryError::storage("quota exceeded"));
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
