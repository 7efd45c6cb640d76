//! Key-value persistence with per-key compare-and-swap.
//!
//! Entitlement and usage records are read-modify-written per user. The
//! backend contract is an atomic `get` plus a CAS-style `put_if`, so two
//! concurrent updates to the same user's record cannot silently lose one,
//! and no store-wide lock is ever taken.

use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use crate::error::StoreError;

/// Persistence boundary for per-user records.
pub trait KvBackend: Send + Sync {
    /// Read the current value for `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` only if the stored value still equals `expected`
    /// (`None` meaning the key must not exist yet). Returns false when the
    /// guard failed and the caller should re-read and retry.
    fn put_if(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool, StoreError>;
}

/// SQLite-backed store: WAL mode, a single `kv` table. The conditional
/// UPDATE/INSERT gives genuine compare-and-swap semantics per key.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open or create the database at `path`.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    /// In-memory database, mainly for tests and one-shot tooling.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        // WAL keeps concurrent readers out of the writers' way.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KvBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result: Result<String, _> = conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_if(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = match expected {
            None => conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO NOTHING",
                params![key, value],
            )?,
            Some(old) => conn.execute(
                "UPDATE kv SET value = ?2 WHERE key = ?1 AND value = ?3",
                params![key, value, old],
            )?,
        };
        Ok(changed == 1)
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBackend {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    fn put_if(&self, key: &str, expected: Option<&str>, value: &str) -> Result<bool, StoreError> {
        let mut map = self.map.lock().unwrap();
        let matches = match (expected, map.get(key)) {
            (None, None) => true,
            (Some(e), Some(current)) => current == e,
            _ => false,
        };
        if matches {
            map.insert(key.to_string(), value.to_string());
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends() -> Vec<Box<dyn KvBackend>> {
        vec![
            Box::new(MemoryBackend::new()),
            Box::new(SqliteBackend::open_in_memory().unwrap()),
        ]
    }

    #[test]
    fn get_missing_key_is_none() {
        for backend in backends() {
            assert_eq!(backend.get("nope").unwrap(), None);
        }
    }

    #[test]
    fn insert_only_succeeds_when_absent() {
        for backend in backends() {
            assert!(backend.put_if("k", None, "v1").unwrap());
            assert!(!backend.put_if("k", None, "v2").unwrap());
            assert_eq!(backend.get("k").unwrap().as_deref(), Some("v1"));
        }
    }

    #[test]
    fn update_requires_matching_value() {
        for backend in backends() {
            backend.put_if("k", None, "v1").unwrap();
            assert!(!backend.put_if("k", Some("stale"), "v2").unwrap());
            assert!(backend.put_if("k", Some("v1"), "v2").unwrap());
            assert_eq!(backend.get("k").unwrap().as_deref(), Some("v2"));
        }
    }

    #[test]
    fn update_against_missing_key_fails() {
        for backend in backends() {
            assert!(!backend.put_if("ghost", Some("v"), "v2").unwrap());
        }
    }

    #[test]
    fn sqlite_backend_persists_across_reopen() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        {
            let backend = SqliteBackend::open_at(tmp.path()).unwrap();
            backend.put_if("k", None, "kept").unwrap();
        }
        let backend = SqliteBackend::open_at(tmp.path()).unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("kept"));
    }
}
