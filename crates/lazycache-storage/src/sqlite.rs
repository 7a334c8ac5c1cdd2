//! SQLite implementation of [`KeyValueStore`].
//!
//! [`SqliteStore`] keeps every entry in a single `entries` table. Each write
//! is a single statement and therefore atomic.

use std::collections::BTreeSet;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StorageError;
use crate::traits::KeyValueStore;

/// SQLite-backed implementation of [`KeyValueStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn contains(&mut self, key: &str) -> Result<bool, StorageError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE key = ?1)",
            params![key],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn get(&mut self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute("DELETE FROM entries WHERE key = ?1", params![key])?;
        if changed == 0 {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(())
    }

    fn keys(&mut self) -> Result<BTreeSet<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT key FROM entries")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(keys)
    }

    fn len(&mut self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_overwrites_existing_entry() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.put("k", b"one").unwrap();
        store.put("k", b"two").unwrap();
        assert_eq!(store.get("k").unwrap(), b"two");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(store.delete("nope").unwrap_err().is_not_found());
        assert!(store.get("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.db");
        let path = path.to_str().unwrap();
        {
            let mut store = SqliteStore::new(path).unwrap();
            store.put("abcd", b"value").unwrap();
        }
        let mut store = SqliteStore::new(path).unwrap();
        assert!(store.contains("abcd").unwrap());
        assert_eq!(store.get("abcd").unwrap(), b"value");
    }
}
