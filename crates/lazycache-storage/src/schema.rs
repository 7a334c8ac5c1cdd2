//! The `entries` table behind [`SqliteStore`](crate::SqliteStore).
//!
//! One row per cached node: the hex fingerprint as primary key and the codec
//! payload as a blob. The table is created by the embedded migrations, whose
//! progress is tracked in SQLite's `user_version`.

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::error::StorageError;

/// `user_version` of a fully migrated cache database.
pub const SCHEMA_VERSION: i64 = 1;

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_initial_schema.sql"))])
}

/// Opens the cache database at `path`, creating the file and the `entries`
/// table on first use.
pub fn open_database(path: &str) -> Result<Connection, StorageError> {
    prepare(Connection::open(path)?)
}

/// A private in-memory cache database, dropped with the connection.
pub fn open_in_memory() -> Result<Connection, StorageError> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(mut conn: Connection) -> Result<Connection, StorageError> {
    // Cache writes are idempotent, so a lost tail after a crash only costs a
    // recomputation.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    migrations()
        .to_latest(&mut conn)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_version(conn: &Connection) -> i64 {
        conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn entries_table_exists_after_migration() {
        let conn = open_in_memory().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'entries'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(user_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn reopening_keeps_rows_and_version() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.db");
        let path = path.to_str().unwrap();

        let conn = open_database(path).unwrap();
        conn.execute("INSERT INTO entries (key, value) VALUES ('ab12', x'01')", [])
            .unwrap();
        drop(conn);

        let conn = open_database(path).unwrap();
        assert_eq!(user_version(&conn), SCHEMA_VERSION);
        let value: Vec<u8> = conn
            .query_row("SELECT value FROM entries WHERE key = 'ab12'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, vec![1u8]);
    }
}
