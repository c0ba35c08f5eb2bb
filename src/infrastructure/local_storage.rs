//! Local SQLite key-value store.
//!
//! Standalone fallback used when the host note is unreachable. Values are
//! the same serialized document the host would receive.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{AppError, Result};

/// Key under which the board document is stored.
pub const BOARD_KEY: &str = "multi-chronometer-data";

/// Local key-value repository using SQLite.
pub struct LocalStorage {
    conn: Connection,
}

impl LocalStorage {
    /// Opens or creates the local storage database.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }

        let conn = Connection::open(path).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(AppError::database)?;

        let storage = Self { conn };
        storage.init_schema()?;

        Ok(storage)
    }

    /// Opens a throwaway in-memory store.
    ///
    /// # Errors
    /// Returns error if schema creation fails.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::database)?;
        let storage = Self { conn };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r"
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
            )
            .map_err(AppError::database)?;

        Ok(())
    }

    /// Read a value.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(AppError::database)
    }

    /// Insert or replace a value.
    ///
    /// # Errors
    /// Returns error if the write fails.
    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                r"
            INSERT INTO local_storage (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            ",
                params![key, value],
            )
            .map_err(AppError::database)?;

        tracing::debug!(key, bytes = value.len(), "Local storage item written");
        Ok(())
    }

    /// Get total storage size in bytes (0 for in-memory stores).
    ///
    /// # Errors
    /// Returns error if the database file metadata cannot be read.
    pub fn get_storage_size(&self) -> Result<u64> {
        let path = match self.conn.path() {
            Some(p) if !p.is_empty() => Path::new(p),
            _ => return Ok(0),
        };
        let metadata = std::fs::metadata(path)
            .map_err(|e| AppError::io("Failed to get storage size", e))?;
        Ok(metadata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let storage = LocalStorage::open(&db_path).unwrap();

        let count: i64 = storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='local_storage'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(count, 1);
        assert!(storage.get_storage_size().unwrap() > 0);
    }

    #[test]
    fn test_item_roundtrip_and_overwrite() {
        let storage = LocalStorage::open_in_memory().unwrap();
        assert_eq!(storage.get_item(BOARD_KEY).unwrap(), None);

        storage.set_item(BOARD_KEY, "[]").unwrap();
        storage.set_item(BOARD_KEY, r#"{"chronometers":[]}"#).unwrap();

        assert_eq!(
            storage.get_item(BOARD_KEY).unwrap().as_deref(),
            Some(r#"{"chronometers":[]}"#)
        );
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        LocalStorage::open(&db_path)
            .unwrap()
            .set_item("k", "v")
            .unwrap();

        let reopened = LocalStorage::open(&db_path).unwrap();
        assert_eq!(reopened.get_item("k").unwrap().as_deref(), Some("v"));
    }
}
