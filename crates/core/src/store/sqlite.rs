//! SQLite cache backend.
//!
//! A persistent, tag-capable store. The connection is opened with WAL
//! mode and foreign keys on, and schema migrations run at open time.
//! Expiry is an `expires_at` timestamp comparison; expired rows are a
//! miss on read and reclaimed by [`SqliteStore::purge_expired`].

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, params, params_from_iter};

use super::{CacheStore, migrations};
use crate::error::StoreError;

/// Tag-capable SQLite cache store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance
    /// pragmas, and runs any pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::setup(Connection::open(path)?)
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::setup(Connection::open_in_memory()?)
    }

    fn setup(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA foreign_keys=ON;",
        )?;
        migrations::run(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    // Fixed-width UTC timestamps keep lexicographic expires_at
    // comparisons exact.
    fn timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Delete expired entries. Returns the number of deleted rows.
    pub fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Self::timestamp(Utc::now());
        let conn = self.conn.lock();
        let count = conn.execute("DELETE FROM entries WHERE expires_at <= ?1", params![now])?;
        Ok(count as u64)
    }

    /// Number of entries currently stored, expired or not.
    pub fn entry_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl CacheStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Self::timestamp(Utc::now());
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT payload FROM entries WHERE key = ?1 AND expires_at > ?2")?;
        let result = stmt.query_row(params![key, now], |row| row.get::<_, Vec<u8>>(0));
        match result {
            Ok(payload) => Ok(Some(payload)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, payload: &[u8], ttl: Duration, tags: &[String]) -> Result<(), StoreError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Unavailable(format!("ttl out of range: {e}")))?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO entries (key, payload, stored_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                stored_at = excluded.stored_at,
                expires_at = excluded.expires_at",
            params![key, payload, Self::timestamp(now), Self::timestamp(now + ttl)],
        )?;
        tx.execute("DELETE FROM entry_tags WHERE key = ?1", params![key])?;
        for tag in tags {
            tx.execute("INSERT INTO entry_tags (tag, key) VALUES (?1, ?2)", params![tag, key])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM entries WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn flush_by_tags(&self, tags: &[String]) -> Result<bool, StoreError> {
        if tags.is_empty() {
            return Ok(true);
        }
        let placeholders = (1..=tags.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
        let sql =
            format!("DELETE FROM entries WHERE key IN (SELECT key FROM entry_tags WHERE tag IN ({placeholders}))");
        let conn = self.conn.lock();
        conn.execute(&sql, params_from_iter(tags.iter()))?;
        Ok(true)
    }

    fn flush_all(&self) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM entries", [])?;
        Ok(true)
    }

    fn supports_tags(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_put_get_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .put("k1", b"payload", Duration::from_secs(60), &tags(&["a", "b"]))
            .unwrap();
        assert_eq!(store.get("k1").unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn test_get_missing() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("k1", b"payload", Duration::ZERO, &[]).unwrap();
        assert_eq!(store.get("k1").unwrap(), None);
        assert_eq!(store.purge_expired().unwrap(), 1);
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_put_replaces_payload_and_tags() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("k1", b"v1", Duration::from_secs(60), &tags(&["old"])).unwrap();
        store.put("k1", b"v2", Duration::from_secs(60), &tags(&["new"])).unwrap();

        assert_eq!(store.get("k1").unwrap(), Some(b"v2".to_vec()));
        assert!(store.flush_by_tags(&tags(&["old"])).unwrap());
        assert_eq!(store.get("k1").unwrap(), Some(b"v2".to_vec()));
        assert!(store.flush_by_tags(&tags(&["new"])).unwrap());
        assert_eq!(store.get("k1").unwrap(), None);
    }

    #[test]
    fn test_flush_by_tags_is_selective() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .put("post", b"p", Duration::from_secs(60), &tags(&["entity:post"]))
            .unwrap();
        store
            .put("user", b"u", Duration::from_secs(60), &tags(&["entity:user"]))
            .unwrap();

        assert!(store.flush_by_tags(&tags(&["entity:post"])).unwrap());
        assert_eq!(store.get("post").unwrap(), None);
        assert_eq!(store.get("user").unwrap(), Some(b"u".to_vec()));
    }

    #[test]
    fn test_flush_all() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("a", b"1", Duration::from_secs(60), &tags(&["x"])).unwrap();
        store.put("b", b"2", Duration::from_secs(60), &[]).unwrap();
        assert!(store.flush_all().unwrap());
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("k1", b"payload", Duration::from_secs(60), &[]).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("k1").unwrap(), Some(b"payload".to_vec()));
    }
}
