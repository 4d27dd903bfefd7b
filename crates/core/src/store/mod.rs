//! Cache store adapters.
//!
//! [`CacheStore`] is the boundary to the external key-value cache.
//! Tag support is an explicit capability flag resolved when the store
//! is constructed, not probed per call. Two backends ship here: an
//! in-process map and a SQLite database.

pub mod memory;
pub mod migrations;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::StoreError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Polymorphic interface over an external key-value cache.
///
/// All operations block inline on the backend; timeouts are the
/// backend's responsibility.
pub trait CacheStore: Send + Sync {
    /// Look up a payload. `Ok(None)` is a miss, including expiry.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store a payload under `key` with the given TTL and tag set.
    fn put(&self, key: &str, payload: &[u8], ttl: Duration, tags: &[String]) -> Result<(), StoreError>;

    /// Remove a single entry.
    fn forget(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every entry carrying at least one of `tags`. Only
    /// meaningful when [`CacheStore::supports_tags`] is true;
    /// stores without tag support report `Ok(false)`.
    fn flush_by_tags(&self, tags: &[String]) -> Result<bool, StoreError> {
        let _ = tags;
        Ok(false)
    }

    /// Remove every entry in the store, tagged or not.
    fn flush_all(&self) -> Result<bool, StoreError>;

    /// Whether this backend can flush selectively by tag.
    fn supports_tags(&self) -> bool {
        false
    }

    /// Backend name for diagnostics and the CLI.
    fn backend_name(&self) -> &'static str;
}

/// Open the cache backend named by the configuration.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn CacheStore>, StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "sqlite" => Ok(Arc::new(SqliteStore::open(&config.db_path)?)),
        other => Err(StoreError::Unavailable(format!("unknown cache backend: {other}"))),
    }
}
