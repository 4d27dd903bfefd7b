//! In-process cache backend.
//!
//! A tag-capable store backed by a map behind a read-write lock.
//! Expiry is checked lazily on read; there is no background sweeper.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::CacheStore;
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    tags: Vec<String>,
    stored_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Tag-capable in-memory cache store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired, not yet reaped) entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Utc::now();
        let stored_at = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_expired(now) => entry.stored_at,
                Some(entry) => return Ok(Some(entry.payload.clone())),
                None => return Ok(None),
            }
        };
        self.entries.write().remove(key);
        tracing::debug!(key, stored_at = %stored_at, "expired entry evicted");
        Ok(None)
    }

    fn put(&self, key: &str, payload: &[u8], ttl: Duration, tags: &[String]) -> Result<(), StoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Unavailable(format!("ttl out of range: {e}")))?;
        let now = Utc::now();
        let entry = Entry { payload: payload.to_vec(), tags: tags.to_vec(), stored_at: now, expires_at: now + ttl };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn flush_by_tags(&self, tags: &[String]) -> Result<bool, StoreError> {
        self.entries
            .write()
            .retain(|_, entry| !entry.tags.iter().any(|t| tags.contains(t)));
        Ok(true)
    }

    fn flush_all(&self) -> Result<bool, StoreError> {
        self.entries.write().clear();
        Ok(true)
    }

    fn supports_tags(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
