//! Read-through result caching.
//!
//! `ResultCache` sits between the read path and the query source.
//! A hit returns the deserialized payload without touching the
//! executor; a miss runs the executor, stores the materialized result
//! under the spec's fingerprint with the entity's tag scope, and
//! returns it. A failing backend degrades to direct execution: cache
//! trouble must never turn into a data-retrieval failure.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::registry::EntityRegistry;
use crate::spec::QuerySpec;
use crate::spec::fingerprint::fingerprint;
use crate::store::CacheStore;

/// Read-through cache over an external query source.
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    registry: Arc<EntityRegistry>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, registry: Arc<EntityRegistry>) -> Self {
        Self { store, registry }
    }

    /// Fetch the result for `spec`, executing `exec` only on a miss.
    ///
    /// TTL resolves to the entity's configured duration, falling back
    /// to the global default.
    pub fn fetch<T, E, F>(&self, spec: &QuerySpec, exec: F) -> Result<T, FetchError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: std::error::Error,
        F: FnOnce() -> Result<T, E>,
    {
        self.fetch_with_ttl(spec, None, exec)
    }

    /// Like [`ResultCache::fetch`], with a per-call TTL override.
    pub fn fetch_with_ttl<T, E, F>(
        &self,
        spec: &QuerySpec,
        ttl_override: Option<Duration>,
        exec: F,
    ) -> Result<T, FetchError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: std::error::Error,
        F: FnOnce() -> Result<T, E>,
    {
        let entity = spec.entity();
        let prefix = self.registry.prefix_for(entity)?;
        let key = fingerprint(spec, &prefix);

        // A read failure means the backend is in trouble; skip the
        // store on this call rather than failing twice.
        let mut backend_degraded = false;
        match self.store.get(&key) {
            Ok(Some(payload)) => match serde_json::from_slice(&payload) {
                Ok(value) => {
                    tracing::debug!(entity, key = %key, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(entity, key = %key, error = %e, "cached payload undecodable; treating as miss");
                }
            },
            Ok(None) => {
                tracing::debug!(entity, key = %key, "cache miss");
            }
            Err(e) => {
                backend_degraded = true;
                tracing::warn!(entity, key = %key, error = %e, "cache read failed; executing query directly");
            }
        }

        let value = exec().map_err(FetchError::Source)?;

        if !backend_degraded {
            let ttl = match ttl_override {
                Some(ttl) => ttl,
                None => self.registry.ttl_for(entity)?,
            };
            let scope = self.registry.scope_for(entity)?;
            match serde_json::to_vec(&value) {
                Ok(payload) => {
                    if let Err(e) = self.store.put(&key, &payload, ttl, &scope.tags()) {
                        tracing::warn!(entity, key = %key, error = %e, "cache write failed; result served uncached");
                    }
                }
                Err(e) => {
                    tracing::warn!(entity, key = %key, error = %e, "result not serializable; skipping cache store");
                }
            }
        }

        Ok(value)
    }
}
