//! Invalidation routing for write operations.
//!
//! Every write against an entity's storage, from a single update to a
//! truncate, flushes that entity's whole tag scope. Routing never
//! attempts per-row invalidation: deciding which cached query results
//! a mutation touches would mean re-evaluating every cached predicate.
//!
//! Flushing is two-tier: a selective tag flush when the backend
//! supports it, otherwise (or on tag-flush failure) a whole-store
//! flush. Invalidation failures are reported as `false`, never as
//! errors: the underlying write already succeeded and must not be
//! rolled back over a stale cache.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::registry::EntityRegistry;
use crate::scope::TagScope;
use crate::store::CacheStore;

/// The write operation kinds that trigger invalidation.
///
/// Single-entity lifecycle events fire after the storage write
/// completes; bulk kinds are intercepted at the query-builder level
/// since they never hydrate individual entities. All kinds route to
/// the same scope-wide flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Created,
    Updated,
    Deleted,
    Restored,
    ForceDeleted,
    MassUpdated,
    MassDeleted,
    Inserted,
    InsertOrIgnored,
    UpdatedOrInserted,
    Upserted,
    Truncated,
    Incremented,
    Decremented,
    PivotAttached,
    PivotDetached,
    PivotSynced,
}

/// One write operation against an entity's storage.
///
/// Affected ids are carried for diagnostics only; invalidation is
/// always scope-wide.
#[derive(Debug, Clone)]
pub struct InvalidationEvent {
    pub entity: String,
    pub kind: WriteKind,
    pub ids: Vec<i64>,
}

impl InvalidationEvent {
    pub fn new(entity: impl Into<String>, kind: WriteKind) -> Self {
        Self { entity: entity.into(), kind, ids: Vec::new() }
    }

    pub fn with_ids(mut self, ids: Vec<i64>) -> Self {
        self.ids = ids;
        self
    }
}

/// Which flush tier handled an invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStrategy {
    Tags,
    Full,
}

impl fmt::Display for FlushStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushStrategy::Tags => write!(f, "tags"),
            FlushStrategy::Full => write!(f, "full"),
        }
    }
}

/// Result of one flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutcome {
    pub strategy: FlushStrategy,
    pub flushed: bool,
}

/// Routes write operations to the correct cache flush.
pub struct InvalidationRouter {
    store: Arc<dyn CacheStore>,
    registry: Arc<EntityRegistry>,
}

impl InvalidationRouter {
    pub fn new(store: Arc<dyn CacheStore>, registry: Arc<EntityRegistry>) -> Self {
        Self { store, registry }
    }

    /// Flush every cached entry in the entity's tag scope.
    ///
    /// Returns a success indicator, not a guarantee: any failure along
    /// the way, including an unregistered entity type, is logged and
    /// reported as `false`.
    pub fn invalidate(&self, entity: &str) -> bool {
        match self.registry.scope_for(entity) {
            Ok(scope) => self.flush_tags(&scope.entity_tags()).flushed,
            Err(e) => {
                tracing::warn!(entity, error = %e, "invalidation skipped");
                false
            }
        }
    }

    /// Handle a write event. Every kind routes to a scope-wide flush
    /// of the mutated entity type.
    pub fn on_write(&self, event: &InvalidationEvent) -> bool {
        tracing::debug!(entity = %event.entity, kind = ?event.kind, ids = event.ids.len(), "write observed");
        self.invalidate(&event.entity)
    }

    /// Like [`InvalidationRouter::invalidate`], but reports which
    /// strategy ran and surfaces unknown entity types to the caller.
    /// Used by the CLI.
    pub fn invalidate_reporting(&self, entity: &str) -> Result<FlushOutcome, Error> {
        let scope = self.registry.scope_for(entity)?;
        Ok(self.flush_tags(&scope.entity_tags()))
    }

    /// Flush every scope the layer has written: tag-flush of the
    /// global marker, with the usual full-flush fallback.
    pub fn flush_everything(&self) -> FlushOutcome {
        self.flush_tags(&[TagScope::GLOBAL.to_string()])
    }

    fn flush_tags(&self, tags: &[String]) -> FlushOutcome {
        if self.store.supports_tags() {
            match self.store.flush_by_tags(tags) {
                Ok(true) => {
                    tracing::debug!(?tags, "tag flush complete");
                    return FlushOutcome { strategy: FlushStrategy::Tags, flushed: true };
                }
                Ok(false) => {
                    tracing::debug!(?tags, "tag flush declined; falling back to full flush");
                }
                Err(e) => {
                    tracing::warn!(?tags, error = %e, "tag flush failed; falling back to full flush");
                }
            }
        }

        match self.store.flush_all() {
            Ok(flushed) => FlushOutcome { strategy: FlushStrategy::Full, flushed },
            Err(e) => {
                tracing::warn!(error = %e, "full flush failed");
                FlushOutcome { strategy: FlushStrategy::Full, flushed: false }
            }
        }
    }
}
