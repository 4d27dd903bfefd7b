//! Unified error types for querystash.
//!
//! Backend failures and configuration misuse follow different policies:
//! backend failures are caught at the ResultCache / InvalidationRouter
//! boundary and degraded, configuration errors propagate to the caller.

/// Failure inside a cache backend at the transport or storage level.
///
/// These never reach application read/write paths: `ResultCache`
/// degrades to direct execution and `InvalidationRouter` converts them
/// to a `false` result.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend could not be reached or refused the operation.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

/// Configuration misuse. Unlike [`StoreError`], these propagate: they
/// indicate a programming error, not a transient condition.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Entity type is not registered with the cache layer.
    #[error("unknown entity type: {0}")]
    UnknownEntity(String),

    /// Named relation does not exist on the owning entity.
    #[error("unknown relation `{relation}` on entity `{entity}`")]
    UnknownRelation { entity: String, relation: String },

    /// Relationship helper invoked on an entity that does not
    /// participate in the cache scope.
    #[error("entity does not participate in the cache scope: {0}")]
    NotCacheable(String),
}

/// Error surface of [`crate::cache::ResultCache::fetch`].
///
/// `E` is the query executor's own error type. Backend failures never
/// appear here; they degrade the call to direct execution instead.
#[derive(Debug, thiserror::Error)]
pub enum FetchError<E: std::error::Error> {
    /// The cache layer was misconfigured for this query.
    #[error(transparent)]
    Config(#[from] Error),

    /// The underlying query executor failed.
    #[error(transparent)]
    Source(E),
}
