//! Cache invalidation for many-to-many pivot mutations.
//!
//! Pivot attach/detach/sync never fire entity lifecycle events, so the
//! bridge wraps the mutation and flushes the owner's scope afterwards.
//! The flush only fires when the mutation reports a nonzero change, so
//! no-op relationship calls do not cost a cache flush.

use crate::error::Error;
use crate::invalidation::InvalidationRouter;

/// Counts reported by a pivot sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncChanges {
    pub attached: usize,
    pub updated: usize,
    pub detached: usize,
}

impl SyncChanges {
    pub fn total(&self) -> usize {
        self.attached + self.updated + self.detached
    }
}

/// External collaborator error from a pivot mutation.
pub type RelationError = Box<dyn std::error::Error + Send + Sync>;

/// A many-to-many relation able to mutate its pivot rows.
///
/// Implemented by the ORM side; the bridge only consumes the reported
/// change counts.
pub trait PivotRelation {
    /// Attach the given ids. Returns the number of pivot rows written.
    fn attach(&mut self, ids: &[i64]) -> Result<usize, RelationError>;

    /// Detach the given ids (all when empty). Returns the number of
    /// pivot rows removed.
    fn detach(&mut self, ids: &[i64]) -> Result<usize, RelationError>;

    /// Sync the pivot table to exactly `ids`, detaching others when
    /// `detaching` is set.
    fn sync(&mut self, ids: &[i64], detaching: bool) -> Result<SyncChanges, RelationError>;
}

/// The owning side of pivot relations, as seen by the bridge.
pub trait PivotOwner {
    /// Entity type name used for the invalidation scope, or `None`
    /// when the owner does not participate in caching.
    fn cache_entity(&self) -> Option<&str>;

    /// Look up a relation by name.
    fn relation(&mut self, name: &str) -> Option<&mut dyn PivotRelation>;
}

/// Error surface of the relationship helpers.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Owner or relation is misconfigured; fatal for the call.
    #[error(transparent)]
    Config(#[from] Error),

    /// The pivot mutation itself failed.
    #[error("pivot mutation failed: {0}")]
    Mutation(#[source] RelationError),
}

/// Pivot-mutation helpers that keep the owner's cache scope fresh.
pub struct RelationshipCacheBridge<'a> {
    router: &'a InvalidationRouter,
}

impl<'a> RelationshipCacheBridge<'a> {
    pub fn new(router: &'a InvalidationRouter) -> Self {
        Self { router }
    }

    /// Attach `ids` on the named relation, then flush the owner's
    /// scope if any ids were given.
    pub fn attach_and_flush(
        &self,
        owner: &mut dyn PivotOwner,
        relation: &str,
        ids: &[i64],
    ) -> Result<usize, BridgeError> {
        let entity = self.scoped_entity(owner)?;
        let written = self
            .resolve(owner, &entity, relation)?
            .attach(ids)
            .map_err(BridgeError::Mutation)?;
        if !ids.is_empty() {
            self.router.invalidate(&entity);
        }
        Ok(written)
    }

    /// Detach `ids` on the named relation, then flush the owner's
    /// scope if any rows were removed.
    pub fn detach_and_flush(
        &self,
        owner: &mut dyn PivotOwner,
        relation: &str,
        ids: &[i64],
    ) -> Result<usize, BridgeError> {
        let entity = self.scoped_entity(owner)?;
        let removed = self
            .resolve(owner, &entity, relation)?
            .detach(ids)
            .map_err(BridgeError::Mutation)?;
        if removed > 0 {
            self.router.invalidate(&entity);
        }
        Ok(removed)
    }

    /// Sync the named relation to exactly `ids`, then flush the
    /// owner's scope if anything changed.
    pub fn sync_and_flush(
        &self,
        owner: &mut dyn PivotOwner,
        relation: &str,
        ids: &[i64],
        detaching: bool,
    ) -> Result<SyncChanges, BridgeError> {
        let entity = self.scoped_entity(owner)?;
        let changes = self
            .resolve(owner, &entity, relation)?
            .sync(ids, detaching)
            .map_err(BridgeError::Mutation)?;
        if changes.total() > 0 {
            self.router.invalidate(&entity);
        }
        Ok(changes)
    }

    fn scoped_entity(&self, owner: &dyn PivotOwner) -> Result<String, Error> {
        owner
            .cache_entity()
            .map(str::to_string)
            .ok_or_else(|| Error::NotCacheable("pivot owner".to_string()))
    }

    fn resolve<'o>(
        &self,
        owner: &'o mut dyn PivotOwner,
        entity: &str,
        relation: &str,
    ) -> Result<&'o mut dyn PivotRelation, Error> {
        match owner.relation(relation) {
            Some(rel) => Ok(rel),
            None => Err(Error::UnknownRelation { entity: entity.to_string(), relation: relation.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::registry::{EntityDescriptor, EntityRegistry};
    use crate::store::{CacheStore, MemoryStore};

    struct FakeRelation {
        rows: Vec<i64>,
    }

    impl PivotRelation for FakeRelation {
        fn attach(&mut self, ids: &[i64]) -> Result<usize, RelationError> {
            self.rows.extend_from_slice(ids);
            Ok(ids.len())
        }

        fn detach(&mut self, ids: &[i64]) -> Result<usize, RelationError> {
            let before = self.rows.len();
            if ids.is_empty() {
                self.rows.clear();
            } else {
                self.rows.retain(|id| !ids.contains(id));
            }
            Ok(before - self.rows.len())
        }

        fn sync(&mut self, ids: &[i64], detaching: bool) -> Result<SyncChanges, RelationError> {
            let attached = ids.iter().filter(|id| !self.rows.contains(id)).count();
            let detached = if detaching {
                self.rows.iter().filter(|id| !ids.contains(id)).count()
            } else {
                0
            };
            if detaching {
                self.rows.retain(|id| ids.contains(id));
            }
            for id in ids {
                if !self.rows.contains(id) {
                    self.rows.push(*id);
                }
            }
            Ok(SyncChanges { attached, updated: 0, detached })
        }
    }

    struct FakeOwner {
        cacheable: bool,
        tags: FakeRelation,
    }

    impl FakeOwner {
        fn new(cacheable: bool) -> Self {
            Self { cacheable, tags: FakeRelation { rows: vec![1, 2] } }
        }
    }

    impl PivotOwner for FakeOwner {
        fn cache_entity(&self) -> Option<&str> {
            self.cacheable.then_some("post")
        }

        fn relation(&mut self, name: &str) -> Option<&mut dyn PivotRelation> {
            (name == "tags").then_some(&mut self.tags as &mut dyn PivotRelation)
        }
    }

    fn setup() -> (Arc<MemoryStore>, InvalidationRouter) {
        let mut reg = EntityRegistry::default();
        reg.register(EntityDescriptor::new("post", "posts"));
        let reg = Arc::new(reg);
        let store = Arc::new(MemoryStore::new());
        let scope = reg.scope_for("post").unwrap();
        store
            .put("post-key", b"cached", Duration::from_secs(60), &scope.tags())
            .unwrap();
        let router = InvalidationRouter::new(store.clone(), reg);
        (store, router)
    }

    #[test]
    fn test_attach_flushes_owner_scope() {
        let (store, router) = setup();
        let bridge = RelationshipCacheBridge::new(&router);
        let mut owner = FakeOwner::new(true);

        let written = bridge.attach_and_flush(&mut owner, "tags", &[3]).unwrap();
        assert_eq!(written, 1);
        assert_eq!(store.get("post-key").unwrap(), None);
    }

    #[test]
    fn test_attach_empty_ids_skips_flush() {
        let (store, router) = setup();
        let bridge = RelationshipCacheBridge::new(&router);
        let mut owner = FakeOwner::new(true);

        bridge.attach_and_flush(&mut owner, "tags", &[]).unwrap();
        assert_eq!(store.get("post-key").unwrap(), Some(b"cached".to_vec()));
    }

    #[test]
    fn test_detach_noop_skips_flush() {
        let (store, router) = setup();
        let bridge = RelationshipCacheBridge::new(&router);
        let mut owner = FakeOwner::new(true);

        // Id 99 is not attached, so nothing is removed.
        let removed = bridge.detach_and_flush(&mut owner, "tags", &[99]).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(store.get("post-key").unwrap(), Some(b"cached".to_vec()));
    }

    #[test]
    fn test_detach_flushes_on_removal() {
        let (store, router) = setup();
        let bridge = RelationshipCacheBridge::new(&router);
        let mut owner = FakeOwner::new(true);

        let removed = bridge.detach_and_flush(&mut owner, "tags", &[1]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.get("post-key").unwrap(), None);
    }

    #[test]
    fn test_sync_without_changes_skips_flush() {
        let (store, router) = setup();
        let bridge = RelationshipCacheBridge::new(&router);
        let mut owner = FakeOwner::new(true);

        let changes = bridge.sync_and_flush(&mut owner, "tags", &[1, 2], true).unwrap();
        assert_eq!(changes.total(), 0);
        assert_eq!(store.get("post-key").unwrap(), Some(b"cached".to_vec()));
    }

    #[test]
    fn test_sync_with_changes_flushes() {
        let (store, router) = setup();
        let bridge = RelationshipCacheBridge::new(&router);
        let mut owner = FakeOwner::new(true);

        let changes = bridge.sync_and_flush(&mut owner, "tags", &[2, 3], true).unwrap();
        assert_eq!(changes.attached, 1);
        assert_eq!(changes.detached, 1);
        assert_eq!(store.get("post-key").unwrap(), None);
    }

    #[test]
    fn test_owner_without_scope_is_config_error() {
        let (_, router) = setup();
        let bridge = RelationshipCacheBridge::new(&router);
        let mut owner = FakeOwner::new(false);

        let result = bridge.attach_and_flush(&mut owner, "tags", &[3]);
        assert!(matches!(result, Err(BridgeError::Config(Error::NotCacheable(_)))));
    }

    #[test]
    fn test_unknown_relation_is_config_error() {
        let (_, router) = setup();
        let bridge = RelationshipCacheBridge::new(&router);
        let mut owner = FakeOwner::new(true);

        let result = bridge.attach_and_flush(&mut owner, "categories", &[3]);
        assert!(matches!(result, Err(BridgeError::Config(Error::UnknownRelation { .. }))));
    }
}
