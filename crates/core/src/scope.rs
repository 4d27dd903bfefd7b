//! Invalidation tag scopes.
//!
//! Every cache entry for an entity type carries three tags: a global
//! marker, the entity-type tag, and the physical-storage tag. Any one
//! of the three is enough to flush the entry. The storage tag exists
//! for entity types that alias the same table: a mutation through one
//! alias invalidates cached results of every alias.

/// The invalidation tags associated with one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagScope {
    pub global: String,
    pub type_tag: String,
    pub storage_tag: String,
}

impl TagScope {
    /// Marker carried by every entry the layer writes.
    pub const GLOBAL: &'static str = "querystash:all";

    pub fn new(entity: &str, storage: &str) -> Self {
        Self {
            global: Self::GLOBAL.to_string(),
            type_tag: format!("querystash:entity:{entity}"),
            storage_tag: format!("querystash:storage:{storage}"),
        }
    }

    /// All three tags, global first. This is the set every cache
    /// entry is stored under.
    pub fn tags(&self) -> [String; 3] {
        [self.global.clone(), self.type_tag.clone(), self.storage_tag.clone()]
    }

    /// The entity-specific tags only. Per-entity flushes must use
    /// this set: the global marker is carried by every entry, so
    /// flushing by it would wipe unrelated entity types too.
    pub fn entity_tags(&self) -> [String; 2] {
        [self.type_tag.clone(), self.storage_tag.clone()]
    }
}
