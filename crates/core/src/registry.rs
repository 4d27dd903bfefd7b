//! Entity metadata registry.
//!
//! An explicit, process-lifetime object holding the static metadata
//! the cache layer needs per entity type: physical storage name and
//! optional TTL / key-prefix overrides. Tag scopes are memoized here;
//! the memo map is append-only and its values are idempotent to
//! recompute, so a shared read-write lock is enough.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;

use crate::config::AppConfig;
use crate::error::Error;
use crate::scope::TagScope;

/// Global fallback TTL when neither the call nor the entity override
/// one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Static metadata for one cacheable entity type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// Entity type identifier, e.g. `post`.
    pub name: String,
    /// Physical storage (table) name, e.g. `posts`.
    pub storage: String,
    /// Per-type TTL override.
    pub ttl: Option<Duration>,
    /// Per-type key prefix override.
    pub prefix: Option<String>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, storage: impl Into<String>) -> Self {
        Self { name: name.into(), storage: storage.into(), ttl: None, prefix: None }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Registry of every entity type participating in the cache layer.
#[derive(Debug)]
pub struct EntityRegistry {
    entities: HashMap<String, EntityDescriptor>,
    scopes: RwLock<HashMap<String, TagScope>>,
    default_ttl: Duration,
    default_prefix: String,
}

impl EntityRegistry {
    pub fn new(default_ttl: Duration, default_prefix: impl Into<String>) -> Self {
        Self {
            entities: HashMap::new(),
            scopes: RwLock::new(HashMap::new()),
            default_ttl,
            default_prefix: default_prefix.into(),
        }
    }

    /// Build a registry from loaded configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut registry = Self::new(Duration::from_secs(config.default_ttl_secs), config.key_prefix.clone());
        for entity in &config.entities {
            let mut descriptor = EntityDescriptor::new(&entity.name, &entity.table);
            descriptor.ttl = entity.ttl_secs.map(Duration::from_secs);
            descriptor.prefix = entity.prefix.clone();
            registry.register(descriptor);
        }
        registry
    }

    /// Register an entity type. Replaces any previous descriptor with
    /// the same name.
    pub fn register(&mut self, descriptor: EntityDescriptor) {
        self.scopes.write().remove(&descriptor.name);
        self.entities.insert(descriptor.name.clone(), descriptor);
    }

    pub fn descriptor(&self, entity: &str) -> Result<&EntityDescriptor, Error> {
        self.entities
            .get(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    /// Tag scope for an entity type, memoized for the process
    /// lifetime.
    pub fn scope_for(&self, entity: &str) -> Result<TagScope, Error> {
        if let Some(scope) = self.scopes.read().get(entity) {
            return Ok(scope.clone());
        }
        let descriptor = self.descriptor(entity)?;
        let scope = TagScope::new(&descriptor.name, &descriptor.storage);
        self.scopes.write().insert(entity.to_string(), scope.clone());
        Ok(scope)
    }

    /// Effective TTL for an entity type.
    pub fn ttl_for(&self, entity: &str) -> Result<Duration, Error> {
        Ok(self.descriptor(entity)?.ttl.unwrap_or(self.default_ttl))
    }

    /// Effective key prefix for an entity type.
    pub fn prefix_for(&self, entity: &str) -> Result<String, Error> {
        Ok(self
            .descriptor(entity)?
            .prefix
            .clone()
            .unwrap_or_else(|| self.default_prefix.clone()))
    }

    /// Registered entity type names, for diagnostics.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(String::as_str).collect()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, "querystash")
    }
}
