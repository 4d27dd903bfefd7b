//! Core types and shared functionality for querystash.
//!
//! This crate provides:
//! - QuerySpec fingerprinting into stable cache keys
//! - Read-through result caching over pluggable backends
//! - Tag-scoped invalidation routing for write operations
//! - Configuration structures

pub mod bridge;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod registry;
pub mod scope;
pub mod spec;
pub mod store;

pub use cache::ResultCache;
pub use config::AppConfig;
pub use error::{Error, FetchError, StoreError};
pub use invalidation::InvalidationRouter;
pub use registry::EntityRegistry;
pub use scope::TagScope;
pub use spec::QuerySpec;
pub use store::CacheStore;
