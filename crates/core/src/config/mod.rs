//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for
//! layered configuration loading from multiple sources:
//!
//! 1. Environment variables (QUERYSTASH_*)
//! 2. TOML config file (if QUERYSTASH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Per-entity cache settings: physical table plus optional overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Entity type identifier, e.g. `post`.
    pub name: String,

    /// Physical storage (table) name, e.g. `posts`.
    pub table: String,

    /// TTL override in seconds for this entity type.
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// Key prefix override for this entity type.
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (QUERYSTASH_*)
/// 2. TOML config file (if QUERYSTASH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache backend: `memory` or `sqlite`.
    ///
    /// Set via QUERYSTASH_BACKEND environment variable.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Path to the SQLite cache database (sqlite backend only).
    ///
    /// Set via QUERYSTASH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Default TTL in seconds for cached query results.
    ///
    /// Set via QUERYSTASH_DEFAULT_TTL_SECS environment variable.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Default key prefix for cache keys.
    ///
    /// Set via QUERYSTASH_KEY_PREFIX environment variable.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Cacheable entity types. Usually supplied via the TOML file.
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

fn default_backend() -> String {
    "memory".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./querystash-cache.sqlite")
}

fn default_ttl_secs() -> u64 {
    60
}

fn default_key_prefix() -> String {
    "querystash".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            db_path: default_db_path(),
            default_ttl_secs: default_ttl_secs(),
            key_prefix: default_key_prefix(),
            entities: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `QUERYSTASH_`
    /// 2. TOML file from `QUERYSTASH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("QUERYSTASH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("QUERYSTASH_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
