//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::AppConfig;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `backend` is not `memory` or `sqlite`
    /// - `default_ttl_secs` is 0 or exceeds 30 days
    /// - `key_prefix` is empty
    /// - an entity has an empty name/table or a duplicate name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend != "memory" && self.backend != "sqlite" {
            return Err(ConfigError::Invalid {
                field: "backend".into(),
                reason: format!("unknown backend `{}`; expected memory or sqlite", self.backend),
            });
        }

        if self.default_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "default_ttl_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.default_ttl_secs > 30 * 24 * 60 * 60 {
            return Err(ConfigError::Invalid {
                field: "default_ttl_secs".into(),
                reason: "must not exceed 30 days".into(),
            });
        }

        if self.key_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "key_prefix".into(), reason: "must not be empty".into() });
        }

        let mut seen = HashSet::new();
        for entity in &self.entities {
            if entity.name.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "entities".into(),
                    reason: "entity name must not be empty".into(),
                });
            }
            if entity.table.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "entities".into(),
                    reason: format!("entity `{}` has an empty table", entity.name),
                });
            }
            if !seen.insert(entity.name.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "entities".into(),
                    reason: format!("duplicate entity `{}`", entity.name),
                });
            }
            if entity.ttl_secs == Some(0) {
                return Err(ConfigError::Invalid {
                    field: "entities".into(),
                    reason: format!("entity `{}` has a zero TTL", entity.name),
                });
            }
        }

        Ok(())
    }
}
