//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `namespace` or `version` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `version` contains `-` or whitespace (store names are
    ///   `{namespace}-{version}-{purpose}`, so a dash would make them ambiguous)
    /// - `origin` is not an absolute http(s) URL
    /// - `navigation_fallback` is not root-relative
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `precache_concurrency` is 0 or exceeds 32
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "namespace".into(),
                hint: "Set SWCACHE_NAMESPACE environment variable".into(),
            });
        }
        if self.namespace.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid { field: "namespace".into(), reason: "must not contain whitespace".into() });
        }

        if self.version.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "version".into(),
                hint: "Set SWCACHE_VERSION environment variable".into(),
            });
        }
        if self.version.chars().any(|c| c == '-' || c.is_whitespace()) {
            return Err(ConfigError::Invalid {
                field: "version".into(),
                reason: "must not contain '-' or whitespace".into(),
            });
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some() => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported origin: {origin}"),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        if !self.navigation_fallback.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "navigation_fallback".into(),
                reason: "must be a root-relative path".into(),
            });
        }

        if self.allowed_hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "allowed_hosts".into(),
                reason: "must not contain empty hosts".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.precache_concurrency == 0 || self.precache_concurrency > 32 {
            return Err(ConfigError::Invalid {
                field: "precache_concurrency".into(),
                reason: "must be between 1 and 32".into(),
            });
        }

        if !self.skip_waiting && self.install_on_start {
            tracing::debug!("skip_waiting is off; a boot-time install stays waiting until sessions close");
        }

        Ok(())
    }
}
