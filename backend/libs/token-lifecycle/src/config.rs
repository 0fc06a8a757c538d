//! Lifecycle tracking configuration
//!
//! Every value can be overridden from the environment:
//!
//! | Variable | Default |
//! |---|---|
//! | `TOKEN_CACHE_DURATION` | 3600 (seconds) |
//! | `REVOKED_TOKEN_RETENTION_PERIOD` | 2592000000 (milliseconds, 30 days) |
//! | `TOKEN_REVOKED_LIST_PATH` | `data/revoked_tokens.json` |
//! | `TOKEN_EXPIRY_LIST_PATH` | `data/expired_tokens.json` |
//! | `TOKEN_CLEANUP_INTERVAL_SECS` | 60 |
//! | `TOKEN_FILE_LOCK_TIMEOUT_MS` | 5000 |
//! | `TOKEN_CACHE_NAMESPACE` | `token_lifecycle` |

use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TOKEN_CACHE_DURATION_SECS: u64 = 3600;
pub const DEFAULT_REVOKED_RETENTION_MS: u64 = 30 * 24 * 60 * 60 * 1000;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CACHE_NAMESPACE: &str = "token_lifecycle";

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// TTL applied to per-token and list cache entries
    pub token_cache_duration_secs: u64,
    /// Revoked tokens issued longer ago than this are dropped by cleanup
    pub revoked_token_retention_ms: u64,
    pub revoked_list_path: PathBuf,
    pub expired_list_path: PathBuf,
    pub cleanup_interval_secs: u64,
    /// Upper bound on waiting for a token list file lock
    pub lock_timeout_ms: u64,
    pub cache_namespace: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            token_cache_duration_secs: DEFAULT_TOKEN_CACHE_DURATION_SECS,
            revoked_token_retention_ms: DEFAULT_REVOKED_RETENTION_MS,
            revoked_list_path: PathBuf::from("data/revoked_tokens.json"),
            expired_list_path: PathBuf::from("data/expired_tokens.json"),
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            cache_namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
        }
    }
}

impl LifecycleConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            token_cache_duration_secs: parse_env(
                "TOKEN_CACHE_DURATION",
                defaults.token_cache_duration_secs,
            )?,
            revoked_token_retention_ms: parse_env(
                "REVOKED_TOKEN_RETENTION_PERIOD",
                defaults.revoked_token_retention_ms,
            )?,
            revoked_list_path: env::var("TOKEN_REVOKED_LIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.revoked_list_path),
            expired_list_path: env::var("TOKEN_EXPIRY_LIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.expired_list_path),
            cleanup_interval_secs: parse_env(
                "TOKEN_CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval_secs,
            )?,
            lock_timeout_ms: parse_env("TOKEN_FILE_LOCK_TIMEOUT_MS", defaults.lock_timeout_ms)?,
            cache_namespace: env::var("TOKEN_CACHE_NAMESPACE")
                .unwrap_or(defaults.cache_namespace),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_cache_duration_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TOKEN_CACHE_DURATION",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "TOKEN_CLEANUP_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.revoked_list_path == self.expired_list_path {
            return Err(ConfigError::Invalid {
                var: "TOKEN_EXPIRY_LIST_PATH",
                reason: "must differ from TOKEN_REVOKED_LIST_PATH".to_string(),
            });
        }
        if self.cache_namespace.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "TOKEN_CACHE_NAMESPACE",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn retention_ms(&self) -> i64 {
        i64::try_from(self.revoked_token_retention_ms).unwrap_or(i64::MAX)
    }
}

fn parse_env<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            reason: format!("cannot parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}
