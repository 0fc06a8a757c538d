//! Error types for token lifecycle tracking

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures while reading or writing a persisted token list
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed token list {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Timed out after {timeout:?} waiting for lock {}", .path.display())]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("Persistence task failed: {0}")]
    Task(String),
}

impl PersistenceError {
    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            PersistenceError::Io { .. } => "io",
            PersistenceError::Malformed { .. } => "malformed",
            PersistenceError::LockTimeout { .. } => "lock_timeout",
            PersistenceError::Task(_) => "task",
        }
    }
}

/// Invalid lifecycle configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Failures surfaced by the tracker's own API
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cleanup tasks are already running")]
    AlreadyStarted,
}

/// Reason an authentication attempt was refused.
///
/// Every rejection maps to HTTP 403 with a fixed, terse message; no internal
/// detail ever reaches the response body.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("access denied")]
    AccessDenied,

    #[error("no token")]
    NoToken,

    #[error("token revoked")]
    TokenRevoked,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token")]
    InvalidToken,
}

impl Rejection {
    pub const STATUS_CODE: u16 = 403;

    pub fn status_code(&self) -> u16 {
        Self::STATUS_CODE
    }

    pub fn message(&self) -> &'static str {
        match self {
            Rejection::AccessDenied => "access denied",
            Rejection::NoToken => "no token",
            Rejection::TokenRevoked => "token revoked",
            Rejection::TokenExpired => "token expired",
            Rejection::InvalidToken => "invalid token",
        }
    }

    /// Metric label
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::AccessDenied => "access_denied",
            Rejection::NoToken => "no_token",
            Rejection::TokenRevoked => "token_revoked",
            Rejection::TokenExpired => "token_expired",
            Rejection::InvalidToken => "invalid_token",
        }
    }
}
