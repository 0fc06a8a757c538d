//! Seams to collaborators this crate consumes but does not implement:
//! signature verification, claim decoding, IP reputation and time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Verified JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Timestamps read from a token without checking its signature.
///
/// Only ever used to decide whether a tracked token can be forgotten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct UnverifiedClaims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Signature + expiry verification. Any failure is `None`.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Option<Claims>;
}

/// Non-verifying claim extraction
pub trait TokenDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Option<UnverifiedClaims>;
}

#[async_trait]
pub trait IpReputation: Send + Sync {
    async fn is_blacklisted(&self, ip: &str) -> bool;
    async fn is_temporarily_blacklisted(&self, ip: &str) -> bool;
}

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
