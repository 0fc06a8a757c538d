//! JWT lifecycle tracking
//!
//! Remembers which access tokens were revoked before their encoded expiry and
//! which were observed as expired, across restarts and across worker
//! processes, without putting persistent storage on the authentication path.
//!
//! # Layers
//!
//! - [`TokenSetStore`]: in-process concurrent sets, the first answer
//! - [`DurablePersistence`]: one JSON file per set, written under an advisory lock
//! - [`CacheMirror`]: TTL-bounded per-token answers in a shared cache namespace
//! - [`LifecycleCleaner`]: periodic removal of tokens that no longer matter
//! - [`LifecycleTracker`]: owns the above and exposes the read / mutation API
//! - [`AuthenticationGate`]: the ordered per-request decision
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use token_lifecycle::{
//!     AuthenticationGate, LifecycleConfig, LifecycleTracker, PayloadDecoder,
//!     Rs256Verifier, StaticIpReputation, SystemClock,
//! };
//!
//! let tracker = Arc::new(LifecycleTracker::new(
//!     LifecycleConfig::from_env()?,
//!     cache,
//!     Arc::new(PayloadDecoder),
//!     Arc::new(SystemClock),
//! )?);
//! tracker.start().await?;
//!
//! let gate = AuthenticationGate::new(
//!     tracker.clone(),
//!     Arc::new(Rs256Verifier::from_public_pem(&public_key_pem)?),
//!     Arc::new(StaticIpReputation::default()),
//! );
//! let identity = gate.authenticate(Some("203.0.113.7"), Some("Bearer ...")).await?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod external;
pub mod gate;
pub mod ip_reputation;
pub mod jwt;
pub mod metrics;
pub mod mirror;
pub mod persistence;
pub mod store;
pub mod tracker;

#[cfg(test)]
mod test_utils;

pub use cleaner::{CleanerHandle, CleanupReport, LifecycleCleaner};
pub use config::LifecycleConfig;
pub use error::{ConfigError, LifecycleError, PersistenceError, Rejection};
pub use external::{
    Claims, Clock, IpReputation, SystemClock, TokenDecoder, TokenVerifier, UnverifiedClaims,
};
pub use gate::{bearer_token, AuthenticatedIdentity, AuthenticationGate};
pub use ip_reputation::{parse_ip_list, StaticIpReputation};
pub use jwt::{PayloadDecoder, Rs256Verifier};
pub use mirror::CacheMirror;
pub use persistence::DurablePersistence;
pub use store::{TokenKind, TokenSetStore};
pub use tracker::LifecycleTracker;
