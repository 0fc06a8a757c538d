//! Per-request authentication decision
//!
//! Checks run in a fixed order and stop at the first failure:
//! client IP → bearer token present → revoked → expired → signature/`exp`.
//! The cheap local checks come first so a revoked token never reaches the
//! verifier.

use crate::error::Rejection;
use crate::external::{Claims, IpReputation, TokenVerifier};
use crate::mirror::fingerprint;
use crate::tracker::LifecycleTracker;
use std::sync::Arc;
use tracing::{debug, warn};

const BEARER_PREFIX: &str = "Bearer ";

/// A request that passed every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub token: String,
    pub claims: Claims,
}

pub struct AuthenticationGate {
    tracker: Arc<LifecycleTracker>,
    verifier: Arc<dyn TokenVerifier>,
    ip_reputation: Arc<dyn IpReputation>,
}

impl AuthenticationGate {
    pub fn new(
        tracker: Arc<LifecycleTracker>,
        verifier: Arc<dyn TokenVerifier>,
        ip_reputation: Arc<dyn IpReputation>,
    ) -> Self {
        Self {
            tracker,
            verifier,
            ip_reputation,
        }
    }

    pub fn tracker(&self) -> &Arc<LifecycleTracker> {
        &self.tracker
    }

    /// Decide whether a request may proceed.
    ///
    /// `authorization` is the raw `Authorization` header value.
    pub async fn authenticate(
        &self,
        client_ip: Option<&str>,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedIdentity, Rejection> {
        let result = self.check(client_ip, authorization).await;

        if let Err(rejection) = result {
            crate::metrics::record_rejection(rejection);
            warn!(
                client_ip = client_ip.unwrap_or("-"),
                reason = rejection.reason(),
                "Authentication rejected"
            );
        }
        result
    }

    async fn check(
        &self,
        client_ip: Option<&str>,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedIdentity, Rejection> {
        let ip = client_ip
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .ok_or(Rejection::AccessDenied)?;

        if self.ip_reputation.is_temporarily_blacklisted(ip).await
            || self.ip_reputation.is_blacklisted(ip).await
        {
            return Err(Rejection::AccessDenied);
        }

        let token = authorization
            .and_then(bearer_token)
            .ok_or(Rejection::NoToken)?;

        if self.tracker.is_token_revoked(token).await {
            return Err(Rejection::TokenRevoked);
        }

        if self.tracker.is_token_expired(token).await {
            return Err(Rejection::TokenExpired);
        }

        let claims = self
            .verifier
            .verify(token)
            .await
            .ok_or(Rejection::InvalidToken)?;

        debug!(token = %fingerprint(token), sub = %claims.sub, "Request authenticated");
        Ok(AuthenticatedIdentity {
            token: token.to_string(),
            claims,
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
