//! Cache mirror: a TTL-bounded accelerator in front of the token sets
//!
//! Per-token answers live under `revoked:<token>` / `expired:<token>` and the
//! whole lists under `tokenRevocationList` / `tokenExpirationList`, all inside
//! one namespace. Nothing here is authoritative: every cache failure falls back
//! to the in-memory [`TokenSetStore`].

use crate::store::{TokenKind, TokenSetStore};
use nova_cache::{CacheExt, NamespacedCache};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const REVOCATION_LIST_KEY: &str = "tokenRevocationList";
pub const EXPIRATION_LIST_KEY: &str = "tokenExpirationList";

pub struct CacheMirror {
    cache: Arc<dyn NamespacedCache>,
    store: Arc<TokenSetStore>,
    namespace: String,
    ttl_secs: u64,
}

impl CacheMirror {
    pub fn new(
        cache: Arc<dyn NamespacedCache>,
        store: Arc<TokenSetStore>,
        namespace: impl Into<String>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            cache,
            store,
            namespace: namespace.into(),
            ttl_secs,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub async fn is_revoked(&self, token: &str) -> bool {
        self.lookup(TokenKind::Revoked, token).await
    }

    pub async fn is_expired(&self, token: &str) -> bool {
        self.lookup(TokenKind::Expired, token).await
    }

    async fn lookup(&self, kind: TokenKind, token: &str) -> bool {
        // A mutation in this process is visible before any cache round trip
        if self.store.contains(kind, token) {
            return true;
        }

        let key = token_key(kind, token);
        match self.cache.get::<bool>(&self.namespace, &key).await {
            Ok(Some(true)) => {
                // Marked by another process sharing the cache
                self.store.add(kind, token);
                true
            }
            Ok(Some(false)) => false,
            Ok(None) => {
                let present = self.store.contains(kind, token);
                if let Err(e) = self
                    .cache
                    .set(&self.namespace, &key, &present, self.ttl_secs)
                    .await
                {
                    error!(kind = %kind, error = %e, "Failed to populate token cache entry");
                }
                present
            }
            Err(e) => {
                error!(kind = %kind, error = %e, "Token cache lookup failed, using in-memory set");
                self.store.contains(kind, token)
            }
        }
    }

    pub async fn mark_revoked(&self, token: &str) {
        self.mark(TokenKind::Revoked, token, self.ttl_secs).await
    }

    pub async fn mark_expired(&self, token: &str, ttl_secs: u64) {
        self.mark(TokenKind::Expired, token, ttl_secs).await
    }

    /// Overwrite the per-token entry after a mutation
    pub async fn mark(&self, kind: TokenKind, token: &str, ttl_secs: u64) {
        let key = token_key(kind, token);
        if let Err(e) = self.cache.set(&self.namespace, &key, &true, ttl_secs).await {
            error!(
                kind = %kind,
                token = %fingerprint(token),
                error = %e,
                "Failed to mark token in cache"
            );
        }
    }

    /// Drop the per-token entry of a token that is no longer tracked
    pub async fn forget(&self, kind: TokenKind, token: &str) {
        if let Err(e) = self.cache.del(&self.namespace, &token_key(kind, token)).await {
            error!(kind = %kind, error = %e, "Failed to drop token cache entry");
        }
    }

    /// Drop both aggregate list entries so the next full-list read goes to disk
    pub async fn invalidate_list_cache(&self) {
        for kind in TokenKind::ALL {
            if let Err(e) = self.cache.del(&self.namespace, list_key(kind)).await {
                error!(kind = %kind, error = %e, "Failed to invalidate token list cache");
            }
        }
    }

    pub async fn cached_list(&self, kind: TokenKind) -> Option<HashSet<String>> {
        match self
            .cache
            .get::<Vec<String>>(&self.namespace, list_key(kind))
            .await
        {
            Ok(Some(tokens)) => Some(tokens.into_iter().collect()),
            Ok(None) => None,
            Err(e) => {
                error!(kind = %kind, error = %e, "Token list cache read failed");
                None
            }
        }
    }

    pub async fn store_list(&self, kind: TokenKind, tokens: &HashSet<String>) {
        let mut list: Vec<&String> = tokens.iter().collect();
        list.sort();

        if let Err(e) = self
            .cache
            .set(&self.namespace, list_key(kind), &list, self.ttl_secs)
            .await
        {
            error!(kind = %kind, error = %e, "Failed to cache token list");
        } else {
            debug!(kind = %kind, count = list.len(), "Cached token list");
        }
    }

    /// Remove every entry of the namespace
    pub async fn clear(&self) {
        match self.cache.clear_namespace(&self.namespace).await {
            Ok(removed) => {
                info!(namespace = %self.namespace, removed, "Cleared token cache namespace")
            }
            Err(e) => {
                error!(namespace = %self.namespace, error = %e, "Failed to clear token cache namespace")
            }
        }
    }
}

pub fn token_key(kind: TokenKind, token: &str) -> String {
    format!("{}:{}", kind.as_str(), token)
}

pub fn list_key(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Revoked => REVOCATION_LIST_KEY,
        TokenKind::Expired => EXPIRATION_LIST_KEY,
    }
}

/// Short SHA-256 prefix so logs can correlate tokens without leaking them
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
