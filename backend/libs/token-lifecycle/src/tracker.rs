//! Process-wide owner of the revoked / expired token state
//!
//! One [`LifecycleTracker`] is built by the composition root and shared via
//! `Arc`. It wires the in-memory sets, the persisted lists, the cache mirror
//! and the periodic cleaner together and exposes the read / mutation API.

use crate::cleaner::{CleanerHandle, LifecycleCleaner};
use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::external::{Clock, TokenDecoder};
use crate::mirror::{fingerprint, CacheMirror};
use crate::persistence::DurablePersistence;
use crate::store::{TokenKind, TokenSetStore};
use nova_cache::NamespacedCache;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info};

pub struct LifecycleTracker {
    config: LifecycleConfig,
    store: Arc<TokenSetStore>,
    persistence: Arc<DurablePersistence>,
    mirror: Arc<CacheMirror>,
    cleaner: Arc<LifecycleCleaner>,
    loaded: OnceCell<()>,
    cleaner_handle: Mutex<Option<CleanerHandle>>,
}

impl LifecycleTracker {
    pub fn new(
        config: LifecycleConfig,
        cache: Arc<dyn NamespacedCache>,
        decoder: Arc<dyn TokenDecoder>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LifecycleError> {
        config.validate()?;

        let store = Arc::new(TokenSetStore::new());
        let persistence = Arc::new(DurablePersistence::from_config(&config));
        let mirror = Arc::new(CacheMirror::new(
            cache,
            store.clone(),
            config.cache_namespace.clone(),
            config.token_cache_duration_secs,
        ));
        let cleaner = Arc::new(LifecycleCleaner::new(
            store.clone(),
            persistence.clone(),
            mirror.clone(),
            decoder,
            clock,
            config.retention_ms(),
        ));

        Ok(Self {
            config,
            store,
            persistence,
            mirror,
            cleaner,
            loaded: OnceCell::new(),
            cleaner_handle: Mutex::new(None),
        })
    }

    /// Read both persisted lists once, on first need
    async fn ensure_loaded(&self) {
        self.loaded
            .get_or_init(|| async {
                for kind in TokenKind::ALL {
                    let tokens = self.persistence.load(kind).await;
                    let adopted = self.store.extend(kind, tokens);
                    info!(kind = %kind, count = adopted, "Token list loaded");
                }
            })
            .await;
    }

    /// Load persisted state and start the periodic cleanup tasks
    pub async fn start(&self) -> Result<(), LifecycleError> {
        self.ensure_loaded().await;

        let mut handle = self.cleaner_handle.lock().await;
        if handle.is_some() {
            return Err(LifecycleError::AlreadyStarted);
        }
        *handle = Some(self.cleaner.spawn(self.config.cleanup_interval()));
        Ok(())
    }

    pub async fn is_token_revoked(&self, token: &str) -> bool {
        self.ensure_loaded().await;
        self.mirror.is_revoked(token).await
    }

    pub async fn is_token_expired(&self, token: &str) -> bool {
        self.ensure_loaded().await;
        self.mirror.is_expired(token).await
    }

    /// Invalidate `token` before its encoded expiry.
    ///
    /// Visible to `is_token_revoked` in this process as soon as this returns.
    /// Persistence failures are logged only. Returns whether the token was
    /// newly revoked.
    pub async fn revoke_token(&self, token: &str) -> bool {
        let newly_revoked = self.store.add(TokenKind::Revoked, token);
        self.ensure_loaded().await;

        self.mirror.mark_revoked(token).await;
        self.mirror.invalidate_list_cache().await;

        if newly_revoked {
            crate::metrics::record_tracked(TokenKind::Revoked);
            self.persist_addition(TokenKind::Revoked, token).await;
            info!(token = %fingerprint(token), "Token revoked");
        } else {
            debug!(token = %fingerprint(token), "Token already revoked");
        }
        newly_revoked
    }

    /// Record that `token` is expired, caching the answer for at most
    /// `ttl_seconds` (bounded by the configured cache duration).
    pub async fn expire_token(&self, token: &str, ttl_seconds: u64) -> bool {
        let newly_expired = self.store.add(TokenKind::Expired, token);
        self.ensure_loaded().await;

        let ttl = self
            .config
            .token_cache_duration_secs
            .min(ttl_seconds)
            .max(1);
        self.mirror.mark_expired(token, ttl).await;
        self.mirror.invalidate_list_cache().await;

        if newly_expired {
            crate::metrics::record_tracked(TokenKind::Expired);
            self.persist_addition(TokenKind::Expired, token).await;
            info!(token = %fingerprint(token), ttl_secs = ttl, "Token marked expired");
        }
        newly_expired
    }

    async fn persist_addition(&self, kind: TokenKind, token: &str) {
        let token = token.to_string();
        match self
            .persistence
            .update(kind, move |on_disk| {
                on_disk.insert(token);
            })
            .await
        {
            Ok(merged) => {
                let adopted = self.store.extend(kind, merged);
                if adopted > 0 {
                    debug!(kind = %kind, adopted, "Merged tokens persisted by other processes");
                }
            }
            Err(e) => {
                error!(kind = %kind, error = %e, "Failed to persist token list");
                crate::metrics::record_persistence_failure(kind, e.kind());
            }
        }
    }

    /// Stop the cleanup tasks and clear this tracker's cache namespace
    pub async fn shutdown(&self) {
        if let Some(handle) = self.cleaner_handle.lock().await.take() {
            handle.stop().await;
        }
        self.mirror.clear().await;
        info!("Token lifecycle tracker shut down");
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TokenSetStore> {
        &self.store
    }

    pub fn persistence(&self) -> &Arc<DurablePersistence> {
        &self.persistence
    }

    pub fn mirror(&self) -> &Arc<CacheMirror> {
        &self.mirror
    }

    pub fn cleaner(&self) -> &Arc<LifecycleCleaner> {
        &self.cleaner
    }
}
