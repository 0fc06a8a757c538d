//! Periodic cleanup of the tracked token sets
//!
//! Two independent tasks, one per [`TokenKind`], so that a slow pass over one
//! list never delays the other:
//!
//! - expired pass: drop tokens whose `exp` has passed
//! - revoked pass: drop tokens issued before `now - retention`
//!
//! Each pass starts by reconciling the in-memory set with the full list
//! (cached aggregate, else the file on disk), which is how revocations made by
//! other processes reach this one.

use crate::external::{Clock, TokenDecoder, UnverifiedClaims};
use crate::mirror::{fingerprint, CacheMirror};
use crate::persistence::DurablePersistence;
use crate::store::{TokenKind, TokenSetStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a single cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub scanned: usize,
    pub removed: usize,
    /// Tokens that could not be decoded or lacked the relevant claim
    pub skipped: usize,
}

pub struct LifecycleCleaner {
    store: Arc<TokenSetStore>,
    persistence: Arc<DurablePersistence>,
    mirror: Arc<CacheMirror>,
    decoder: Arc<dyn TokenDecoder>,
    clock: Arc<dyn Clock>,
    retention_ms: i64,
}

impl LifecycleCleaner {
    pub fn new(
        store: Arc<TokenSetStore>,
        persistence: Arc<DurablePersistence>,
        mirror: Arc<CacheMirror>,
        decoder: Arc<dyn TokenDecoder>,
        clock: Arc<dyn Clock>,
        retention_ms: i64,
    ) -> Self {
        Self {
            store,
            persistence,
            mirror,
            decoder,
            clock,
            retention_ms,
        }
    }

    pub async fn run_expired_pass(&self) -> CleanupReport {
        let now_ms = self.clock.now_millis();
        self.run_pass(TokenKind::Expired, move |claims| {
            claims.exp.map(|exp| exp.saturating_mul(1000) < now_ms)
        })
        .await
    }

    pub async fn run_revoked_pass(&self) -> CleanupReport {
        let cutoff_ms = self.clock.now_millis().saturating_sub(self.retention_ms);
        self.run_pass(TokenKind::Revoked, move |claims| {
            claims.iat.map(|iat| iat.saturating_mul(1000) < cutoff_ms)
        })
        .await
    }

    pub async fn run_pass_for(&self, kind: TokenKind) -> CleanupReport {
        match kind {
            TokenKind::Expired => self.run_expired_pass().await,
            TokenKind::Revoked => self.run_revoked_pass().await,
        }
    }

    /// Full list for `kind`, merged into the in-memory set
    async fn reconcile(&self, kind: TokenKind) -> HashSet<String> {
        let listed = match self.mirror.cached_list(kind).await {
            Some(tokens) => tokens,
            None => {
                let tokens = self.persistence.load(kind).await;
                self.mirror.store_list(kind, &tokens).await;
                tokens
            }
        };

        let adopted = self.store.extend(kind, listed);
        if adopted > 0 {
            info!(kind = %kind, adopted, "Adopted tokens tracked by other processes");
        }
        self.store.snapshot(kind)
    }

    async fn run_pass<F>(&self, kind: TokenKind, is_stale: F) -> CleanupReport
    where
        F: Fn(&UnverifiedClaims) -> Option<bool> + Send,
    {
        let tokens = self.reconcile(kind).await;
        let mut report = CleanupReport {
            scanned: tokens.len(),
            ..CleanupReport::default()
        };

        let mut stale = HashSet::new();
        for token in tokens {
            match self.decoder.decode(&token).and_then(|claims| is_stale(&claims)) {
                Some(true) => {
                    stale.insert(token);
                }
                Some(false) => {}
                None => {
                    report.skipped += 1;
                    warn!(
                        kind = %kind,
                        token = %fingerprint(&token),
                        "Skipping token without a decodable timestamp during cleanup"
                    );
                }
            }
        }

        if stale.is_empty() {
            debug!(kind = %kind, scanned = report.scanned, "Token cleanup found nothing to remove");
            return report;
        }

        for token in &stale {
            if self.store.remove(kind, token) {
                report.removed += 1;
            }
            self.mirror.forget(kind, token).await;
        }

        let current = self.store.snapshot(kind);
        let persisted = self
            .persistence
            .update(kind, move |on_disk| {
                on_disk.extend(current);
                on_disk.retain(|token| !stale.contains(token));
            })
            .await;
        if let Err(e) = persisted {
            error!(kind = %kind, error = %e, "Failed to persist token list after cleanup");
            crate::metrics::record_persistence_failure(kind, "cleanup");
        }

        self.mirror.invalidate_list_cache().await;
        crate::metrics::record_cleanup(kind, report.removed);
        info!(
            kind = %kind,
            scanned = report.scanned,
            removed = report.removed,
            skipped = report.skipped,
            "Token cleanup pass completed"
        );
        report
    }

    /// Start both periodic passes. The first run happens one `interval` after start.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> CleanerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = TokenKind::ALL
            .into_iter()
            .map(|kind| {
                tokio::spawn(run_periodically(
                    self.clone(),
                    kind,
                    interval,
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        info!(interval_secs = interval.as_secs(), "Token cleanup tasks started");
        CleanerHandle { shutdown_tx, tasks }
    }
}

async fn run_periodically(
    cleaner: Arc<LifecycleCleaner>,
    kind: TokenKind,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!(kind = %kind, "Token cleanup task shutting down");
                break;
            }
            _ = ticker.tick() => {
                let report = cleaner.run_pass_for(kind).await;
                debug!(kind = %kind, removed = report.removed, "Scheduled token cleanup ran");
            }
        }
    }
}

/// Owns the two cleanup tasks; dropping it also stops them
pub struct CleanerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl CleanerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);

        for mut task in self.tasks {
            match tokio::time::timeout(STOP_TIMEOUT, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Token cleanup task ended abnormally"),
                Err(_) => {
                    warn!("Token cleanup task did not stop within timeout, aborting");
                    task.abort();
                }
            }
        }
        info!("Token cleanup tasks stopped");
    }
}
