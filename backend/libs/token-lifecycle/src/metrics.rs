//! Prometheus metrics for token lifecycle tracking

use crate::error::Rejection;
use crate::store::TokenKind;
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<LifecycleMetrics> = OnceLock::new();

struct LifecycleMetrics {
    rejections: IntCounterVec,
    tracked: IntCounterVec,
    cleanup_removed: IntCounterVec,
    persistence_failures: IntCounterVec,
}

impl LifecycleMetrics {
    fn new() -> Self {
        Self {
            rejections: IntCounterVec::new(
                Opts::new(
                    "token_gate_rejections_total",
                    "Authentication attempts rejected by the gate",
                ),
                &["reason"],
            )
            .expect("valid metric definition"),
            tracked: IntCounterVec::new(
                Opts::new(
                    "token_lifecycle_tracked_total",
                    "Tokens newly added to a tracked set",
                ),
                &["kind"],
            )
            .expect("valid metric definition"),
            cleanup_removed: IntCounterVec::new(
                Opts::new(
                    "token_lifecycle_cleanup_removed_total",
                    "Tokens dropped by periodic cleanup",
                ),
                &["kind"],
            )
            .expect("valid metric definition"),
            persistence_failures: IntCounterVec::new(
                Opts::new(
                    "token_lifecycle_persistence_failures_total",
                    "Failed reads or writes of persisted token lists",
                ),
                &["kind", "operation"],
            )
            .expect("valid metric definition"),
        }
    }
}

fn get_metrics() -> &'static LifecycleMetrics {
    METRICS.get_or_init(LifecycleMetrics::new)
}

/// Register lifecycle metrics with a Prometheus registry
pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
    let metrics = get_metrics();
    registry.register(Box::new(metrics.rejections.clone()))?;
    registry.register(Box::new(metrics.tracked.clone()))?;
    registry.register(Box::new(metrics.cleanup_removed.clone()))?;
    registry.register(Box::new(metrics.persistence_failures.clone()))?;
    Ok(())
}

pub(crate) fn record_rejection(rejection: Rejection) {
    get_metrics()
        .rejections
        .with_label_values(&[rejection.reason()])
        .inc();
}

pub(crate) fn record_tracked(kind: TokenKind) {
    get_metrics()
        .tracked
        .with_label_values(&[kind.as_str()])
        .inc();
}

pub(crate) fn record_cleanup(kind: TokenKind, removed: usize) {
    get_metrics()
        .cleanup_removed
        .with_label_values(&[kind.as_str()])
        .inc_by(removed as u64);
}

pub(crate) fn record_persistence_failure(kind: TokenKind, operation: &str) {
    get_metrics()
        .persistence_failures
        .with_label_values(&[kind.as_str(), operation])
        .inc();
}
