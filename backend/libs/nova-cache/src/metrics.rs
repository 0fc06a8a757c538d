//! Cache metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    misses: CounterVec,
    writes: CounterVec,
    invalidations: CounterVec,
    errors: CounterVec,
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: CounterVec::new(
                Opts::new("nova_cache_hits_total", "Total cache hits"),
                &["namespace"],
            )
            .expect("valid metric definition"),
            misses: CounterVec::new(
                Opts::new("nova_cache_misses_total", "Total cache misses"),
                &["namespace"],
            )
            .expect("valid metric definition"),
            writes: CounterVec::new(
                Opts::new("nova_cache_writes_total", "Total cache writes"),
                &["namespace"],
            )
            .expect("valid metric definition"),
            invalidations: CounterVec::new(
                Opts::new(
                    "nova_cache_invalidations_total",
                    "Total cache invalidations",
                ),
                &["namespace"],
            )
            .expect("valid metric definition"),
            errors: CounterVec::new(
                Opts::new("nova_cache_errors_total", "Total cache errors"),
                &["namespace", "error_type"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.invalidations.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

/// Extract the namespace from a fully qualified cache key for labeling
fn extract_namespace(key: &str) -> &str {
    // Format: v{N}:{namespace}:...
    key.split(':').nth(1).unwrap_or("unknown")
}

/// Cache metrics wrapper
#[derive(Clone, Default)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_hit(&self, key: &str) {
        let namespace = extract_namespace(key);
        get_metrics().hits.with_label_values(&[namespace]).inc();
    }

    pub fn record_miss(&self, key: &str) {
        let namespace = extract_namespace(key);
        get_metrics().misses.with_label_values(&[namespace]).inc();
    }

    pub fn record_write(&self, key: &str) {
        let namespace = extract_namespace(key);
        get_metrics().writes.with_label_values(&[namespace]).inc();
    }

    pub fn record_invalidation(&self, key: &str) {
        let namespace = extract_namespace(key);
        get_metrics()
            .invalidations
            .with_label_values(&[namespace])
            .inc();
    }

    pub fn record_error(&self, key: &str, error_type: &str) {
        let namespace = extract_namespace(key);
        get_metrics()
            .errors
            .with_label_values(&[namespace, error_type])
            .inc();
    }
}
