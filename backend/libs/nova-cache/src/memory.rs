//! In-process cache backend for single-node deployments and tests

use crate::{CacheKey, CacheMetrics, CacheResult, NamespacedCache};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const DEFAULT_MAX_ENTRIES: usize = 100_000;
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// DashMap-backed cache honouring the same key schema and TTL semantics as
/// [`crate::RedisCache`]
///
/// **Bounds**:
/// - expired entries are swept on write, at most once per sweep interval
/// - past `max_entries`, roughly 10% of entries are evicted (FIFO approximation)
#[derive(Clone)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, Entry>>,
    metrics: CacheMetrics,
    max_entries: usize,
    sweep_interval_ms: u64,
    started: Instant,
    /// Milliseconds since `started` at the last sweep
    last_sweep_ms: Arc<AtomicU64>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES, DEFAULT_SWEEP_INTERVAL)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_entries: usize, sweep_interval: Duration) -> Self {
        debug!(
            max_entries,
            sweep_interval_secs = sweep_interval.as_secs(),
            "Initializing memory cache"
        );

        Self {
            entries: Arc::new(DashMap::new()),
            metrics: CacheMetrics::new(),
            max_entries: max_entries.max(1),
            sweep_interval_ms: u64::try_from(sweep_interval.as_millis()).unwrap_or(u64::MAX),
            started: Instant::now(),
            last_sweep_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Drop expired entries if the sweep interval has elapsed
    fn maybe_sweep(&self, now: Instant) {
        let elapsed_ms =
            u64::try_from(now.duration_since(self.started).as_millis()).unwrap_or(u64::MAX);
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if elapsed_ms.saturating_sub(last) < self.sweep_interval_ms {
            return;
        }
        // One writer sweeps; the others carry on
        if self
            .last_sweep_ms
            .compare_exchange(last, elapsed_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let swept = before.saturating_sub(self.entries.len());
        if swept > 0 {
            debug!(swept, "Memory cache swept expired entries");
        }
    }

    /// Keep the entry count under `max_entries` before a new key is inserted
    fn enforce_limits(&self, now: Instant) {
        if self.entries.len() < self.max_entries {
            return;
        }

        self.entries.retain(|_, entry| entry.expires_at > now);
        if self.entries.len() < self.max_entries {
            return;
        }

        let evict_count = (self.entries.len() / 10).max(1);
        warn!(
            current_entries = self.entries.len(),
            evict_count, "Memory cache limit exceeded, evicting entries"
        );

        let keys_to_evict: Vec<String> = self
            .entries
            .iter()
            .take(evict_count)
            .map(|entry| entry.key().clone())
            .collect();
        for key in keys_to_evict {
            self.entries.remove(&key);
        }
    }

    /// Number of live (non-expired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl NamespacedCache for MemoryCache {
    async fn get_raw(&self, namespace: &str, key: &str) -> CacheResult<Option<String>> {
        let full_key = CacheKey::namespaced(namespace, key);
        let now = Instant::now();

        let hit = self
            .entries
            .get(&full_key)
            .map(|entry| (entry.value.clone(), entry.expires_at));

        match hit {
            Some((value, expires_at)) if expires_at > now => {
                self.metrics.record_hit(&full_key);
                Ok(Some(value))
            }
            Some(_) => {
                self.entries.remove(&full_key);
                self.metrics.record_miss(&full_key);
                Ok(None)
            }
            None => {
                self.metrics.record_miss(&full_key);
                Ok(None)
            }
        }
    }

    async fn set_raw(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl_secs: u64,
    ) -> CacheResult<()> {
        let full_key = CacheKey::namespaced(namespace, key);
        let now = Instant::now();
        self.maybe_sweep(now);
        if !self.entries.contains_key(&full_key) {
            self.enforce_limits(now);
        }

        let expires_at = now + Duration::from_secs(ttl_secs.max(1));
        self.entries
            .insert(full_key.clone(), Entry { value, expires_at });

        debug!(key = %full_key, ttl = ttl_secs, "Memory cache set");
        self.metrics.record_write(&full_key);
        Ok(())
    }

    async fn del(&self, namespace: &str, key: &str) -> CacheResult<()> {
        let full_key = CacheKey::namespaced(namespace, key);
        self.entries.remove(&full_key);
        self.metrics.record_invalidation(&full_key);
        Ok(())
    }

    async fn clear_namespace(&self, namespace: &str) -> CacheResult<usize> {
        let prefix = CacheKey::namespace_prefix(namespace);
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        let removed = before.saturating_sub(self.entries.len());

        debug!(namespace = %namespace, removed, "Memory cache namespace cleared");
        Ok(removed)
    }
}
