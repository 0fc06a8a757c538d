//! Nova unified caching layer
//!
//! Provides a namespaced key/value cache with expiration:
//! - Unified key schema with versioning and per-subsystem namespaces
//! - SCAN-based namespace invalidation (no blocking KEYS)
//! - Redis backend for multi-process deployments, in-memory backend for single nodes
//! - Metrics integration

mod error;
mod keys;
mod memory;
mod metrics;

pub use error::{CacheError, CacheResult};
pub use keys::{CacheKey, CACHE_VERSION};
pub use memory::MemoryCache;
pub use metrics::CacheMetrics;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Pipeline};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Shared Redis connection manager
pub type SharedRedis = Arc<Mutex<ConnectionManager>>;

/// Core namespaced cache operations.
///
/// Values are opaque strings; use [`CacheExt`] for JSON-typed access.
#[async_trait::async_trait]
pub trait NamespacedCache: Send + Sync {
    /// Get a raw value, `None` on miss or expiry
    async fn get_raw(&self, namespace: &str, key: &str) -> CacheResult<Option<String>>;

    /// Set a raw value with TTL (seconds)
    async fn set_raw(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl_secs: u64,
    ) -> CacheResult<()>;

    /// Delete a key
    async fn del(&self, namespace: &str, key: &str) -> CacheResult<()>;

    /// Delete every key of a namespace, returning how many were removed
    async fn clear_namespace(&self, namespace: &str) -> CacheResult<usize>;
}

/// JSON-typed helpers available on every [`NamespacedCache`]
#[async_trait::async_trait]
pub trait CacheExt: NamespacedCache {
    async fn get<T: DeserializeOwned + Send>(
        &self,
        namespace: &str,
        key: &str,
    ) -> CacheResult<Option<T>> {
        match self.get_raw(namespace, key).await? {
            Some(data) => match serde_json::from_str::<T>(&data) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!(namespace = %namespace, key = %key, error = %e, "Cache deserialization failed");
                    // Drop the corrupted entry so the next read repopulates it
                    let _ = self.del(namespace, key).await;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> CacheResult<()> {
        let data = serde_json::to_string(value)?;
        self.set_raw(namespace, key, data, ttl_secs).await
    }
}

impl<C: NamespacedCache + ?Sized> CacheExt for C {}

/// Redis-backed cache shared by every process of a deployment
#[derive(Clone)]
pub struct RedisCache {
    redis: SharedRedis,
    metrics: CacheMetrics,
}

impl RedisCache {
    pub fn new(redis: SharedRedis) -> Self {
        Self {
            redis,
            metrics: CacheMetrics::new(),
        }
    }

    pub fn with_metrics(redis: SharedRedis, metrics: CacheMetrics) -> Self {
        Self { redis, metrics }
    }

    /// Subtract jitter from TTL to spread expirations without ever
    /// exceeding the requested lifetime
    fn apply_jitter(ttl_secs: u64) -> u64 {
        let jitter_percent = (rand::random::<u32>() % 10) as f64 / 100.0;
        let jitter = (ttl_secs as f64 * jitter_percent).round() as u64;
        ttl_secs.saturating_sub(jitter).max(1)
    }
}

#[async_trait::async_trait]
impl NamespacedCache for RedisCache {
    async fn get_raw(&self, namespace: &str, key: &str) -> CacheResult<Option<String>> {
        let full_key = CacheKey::namespaced(namespace, key);
        let mut conn = self.redis.lock().await;

        match conn.get::<_, Option<String>>(&full_key).await {
            Ok(Some(data)) => {
                debug!(key = %full_key, "Cache hit");
                self.metrics.record_hit(&full_key);
                Ok(Some(data))
            }
            Ok(None) => {
                debug!(key = %full_key, "Cache miss");
                self.metrics.record_miss(&full_key);
                Ok(None)
            }
            Err(e) => {
                warn!(key = %full_key, error = %e, "Redis get error");
                self.metrics.record_error(&full_key, "redis");
                Err(CacheError::Redis(e))
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
        let ttl_with_jitter = Self::apply_jitter(ttl_secs);

        let mut conn = self.redis.lock().await;
        conn.set_ex::<_, _, ()>(&full_key, value, ttl_with_jitter)
            .await
            .map_err(|e| {
                self.metrics.record_error(&full_key, "redis");
                CacheError::Redis(e)
            })?;

        debug!(key = %full_key, ttl = ttl_with_jitter, "Cache set");
        self.metrics.record_write(&full_key);
        Ok(())
    }

    async fn del(&self, namespace: &str, key: &str) -> CacheResult<()> {
        let full_key = CacheKey::namespaced(namespace, key);
        let mut conn = self.redis.lock().await;
        conn.del::<_, ()>(&full_key).await.map_err(|e| {
            self.metrics.record_error(&full_key, "redis");
            CacheError::Redis(e)
        })?;

        debug!(key = %full_key, "Cache delete");
        self.metrics.record_invalidation(&full_key);
        Ok(())
    }

    async fn clear_namespace(&self, namespace: &str) -> CacheResult<usize> {
        let pattern = CacheKey::namespace_pattern(namespace);
        let mut conn = self.redis.lock().await;
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            // Use SCAN instead of KEYS to avoid blocking
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut *conn)
                .await
                .map_err(CacheError::Redis)?;

            if !keys.is_empty() {
                let mut pipe = Pipeline::new();
                for key in &keys {
                    pipe.del(key);
                }
                pipe.query_async::<_, ()>(&mut *conn)
                    .await
                    .map_err(CacheError::Redis)?;

                total_deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, deleted = total_deleted, "Cache namespace cleared");
        Ok(total_deleted)
    }
}
