//! Unified cache key schema
//!
//! Every key lives inside a namespace so that subsystems sharing one Redis
//! never collide. Key format: v{VERSION}:{namespace}:{key}

/// Cache schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 2;

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Fully qualified key
    /// Format: v2:{namespace}:{key}
    pub fn namespaced(namespace: &str, key: &str) -> String {
        format!("v{}:{}:{}", CACHE_VERSION, namespace, key)
    }

    /// Prefix shared by every key of a namespace
    /// Format: v2:{namespace}:
    pub fn namespace_prefix(namespace: &str) -> String {
        format!("v{}:{}:", CACHE_VERSION, namespace)
    }

    /// SCAN pattern matching every key of a namespace
    pub fn namespace_pattern(namespace: &str) -> String {
        format!("{}*", Self::namespace_prefix(namespace))
    }
}
