//! Cache backend trait, entry shape and statistics.

use async_trait::async_trait;
use pagewright_core::{PagewrightResult, Timestamp};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A single cached value and its bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub namespace: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    /// Key plus value length in bytes.
    pub size_bytes: usize,
}

impl CacheEntry {
    /// An entry is expired from `expires_at` onwards.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Cache backend for pluggable implementations.
///
/// All operations are atomic with respect to one store. A `get` that races
/// with a delete or a reaper sweep observes either the whole entry or a miss.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Read a value. Absent and expired keys are misses; an expired entry is
    /// removed as a side effect.
    async fn get(&self, key: &str) -> PagewrightResult<Option<String>>;

    /// Store a value. `ttl` overrides the namespace default when given.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> PagewrightResult<()>;

    /// Remove one key. Returns whether it existed.
    async fn delete(&self, key: &str) -> PagewrightResult<bool>;

    /// Remove every entry in a namespace. Returns the number removed.
    async fn delete_by_namespace(&self, namespace: &str) -> PagewrightResult<u64>;

    /// Remove everything and reset hit/miss counters. Administrative only.
    async fn clear(&self) -> PagewrightResult<u64>;

    /// Remove every entry already past its expiry. Returns the number removed.
    async fn purge_expired(&self) -> PagewrightResult<u64>;

    /// Current statistics.
    async fn stats(&self) -> PagewrightResult<CacheStats>;

    /// Number of stored entries, expired or not.
    async fn len(&self) -> PagewrightResult<usize>;
}

/// Read and deserialize a JSON value. Undecodable entries count as misses.
pub async fn get_json<T, C>(cache: &C, key: &str) -> PagewrightResult<Option<T>>
where
    T: DeserializeOwned,
    C: CacheBackend + ?Sized,
{
    Ok(cache
        .get(key)
        .await?
        .and_then(|raw| serde_json::from_str(&raw).ok()))
}

/// Serialize and store a JSON value. Values that fail to serialize are
/// logged and not cached; the cache is never authoritative.
pub async fn set_json<T, C>(cache: &C, key: &str, value: &T, ttl: Option<Duration>) -> PagewrightResult<()>
where
    T: Serialize + Sync,
    C: CacheBackend + ?Sized,
{
    match serde_json::to_string(value) {
        Ok(raw) => cache.set(key, raw, ttl).await,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cache value not serializable, skipping write");
            Ok(())
        }
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Per-namespace usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NamespaceStats {
    pub keys: u64,
    pub bytes: u64,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of cache hits since the last clear.
    pub hits: u64,
    /// Number of cache misses since the last clear.
    pub misses: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
    /// Approximate memory usage in bytes.
    pub total_bytes: u64,
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
