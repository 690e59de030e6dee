//! In-memory cache store.

use super::clock::{Clock, SystemClock};
use super::namespace::{namespace_of, CachePolicy};
use super::traits::{CacheBackend, CacheEntry, CacheStats, NamespaceStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagewright_core::{PagewrightResult, StorageError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Single-process TTL cache over one `RwLock<HashMap>`.
///
/// Nothing here coordinates across processes; each server instance holds
/// its own independent cache.
#[derive(Debug)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl MemoryCacheStore {
    /// Create a store using the wall clock.
    pub fn new(policy: CachePolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a store with an explicit clock.
    pub fn with_clock(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Copy of a raw entry, expired or not. Does not touch counters.
    pub fn peek(&self, key: &str) -> PagewrightResult<Option<CacheEntry>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, CacheEntry>>, StorageError> {
        self.entries.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, CacheEntry>>, StorageError> {
        self.entries.write().map_err(|_| StorageError::LockPoisoned)
    }

    fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn miss(&self) -> PagewrightResult<Option<String>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheStore {
    async fn get(&self, key: &str) -> PagewrightResult<Option<String>> {
        let now = self.clock.now();
        {
            let entries = self.read()?;
            match entries.get(key) {
                None => return self.miss(),
                Some(entry) if !entry.is_expired_at(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }

        // Expired: evict under the write lock, re-checking in case a fresh
        // value landed between the two locks.
        let mut entries = self.write()?;
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired_at(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.value.clone()));
            }
            entries.remove(key);
        }
        self.miss()
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> PagewrightResult<()> {
        let namespace = namespace_of(key).to_string();
        let ttl = ttl.unwrap_or_else(|| self.policy.ttl_for(&namespace));
        let now = self.clock.now();
        let entry = CacheEntry {
            key: key.to_string(),
            size_bytes: key.len() + value.len(),
            value,
            namespace,
            created_at: now,
            expires_at: Self::expiry(now, ttl),
        };
        self.write()?.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> PagewrightResult<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    async fn delete_by_namespace(&self, namespace: &str) -> PagewrightResult<u64> {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.namespace != namespace);
        Ok((before - entries.len()) as u64)
    }

    async fn clear(&self) -> PagewrightResult<u64> {
        let mut entries = self.write()?;
        let removed = entries.len() as u64;
        entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        Ok(removed)
    }

    async fn purge_expired(&self) -> PagewrightResult<u64> {
        let now = self.clock.now();
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        Ok((before - entries.len()) as u64)
    }

    async fn stats(&self) -> PagewrightResult<CacheStats> {
        let entries = self.read()?;
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: entries.len() as u64,
            ..Default::default()
        };
        for entry in entries.values() {
            stats.total_bytes += entry.size_bytes as u64;
            let ns: &mut NamespaceStats = stats.namespaces.entry(entry.namespace.clone()).or_default();
            ns.keys += 1;
            ns.bytes += entry.size_bytes as u64;
        }
        Ok(stats)
    }

    async fn len(&self) -> PagewrightResult<usize> {
        Ok(self.read()?.len())
    }
}

// ============================================================================
// TESTS
// ============================================================================
