//! Cache Reaper Background Task
//!
//! Expired cache entries are evicted lazily on read, so a key that is never
//! read again would stay resident forever. The reaper sweeps them on a fixed
//! interval and refreshes the `pagewright_cache_entries` gauge.
//!
//! # Configuration
//!
//! ```rust
//! use pagewright_api::jobs::CacheReaperConfig;
//! use std::time::Duration;
//!
//! let config = CacheReaperConfig {
//!     interval: Duration::from_secs(60),
//! };
//! ```

use pagewright_storage::CacheBackend;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::constants::DEFAULT_CACHE_REAP_INTERVAL_SECS;
use crate::telemetry::metrics;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CacheReaperConfig {
    /// Time between sweeps (default: 60 seconds)
    pub interval: Duration,
}

impl Default for CacheReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CACHE_REAP_INTERVAL_SECS),
        }
    }
}

impl CacheReaperConfig {
    /// Create CacheReaperConfig from environment variables.
    ///
    /// - `PAGEWRIGHT_CACHE_REAP_INTERVAL_SECS`: sweep interval (default: 60)
    pub fn from_env() -> Self {
        let interval = std::env::var("PAGEWRIGHT_CACHE_REAP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_CACHE_REAP_INTERVAL_SECS));
        Self { interval }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters kept for the lifetime of one reaper task.
#[derive(Debug, Default)]
pub struct CacheReaperMetrics {
    /// Total expired entries removed since startup
    pub entries_purged: AtomicU64,

    /// Total sweeps completed
    pub sweeps: AtomicU64,

    /// Total sweeps that failed
    pub sweep_errors: AtomicU64,
}

impl CacheReaperMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CacheReaperSnapshot {
        CacheReaperSnapshot {
            entries_purged: self.entries_purged.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of reaper metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheReaperSnapshot {
    pub entries_purged: u64,
    pub sweeps: u64,
    pub sweep_errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Sweep expired cache entries until the shutdown signal flips.
///
/// The first sweep runs immediately. Ticks missed while a sweep is slow are
/// skipped, not replayed.
///
/// # Example
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = tokio::spawn(cache_reaper_task(cache, CacheReaperConfig::from_env(), shutdown_rx));
///
/// // Later, trigger shutdown
/// let _ = shutdown_tx.send(true);
/// let metrics = handle.await?;
/// ```
pub async fn cache_reaper_task(
    cache: Arc<dyn CacheBackend>,
    config: CacheReaperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<CacheReaperMetrics> {
    let reaper_metrics = Arc::new(CacheReaperMetrics::new());

    let mut sweep_interval = interval(config.interval);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_secs = config.interval.as_secs(),
        "Cache reaper task started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // A dropped sender also means shutdown.
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Cache reaper task shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                sweep(cache.as_ref(), &reaper_metrics).await;
            }
        }
    }

    let snapshot = reaper_metrics.snapshot();
    tracing::info!(
        entries_purged = snapshot.entries_purged,
        sweeps = snapshot.sweeps,
        sweep_errors = snapshot.sweep_errors,
        "Cache reaper task completed"
    );

    reaper_metrics
}

/// One sweep: purge, then refresh the entry gauge.
async fn sweep(cache: &dyn CacheBackend, reaper_metrics: &CacheReaperMetrics) {
    reaper_metrics.sweeps.fetch_add(1, Ordering::Relaxed);

    match cache.purge_expired().await {
        Ok(0) => tracing::trace!("Cache sweep found nothing expired"),
        Ok(purged) => {
            reaper_metrics
                .entries_purged
                .fetch_add(purged, Ordering::Relaxed);
            tracing::debug!(purged, "Expired cache entries purged");
        }
        Err(e) => {
            reaper_metrics.sweep_errors.fetch_add(1, Ordering::Relaxed);
            tracing::error!(error = %e, "Cache sweep failed");
            return;
        }
    }

    match cache.len().await {
        Ok(count) => {
            if let Some(m) = metrics() {
                m.set_cache_entries(count);
            }
        }
        Err(e) => tracing::warn!(error = %e, "Could not read cache size"),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pagewright_storage::{CacheKey, CachePolicy, ManualClock, MemoryCacheStore};

    #[test]
    fn test_config_default() {
        let config = CacheReaperConfig::default();
        assert_eq!(
            config.interval,
            Duration::from_secs(DEFAULT_CACHE_REAP_INTERVAL_SECS)
        );
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = CacheReaperMetrics::new();
        metrics.entries_purged.store(7, Ordering::Relaxed);
        metrics.sweeps.store(2, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.entries_purged, 7);
        assert_eq!(snapshot.sweeps, 2);
        assert_eq!(snapshot.sweep_errors, 0);
    }

    #[tokio::test]
    async fn test_sweep_purges_only_expired_entries() -> Result<(), String> {
        let clock = Arc::new(ManualClock::default());
        let policy = CachePolicy::default().with_namespace_ttl("company", Duration::from_secs(10));
        let cache = MemoryCacheStore::with_clock(policy, clock.clone());

        cache
            .set(&CacheKey::company(), "{}".to_string(), None)
            .await
            .map_err(|e| e.to_string())?;
        cache
            .set(&CacheKey::site(), "{}".to_string(), Some(Duration::from_secs(3600)))
            .await
            .map_err(|e| e.to_string())?;
        clock.advance(chrono::Duration::seconds(10));

        let reaper_metrics = CacheReaperMetrics::new();
        sweep(&cache, &reaper_metrics).await;

        let snapshot = reaper_metrics.snapshot();
        assert_eq!(snapshot.entries_purged, 1);
        assert_eq!(snapshot.sweeps, 1);
        assert_eq!(cache.len().await.map_err(|e| e.to_string())?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_task_sweeps_then_stops_on_shutdown() -> Result<(), String> {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(MemoryCacheStore::with_clock(CachePolicy::default(), clock.clone()));
        cache
            .set(&CacheKey::page("/kenner/roof-repair"), "{}".to_string(), Some(Duration::from_secs(1)))
            .await
            .map_err(|e| e.to_string())?;
        clock.advance(chrono::Duration::seconds(5));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = CacheReaperConfig {
            interval: Duration::from_secs(3600),
        };
        let handle = tokio::spawn(cache_reaper_task(cache.clone(), config, shutdown_rx));

        // The first tick fires immediately; wait for it to land.
        for _ in 0..100 {
            if cache.len().await.map_err(|e| e.to_string())? == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown_tx.send(true).map_err(|e| e.to_string())?;

        let reaper_metrics = handle.await.map_err(|e| e.to_string())?;
        let snapshot = reaper_metrics.snapshot();
        assert_eq!(snapshot.entries_purged, 1);
        assert!(snapshot.sweeps >= 1);
        Ok(())
    }
}
