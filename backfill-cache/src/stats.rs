//! Lookup counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by all clones of a lookup.
#[derive(Debug, Default)]
pub struct LookupStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_refreshes: AtomicU64,
    remote_fetches: AtomicU64,
    remote_failures: AtomicU64,
    backfills: AtomicU64,
    backfill_failures: AtomicU64,
    cache_read_failures: AtomicU64,
}

impl LookupStats {
    /// Create a set of counters, all zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_refresh(&self) {
        self.stale_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_fetch(&self) {
        self.remote_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remote_failure(&self) {
        self.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_backfill(&self) {
        self.backfills.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_backfill_failure(&self) {
        self.backfill_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_read_failure(&self) {
        self.cache_read_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> LookupStatsSnapshot {
        LookupStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_refreshes: self.stale_refreshes.load(Ordering::Relaxed),
            remote_fetches: self.remote_fetches.load(Ordering::Relaxed),
            remote_failures: self.remote_failures.load(Ordering::Relaxed),
            backfills: self.backfills.load(Ordering::Relaxed),
            backfill_failures: self.backfill_failures.load(Ordering::Relaxed),
            cache_read_failures: self.cache_read_failures.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about lookup usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LookupStatsSnapshot {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that went to the remote source, stale refreshes included.
    pub misses: u64,
    /// Misses caused by a cached value older than the freshness bound.
    pub stale_refreshes: u64,
    /// Calls made to the remote source.
    pub remote_fetches: u64,
    /// Remote calls that failed.
    pub remote_failures: u64,
    /// Fetched values written to the cache.
    pub backfills: u64,
    /// Fetched values the cache refused to store.
    pub backfill_failures: u64,
    /// Cache reads that failed and were treated as misses.
    pub cache_read_failures: u64,
}

impl LookupStatsSnapshot {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total lookups observed.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}
