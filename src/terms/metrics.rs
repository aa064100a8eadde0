//! Term cache metrics.
//!
//! Counters are owned by each `TermCache` rather than a process-wide
//! singleton, so independent caches (and tests) never share state.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// `get` calls served from a fresh cached index
    hits: AtomicUsize,

    /// `get` calls that had to wait for a build
    misses: AtomicUsize,

    /// Completed builds (store reads that succeeded)
    builds: AtomicUsize,

    /// Builds whose result was not cached because the scope was invalidated meanwhile
    stale_builds_discarded: AtomicUsize,

    /// Builds that failed because the store read failed
    build_failures: AtomicUsize,

    invalidations: AtomicUsize,

    /// Expired entries removed by `purge_expired`
    evictions: AtomicUsize,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_build(&self) {
        self.builds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_build(&self) {
        self.stale_builds_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_build_failure(&self) {
        self.build_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn stale_builds_discarded(&self) -> usize {
        self.stale_builds_discarded.load(Ordering::Relaxed)
    }

    pub fn build_failures(&self) -> usize {
        self.build_failures.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> usize {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.hits();
        let misses = self.misses();
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            hits,
            misses,
            hit_rate,
            builds: self.builds(),
            stale_builds_discarded: self.stale_builds_discarded(),
            build_failures: self.build_failures(),
            invalidations: self.invalidations(),
            evictions: self.evictions(),
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub hits: usize,
    pub misses: usize,

    /// Hit rate as a percentage (0-100)
    pub hit_rate: f64,

    pub builds: usize,
    pub stale_builds_discarded: usize,
    pub build_failures: usize,
    pub invalidations: usize,
    pub evictions: usize,
}
