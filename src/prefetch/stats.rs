//! Prefetch activity counters.
//!
//! Counters are wait-free atomics so the scheduler and spawned fetch tasks
//! can record events without holding a lock. `Relaxed` ordering is fine:
//! the counters are informational and never coordinate control flow.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared prefetch counters, updated from the scheduler and fetch tasks.
#[derive(Debug, Default)]
pub struct PrefetchStats {
    total_prefetched: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    bytes_transferred: AtomicU64,
    failures: AtomicU64,
}

impl PrefetchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A candidate was already cached when evaluated.
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A candidate was missing from the cache and a fetch was dispatched.
    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A fetch completed and its payload was cached.
    pub fn record_success(&self, bytes: u64) {
        self.total_prefetched.fetch_add(1, Ordering::Relaxed);
        self.bytes_transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    /// A fetch failed.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.total_prefetched.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.bytes_transferred.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }

    /// A point-in-time copy of the counters.
    pub fn snapshot(&self) -> PrefetchStatsSnapshot {
        PrefetchStatsSnapshot {
            total_prefetched: self.total_prefetched.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            bytes_transferred: self.bytes_transferred.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time prefetch counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrefetchStatsSnapshot {
    pub total_prefetched: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub bytes_transferred: u64,
    pub failures: u64,
}

impl PrefetchStatsSnapshot {
    /// Fraction of evaluated candidates that were already cached.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
