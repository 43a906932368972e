//! Cache statistics tracking and reporting.

/// Counters for a single cache tier.
#[derive(Debug, Clone, Default)]
pub struct TierStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: usize,
    pub size_bytes: usize,
    /// Entries removed by the capacity sweep (durable tier only).
    pub evictions: u64,
    /// Entries removed lazily because they outlived their TTL (durable tier only).
    pub expirations: u64,
    pub writes: u64,
    pub write_failures: u64,
    /// Writes refused because the tier was at capacity (memory tier only).
    pub rejected_admissions: u64,
}

impl TierStats {
    /// Create a new statistics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate the hit rate for this tier (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Record a cache hit.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Record a cache miss.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Record evicted entries from a capacity sweep.
    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }

    /// Record a lazily expired entry.
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    /// Record a successful write.
    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    /// Record a failed write.
    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    /// Record a write refused at capacity.
    pub fn record_rejected_admission(&mut self) {
        self.rejected_admissions += 1;
    }

    /// Update size metrics after an insert, removal, or sweep.
    pub fn update_size(&mut self, size_bytes: usize, entry_count: usize) {
        self.size_bytes = size_bytes;
        self.entry_count = entry_count;
    }
}

/// Combined store-level summary exposed to collaborators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreStats {
    /// Entries resident in the memory tier.
    pub memory_entries: usize,
    /// Entries resident in the durable tier.
    pub durable_entries: usize,
    /// Total tracked payload size across both tiers, in megabytes.
    pub total_size_mb: f64,
}
