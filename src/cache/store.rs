//! Two-tier cache store coordinator.

use crate::cache::durable::DurableTier;
use crate::cache::memory::MemoryTier;
use crate::cache::stats::{StoreStats, TierStats};
use crate::cache::types::{CacheConfig, CacheError, CacheKey, Priority};
use std::path::PathBuf;
use tracing::trace;

/// A locally-playable reference to a cached video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedVideo {
    /// Path to the durable tier's backing file.
    pub path: PathBuf,
    /// True when only the head-only partial blob is available.
    pub is_partial: bool,
}

/// Tiered cache store coordinating the memory and durable tiers.
///
/// Lookup strategy:
/// 1. Memory tier (fast path, no I/O)
/// 2. Durable tier, with lazy TTL expiry and promotion of high-priority
///    entries back into memory when capacity allows
///
/// The durable tier is the system of record: every store lands there, and
/// the memory tier only admits high-priority entries while it has free
/// capacity.
pub struct TieredCacheStore {
    memory: MemoryTier,
    durable: DurableTier,
}

impl TieredCacheStore {
    /// Create a new tiered cache store.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Ok(Self {
            memory: MemoryTier::new(config.memory.max_entries),
            durable: DurableTier::new(config.durable)?,
        })
    }

    /// Store a payload.
    ///
    /// Writes to the durable tier unconditionally; additionally admits the
    /// payload into the memory tier when `priority` is `High` and capacity
    /// allows. The durable write triggers the capacity eviction sweep, which
    /// may remove unrelated old entries.
    pub fn store(&self, key: CacheKey, data: Vec<u8>, priority: Priority) -> Result<(), CacheError> {
        self.durable.insert(key.clone(), &data, priority)?;

        if priority == Priority::High && !self.memory.insert(key.clone(), data) {
            trace!(key = %key, "memory tier full, entry kept durable-only");
        }

        Ok(())
    }

    /// Get a cached payload.
    ///
    /// Checks the memory tier first. On a miss, reads the durable tier
    /// (expired entries are deleted and reported as a miss) and promotes
    /// high-priority hits back into memory when capacity allows.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        if let Some(data) = self.memory.get(key) {
            return Some(data);
        }

        if let Some((data, priority)) = self.durable.get(key) {
            if priority == Priority::High && self.memory.has_capacity() {
                self.memory.insert(key.clone(), data.clone());
            }
            return Some(data);
        }

        None
    }

    /// Check if a key is resident in either tier.
    ///
    /// Membership is conservative; staleness is resolved at `get` time.
    pub fn has(&self, key: &CacheKey) -> bool {
        self.memory.contains(key) || self.durable.contains(key)
    }

    /// Remove a key from both tiers. No-op if absent.
    pub fn remove(&self, key: &CacheKey) {
        self.memory.remove(key);
        self.durable.remove(key);
    }

    /// Empty both tiers.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.memory.clear();
        self.durable.clear()?;
        Ok(())
    }

    /// Materialize a locally-playable reference for a video id.
    ///
    /// Prefers the canonical full entry; falls back to the head-only partial
    /// entry when the full payload is not yet available. Returns `None` when
    /// nothing usable is cached.
    pub fn materialize(&self, id: &str) -> Option<CachedVideo> {
        if let Some(path) = self.durable.entry_path(&CacheKey::canonical(id)) {
            return Some(CachedVideo {
                path,
                is_partial: false,
            });
        }

        self.durable
            .entry_path(&CacheKey::partial(id))
            .map(|path| CachedVideo {
                path,
                is_partial: true,
            })
    }

    /// Combined store-level summary computed from tracked sizes.
    pub fn stats(&self) -> StoreStats {
        let total_bytes = self.memory.size_bytes() + self.durable.size_bytes();
        StoreStats {
            memory_entries: self.memory.entry_count(),
            durable_entries: self.durable.entry_count(),
            total_size_mb: total_bytes as f64 / (1024.0 * 1024.0),
        }
    }

    /// Memory tier statistics.
    pub fn memory_stats(&self) -> TierStats {
        self.memory.stats()
    }

    /// Durable tier statistics.
    pub fn durable_stats(&self) -> TierStats {
        self.durable.stats()
    }
}
