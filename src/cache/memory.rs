//! In-memory cache tier bounded by entry count.
//!
//! Unlike a classic LRU, the memory tier never force-evicts: once it is at
//! capacity, new writes are rejected and the durable tier remains the system
//! of record. This keeps the hottest handful of videos pinned without
//! thrashing on every prefetch pass.

use crate::cache::stats::TierStats;
use crate::cache::types::CacheKey;
use std::collections::HashMap;
use std::sync::Mutex;

struct Inner {
    entries: HashMap<CacheKey, Vec<u8>>,
    size_bytes: usize,
}

/// Count-bounded memory tier for video payloads.
pub struct MemoryTier {
    inner: Mutex<Inner>,
    max_entries: usize,
    stats: Mutex<TierStats>,
}

impl MemoryTier {
    /// Create a new memory tier holding at most `max_entries` payloads.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                size_bytes: 0,
            }),
            max_entries,
            stats: Mutex::new(TierStats::new()),
        }
    }

    /// Get a cached payload.
    ///
    /// Returns `Some(data)` on a hit, `None` otherwise. Records hit/miss
    /// statistics.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        let found = inner.entries.get(key).cloned();

        if let Ok(mut stats) = self.stats.lock() {
            match found {
                Some(_) => stats.record_hit(),
                None => stats.record_miss(),
            }
        }

        found
    }

    /// Try to admit a payload into the memory tier.
    ///
    /// Replaces an existing entry for the same key. Returns `false` when the
    /// tier is at capacity and the key is not already resident; the caller
    /// falls back on the durable tier.
    pub fn insert(&self, key: CacheKey, data: Vec<u8>) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            if let Ok(mut stats) = self.stats.lock() {
                stats.record_rejected_admission();
            }
            return false;
        }

        let new_size = data.len();
        if let Some(old) = inner.entries.insert(key, data) {
            inner.size_bytes = inner.size_bytes.saturating_sub(old.len());
        }
        inner.size_bytes += new_size;

        if let Ok(mut stats) = self.stats.lock() {
            stats.record_write();
            stats.update_size(inner.size_bytes, inner.entries.len());
        }

        true
    }

    /// Check if a key is resident.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.entries.contains_key(key)
    }

    /// Remove an entry. No-op if absent.
    pub fn remove(&self, key: &CacheKey) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(old) = inner.entries.remove(key) {
            inner.size_bytes = inner.size_bytes.saturating_sub(old.len());

            if let Ok(mut stats) = self.stats.lock() {
                stats.update_size(inner.size_bytes, inner.entries.len());
            }
        }
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        inner.size_bytes = 0;

        if let Ok(mut stats) = self.stats.lock() {
            stats.update_size(0, 0);
        }
    }

    /// Current number of resident entries.
    pub fn entry_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.entries.len()
    }

    /// Whether at least one more entry can be admitted.
    pub fn has_capacity(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.entries.len() < self.max_entries
    }

    /// Current tracked payload size in bytes.
    pub fn size_bytes(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.size_bytes
    }

    /// Maximum number of entries.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Get tier statistics.
    pub fn stats(&self) -> TierStats {
        let stats = self.stats.lock().unwrap();
        stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_tier_new() {
        let tier = MemoryTier::new(5);

        assert_eq!(tier.max_entries(), 5);
        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.size_bytes(), 0);
        assert!(tier.has_capacity());
    }

    #[test]
    fn test_insert_and_get() {
        let tier = MemoryTier::new(5);
        let key = CacheKey::canonical("v1");
        let data = vec![1, 2, 3, 4, 5];

        assert!(tier.insert(key.clone(), data.clone()));
        assert_eq!(tier.get(&key), Some(data));
        assert_eq!(tier.entry_count(), 1);
    }

    #[test]
    fn test_get_miss() {
        let tier = MemoryTier::new(5);
        assert_eq!(tier.get(&CacheKey::canonical("absent")), None);
    }

    #[test]
    fn test_rejects_when_full() {
        let tier = MemoryTier::new(2);

        assert!(tier.insert(CacheKey::canonical("v1"), vec![1]));
        assert!(tier.insert(CacheKey::canonical("v2"), vec![2]));
        assert!(!tier.insert(CacheKey::canonical("v3"), vec![3]));

        // The resident entries are untouched; nothing was evicted.
        assert_eq!(tier.entry_count(), 2);
        assert!(tier.contains(&CacheKey::canonical("v1")));
        assert!(tier.contains(&CacheKey::canonical("v2")));
        assert!(!tier.contains(&CacheKey::canonical("v3")));
    }

    #[test]
    fn test_replace_existing_at_capacity() {
        let tier = MemoryTier::new(1);
        let key = CacheKey::canonical("v1");

        assert!(tier.insert(key.clone(), vec![0u8; 100]));
        // Replacement of a resident key is allowed even at capacity.
        assert!(tier.insert(key.clone(), vec![0u8; 50]));

        assert_eq!(tier.entry_count(), 1);
        assert_eq!(tier.size_bytes(), 50);
    }

    #[test]
    fn test_size_tracking() {
        let tier = MemoryTier::new(5);

        tier.insert(CacheKey::canonical("v1"), vec![0u8; 1000]);
        assert_eq!(tier.size_bytes(), 1000);

        tier.insert(CacheKey::canonical("v2"), vec![0u8; 2000]);
        assert_eq!(tier.size_bytes(), 3000);

        tier.remove(&CacheKey::canonical("v1"));
        assert_eq!(tier.size_bytes(), 2000);
    }

    #[test]
    fn test_remove_idempotent() {
        let tier = MemoryTier::new(5);
        let key = CacheKey::canonical("v1");

        tier.insert(key.clone(), vec![1, 2, 3]);
        tier.remove(&key);
        tier.remove(&key);

        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.size_bytes(), 0);
    }

    #[test]
    fn test_clear() {
        let tier = MemoryTier::new(5);
        tier.insert(CacheKey::canonical("v1"), vec![1]);
        tier.insert(CacheKey::canonical("v2"), vec![2]);

        tier.clear();

        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.size_bytes(), 0);
    }

    #[test]
    fn test_statistics() {
        let tier = MemoryTier::new(1);
        let key = CacheKey::canonical("v1");

        tier.insert(key.clone(), vec![1]);
        tier.insert(CacheKey::canonical("v2"), vec![2]); // rejected
        tier.get(&key);
        tier.get(&CacheKey::canonical("absent"));

        let stats = tier.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.rejected_admissions, 1);
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let tier = MemoryTier::new(5);

        for i in 0..20 {
            tier.insert(CacheKey::canonical(format!("v{i}")), vec![0u8; 10]);
            assert!(tier.entry_count() <= 5);
        }
    }
}
