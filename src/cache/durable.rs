//! File-backed durable cache tier with TTL and batched eviction.
//!
//! Each entry is a single file named `<escaped-key>.<hi|lo>.bin` under the
//! cache directory. The in-memory index (key, path, size, store time,
//! priority) is rebuilt by scanning that directory at startup, so the tier
//! survives process restarts. Expiry is resolved lazily on read; capacity is
//! enforced by a batched sweep that removes the oldest 20% of entries by
//! store time whenever the count exceeds the configured maximum.

use crate::cache::stats::TierStats;
use crate::cache::types::{CacheError, CacheKey, DurableTierConfig, Priority};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

const FILE_EXTENSION: &str = "bin";
const HIGH_MARKER: &str = "hi";
const LOW_MARKER: &str = "lo";

#[derive(Debug, Clone)]
struct DurableEntry {
    path: PathBuf,
    size: usize,
    stored_at: SystemTime,
    priority: Priority,
}

/// Durable tier for persistent storage of video payloads.
pub struct DurableTier {
    cache_dir: PathBuf,
    max_entries: usize,
    max_age: Duration,
    index: Mutex<HashMap<CacheKey, DurableEntry>>,
    current_size_bytes: Mutex<usize>,
    stats: Mutex<TierStats>,
}

impl DurableTier {
    /// Create a new durable tier rooted at the configured cache directory.
    ///
    /// Creates the directory if needed and rebuilds the index from any
    /// entries left behind by a previous session.
    pub fn new(config: DurableTierConfig) -> Result<Self, CacheError> {
        if config.max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "durable tier capacity must be at least 1 entry".to_string(),
            ));
        }
        if !config.cache_dir.exists() {
            fs::create_dir_all(&config.cache_dir)?;
        }

        let tier = Self {
            cache_dir: config.cache_dir,
            max_entries: config.max_entries,
            max_age: config.max_age,
            index: Mutex::new(HashMap::new()),
            current_size_bytes: Mutex::new(0),
            stats: Mutex::new(TierStats::new()),
        };

        tier.scan_cache_dir()?;
        tier.evict_if_over_capacity();

        Ok(tier)
    }

    /// Get a cached payload with its store-time priority.
    ///
    /// Entries older than the configured lifetime are deleted and reported
    /// as a miss. A file that has vanished or become unreadable is dropped
    /// from the index and also reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<(Vec<u8>, Priority)> {
        let entry = {
            let index = self.index.lock().unwrap();
            index.get(key).cloned()
        };

        if let Some(entry) = entry {
            if self.is_expired(&entry) {
                self.purge(key, &entry);
                if let Ok(mut stats) = self.stats.lock() {
                    stats.record_expiration();
                    stats.record_miss();
                }
                tracing::debug!(key = %key, "durable entry expired, removed on read");
                return None;
            }

            match fs::read(&entry.path) {
                Ok(data) => {
                    if let Ok(mut stats) = self.stats.lock() {
                        stats.record_hit();
                    }
                    return Some((data, entry.priority));
                }
                Err(_) => {
                    // File disappeared underneath us; drop the index entry.
                    self.purge(key, &entry);
                }
            }
        }

        if let Ok(mut stats) = self.stats.lock() {
            stats.record_miss();
        }
        None
    }

    /// Write a payload to disk and register it in the index.
    ///
    /// Re-storing an existing key replaces the entry and refreshes its store
    /// time. After a successful write the capacity sweep runs.
    pub fn insert(&self, key: CacheKey, data: &[u8], priority: Priority) -> Result<(), CacheError> {
        let path = self.entry_file_path(&key, priority);

        if let Err(e) = fs::write(&path, data) {
            if let Ok(mut stats) = self.stats.lock() {
                stats.record_write_failure();
            }
            return Err(CacheError::Io(e));
        }

        let entry = DurableEntry {
            path: path.clone(),
            size: data.len(),
            stored_at: SystemTime::now(),
            priority,
        };

        {
            let mut index = self.index.lock().unwrap();
            let mut size = self.current_size_bytes.lock().unwrap();

            if let Some(old) = index.insert(key, entry) {
                *size = size.saturating_sub(old.size);
                // A priority change moves the payload to a new file name.
                if old.path != path {
                    let _ = fs::remove_file(&old.path);
                }
            }
            *size += data.len();

            if let Ok(mut stats) = self.stats.lock() {
                stats.record_write();
                stats.update_size(*size, index.len());
            }
        }

        self.evict_if_over_capacity();

        Ok(())
    }

    /// Check if a key is present in the index.
    ///
    /// Membership is conservative: staleness is resolved at `get` time.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let index = self.index.lock().unwrap();
        index.contains_key(key)
    }

    /// Resolve the on-disk path of a live (non-expired) entry.
    ///
    /// Expired entries are cleaned up and reported as absent, so the caller
    /// never hands a stale file to the playback component.
    pub fn entry_path(&self, key: &CacheKey) -> Option<PathBuf> {
        let entry = {
            let index = self.index.lock().unwrap();
            index.get(key).cloned()
        };

        let entry = entry?;
        if self.is_expired(&entry) {
            self.purge(key, &entry);
            if let Ok(mut stats) = self.stats.lock() {
                stats.record_expiration();
            }
            return None;
        }
        Some(entry.path)
    }

    /// Remove an entry and its backing file. No-op if absent.
    pub fn remove(&self, key: &CacheKey) {
        let entry = {
            let index = self.index.lock().unwrap();
            index.get(key).cloned()
        };

        if let Some(entry) = entry {
            self.purge(key, &entry);
        }
    }

    /// Remove all entries and their backing files.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut index = self.index.lock().unwrap();

        for entry in index.values() {
            let _ = fs::remove_file(&entry.path);
        }
        index.clear();

        let mut size = self.current_size_bytes.lock().unwrap();
        *size = 0;

        if let Ok(mut stats) = self.stats.lock() {
            stats.update_size(0, 0);
        }

        Ok(())
    }

    /// Current number of indexed entries.
    pub fn entry_count(&self) -> usize {
        let index = self.index.lock().unwrap();
        index.len()
    }

    /// Current tracked payload size in bytes.
    pub fn size_bytes(&self) -> usize {
        let size = self.current_size_bytes.lock().unwrap();
        *size
    }

    /// Maximum number of entries before the sweep runs.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Get tier statistics.
    pub fn stats(&self) -> TierStats {
        let stats = self.stats.lock().unwrap();
        stats.clone()
    }

    fn is_expired(&self, entry: &DurableEntry) -> bool {
        match entry.stored_at.elapsed() {
            Ok(age) => age > self.max_age,
            // Clock went backwards; treat the entry as fresh.
            Err(_) => false,
        }
    }

    /// Drop an entry from index, size accounting, and disk.
    fn purge(&self, key: &CacheKey, entry: &DurableEntry) {
        let _ = fs::remove_file(&entry.path);

        let mut index = self.index.lock().unwrap();
        if index.remove(key).is_some() {
            let mut size = self.current_size_bytes.lock().unwrap();
            *size = size.saturating_sub(entry.size);

            if let Ok(mut stats) = self.stats.lock() {
                stats.update_size(*size, index.len());
            }
        }
    }

    fn entry_file_path(&self, key: &CacheKey, priority: Priority) -> PathBuf {
        let marker = match priority {
            Priority::High => HIGH_MARKER,
            Priority::Low => LOW_MARKER,
        };
        self.cache_dir
            .join(format!("{}.{marker}.{FILE_EXTENSION}", escape_key(key.as_str())))
    }

    /// Rebuild the index from entry files left on disk.
    fn scan_cache_dir(&self) -> Result<(), CacheError> {
        let mut index = self.index.lock().unwrap();
        let mut total_size = 0usize;

        for dir_entry in fs::read_dir(&self.cache_dir)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();

            if !path.is_file() {
                continue;
            }
            let Some((key, priority)) = parse_entry_file_name(&path) else {
                continue;
            };
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            let stored_at = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let size = metadata.len() as usize;

            let entry = DurableEntry {
                path,
                size,
                stored_at,
                priority,
            };

            // A crash between a rewrite and the old variant's removal can
            // leave both priority markers for one key; keep the newer file.
            match index.entry(key) {
                Entry::Occupied(mut slot) => {
                    if entry.stored_at >= slot.get().stored_at {
                        total_size = total_size.saturating_sub(slot.get().size) + size;
                        let old = slot.insert(entry);
                        let _ = fs::remove_file(&old.path);
                    } else {
                        let _ = fs::remove_file(&entry.path);
                    }
                }
                Entry::Vacant(slot) => {
                    total_size += size;
                    slot.insert(entry);
                }
            }
        }

        let mut size = self.current_size_bytes.lock().unwrap();
        *size = total_size;

        if let Ok(mut stats) = self.stats.lock() {
            stats.update_size(total_size, index.len());
        }

        Ok(())
    }

    /// Remove the oldest 20% of entries by store time once the count exceeds
    /// capacity. The batched sweep amortizes eviction cost across many
    /// writes instead of evicting one-in-one-out.
    fn evict_if_over_capacity(&self) {
        let victims: Vec<(CacheKey, DurableEntry)> = {
            let index = self.index.lock().unwrap();
            let count = index.len();
            if count <= self.max_entries {
                return;
            }

            let mut entries: Vec<(CacheKey, DurableEntry)> =
                index.iter().map(|(k, e)| (k.clone(), e.clone())).collect();
            entries.sort_by_key(|(_, e)| e.stored_at);

            let sweep = (count as f64 * 0.2).ceil() as usize;
            entries.truncate(sweep);
            entries
        };

        let evicted = victims.len();
        let mut freed_bytes = 0usize;
        for (key, entry) in victims {
            freed_bytes += entry.size;
            self.purge(&key, &entry);
        }

        if let Ok(mut stats) = self.stats.lock() {
            stats.record_evictions(evicted as u64);
        }

        tracing::info!(
            evicted,
            freed_kb = freed_bytes / 1024,
            remaining = self.entry_count(),
            "durable cache eviction sweep"
        );
    }
}

/// Escape a cache key into a filesystem-safe file stem.
///
/// Keeps `[A-Za-z0-9._-]` and percent-encodes every other byte, so arbitrary
/// video ids round-trip through file names.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}

/// Reverse of [`escape_key`]. Returns `None` for malformed escapes.
fn unescape_key(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Parse a cache key and priority from an entry file path.
///
/// Expected file name: `<escaped-key>.<hi|lo>.bin`.
fn parse_entry_file_name(path: &Path) -> Option<(CacheKey, Priority)> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(&format!(".{FILE_EXTENSION}"))?;

    let (escaped, priority) = if let Some(s) = stem.strip_suffix(&format!(".{HIGH_MARKER}")) {
        (s, Priority::High)
    } else if let Some(s) = stem.strip_suffix(&format!(".{LOW_MARKER}")) {
        (s, Priority::Low)
    } else {
        return None;
    };

    let key = unescape_key(escaped)?;
    Some((CacheKey::canonical(key), priority))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_temp_tier() -> (DurableTier, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = DurableTierConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            max_entries: 50,
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
        };
        let tier = DurableTier::new(config).unwrap();
        (tier, temp_dir)
    }

    #[test]
    fn test_durable_tier_new() {
        let (tier, _temp) = create_temp_tier();

        assert_eq!(tier.max_entries(), 50);
        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.size_bytes(), 0);
    }

    #[test]
    fn test_insert_and_get() {
        let (tier, _temp) = create_temp_tier();
        let key = CacheKey::canonical("v1");
        let data = vec![1, 2, 3, 4, 5];

        tier.insert(key.clone(), &data, Priority::High).unwrap();

        let (retrieved, priority) = tier.get(&key).unwrap();
        assert_eq!(retrieved, data);
        assert_eq!(priority, Priority::High);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config = DurableTierConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            max_entries: 0,
            max_age: Duration::from_secs(3600),
        };

        assert!(matches!(
            DurableTier::new(config),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_get_miss() {
        let (tier, _temp) = create_temp_tier();
        assert!(tier.get(&CacheKey::canonical("absent")).is_none());
    }

    #[test]
    fn test_contains() {
        let (tier, _temp) = create_temp_tier();
        let key = CacheKey::canonical("v1");

        assert!(!tier.contains(&key));
        tier.insert(key.clone(), &[1, 2, 3], Priority::Low).unwrap();
        assert!(tier.contains(&key));
    }

    #[test]
    fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let config = DurableTierConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            max_entries: 50,
            max_age: Duration::from_secs(3600),
        };

        {
            let tier = DurableTier::new(config.clone()).unwrap();
            tier.insert(CacheKey::canonical("v1"), &[1, 2, 3, 4, 5], Priority::High)
                .unwrap();
        }

        {
            let tier = DurableTier::new(config).unwrap();
            assert_eq!(tier.entry_count(), 1);

            let (data, priority) = tier.get(&CacheKey::canonical("v1")).unwrap();
            assert_eq!(data, vec![1, 2, 3, 4, 5]);
            assert_eq!(priority, Priority::High);
        }
    }

    #[test]
    fn test_partial_key_round_trips_through_scan() {
        let temp_dir = TempDir::new().unwrap();
        let config = DurableTierConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            max_entries: 50,
            max_age: Duration::from_secs(3600),
        };

        {
            let tier = DurableTier::new(config.clone()).unwrap();
            tier.insert(CacheKey::partial("v1"), &[9, 9], Priority::High)
                .unwrap();
        }

        let tier = DurableTier::new(config).unwrap();
        assert!(tier.contains(&CacheKey::partial("v1")));
        assert!(!tier.contains(&CacheKey::canonical("v1")));
    }

    #[test]
    fn test_expiry_on_read() {
        let temp_dir = TempDir::new().unwrap();
        let config = DurableTierConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            max_entries: 50,
            max_age: Duration::from_millis(30),
        };
        let tier = DurableTier::new(config).unwrap();
        let key = CacheKey::canonical("v1");

        tier.insert(key.clone(), &[1, 2, 3], Priority::Low).unwrap();
        std::thread::sleep(Duration::from_millis(60));

        assert!(tier.get(&key).is_none());
        // Lazy cleanup removed the entry entirely.
        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.size_bytes(), 0);
        assert_eq!(tier.stats().expirations, 1);
    }

    #[test]
    fn test_entry_path_expired() {
        let temp_dir = TempDir::new().unwrap();
        let config = DurableTierConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            max_entries: 50,
            max_age: Duration::from_millis(30),
        };
        let tier = DurableTier::new(config).unwrap();
        let key = CacheKey::canonical("v1");

        tier.insert(key.clone(), &[1], Priority::Low).unwrap();
        assert!(tier.entry_path(&key).is_some());

        std::thread::sleep(Duration::from_millis(60));
        assert!(tier.entry_path(&key).is_none());
        assert_eq!(tier.entry_count(), 0);
    }

    #[test]
    fn test_remove_idempotent() {
        let (tier, _temp) = create_temp_tier();
        let key = CacheKey::canonical("v1");

        tier.insert(key.clone(), &[1, 2, 3], Priority::Low).unwrap();
        tier.remove(&key);
        tier.remove(&key);

        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.size_bytes(), 0);
    }

    #[test]
    fn test_clear() {
        let (tier, temp) = create_temp_tier();

        tier.insert(CacheKey::canonical("v1"), &[1], Priority::Low).unwrap();
        tier.insert(CacheKey::canonical("v2"), &[2], Priority::High).unwrap();

        tier.clear().unwrap();

        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.size_bytes(), 0);
        // Backing files are gone too.
        let remaining = fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_eviction_sweep_removes_oldest_fifth() {
        let temp_dir = TempDir::new().unwrap();
        let config = DurableTierConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            max_entries: 10,
            max_age: Duration::from_secs(3600),
        };
        let tier = DurableTier::new(config).unwrap();

        for i in 0..11 {
            tier.insert(CacheKey::canonical(format!("v{i}")), &[0u8; 100], Priority::Low)
                .unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }

        // 11 entries exceeded capacity 10; ceil(0.2 * 11) = 3 oldest removed.
        assert_eq!(tier.entry_count(), 8);
        assert!(!tier.contains(&CacheKey::canonical("v0")));
        assert!(!tier.contains(&CacheKey::canonical("v1")));
        assert!(!tier.contains(&CacheKey::canonical("v2")));
        assert!(tier.contains(&CacheKey::canonical("v10")));
        assert_eq!(tier.stats().evictions, 3);
    }

    #[test]
    fn test_capacity_never_exceeded_after_insert() {
        let temp_dir = TempDir::new().unwrap();
        let config = DurableTierConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            max_entries: 5,
            max_age: Duration::from_secs(3600),
        };
        let tier = DurableTier::new(config).unwrap();

        for i in 0..30 {
            tier.insert(CacheKey::canonical(format!("v{i}")), &[0u8; 10], Priority::Low)
                .unwrap();
            assert!(tier.entry_count() <= 5);
        }
    }

    #[test]
    fn test_size_tracking() {
        let (tier, _temp) = create_temp_tier();

        tier.insert(CacheKey::canonical("v1"), &[0u8; 1000], Priority::Low)
            .unwrap();
        assert_eq!(tier.size_bytes(), 1000);

        tier.insert(CacheKey::canonical("v2"), &[0u8; 2000], Priority::Low)
            .unwrap();
        assert_eq!(tier.size_bytes(), 3000);

        // Re-storing a key replaces its size contribution.
        tier.insert(CacheKey::canonical("v1"), &[0u8; 500], Priority::Low)
            .unwrap();
        assert_eq!(tier.size_bytes(), 2500);
    }

    #[test]
    fn test_statistics_hits_and_misses() {
        let (tier, _temp) = create_temp_tier();
        let key = CacheKey::canonical("v1");

        tier.insert(key.clone(), &[1, 2, 3], Priority::Low).unwrap();
        tier.get(&key);
        tier.get(&key);
        tier.get(&CacheKey::canonical("absent"));

        let stats = tier.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }

    #[test]
    fn test_escape_key_round_trip() {
        let cases = [
            "plain-id_42",
            "with space",
            "slash/and:colon",
            "unicode-émoji-🎬",
            "%already%escaped%",
        ];
        for case in cases {
            let escaped = escape_key(case);
            assert!(
                escaped
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '%')),
                "escaped form must be filesystem-safe: {escaped}"
            );
            assert_eq!(unescape_key(&escaped).as_deref(), Some(case));
        }
    }

    #[test]
    fn test_scan_keeps_newer_of_duplicate_key_files() {
        let temp_dir = TempDir::new().unwrap();
        let lo_path = temp_dir.path().join("v1.lo.bin");
        fs::write(&lo_path, b"older").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let hi_path = temp_dir.path().join("v1.hi.bin");
        fs::write(&hi_path, b"newer!").unwrap();

        let config = DurableTierConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            max_entries: 50,
            max_age: Duration::from_secs(3600),
        };
        let tier = DurableTier::new(config).unwrap();

        assert_eq!(tier.entry_count(), 1);
        assert_eq!(tier.size_bytes(), 6);

        let (data, priority) = tier.get(&CacheKey::canonical("v1")).unwrap();
        assert_eq!(data, b"newer!");
        assert_eq!(priority, Priority::High);

        assert!(hi_path.exists());
        assert!(!lo_path.exists(), "stale duplicate must be deleted on scan");
    }

    #[test]
    fn test_parse_entry_file_name() {
        let path = Path::new("/cache/video-42.hi.bin");
        let (key, priority) = parse_entry_file_name(path).unwrap();
        assert_eq!(key, CacheKey::canonical("video-42"));
        assert_eq!(priority, Priority::High);

        let path = Path::new("/cache/video-42-partial.lo.bin");
        let (key, priority) = parse_entry_file_name(path).unwrap();
        assert!(key.is_partial());
        assert_eq!(priority, Priority::Low);

        assert!(parse_entry_file_name(Path::new("/cache/garbage.txt")).is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Each case creates its own tempdir; keep the case count low.
            #![proptest_config(ProptestConfig::with_cases(16))]

            #[test]
            fn prop_capacity_never_exceeded(
                ops in proptest::collection::vec((0usize..30, 1usize..64), 1..60),
            ) {
                let temp_dir = TempDir::new().unwrap();
                let config = DurableTierConfig {
                    cache_dir: temp_dir.path().to_path_buf(),
                    max_entries: 10,
                    max_age: Duration::from_secs(3600),
                };
                let tier = DurableTier::new(config).unwrap();

                for (id, size) in ops {
                    tier.insert(
                        CacheKey::canonical(format!("vid{id}")),
                        &vec![0u8; size],
                        Priority::Low,
                    )
                    .unwrap();
                    prop_assert!(tier.entry_count() <= tier.max_entries());
                }
            }
        }
    }
}
