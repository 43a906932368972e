//! Core types for the cache subsystem.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Suffix distinguishing a head-only partial entry from its canonical video.
pub const PARTIAL_SUFFIX: &str = "-partial";

/// Default memory tier capacity, in entries.
pub const DEFAULT_MEMORY_ENTRIES: usize = 5;

/// Default durable tier capacity, in entries.
pub const DEFAULT_DURABLE_ENTRIES: usize = 50;

/// Default durable entry lifetime, measured from store time.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cache key identifying a cached video payload.
///
/// A key is either the canonical video id, or the id with a `-partial`
/// suffix marking a head-only blob awaiting background completion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for the complete video payload.
    pub fn canonical(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Key for the head-only partial payload of a video.
    pub fn partial(id: &str) -> Self {
        Self(format!("{id}{PARTIAL_SUFFIX}"))
    }

    /// Whether this key names a head-only partial entry.
    pub fn is_partial(&self) -> bool {
        self.0.ends_with(PARTIAL_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-time priority of a cache entry.
///
/// Only `High` entries are eligible for memory-tier residency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Low,
}

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid cache configuration
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

/// Memory tier configuration.
#[derive(Debug, Clone)]
pub struct MemoryTierConfig {
    /// Maximum number of resident entries (default: 5)
    pub max_entries: usize,
}

impl Default for MemoryTierConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MEMORY_ENTRIES,
        }
    }
}

/// Durable tier configuration.
#[derive(Debug, Clone)]
pub struct DurableTierConfig {
    /// Cache directory root
    pub cache_dir: PathBuf,
    /// Maximum number of entries before the eviction sweep runs (default: 50)
    pub max_entries: usize,
    /// Entry lifetime measured from store time (default: 7 days)
    pub max_age: Duration,
}

impl Default for DurableTierConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reelcache");

        Self {
            cache_dir,
            max_entries: DEFAULT_DURABLE_ENTRIES,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

/// Complete cache configuration.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Memory tier configuration
    pub memory: MemoryTierConfig,
    /// Durable tier configuration
    pub durable: DurableTierConfig,
}

impl CacheConfig {
    /// Create a cache configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the memory tier capacity in entries.
    pub fn with_memory_entries(mut self, entries: usize) -> Self {
        self.memory.max_entries = entries;
        self
    }

    /// Set the durable tier capacity in entries.
    pub fn with_durable_entries(mut self, entries: usize) -> Self {
        self.durable.max_entries = entries;
        self
    }

    /// Set the durable cache directory.
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.durable.cache_dir = dir;
        self
    }

    /// Set the durable entry lifetime.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.durable.max_age = max_age;
        self
    }
}
