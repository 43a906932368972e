//! Two-tier cache for video payloads.
//!
//! Provides a small, fast memory tier and a larger file-backed durable tier
//! with TTL expiry and batched capacity eviction, plus a read-through
//! promotion path from durable to memory.

mod durable;
mod memory;
mod stats;
mod store;
mod types;

pub use durable::DurableTier;
pub use memory::MemoryTier;
pub use stats::{StoreStats, TierStats};
pub use store::{CachedVideo, TieredCacheStore};
pub use types::{
    CacheConfig, CacheError, CacheKey, DurableTierConfig, MemoryTierConfig, Priority,
    DEFAULT_DURABLE_ENTRIES, DEFAULT_MAX_AGE, DEFAULT_MEMORY_ENTRIES, PARTIAL_SUFFIX,
};
