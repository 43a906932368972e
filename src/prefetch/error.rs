//! Prefetch error types.

use crate::cache::CacheError;
use crate::net::NetError;
use thiserror::Error;

/// Errors surfaced by prefetch operations.
#[derive(Debug, Error)]
pub enum PrefetchError {
    /// A network fetch for a video failed.
    #[error("fetch failed for video {id}")]
    Fetch {
        id: String,
        #[source]
        source: NetError,
    },

    /// A cache operation failed.
    #[error("cache error")]
    Cache(#[from] CacheError),
}
