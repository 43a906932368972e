//! Partial download coalescing.
//!
//! High-priority candidates are fetched in two phases: a bounded head range
//! first so playback can start immediately, then the remainder in the
//! background. When the remainder lands, the head and tail are stitched into
//! a single canonical cache entry and the partial entry is dropped. Servers
//! that ignore range requests (a 200 instead of a 206) get a plain full GET
//! instead, so the coalescer degrades to a one-shot fetch.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheKey, Priority, TieredCacheStore};
use crate::net::AsyncHttpClient;
use crate::prefetch::error::PrefetchError;

/// Head range size for the initial fetch: enough for a few seconds of
/// typical short-form video so playback starts instantly.
pub const DEFAULT_HEAD_BYTES: u64 = 3 * 1024 * 1024;

/// Result of a coalesced fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Bytes transferred over the network, across both phases.
    pub bytes_fetched: u64,
    /// Whether a complete canonical entry was cached. `false` means only
    /// the partial head survived; a later fetch can still complete it.
    pub completed: bool,
}

/// Two-phase range fetcher that stitches head and remainder into one entry.
pub struct PartialDownloadCoalescer<C> {
    store: Arc<TieredCacheStore>,
    client: Arc<C>,
    head_bytes: u64,
}

impl<C> Clone for PartialDownloadCoalescer<C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            client: Arc::clone(&self.client),
            head_bytes: self.head_bytes,
        }
    }
}

impl<C: AsyncHttpClient> PartialDownloadCoalescer<C> {
    pub fn new(store: Arc<TieredCacheStore>, client: Arc<C>, head_bytes: u64) -> Self {
        Self {
            store,
            client,
            head_bytes: head_bytes.max(1),
        }
    }

    /// Fetch a video, preferring a head-range-then-remainder split.
    ///
    /// Falls back to a plain full GET when the server does not honor range
    /// requests. A remainder failure keeps the partial head cached and
    /// returns `completed: false` rather than an error.
    pub async fn fetch(&self, id: &str, url: &str) -> Result<FetchOutcome, PrefetchError> {
        let head = match self.client.get_range(url, 0, Some(self.head_bytes - 1)).await {
            Ok(response) if response.is_partial_content() => response,
            Ok(response) => {
                debug!(
                    id,
                    status = response.status,
                    "server ignored range request, fetching full body"
                );
                return self.fetch_full(id, url).await;
            }
            Err(err) => {
                debug!(id, error = %err, "head range fetch failed, trying full body");
                return self.fetch_full(id, url).await;
            }
        };

        let head_len = head.body.len() as u64;
        let partial_key = CacheKey::partial(id);
        if let Err(err) = self
            .store
            .store(partial_key.clone(), head.body.to_vec(), Priority::High)
        {
            warn!(id, error = %err, "failed to cache partial head");
        }
        debug!(id, bytes = head_len, "cached partial head");

        match self.client.get_range(url, head_len, None).await {
            Ok(tail) => {
                let tail_len = tail.body.len() as u64;
                let Some(mut data) = self.store.get(&partial_key) else {
                    warn!(id, "partial entry vanished before coalescing, abandoning");
                    return Ok(FetchOutcome {
                        bytes_fetched: head_len + tail_len,
                        completed: false,
                    });
                };
                data.extend_from_slice(&tail.body);
                self.store
                    .store(CacheKey::canonical(id), data, Priority::High)?;
                self.store.remove(&partial_key);
                debug!(id, bytes = head_len + tail_len, "coalesced full video");
                Ok(FetchOutcome {
                    bytes_fetched: head_len + tail_len,
                    completed: true,
                })
            }
            Err(err) => {
                warn!(id, error = %err, "remainder fetch failed, keeping partial head");
                Ok(FetchOutcome {
                    bytes_fetched: head_len,
                    completed: false,
                })
            }
        }
    }

    /// One-shot full fetch used when range requests are not honored.
    async fn fetch_full(&self, id: &str, url: &str) -> Result<FetchOutcome, PrefetchError> {
        let body = self
            .client
            .get(url)
            .await
            .map_err(|source| PrefetchError::Fetch {
                id: id.to_string(),
                source,
            })?;
        let bytes = body.len() as u64;
        self.store
            .store(CacheKey::canonical(id), body.to_vec(), Priority::High)?;
        debug!(id, bytes, "cached full video");
        Ok(FetchOutcome {
            bytes_fetched: bytes,
            completed: true,
        })
    }
}
