//! Top-level service facade.
//!
//! [`VideoCacheService`] wires the tiered cache, the condition monitor, and
//! the prefetch scheduler together and exposes the narrow surface the host
//! application talks to: feed in playback events and condition signals,
//! read cached payloads and stats back out.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::{CacheConfig, CacheError, CachedVideo, StoreStats, TierStats, TieredCacheStore};
use crate::net::AsyncHttpClient;
use crate::prefetch::scheduler::{InFlightSet, PrefetchScheduler};
use crate::prefetch::stats::{PrefetchStats, PrefetchStatsSnapshot};
use crate::prefetch::{
    ConditionMonitor, PlaybackEvent, PrefetchConfig, VideoDescriptor, DEFAULT_HEAD_BYTES,
};

/// Combined configuration for the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub prefetch: PrefetchConfig,
    /// Size of the initial head range fetched for the next-up video.
    pub head_bytes: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            prefetch: PrefetchConfig::default(),
            head_bytes: DEFAULT_HEAD_BYTES,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_prefetch(mut self, prefetch: PrefetchConfig) -> Self {
        self.prefetch = prefetch;
        self
    }

    pub fn with_head_bytes(mut self, head_bytes: u64) -> Self {
        self.head_bytes = head_bytes;
        self
    }
}

/// Running video cache and prefetch service.
///
/// Owns the scheduler task; dropping the service without calling
/// [`shutdown`](Self::shutdown) detaches it, leaving the scheduler and any
/// in-flight fetch tasks running until their channels close, so hosts
/// should shut down explicitly.
pub struct VideoCacheService {
    store: Arc<TieredCacheStore>,
    conditions: ConditionMonitor,
    events_tx: mpsc::Sender<PlaybackEvent>,
    in_flight: Arc<InFlightSet>,
    stats: Arc<PrefetchStats>,
    cancel: CancellationToken,
    scheduler_task: JoinHandle<()>,
}

impl VideoCacheService {
    /// Start the service with the given configuration and HTTP client.
    pub fn start<C: AsyncHttpClient + 'static>(
        config: ServiceConfig,
        client: Arc<C>,
    ) -> Result<Self, CacheError> {
        let store = Arc::new(TieredCacheStore::new(config.cache)?);
        let conditions = ConditionMonitor::new();
        let in_flight = Arc::new(InFlightSet::new());
        let stats = Arc::new(PrefetchStats::new());
        let (events_tx, events_rx) = mpsc::channel(64);

        let scheduler = PrefetchScheduler::new(
            Arc::clone(&store),
            client,
            config.prefetch,
            config.head_bytes,
            conditions.subscribe(),
            events_rx,
            Arc::clone(&in_flight),
            Arc::clone(&stats),
        );
        let cancel = CancellationToken::new();
        let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));
        info!("video cache service started");

        Ok(Self {
            store,
            conditions,
            events_tx,
            in_flight,
            stats,
            cancel,
            scheduler_task,
        })
    }

    /// Monitor to feed platform condition signals into.
    pub fn conditions(&self) -> &ConditionMonitor {
        &self.conditions
    }

    /// Replace the playlist the scheduler prefetches around.
    pub fn set_playlist(&self, playlist: Vec<VideoDescriptor>) {
        self.send_event(PlaybackEvent::PlaylistReplaced(playlist));
    }

    /// Report that playback moved to a new index.
    pub fn set_current_index(&self, index: usize) {
        self.send_event(PlaybackEvent::IndexChanged(index));
    }

    /// Apply a new prefetch configuration.
    pub fn update_config(&self, config: PrefetchConfig) {
        self.send_event(PlaybackEvent::ConfigChanged(config));
    }

    fn send_event(&self, event: PlaybackEvent) {
        if let Err(err) = self.events_tx.try_send(event) {
            warn!(error = %err, "dropping playback event, scheduler not keeping up");
        }
    }

    /// Look up a cached payload for playback.
    ///
    /// Prefers the complete entry; falls back to the partial head when the
    /// remainder has not landed yet.
    pub fn cached_video(&self, id: &str) -> Option<CachedVideo> {
        self.store.materialize(id)
    }

    /// Direct access to the underlying store.
    pub fn store(&self) -> &TieredCacheStore {
        &self.store
    }

    /// Drop every cached entry and reset prefetch counters.
    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.store.clear()?;
        self.stats.reset();
        info!("cache cleared");
        Ok(())
    }

    pub fn cache_stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn memory_stats(&self) -> TierStats {
        self.store.memory_stats()
    }

    pub fn durable_stats(&self) -> TierStats {
        self.store.durable_stats()
    }

    pub fn prefetch_stats(&self) -> PrefetchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether any prefetch fetch is currently in flight.
    pub fn is_prefetching(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Stop the scheduler and wait for it to exit.
    ///
    /// In-flight fetch tasks are detached; their completions are simply
    /// never observed.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.scheduler_task.await {
            warn!(error = %err, "scheduler task ended abnormally");
        }
        info!("video cache service stopped");
    }
}
