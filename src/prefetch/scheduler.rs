//! Prefetch scheduling.
//!
//! The scheduler owns the playlist position and re-evaluates the candidate
//! window whenever playback moves, conditions change, or a fetch completes.
//! Evaluation is drop-not-queue: candidates that do not fit in the
//! concurrency budget are simply skipped and reconsidered on the next
//! trigger, so there is no backlog to drain when the user scrolls fast.
//! In-flight fetches are never cancelled; a superseded fetch still lands
//! its payload in the cache.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, Priority, TieredCacheStore};
use crate::net::AsyncHttpClient;
use crate::prefetch::coalescer::{FetchOutcome, PartialDownloadCoalescer};
use crate::prefetch::conditions::ConditionSnapshot;
use crate::prefetch::config::PrefetchConfig;
use crate::prefetch::error::PrefetchError;
use crate::prefetch::stats::PrefetchStats;
use crate::prefetch::types::{PlaybackEvent, PrefetchCandidate, VideoDescriptor};

/// Set of video ids with a fetch currently in flight.
///
/// A claim must be taken before dispatching and released on completion so a
/// video is never fetched twice concurrently.
#[derive(Debug, Default)]
pub struct InFlightSet {
    inner: Mutex<HashSet<String>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an id. Returns `false` if a fetch for it is already in flight.
    pub fn claim(&self, id: &str) -> bool {
        self.inner.lock().unwrap().insert(id.to_string())
    }

    /// Release a claim taken by [`claim`](Self::claim).
    pub fn release(&self, id: &str) {
        self.inner.lock().unwrap().remove(id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

/// Completion notification sent back from a spawned fetch task.
#[derive(Debug)]
struct FetchCompletion {
    id: String,
    result: Result<FetchOutcome, PrefetchError>,
}

/// Whether current conditions permit prefetching at all.
pub fn gate_allows(config: &PrefetchConfig, snapshot: &ConditionSnapshot) -> bool {
    if !snapshot.is_online {
        return false;
    }
    if config.wifi_only && !snapshot.connection.is_wifi_class() {
        return false;
    }
    if snapshot.data_saver {
        return false;
    }
    snapshot.battery_percent > config.min_battery_percent || snapshot.is_charging
}

/// Compute the prefetch candidate window around the current index.
///
/// Ahead candidates come first, nearest first, with only the immediate next
/// video at high priority. Behind candidates follow at low priority. Indices
/// outside the playlist are clipped.
pub fn candidate_window(
    current: usize,
    len: usize,
    ahead: usize,
    behind: usize,
) -> Vec<PrefetchCandidate> {
    let mut candidates = Vec::new();
    if len == 0 {
        return candidates;
    }

    for offset in 1..=ahead {
        let index = current + offset;
        if index >= len {
            break;
        }
        let priority = if offset == 1 {
            Priority::High
        } else {
            Priority::Low
        };
        candidates.push(PrefetchCandidate { index, priority });
    }

    for offset in 1..=behind {
        if offset > current {
            break;
        }
        let index = current - offset;
        if index < len {
            candidates.push(PrefetchCandidate {
                index,
                priority: Priority::Low,
            });
        }
    }

    candidates
}

/// Event-driven prefetch scheduler.
///
/// Owned by its run task; the service communicates with it through the
/// playback event channel and the shared condition watch.
pub struct PrefetchScheduler<C> {
    store: Arc<TieredCacheStore>,
    client: Arc<C>,
    coalescer: PartialDownloadCoalescer<C>,
    config: PrefetchConfig,
    playlist: Vec<VideoDescriptor>,
    current_index: usize,
    conditions: watch::Receiver<ConditionSnapshot>,
    events: mpsc::Receiver<PlaybackEvent>,
    in_flight: Arc<InFlightSet>,
    stats: Arc<PrefetchStats>,
    completion_tx: mpsc::Sender<FetchCompletion>,
    completion_rx: mpsc::Receiver<FetchCompletion>,
}

impl<C: AsyncHttpClient + 'static> PrefetchScheduler<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<TieredCacheStore>,
        client: Arc<C>,
        config: PrefetchConfig,
        head_bytes: u64,
        conditions: watch::Receiver<ConditionSnapshot>,
        events: mpsc::Receiver<PlaybackEvent>,
        in_flight: Arc<InFlightSet>,
        stats: Arc<PrefetchStats>,
    ) -> Self {
        let coalescer =
            PartialDownloadCoalescer::new(Arc::clone(&store), Arc::clone(&client), head_bytes);
        let (completion_tx, completion_rx) = mpsc::channel(32);
        Self {
            store,
            client,
            coalescer,
            config,
            playlist: Vec::new(),
            current_index: 0,
            conditions,
            events,
            in_flight,
            stats,
            completion_tx,
            completion_rx,
        }
    }

    /// Run the scheduler until cancelled or the event channel closes.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("prefetch scheduler started");
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("prefetch scheduler shutting down");
                    break;
                }
                Some(completion) = self.completion_rx.recv() => {
                    // A failed fetch must not manufacture its own retry
                    // pass; only the next external event may re-attempt it.
                    if self.handle_completion(completion) {
                        self.evaluate();
                    }
                }
                changed = self.conditions.changed() => {
                    if changed.is_err() {
                        info!("condition monitor dropped, stopping scheduler");
                        break;
                    }
                    self.evaluate();
                }
                event = self.events.recv() => {
                    match event {
                        Some(event) => {
                            self.apply_event(event);
                            self.evaluate();
                        }
                        None => {
                            info!("playback event channel closed, stopping scheduler");
                            break;
                        }
                    }
                }
            }
        }
    }

    fn apply_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::IndexChanged(index) => {
                debug!(index, "playback index changed");
                self.current_index = index;
            }
            PlaybackEvent::PlaylistReplaced(playlist) => {
                debug!(len = playlist.len(), "playlist replaced");
                self.playlist = playlist;
                if self.current_index >= self.playlist.len() {
                    self.current_index = 0;
                }
            }
            PlaybackEvent::ConfigChanged(config) => {
                debug!(?config, "prefetch config changed");
                self.config = config;
            }
        }
    }

    /// Re-evaluate the candidate window and dispatch fetches up to the
    /// concurrency budget.
    fn evaluate(&mut self) {
        let snapshot = *self.conditions.borrow_and_update();
        if !self.config.enabled {
            return;
        }
        if !gate_allows(&self.config, &snapshot) {
            debug!(
                is_online = snapshot.is_online,
                connection = %snapshot.connection,
                data_saver = snapshot.data_saver,
                battery = snapshot.battery_percent,
                "conditions do not permit prefetching"
            );
            return;
        }
        if self.playlist.is_empty() {
            return;
        }

        let ahead = self.config.effective_ahead(&snapshot);
        let candidates = candidate_window(
            self.current_index,
            self.playlist.len(),
            ahead,
            self.config.behind_count,
        );

        let mut budget = self
            .config
            .max_concurrent
            .saturating_sub(self.in_flight.len());
        for candidate in candidates {
            if budget == 0 {
                break;
            }
            let video = &self.playlist[candidate.index];
            if self.store.has(&CacheKey::canonical(&video.id)) {
                self.stats.record_hit();
                continue;
            }
            if !self.in_flight.claim(&video.id) {
                continue;
            }
            self.stats.record_miss();
            budget -= 1;
            self.dispatch(video.clone(), candidate.priority);
        }
    }

    fn dispatch(&self, video: VideoDescriptor, priority: Priority) {
        debug!(id = %video.id, ?priority, "dispatching prefetch");
        let tx = self.completion_tx.clone();
        match priority {
            Priority::High => {
                let coalescer = self.coalescer.clone();
                tokio::spawn(async move {
                    let result = coalescer.fetch(&video.id, &video.url).await;
                    let _ = tx.send(FetchCompletion { id: video.id, result }).await;
                });
            }
            Priority::Low => {
                let store = Arc::clone(&self.store);
                let client = Arc::clone(&self.client);
                tokio::spawn(async move {
                    let result = fetch_full_low(&store, client.as_ref(), &video.id, &video.url).await;
                    let _ = tx.send(FetchCompletion { id: video.id, result }).await;
                });
            }
        }
    }

    /// Release the in-flight claim and record the outcome.
    ///
    /// Returns `true` when the fetch succeeded and freed budget is worth
    /// re-evaluating for.
    fn handle_completion(&self, completion: FetchCompletion) -> bool {
        self.in_flight.release(&completion.id);
        match completion.result {
            Ok(outcome) => {
                self.stats.record_success(outcome.bytes_fetched);
                if outcome.completed {
                    debug!(id = %completion.id, bytes = outcome.bytes_fetched, "prefetch completed");
                } else {
                    debug!(id = %completion.id, bytes = outcome.bytes_fetched, "prefetch cached partial head only");
                }
                true
            }
            Err(err) => {
                self.stats.record_failure();
                warn!(id = %completion.id, error = %err, "prefetch failed");
                false
            }
        }
    }
}

/// Single full fetch used for low-priority candidates.
async fn fetch_full_low<C: AsyncHttpClient>(
    store: &TieredCacheStore,
    client: &C,
    id: &str,
    url: &str,
) -> Result<FetchOutcome, PrefetchError> {
    let body = client.get(url).await.map_err(|source| PrefetchError::Fetch {
        id: id.to_string(),
        source,
    })?;
    let bytes = body.len() as u64;
    store.store(CacheKey::canonical(id), body.to_vec(), Priority::Low)?;
    Ok(FetchOutcome {
        bytes_fetched: bytes,
        completed: true,
    })
}
