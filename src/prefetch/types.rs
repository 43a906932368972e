//! Core types for the prefetch subsystem.

use crate::cache::Priority;
use crate::prefetch::config::PrefetchConfig;

/// A video in the feed, as supplied by the backend layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDescriptor {
    /// Canonical video id, used as the cache key.
    pub id: String,
    /// Origin URL the payload is fetched from.
    pub url: String,
}

impl VideoDescriptor {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// A playlist position selected for speculative fetching.
///
/// Transient; recomputed on every scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchCandidate {
    /// Index into the playlist.
    pub index: usize,
    /// High for the immediate next item (partial-download path), Low for
    /// the rest of the window (direct full fetch).
    pub priority: Priority,
}

/// Events published by the playback and feed layers.
///
/// The scheduler consumes these over a channel and re-evaluates the
/// prefetch window on each one, decoupled from any UI render cycle.
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// The currently-playing index changed.
    IndexChanged(usize),
    /// The ordered video list was replaced.
    PlaylistReplaced(Vec<VideoDescriptor>),
    /// The prefetch configuration was updated.
    ConfigChanged(PrefetchConfig),
}
