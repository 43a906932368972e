//! Speculative video prefetching.
//!
//! Watches playback position and device conditions, and fetches the videos
//! the user is likely to see next into the tiered cache before they are
//! requested. The immediate next video downloads its head range first so it
//! can start playing instantly; the remainder is coalesced in the
//! background.

pub mod coalescer;
pub mod conditions;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod stats;
pub mod types;

pub use coalescer::{FetchOutcome, PartialDownloadCoalescer, DEFAULT_HEAD_BYTES};
pub use conditions::{ConditionMonitor, ConditionSnapshot, ConnectionClass};
pub use config::PrefetchConfig;
pub use error::PrefetchError;
pub use scheduler::{candidate_window, gate_allows, InFlightSet, PrefetchScheduler};
pub use stats::{PrefetchStats, PrefetchStatsSnapshot};
pub use types::{PlaybackEvent, PrefetchCandidate, VideoDescriptor};
