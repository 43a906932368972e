//! ReelCache - client-side video prefetch and tiered cache engine.
//!
//! This library decides, under changing network and power conditions, which
//! upcoming videos in a feed to fetch ahead of playback, performs partial
//! byte-range downloads so playback can start instantly, stitches partial and
//! remainder downloads back together, and stores the results in a two-tier
//! (memory + durable) cache with LRU/TTL eviction.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use reelcache::service::{VideoCacheService, ServiceConfig};
//! use reelcache::net::ReqwestClient;
//! use std::sync::Arc;
//!
//! let client = Arc::new(ReqwestClient::new()?);
//! let service = VideoCacheService::start(ServiceConfig::default(), client)?;
//!
//! service.set_playlist(feed_videos);
//! service.set_current_index(0);
//!
//! // The playback component resolves a locally-playable source:
//! if let Some(cached) = service.cached_video("video-42") {
//!     // play from cached.path (cached.is_partial tells you it is a head-only blob)
//! }
//! ```

pub mod cache;
pub mod logging;
pub mod net;
pub mod prefetch;
pub mod service;

/// Version of the reelcache library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
