//! YouTube Data API access for tubeup.
//!
//! This module provides a trait-based interface over the handful of Data API
//! calls the uploader needs, a reqwest-backed implementation and a scripted
//! in-memory implementation.
//!
//! # Design Principles
//! - Callers depend on [`VideoService`], never on the HTTP client directly
//! - One method per remote round trip; retry decisions belong to callers
//! - HTTP failures keep their status so transient ones can be recognised

pub mod client;
pub mod memory;
pub mod models;
pub mod service;

pub use client::{ApiEndpoints, YouTubeClient};
pub use memory::{ChunkReply, MemoryVideoService, RecordedCall};
pub use models::{
    watch_url, Channel, ChannelSnippet, ChannelStatistics, VideoCategory, VideoCategorySnippet,
    VideoResource, VideoSnippet, VideoStatus, WATCH_URL_PREFIX,
};
pub use service::{ChunkOutcome, VideoService};
