//! # Clip Playback Core
//!
//! Caching and playback of short chat audio clips.
//!
//! ## Overview
//!
//! This crate handles:
//! - Resolving remote clips to local files with deduplicated downloads
//!   ([`ClipCache`])
//! - Per-clip playback engines with an explicit state machine
//!   ([`PlaybackEngine`])
//! - Single-playback-at-a-time across engines ([`NowPlayingRegistry`])
//! - Shared device audio session activation ([`AudioSession`])

pub mod cache;
pub mod clip;
pub mod engine;
pub mod error;
pub mod session;

pub use cache::{CacheConfig, CacheStats, ClipCache};
pub use clip::{ClipLocation, ClipReference};
pub use engine::{
    Announcement, ClipFinished, EngineConfig, EngineContext, EngineId, NowPlayingRegistry,
    PlaybackEngine, PlaybackPhase, PlaybackSnapshot,
};
pub use error::{FailureKind, PlaybackError, Result};
pub use session::AudioSession;
