//! # Clip Cache Module
//!
//! Resolves remote voice clips to validated local files.
//!
//! ## Overview
//!
//! - Persistent storage through the `FileSystemAccess` bridge; the cache
//!   directory listing is the only index
//! - At most one network transfer per remote location, shared by every
//!   concurrent requester
//! - Zero-byte entries are purged and downloaded again
//! - Suspiciously small downloads are logged but still served
//!
//! There is no eviction: entries persist until [`ClipCache::clear`] or
//! [`ClipCache::remove`] is called, or the host wipes its cache directory.
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │              ClipCache                 │
//! │  - resolve()                           │
//! │  - is_cached() / remove() / clear()    │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> in-flight map (one shared job per URL)
//!          ├──> HttpClient (download to temp file)
//!          └──> FileSystemAccess (rename into place)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::{CacheConfig, ClipCache};
//!
//! let cache = ClipCache::new(CacheConfig::default(), file_system, http_client);
//! let path = cache.resolve("https://cdn.example.com/voice/42.m4a").await?;
//! ```

pub mod config;
pub mod manager;
pub mod stats;

pub use config::CacheConfig;
pub use manager::ClipCache;
pub use stats::CacheStats;
