//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each chat host.
//!
//! ## Overview
//!
//! This crate defines the contract between the voice-message audio core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per platform
//! (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Full-resource downloads into a local file
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Cache directory, moves, deletes, size queries
//!
//! ### Audio
//! - [`AudioBackend`](playback::AudioBackend) - Decoding/output engine driven through sessions
//! - [`AudioRouting`](routing::AudioRouting) - Device audio session activation and speaker/earpiece routing
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ HTTP, filesystem, routing |
//! | iOS      | host app            | 📋 AVFoundation adapters |
//! | Android  | host app            | 📋 ExoPlayer/AudioManager adapters |
//!
//! The audio backend is always supplied by the host: the core only plays
//! whatever format the host backend can natively decode.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError` and
//! include context (file paths, HTTP status) in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared by the cache and every playback engine.

pub mod error;
pub mod http;
pub mod logging;
pub mod playback;
pub mod routing;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpDownload, HttpRequest};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use playback::{AudioBackend, BackendEvent, BackendStatus, PlaybackSessionId};
pub use routing::{AudioRouting, OutputRoute, SessionCategory};
pub use storage::{FileMetadata, FileSystemAccess};
