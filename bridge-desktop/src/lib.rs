//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, streaming bodies straight to disk
//! - `FileSystemAccess` using `tokio::fs`
//! - `AudioRouting` as a bookkeeping no-op (desktop has no exclusive session)
//!
//! The audio backend itself is left to the host: desktop mixers vary too much
//! for a single default.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopAudioRouting, ReqwestHttpClient, TokioFileSystem};
//!
//! let http_client = ReqwestHttpClient::new();
//! let fs = TokioFileSystem::new();
//! let routing = DesktopAudioRouting::new();
//! ```

mod filesystem;
mod http;
mod routing;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use routing::DesktopAudioRouting;
