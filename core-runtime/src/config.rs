//! # Core Configuration Module
//!
//! The configuration system uses a builder to construct a `CoreConfig` holding
//! the host bridges the audio core needs. It enforces fail-fast validation so a
//! missing capability surfaces at startup rather than on first playback.
//!
//! ## Bridges
//!
//! - `HttpClient` - clip downloads (desktop default: reqwest)
//! - `FileSystemAccess` - cache storage (desktop default: tokio fs)
//! - `AudioRouting` - device audio session (desktop default: no-op routing)
//!
//! With the `desktop-shims` feature, missing bridges are filled with the
//! desktop implementations. Without it, every bridge must be injected.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .file_system(Arc::new(MyFileSystem))
//!     .audio_routing(Arc::new(MyRouting))
//!     .cache_dir("/tmp/chat-audio")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioRouting, FileSystemAccess, HttpClient};
use std::path::PathBuf;
use std::sync::Arc;

/// Core configuration for the audio core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// HTTP client used to download remote clips
    pub http_client: Arc<dyn HttpClient>,

    /// File system access used by the clip cache
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Device audio session control
    pub audio_routing: Arc<dyn AudioRouting>,

    /// Overrides the host cache directory when set
    pub cache_dir: Option<PathBuf>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("audio_routing", &"AudioRouting { ... }")
            .field("cache_dir", &self.cache_dir)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.cache_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config("Cache directory cannot be empty".to_string()));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the default implementation. \
             Mobile: inject the platform-native bridge.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(bridge_desktop::ReqwestHttpClient::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient", "downloading remote clips"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(capability_missing("FileSystemAccess", "the clip cache"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_audio_routing() -> Result<Arc<dyn AudioRouting>> {
    Ok(Arc::new(bridge_desktop::DesktopAudioRouting::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_audio_routing() -> Result<Arc<dyn AudioRouting>> {
    Err(capability_missing("AudioRouting", "audio session control"))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    audio_routing: Option<Arc<dyn AudioRouting>>,
    cache_dir: Option<PathBuf>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the file system implementation.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the audio routing implementation.
    pub fn audio_routing(mut self, routing: Arc<dyn AudioRouting>) -> Self {
        self.audio_routing = Some(routing);
        self
    }

    /// Stores cached clips under `path` instead of the host cache directory.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the event bus buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a bridge is absent and no desktop
    ///   default is compiled in
    /// - [`Error::Config`] when a setting is invalid
    pub fn build(self) -> Result<CoreConfig> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let audio_routing = match self.audio_routing {
            Some(routing) => routing,
            None => provide_default_audio_routing()?,
        };

        let config = CoreConfig {
            http_client,
            file_system,
            audio_routing,
            cache_dir: self.cache_dir,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
