//! Cache configuration

use std::time::Duration;

/// Configuration for the clip cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory for cached clips, relative to the host cache directory
    /// (default: "AudioCache")
    pub cache_directory: String,

    /// Directory for partial downloads, relative to `cache_directory`
    /// (default: "tmp")
    pub temp_directory: String,

    /// Files smaller than this are logged as suspicious (default: 1024 bytes)
    pub min_plausible_size_bytes: u64,

    /// Per-download timeout; `None` leaves it to the transport
    pub download_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_directory: "AudioCache".to_string(),
            temp_directory: "tmp".to_string(),
            min_plausible_size_bytes: 1024,
            download_timeout: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cache directory name.
    pub fn with_cache_directory(mut self, dir: impl Into<String>) -> Self {
        self.cache_directory = dir.into();
        self
    }

    /// Set temporary directory name.
    pub fn with_temp_directory(mut self, dir: impl Into<String>) -> Self {
        self.temp_directory = dir.into();
        self
    }

    /// Set the size below which downloads are flagged.
    pub fn with_min_plausible_size(mut self, bytes: u64) -> Self {
        self.min_plausible_size_bytes = bytes;
        self
    }

    /// Set download timeout.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = Some(timeout);
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_directory.trim().is_empty() {
            return Err("cache_directory cannot be empty".to_string());
        }

        if self.temp_directory.trim().is_empty() {
            return Err("temp_directory cannot be empty".to_string());
        }

        if self.temp_directory.contains(['/', '\\']) || self.temp_directory == ".." {
            return Err("temp_directory must be a single directory name".to_string());
        }

        if self.download_timeout == Some(Duration::ZERO) {
            return Err("download_timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}
