//! # Clip Cache
//!
//! Maps remote clip URLs to validated local files.
//!
//! - One shared download job per URL, run on its own task so it settles and
//!   leaves the in-flight map even when every requester stops waiting
//! - Downloads land in a temporary file and are renamed into place
//! - Existence plus non-zero size of the keyed file is the cache record

use crate::cache::{config::CacheConfig, stats::CacheStats};
use crate::error::{PlaybackError, Result};
use bridge_traits::{http::HttpClient, http::HttpRequest, storage::FileSystemAccess};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

type DownloadJob = Shared<BoxFuture<'static, Result<PathBuf>>>;

static GLOBAL_CACHE: OnceLock<ClipCache> = OnceLock::new();

/// Process-wide clip cache.
///
/// Cloning is cheap and every clone shares the same in-flight map.
#[derive(Clone)]
pub struct ClipCache {
    config: Arc<CacheConfig>,
    fs: Arc<dyn FileSystemAccess>,
    http_client: Arc<dyn HttpClient>,
    base_dir: Option<PathBuf>,
    event_bus: Option<EventBus>,
    cache_path: Arc<OnceCell<PathBuf>>,
    in_flight: Arc<Mutex<HashMap<String, DownloadJob>>>,
}

impl ClipCache {
    /// Create a new clip cache.
    ///
    /// Directories are created lazily on first use, or eagerly through
    /// [`initialize`](Self::initialize).
    pub fn new(
        config: CacheConfig,
        fs: Arc<dyn FileSystemAccess>,
        http_client: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fs,
            http_client,
            base_dir: None,
            event_bus: None,
            cache_path: Arc::new(OnceCell::new()),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Root the cache under `dir` instead of the host cache directory.
    pub fn with_base_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Set event bus for cache events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Install `cache` as the process-wide instance.
    ///
    /// Returns the cache back if one was already installed.
    pub fn install_global(cache: ClipCache) -> std::result::Result<(), ClipCache> {
        GLOBAL_CACHE.set(cache)
    }

    /// The process-wide instance, if installed.
    pub fn global() -> Option<&'static ClipCache> {
        GLOBAL_CACHE.get()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// File system the cache stores clips on.
    pub fn file_system(&self) -> &Arc<dyn FileSystemAccess> {
        &self.fs
    }

    /// Deterministic file name for a remote clip.
    ///
    /// The last path segment of the URL, or an id derived from the whole URL
    /// when it has no usable segment.
    pub fn cache_key(url: &Url) -> String {
        url.path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
            .map(str::to_string)
            .unwrap_or_else(|| {
                Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_str().as_bytes()).to_string()
            })
    }

    /// Validate the configuration and create the cache directories.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<PathBuf> {
        let cache_dir = self.cache_dir().await?;
        self.temp_dir().await?;
        info!(path = ?cache_dir, "Clip cache initialized");
        Ok(cache_dir)
    }

    /// Resolve a remote location string to a local file, downloading it if
    /// no valid cached copy exists.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidLocation`] if `location` is not an http(s) URL
    /// - [`PlaybackError::TransferFailed`] if the fetch fails or ends with a
    ///   non-success status
    /// - [`PlaybackError::StorageFailed`] if the file cannot be stored
    #[instrument(skip(self))]
    pub async fn resolve(&self, location: &str) -> Result<PathBuf> {
        let url = parse_remote(location)?;
        self.resolve_url(&url).await
    }

    /// Same as [`resolve`](Self::resolve) for an already parsed URL.
    pub async fn resolve_url(&self, url: &Url) -> Result<PathBuf> {
        let key = Self::cache_key(url);
        let path = self.cache_dir().await?.join(&key);

        if self.lookup(&key, &path).await? {
            return Ok(path);
        }

        self.join_or_start(url, key, path).await
    }

    /// Whether a valid entry exists for `location`. Never touches the network.
    #[instrument(skip(self))]
    pub async fn is_cached(&self, location: &str) -> Result<bool> {
        let url = parse_remote(location)?;
        let path = self.cache_dir().await?.join(Self::cache_key(&url));
        Ok(self.size_of(&path).await?.is_some_and(|size| size > 0))
    }

    /// Delete the entry for `location`. Returns whether a file was removed.
    #[instrument(skip(self))]
    pub async fn remove(&self, location: &str) -> Result<bool> {
        let url = parse_remote(location)?;
        let path = self.cache_dir().await?.join(Self::cache_key(&url));

        if self.size_of(&path).await?.is_none() {
            return Ok(false);
        }

        self.fs
            .delete_file(&path)
            .await
            .map_err(|e| PlaybackError::StorageFailed(format!("Failed to remove entry: {}", e)))?;
        debug!(key = %Self::cache_key(&url), "Removed cache entry");
        Ok(true)
    }

    /// Delete every cached clip. Partial downloads are left alone.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;

        for (path, _) in self.entries().await? {
            match self.fs.delete_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(PlaybackError::StorageFailed(format!(
                        "Failed to delete {:?}: {}",
                        path.file_name().unwrap_or_default(),
                        e
                    )))
                }
            }
        }

        info!(removed, "Clip cache cleared");
        self.emit(CacheEvent::Cleared { removed });
        Ok(removed)
    }

    /// Compute statistics from the directory listing.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries().await?;

        Ok(CacheStats {
            files: entries.len(),
            total_bytes: entries.iter().map(|(_, size)| size).sum(),
            empty_files: entries.iter().filter(|(_, size)| *size == 0).count(),
            calculated_at: chrono::Utc::now().timestamp(),
        })
    }

    async fn cache_dir(&self) -> Result<PathBuf> {
        self.cache_path
            .get_or_try_init(|| async {
                self.config.validate().map_err(|e| {
                    PlaybackError::InvalidConfig(format!("Invalid cache configuration: {}", e))
                })?;

                let base = match &self.base_dir {
                    Some(dir) => dir.clone(),
                    None => self.fs.get_cache_directory().await.map_err(|e| {
                        error!("Failed to get cache directory: {}", e);
                        PlaybackError::StorageFailed(format!(
                            "Failed to get cache directory: {}",
                            e
                        ))
                    })?,
                };

                let cache_path = base.join(&self.config.cache_directory);
                self.fs.create_dir_all(&cache_path).await.map_err(|e| {
                    error!("Failed to create cache directory: {}", e);
                    PlaybackError::StorageFailed(format!("Failed to create cache directory: {}", e))
                })?;

                Ok::<_, PlaybackError>(cache_path)
            })
            .await
            .cloned()
    }

    async fn temp_dir(&self) -> Result<PathBuf> {
        let temp = self.cache_dir().await?.join(&self.config.temp_directory);
        self.fs.create_dir_all(&temp).await.map_err(|e| {
            PlaybackError::StorageFailed(format!("Failed to create temp directory: {}", e))
        })?;
        Ok(temp)
    }

    async fn size_of(&self, path: &Path) -> Result<Option<u64>> {
        self.fs
            .file_size(path)
            .await
            .map_err(|e| PlaybackError::StorageFailed(format!("Failed to stat cache entry: {}", e)))
    }

    /// Regular files in the cache directory with their sizes.
    async fn entries(&self) -> Result<Vec<(PathBuf, u64)>> {
        let cache_dir = self.cache_dir().await?;
        let listing = self.fs.list_directory(&cache_dir).await.map_err(|e| {
            PlaybackError::StorageFailed(format!("Failed to list cache directory: {}", e))
        })?;

        let mut entries = Vec::with_capacity(listing.len());
        for path in listing {
            if let Some(size) = self.size_of(&path).await? {
                entries.push((path, size));
            }
        }
        Ok(entries)
    }

    /// `true` on a valid hit. Empty files are purged and reported as a miss.
    async fn lookup(&self, key: &str, path: &Path) -> Result<bool> {
        match self.size_of(path).await? {
            Some(0) => {
                warn!(key, "Purging empty cache entry");
                self.fs.delete_file(path).await.map_err(|e| {
                    PlaybackError::StorageFailed(format!("Failed to purge empty entry: {}", e))
                })?;
                self.emit(CacheEvent::EmptyEntryPurged {
                    key: key.to_string(),
                });
                Ok(false)
            }
            Some(size) => {
                debug!(key, size, "Cache hit");
                self.emit(CacheEvent::Hit {
                    key: key.to_string(),
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn join_or_start(&self, url: &Url, key: String, path: PathBuf) -> DownloadJob {
        let mut in_flight = self.in_flight.lock();

        if let Some(job) = in_flight.get(&key) {
            debug!(key = %key, "Joining in-flight download");
            return job.clone();
        }

        let cache = self.clone();
        let job_url = url.clone();
        let job_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = cache.fetch(&job_url, &job_key, &path).await;
            cache.in_flight.lock().remove(&job_key);
            result
        });

        let job = async move {
            handle.await.unwrap_or_else(|e| {
                Err(PlaybackError::Internal(format!("Download task failed: {}", e)))
            })
        }
        .boxed()
        .shared();

        in_flight.insert(key, job.clone());
        job
    }

    async fn fetch(&self, url: &Url, key: &str, dest: &Path) -> Result<PathBuf> {
        // A download for this key may have settled between the caller's
        // lookup and this job starting.
        if self.lookup(key, dest).await? {
            return Ok(dest.to_path_buf());
        }

        info!(key, "Downloading clip");
        self.emit(CacheEvent::DownloadStarted {
            key: key.to_string(),
        });

        let result = self.download(url, key, dest).await;
        if let Err(e) = &result {
            warn!(key, error = %e, "Clip download failed");
            self.emit(CacheEvent::DownloadFailed {
                key: key.to_string(),
                message: e.to_string(),
            });
        }
        result
    }

    async fn download(&self, url: &Url, key: &str, dest: &Path) -> Result<PathBuf> {
        let temp_path = self
            .temp_dir()
            .await?
            .join(format!("{}.{}.part", key, Uuid::new_v4().simple()));

        let mut request = HttpRequest::get(url.as_str());
        if let Some(timeout) = self.config.download_timeout {
            request = request.timeout(timeout);
        }

        let download = match self.http_client.download_to(request, &temp_path).await {
            Ok(download) => download,
            Err(e) => {
                self.discard(&temp_path).await;
                return Err(PlaybackError::TransferFailed(e.to_string()));
            }
        };

        if !download.is_success() {
            self.discard(&temp_path).await;
            return Err(PlaybackError::TransferFailed(format!(
                "HTTP status {}",
                download.status
            )));
        }

        if let Err(e) = self.fs.rename(&temp_path, dest).await {
            self.discard(&temp_path).await;
            return Err(PlaybackError::StorageFailed(format!(
                "Failed to move download into cache: {}",
                e
            )));
        }

        let bytes = self
            .size_of(dest)
            .await?
            .unwrap_or(download.bytes_written);
        let suspicious = bytes < self.config.min_plausible_size_bytes;

        if suspicious {
            warn!(
                key,
                bytes,
                min = self.config.min_plausible_size_bytes,
                "Downloaded clip is suspiciously small"
            );
        } else {
            info!(key, bytes, "Clip cached");
        }

        self.emit(CacheEvent::DownloadCompleted {
            key: key.to_string(),
            bytes,
            suspicious,
        });

        Ok(dest.to_path_buf())
    }

    async fn discard(&self, temp_path: &Path) {
        match self.fs.delete_file(temp_path).await {
            Ok(()) => debug!("Removed partial download"),
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(error = %e, "Failed to remove partial download"),
        }
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Cache(event));
        }
    }
}

impl std::fmt::Debug for ClipCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipCache")
            .field("config", &self.config)
            .field("base_dir", &self.base_dir)
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

fn parse_remote(location: &str) -> Result<Url> {
    let url = Url::parse(location.trim())
        .map_err(|e| PlaybackError::InvalidLocation(format!("{}: {}", location, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PlaybackError::InvalidLocation(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}
