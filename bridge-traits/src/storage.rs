//! Storage and File System Abstractions
//!
//! Provides the platform-agnostic file operations the clip cache relies on.
//! Existence and size checks on the filesystem are the cache's only record,
//! so implementations must report them faithfully.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - iOS/Android: Sandboxed app cache directories
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn cached_size(fs: &dyn FileSystemAccess, key: &str) -> Result<u64> {
///     let cache_dir = fs.get_cache_directory().await?;
///     Ok(fs.metadata(&cache_dir.join(key)).await?.size)
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's private cache directory
    async fn get_cache_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write data to a file, creating it if it doesn't exist
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Move a file, replacing any existing file at `to`.
    ///
    /// Implementations must make this atomic when both paths share a volume.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Size of a regular file, or `None` when the file does not exist.
    async fn file_size(&self, path: &Path) -> Result<Option<u64>> {
        if !self.exists(path).await? {
            return Ok(None);
        }
        let metadata = self.metadata(path).await?;
        if metadata.is_directory {
            return Ok(None);
        }
        Ok(Some(metadata.size))
    }
}
