//! Cache statistics

use serde::{Deserialize, Serialize};

/// Snapshot of the clip cache computed from a directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cached files, empty ones included
    pub files: usize,

    /// Total bytes on disk
    pub total_bytes: u64,

    /// Zero-byte files awaiting purge on next lookup
    pub empty_files: usize,

    /// Timestamp when stats were calculated
    pub calculated_at: i64,
}

impl CacheStats {
    /// Returns average bytes per non-empty file.
    pub fn average_file_size(&self) -> u64 {
        let valid = self.files.saturating_sub(self.empty_files);
        if valid == 0 {
            0
        } else {
            self.total_bytes / valid as u64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files == 0
    }
}
