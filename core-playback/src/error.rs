//! # Playback Error Types
//!
//! Error taxonomy shared by the clip cache and the playback engines.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while resolving or playing a clip.
///
/// Cloneable so a single download outcome can be handed to every requester
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    // ========================================================================
    // Location Errors
    // ========================================================================
    /// The clip reference is not a well-formed URL or path.
    #[error("Invalid clip location: {0}")]
    InvalidLocation(String),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// The network fetch failed or finished with a non-success status.
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Writing or moving the downloaded file failed.
    #[error("Cache storage failed: {0}")]
    StorageFailed(String),

    // ========================================================================
    // Playback Errors
    // ========================================================================
    /// The local file is absent or empty at play time.
    #[error("Clip file missing: {0}")]
    ClipMissing(String),

    /// The backend never reported a usable duration within the bounded wait.
    #[error("Audio backend not ready after {0:?}")]
    BackendTimeout(Duration),

    /// The backend could not open or decode the media.
    #[error("Audio backend could not decode clip: {0}")]
    BackendDecodeError(String),

    /// The device refused to activate audio output.
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The engine's actor task is gone.
    #[error("Playback engine closed")]
    EngineClosed,

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Payload-free tag for a [`PlaybackError`], suitable for events and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidLocation,
    TransferFailed,
    StorageFailed,
    ClipMissing,
    BackendTimeout,
    BackendDecodeError,
    OutputUnavailable,
    InvalidConfig,
    EngineClosed,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidLocation => "invalid_location",
            FailureKind::TransferFailed => "transfer_failed",
            FailureKind::StorageFailed => "storage_failed",
            FailureKind::ClipMissing => "clip_missing",
            FailureKind::BackendTimeout => "backend_timeout",
            FailureKind::BackendDecodeError => "backend_decode_error",
            FailureKind::OutputUnavailable => "output_unavailable",
            FailureKind::InvalidConfig => "invalid_config",
            FailureKind::EngineClosed => "engine_closed",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PlaybackError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PlaybackError::InvalidLocation(_) => FailureKind::InvalidLocation,
            PlaybackError::TransferFailed(_) => FailureKind::TransferFailed,
            PlaybackError::StorageFailed(_) => FailureKind::StorageFailed,
            PlaybackError::ClipMissing(_) => FailureKind::ClipMissing,
            PlaybackError::BackendTimeout(_) => FailureKind::BackendTimeout,
            PlaybackError::BackendDecodeError(_) => FailureKind::BackendDecodeError,
            PlaybackError::OutputUnavailable(_) => FailureKind::OutputUnavailable,
            PlaybackError::InvalidConfig(_) => FailureKind::InvalidConfig,
            PlaybackError::EngineClosed => FailureKind::EngineClosed,
            PlaybackError::Internal(_) => FailureKind::Internal,
        }
    }

    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::TransferFailed(_)
                | PlaybackError::BackendTimeout(_)
                | PlaybackError::OutputUnavailable(_)
        )
    }

    /// Returns `true` if this error came from the cache rather than the backend.
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::TransferFailed(_) | PlaybackError::StorageFailed(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
