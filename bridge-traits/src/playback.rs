//! Playback bridge trait and supporting types.
//!
//! The host owns the actual decoder and output device (AVPlayer, ExoPlayer,
//! a desktop mixer). The core drives it through opaque sessions: one session
//! per opened clip, released with [`AudioBackend::close`]. Backends that cannot
//! await readiness expose it through [`AudioBackend::status`] and
//! [`AudioBackend::duration`] so the core can poll.

use crate::error::Result;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Unique identifier for playback sessions managed by a host backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Load status of an opened session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// Media is still being probed/buffered.
    Loading,
    /// Media can start; the duration may still be unknown.
    Ready,
    /// The backend gave up on this media (usually a decode failure).
    Failed { message: String },
}

/// Asynchronous notifications emitted by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// Playback reached the end of the media.
    Ended { session: PlaybackSessionId },
    /// Playback stopped because the media could not be decoded further.
    Failed {
        session: PlaybackSessionId,
        message: String,
    },
}

impl BackendEvent {
    /// Session the event belongs to.
    pub fn session(&self) -> PlaybackSessionId {
        match self {
            BackendEvent::Ended { session } | BackendEvent::Failed { session, .. } => *session,
        }
    }
}

/// Trait for platform-specific audio backends that decode and output clips.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Open a local file. Returns immediately; readiness is reported through
    /// [`status`](Self::status).
    async fn open(&self, path: &Path) -> Result<PlaybackSessionId>;

    /// Begin or resume output for the session.
    async fn play(&self, session: PlaybackSessionId) -> Result<()>;

    /// Pause output without releasing the session.
    async fn pause(&self, session: PlaybackSessionId) -> Result<()>;

    /// Seek to an absolute position within the media.
    async fn seek(&self, session: PlaybackSessionId, position: Duration) -> Result<()>;

    /// Current playback position.
    async fn position(&self, session: PlaybackSessionId) -> Result<Duration>;

    /// Current load status.
    async fn status(&self, session: PlaybackSessionId) -> Result<BackendStatus>;

    /// Media duration once the backend knows it.
    async fn duration(&self, session: PlaybackSessionId) -> Result<Option<Duration>>;

    /// Release every resource associated with the session.
    async fn close(&self, session: PlaybackSessionId) -> Result<()>;

    /// Subscribe to end-of-media and failure notifications for all sessions.
    fn subscribe(&self) -> broadcast::Receiver<BackendEvent>;
}
