//! # Event Bus System
//!
//! Typed, decoupled notifications from the audio core using
//! `tokio::sync::broadcast`.
//!
//! ```text
//! ┌─────────────┐     emit      ┌───────────┐
//! │  ClipCache  ├──────────────>│           │     subscribe    ┌────────────┐
//! └─────────────┘               │ EventBus  ├─────────────────>│ Subscriber │
//! ┌─────────────┐     emit      │ (broadcast│                  └────────────┘
//! │  Engines    ├──────────────>│  channel) │
//! └─────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Cache(CacheEvent::Hit {
//!         key: "voice-1.m4a".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender is gone, which means shutdown.
//!
//! Emission is best-effort: publishers ignore the "no subscribers" error.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Clip cache activity
    Cache(CacheEvent),
    /// Playback engine activity
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Cache(CacheEvent::DownloadFailed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::DownloadCompleted {
                suspicious: true, ..
            }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::EmptyEntryPurged { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::DownloadCompleted { .. }) => EventSeverity::Info,
            CoreEvent::Cache(CacheEvent::Cleared { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::Finished { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events emitted by the clip cache. Entries are identified by cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A valid cached file answered the request.
    Hit { key: String },
    /// A network transfer began.
    DownloadStarted { key: String },
    /// A transfer finished and the file was moved into the cache.
    DownloadCompleted {
        key: String,
        bytes: u64,
        /// Smaller than the plausible minimum for an audio file.
        suspicious: bool,
    },
    /// A transfer or the final move failed.
    DownloadFailed { key: String, message: String },
    /// A zero-byte entry was found and deleted.
    EmptyEntryPurged { key: String },
    /// Every entry was deleted on request.
    Cleared { removed: usize },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Hit { .. } => "Clip served from cache",
            CacheEvent::DownloadStarted { .. } => "Clip download started",
            CacheEvent::DownloadCompleted { .. } => "Clip download completed",
            CacheEvent::DownloadFailed { .. } => "Clip download failed",
            CacheEvent::EmptyEntryPurged { .. } => "Empty cache entry purged",
            CacheEvent::Cleared { .. } => "Clip cache cleared",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by playback engines. Engines are identified by their id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Output started or resumed.
    Started { engine_id: String, clip: String },
    /// Paused on request.
    Paused { engine_id: String, elapsed_ms: u64 },
    /// Paused because another engine began playing.
    Preempted { engine_id: String, by: String },
    /// The clip played to its end.
    Finished { engine_id: String, clip: String },
    /// Loading or playback failed.
    Failed {
        engine_id: String,
        kind: String,
        message: String,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Preempted { .. } => "Playback preempted",
            PlaybackEvent::Finished { .. } => "Clip finished",
            PlaybackEvent::Failed { .. } => "Playback failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clone it to add producers; each `subscribe()` creates an independent
/// receiver that sees only events emitted after it was created.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
