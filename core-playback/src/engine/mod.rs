//! # Playback Engine
//!
//! Drives one clip's playback lifecycle on a host [`AudioBackend`].
//!
//! ## Overview
//!
//! - [`PlaybackEngine`] is a cheap, cloneable handle; the engine itself is
//!   an actor task that owns all mutable state
//! - Transport calls are fire-and-forget; state is observed through
//!   [`PlaybackSnapshot`]s on a `watch` channel
//! - Only one engine plays at a time, mediated by the
//!   [`NowPlayingRegistry`]
//!
//! ## Example
//!
//! ```ignore
//! let engine = PlaybackEngine::spawn(ctx, None)?;
//! engine.play(ClipReference::parse("https://cdn.example.com/v/1.m4a")?);
//!
//! let mut state = engine.subscribe();
//! while state.changed().await.is_ok() {
//!     let snapshot = state.borrow().clone();
//!     render(snapshot.progress, snapshot.seconds_left);
//! }
//! ```
//!
//! [`AudioBackend`]: bridge_traits::playback::AudioBackend

mod actor;
pub mod config;
pub mod registry;
pub mod snapshot;
pub mod state;

pub use actor::EngineContext;
pub use config::EngineConfig;
pub use registry::{Announcement, EngineId, NowPlayingRegistry};
pub use snapshot::{ClipFinished, PlaybackSnapshot};
pub use state::{PhaseEvent, PlaybackPhase};

use crate::clip::ClipReference;
use crate::error::{PlaybackError, Result};
use actor::{Command, EngineActor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{info_span, trace, Instrument};

const FINISHED_BUFFER: usize = 16;

/// Handle to a playback engine.
///
/// Clones share the same engine. When the last clone is dropped the actor is
/// cancelled: sampling stops, the announcement subscription is dropped, the
/// output claim is released and the backend session is closed.
#[derive(Clone)]
pub struct PlaybackEngine {
    id: EngineId,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PlaybackSnapshot>,
    finished: broadcast::Sender<ClipFinished>,
    _guard: Arc<DropGuard>,
}

impl PlaybackEngine {
    /// Spawn an engine on the current tokio runtime.
    ///
    /// `clip` is shown in the initial snapshot (with its known duration as
    /// the remaining time) and becomes the target of a clip-less
    /// [`seek`](Self::seek).
    ///
    /// Fails with [`PlaybackError::InvalidConfig`] when `ctx.config` does not
    /// validate.
    pub fn spawn(ctx: EngineContext, clip: Option<ClipReference>) -> Result<Self> {
        ctx.config.validate().map_err(PlaybackError::InvalidConfig)?;

        let id = EngineId::new();
        let cancel = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (finished_tx, _) = broadcast::channel(FINISHED_BUFFER);

        let total = clip.as_ref().and_then(|c| c.duration());
        let initial = PlaybackSnapshot::compute(
            PlaybackPhase::Idle,
            clip.clone(),
            Duration::ZERO,
            total,
            None,
            false,
        );
        let (state_tx, state_rx) = watch::channel(initial);

        let actor = EngineActor::new(
            id,
            ctx,
            cancel.clone(),
            command_rx,
            state_tx,
            finished_tx.clone(),
            clip,
        );
        tokio::spawn(actor.run().instrument(info_span!("engine", engine_id = %id)));

        Ok(Self {
            id,
            commands: command_tx,
            state: state_rx,
            finished: finished_tx,
            _guard: Arc::new(cancel.drop_guard()),
        })
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    /// Latest published state.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state.clone()
    }

    /// One notification per clip that plays to its end.
    pub fn finished(&self) -> broadcast::Receiver<ClipFinished> {
        self.finished.subscribe()
    }

    /// Load (if needed) and play `clip`. Resumes when it is already loaded.
    pub fn play(&self, clip: ClipReference) {
        self.send(Command::Play(clip));
    }

    /// Pause if playing; no-op otherwise.
    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    /// Pause when `clip` is playing, otherwise play it.
    pub fn toggle(&self, clip: ClipReference) {
        self.send(Command::Toggle(clip));
    }

    /// Seek `clip` to `fraction` of its duration, loading it first if needed,
    /// and play from there. A fraction of `1.0` finishes the clip.
    pub fn seek_clip(&self, clip: ClipReference, fraction: f64) {
        self.send(Command::SeekClip(clip, fraction));
    }

    /// Seek the current clip.
    pub fn seek(&self, fraction: f64) {
        self.send(Command::Seek(fraction));
    }

    /// Release the backend and return to idle.
    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    /// Resolves once every command sent before this call has been processed.
    pub async fn settled(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Barrier(tx))
            .map_err(|_| PlaybackError::EngineClosed)?;
        rx.await.map_err(|_| PlaybackError::EngineClosed)
    }

    /// Stop the actor and wait for it to release everything.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.commands.send(command) {
            trace!(engine_id = %self.id, command = ?e.0, "Engine closed, command dropped");
        }
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("id", &self.id)
            .field("phase", &self.state.borrow().phase)
            .finish()
    }
}
