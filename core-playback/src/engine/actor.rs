//! Engine actor.
//!
//! One task owns all mutable state of an engine. Commands, announcements,
//! backend notifications and progress ticks are multiplexed with
//! `tokio::select!`, so every transition runs to completion before the next
//! input is looked at.

use crate::cache::ClipCache;
use crate::clip::{ClipLocation, ClipReference};
use crate::engine::config::EngineConfig;
use crate::engine::registry::{Announcement, EngineId, NowPlayingRegistry};
use crate::engine::snapshot::{ClipFinished, PlaybackSnapshot};
use crate::engine::state::{transition, PhaseEvent, PlaybackPhase};
use crate::error::{PlaybackError, Result};
use crate::session::AudioSession;
use bridge_traits::playback::{AudioBackend, BackendEvent, BackendStatus, PlaybackSessionId};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::{redact_if_sensitive, strip_path};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Collaborators shared by every engine.
#[derive(Clone)]
pub struct EngineContext {
    pub backend: Arc<dyn AudioBackend>,
    pub cache: ClipCache,
    pub session: Arc<AudioSession>,
    pub registry: Arc<NowPlayingRegistry>,
    pub events: Option<EventBus>,
    pub config: EngineConfig,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub(crate) enum Command {
    Play(ClipReference),
    Pause,
    Toggle(ClipReference),
    SeekClip(ClipReference, f64),
    Seek(f64),
    Reset,
    Barrier(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Media currently opened on the backend.
#[derive(Debug, Clone, Copy)]
struct Loaded {
    session: PlaybackSessionId,
    duration: Duration,
}

pub(crate) struct EngineActor {
    id: EngineId,
    ctx: EngineContext,
    cancel: CancellationToken,
    commands: mpsc::UnboundedReceiver<Command>,
    announcements: Option<broadcast::Receiver<Announcement>>,
    backend_events: Option<broadcast::Receiver<BackendEvent>>,
    ticker: Option<Interval>,
    state: watch::Sender<PlaybackSnapshot>,
    finished: broadcast::Sender<ClipFinished>,

    phase: PlaybackPhase,
    clip: Option<ClipReference>,
    loaded: Option<Loaded>,
    elapsed: Duration,
    last_error: Option<PlaybackError>,
}

impl EngineActor {
    pub(crate) fn new(
        id: EngineId,
        ctx: EngineContext,
        cancel: CancellationToken,
        commands: mpsc::UnboundedReceiver<Command>,
        state: watch::Sender<PlaybackSnapshot>,
        finished: broadcast::Sender<ClipFinished>,
        clip: Option<ClipReference>,
    ) -> Self {
        // Subscribed before the handle is returned, so no announcement made
        // after spawn can be missed.
        let announcements = Some(ctx.registry.subscribe());
        let backend_events = Some(ctx.backend.subscribe());

        Self {
            id,
            ctx,
            cancel,
            commands,
            announcements,
            backend_events,
            ticker: None,
            state,
            finished,
            phase: PlaybackPhase::Idle,
            clip,
            loaded: None,
            elapsed: Duration::ZERO,
            last_error: None,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!("Engine started");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    self.teardown().await;
                    break;
                }
                announcement = recv_or_pending(&mut self.announcements) => {
                    self.on_announcement(announcement).await;
                }
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.teardown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                event = recv_or_pending(&mut self.backend_events) => {
                    self.on_backend_event(event).await;
                }
                _ = tick_or_pending(&mut self.ticker) => {
                    self.sample().await;
                }
            }
        }

        debug!("Engine stopped");
    }

    async fn handle(&mut self, command: Command) {
        trace!(?command, phase = %self.phase, "Handling command");

        match command {
            Command::Play(clip) => self.play(clip).await,
            Command::Pause => self.pause().await,
            Command::Toggle(clip) => {
                if self.phase.is_playing() && self.is_current(&clip) {
                    self.pause().await;
                } else {
                    self.play(clip).await;
                }
            }
            Command::SeekClip(clip, fraction) => self.seek_clip(clip, fraction).await,
            Command::Seek(fraction) => match (self.loaded.is_some(), self.clip.clone()) {
                (true, _) => self.seek_loaded(fraction).await,
                (false, Some(clip)) => self.seek_clip(clip, fraction).await,
                (false, None) => debug!("Seek ignored, no clip"),
            },
            Command::Reset => self.reset().await,
            Command::Barrier(reply) => {
                let _ = reply.send(());
            }
            // Handled by the run loop.
            Command::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    async fn play(&mut self, clip: ClipReference) {
        if self.loaded.is_some() && self.is_current(&clip) {
            match self.phase {
                PlaybackPhase::Playing => return,
                PlaybackPhase::Ready | PlaybackPhase::Paused | PlaybackPhase::Idle => {
                    if let Err(e) = self.start().await {
                        self.fail(e).await;
                    }
                    return;
                }
                _ => {}
            }
        }

        if let Err(e) = self.load(clip).await {
            self.fail(e).await;
            return;
        }
        if let Err(e) = self.start().await {
            self.fail(e).await;
        }
    }

    async fn pause(&mut self) {
        if !self.phase.is_playing() {
            trace!(phase = %self.phase, "Pause ignored");
            return;
        }

        self.halt().await;
        self.apply(PhaseEvent::Pause);
        self.release_output().await;
        self.publish();

        self.emit(PlaybackEvent::Paused {
            engine_id: self.id.to_string(),
            elapsed_ms: self.elapsed.as_millis() as u64,
        });
        debug!(elapsed_ms = self.elapsed.as_millis() as u64, "Paused");
    }

    /// Pause because `by` claimed the output. The claim is no longer ours,
    /// so the device session stays active for the new holder.
    async fn preempt(&mut self, by: Option<EngineId>) {
        self.halt().await;
        self.apply(PhaseEvent::Preempted);
        self.publish();

        let by = by
            .or_else(|| self.ctx.registry.holder())
            .map(|id| id.to_string())
            .unwrap_or_default();
        info!(by = %by, "Preempted by another engine");
        self.emit(PlaybackEvent::Preempted {
            engine_id: self.id.to_string(),
            by,
        });
    }

    async fn seek_clip(&mut self, clip: ClipReference, fraction: f64) {
        if self.loaded.is_none() || !self.is_current(&clip) {
            if let Err(e) = self.load(clip).await {
                self.fail(e).await;
                return;
            }

            let settle = self.ctx.config.seek_settle_delay;
            if !settle.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return,
                    _ = sleep(settle) => {}
                }
            }
        }

        self.seek_loaded(fraction).await;
    }

    async fn seek_loaded(&mut self, fraction: f64) {
        let Some(loaded) = self.loaded else {
            return;
        };

        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let target = loaded.duration.mul_f64(fraction);

        if let Err(e) = self.ctx.backend.seek(loaded.session, target).await {
            warn!(error = %e, "Backend rejected seek");
            return;
        }
        self.elapsed = target;
        debug!(fraction, target_ms = target.as_millis() as u64, "Seeked");

        if fraction >= 1.0 {
            if self.phase == PlaybackPhase::Idle {
                self.apply(PhaseEvent::Cue);
            }
            self.finish().await;
        } else if !self.phase.is_playing() {
            if let Err(e) = self.start().await {
                self.fail(e).await;
            }
        } else {
            self.publish();
        }
    }

    async fn reset(&mut self) {
        self.release_all().await;
        self.clip = None;
        self.last_error = None;
        self.apply(PhaseEvent::Reset);
        self.publish();
        debug!("Reset");
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Tear down whatever is loaded, then resolve and open `clip`.
    async fn load(&mut self, clip: ClipReference) -> Result<()> {
        self.release_all().await;

        debug!(clip = %log_name(&clip), "Loading clip");
        self.clip = Some(clip.clone());
        self.last_error = None;
        self.apply(PhaseEvent::Load);
        self.publish();

        let path = self.locate(&clip).await?;
        let session = self
            .ctx
            .backend
            .open(&path)
            .await
            .map_err(|e| PlaybackError::BackendDecodeError(e.to_string()))?;

        let duration = match self.await_ready(session).await {
            Ok(duration) => duration,
            Err(e) => {
                if let Err(close_err) = self.ctx.backend.close(session).await {
                    debug!(error = %close_err, "Failed to close unready session");
                }
                return Err(e);
            }
        };

        self.loaded = Some(Loaded { session, duration });
        self.apply(PhaseEvent::BackendReady);
        self.publish();
        debug!(duration_ms = duration.as_millis() as u64, "Clip ready");
        Ok(())
    }

    /// Playable local path for `clip`.
    async fn locate(&self, clip: &ClipReference) -> Result<PathBuf> {
        match clip.location() {
            ClipLocation::Remote(url) => self.ctx.cache.resolve_url(url).await,
            ClipLocation::Local(path) => {
                let size = self
                    .ctx
                    .cache
                    .file_system()
                    .file_size(path)
                    .await
                    .map_err(|e| {
                        PlaybackError::ClipMissing(format!("{}: {}", path.display(), e))
                    })?;

                match size {
                    None | Some(0) => Err(PlaybackError::ClipMissing(path.display().to_string())),
                    Some(size) => {
                        let minimum = self.ctx.cache.config().min_plausible_size_bytes;
                        if size < minimum {
                            let file = path.to_string_lossy();
                            warn!(
                                file = strip_path(&file),
                                size,
                                minimum,
                                "Local clip is suspiciously small"
                            );
                        }
                        Ok(path.clone())
                    }
                }
            }
        }
    }

    /// Poll the backend until it reports a positive duration.
    async fn await_ready(&self, session: PlaybackSessionId) -> Result<Duration> {
        let timeout = self.ctx.config.ready_timeout;
        let deadline = Instant::now() + timeout;

        loop {
            match self.ctx.backend.status(session).await {
                Ok(BackendStatus::Ready) => match self.ctx.backend.duration(session).await {
                    Ok(Some(duration)) if !duration.is_zero() => return Ok(duration),
                    Ok(_) => trace!("Backend ready without duration"),
                    Err(e) => trace!(error = %e, "Duration query failed"),
                },
                Ok(BackendStatus::Failed { message }) => {
                    return Err(PlaybackError::BackendDecodeError(message));
                }
                Ok(BackendStatus::Loading) => {}
                Err(e) => trace!(error = %e, "Status query failed"),
            }

            if Instant::now() >= deadline {
                warn!(timeout_ms = timeout.as_millis() as u64, "Backend never became ready");
                return Err(PlaybackError::BackendTimeout(timeout));
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(PlaybackError::EngineClosed),
                _ = sleep(self.ctx.config.ready_poll_interval) => {}
            }
        }
    }

    /// Activate output, claim it and start the backend.
    async fn start(&mut self) -> Result<()> {
        let Some(loaded) = self.loaded else {
            return Err(PlaybackError::Internal("start without loaded clip".to_string()));
        };

        self.ctx
            .session
            .configure_for_playback(self.ctx.config.output_route)
            .await?;
        self.ctx.registry.claim(self.id);
        self.ctx
            .backend
            .play(loaded.session)
            .await
            .map_err(|e| PlaybackError::BackendDecodeError(e.to_string()))?;

        self.apply(PhaseEvent::Start);
        self.start_ticker();
        self.publish();

        if let Some(clip) = &self.clip {
            info!(clip = %log_name(clip), "Playing");
        }
        self.emit(PlaybackEvent::Started {
            engine_id: self.id.to_string(),
            clip: self.clip_label(),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Progress and completion
    // ------------------------------------------------------------------

    async fn sample(&mut self) {
        let Some(loaded) = self.loaded else {
            return;
        };

        match self.ctx.backend.position(loaded.session).await {
            Ok(position) => {
                self.elapsed = position;
                if !loaded.duration.is_zero() && position >= loaded.duration {
                    self.finish().await;
                } else {
                    self.publish();
                }
            }
            Err(e) => trace!(error = %e, "Position query failed"),
        }
    }

    /// Clip reached its end: rewind, release output, notify, go idle.
    async fn finish(&mut self) {
        let Some(loaded) = self.loaded else {
            return;
        };

        self.stop_ticker();
        if self.phase.is_playing() {
            let _ = self.ctx.backend.pause(loaded.session).await;
        }
        if let Err(e) = self.ctx.backend.seek(loaded.session, Duration::ZERO).await {
            debug!(error = %e, "Failed to rewind finished clip");
        }
        self.release_output().await;

        if !self.apply(PhaseEvent::ReachedEnd) {
            return;
        }
        self.elapsed = loaded.duration;
        self.publish();

        if let Some(clip) = self.clip.clone() {
            let _ = self.finished.send(ClipFinished {
                engine: self.id,
                clip,
            });
        }
        self.emit(PlaybackEvent::Finished {
            engine_id: self.id.to_string(),
            clip: self.clip_label(),
        });

        self.apply(PhaseEvent::Rewound);
        self.elapsed = Duration::ZERO;
        self.publish();
        debug!("Clip finished");
    }

    async fn fail(&mut self, error: PlaybackError) {
        if matches!(error, PlaybackError::EngineClosed) {
            return;
        }

        warn!(error = %error, kind = %error.kind(), "Playback failed");
        self.release_all().await;
        self.apply(PhaseEvent::Fail);
        self.last_error = Some(error.clone());
        self.publish();

        self.emit(PlaybackEvent::Failed {
            engine_id: self.id.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    async fn on_announcement(&mut self, received: std::result::Result<Announcement, RecvError>) {
        let by = match received {
            Ok(announcement) if announcement.engine == self.id => return,
            Ok(announcement) => Some(announcement.engine),
            Err(RecvError::Lagged(missed)) => {
                debug!(missed, "Announcements lagged");
                None
            }
            Err(RecvError::Closed) => {
                self.announcements = None;
                return;
            }
        };

        if self.phase.is_playing() && !self.ctx.registry.is_holder(self.id) {
            self.preempt(by).await;
        }
    }

    async fn on_backend_event(&mut self, received: std::result::Result<BackendEvent, RecvError>) {
        let event = match received {
            Ok(event) => event,
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Backend events lagged");
                return;
            }
            Err(RecvError::Closed) => {
                self.backend_events = None;
                return;
            }
        };

        let current = self.loaded.map(|l| l.session);
        if current != Some(event.session()) {
            trace!(session = %event.session(), "Ignoring event for another session");
            return;
        }

        match event {
            BackendEvent::Ended { .. } => {
                let short_of_end = self.loaded.is_some_and(|l| self.elapsed < l.duration);
                let in_progress = self.phase.is_playing()
                    || (self.phase == PlaybackPhase::Paused && short_of_end);
                if in_progress {
                    self.finish().await;
                } else {
                    trace!(phase = %self.phase, "Ignoring end of media outside playback");
                }
            }
            BackendEvent::Failed { message, .. } => {
                self.fail(PlaybackError::BackendDecodeError(message)).await;
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Stop output and sampling, keeping the session open.
    async fn halt(&mut self) {
        if let Some(loaded) = self.loaded {
            if let Err(e) = self.ctx.backend.pause(loaded.session).await {
                warn!(error = %e, "Backend pause failed");
            }
            if let Ok(position) = self.ctx.backend.position(loaded.session).await {
                self.elapsed = position.min(loaded.duration);
            }
        }
        self.stop_ticker();
    }

    /// Stop everything and close the backend session.
    async fn release_all(&mut self) {
        if self.phase.is_playing() {
            self.halt().await;
        }
        self.stop_ticker();
        self.release_output().await;

        if let Some(loaded) = self.loaded.take() {
            if let Err(e) = self.ctx.backend.close(loaded.session).await {
                debug!(error = %e, "Failed to close backend session");
            }
        }
        self.elapsed = Duration::ZERO;
    }

    /// Drop our claim; deactivate the device session when nobody holds it.
    async fn release_output(&self) {
        if self.ctx.registry.release(self.id) && self.ctx.registry.holder().is_none() {
            if let Err(e) = self.ctx.session.deactivate().await {
                warn!(error = %e, "Failed to release audio output");
            }
        }
    }

    async fn teardown(&mut self) {
        self.stop_ticker();
        self.announcements = None;
        self.backend_events = None;

        self.release_all().await;
        self.apply(PhaseEvent::Reset);
        self.publish();
    }

    fn apply(&mut self, event: PhaseEvent) -> bool {
        match transition(self.phase, event) {
            Some(next) => {
                trace!(from = %self.phase, to = %next, ?event, "Transition");
                self.phase = next;
                true
            }
            None => {
                debug!(phase = %self.phase, ?event, "Transition not allowed");
                false
            }
        }
    }

    fn start_ticker(&mut self) {
        let period = self.ctx.config.progress_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);
    }

    fn stop_ticker(&mut self) {
        self.ticker = None;
    }

    fn is_current(&self, clip: &ClipReference) -> bool {
        self.clip.as_ref().is_some_and(|c| c.same_source(clip))
    }

    fn clip_label(&self) -> String {
        self.clip.as_ref().map(|c| c.to_string()).unwrap_or_default()
    }

    fn publish(&self) {
        let total = self
            .loaded
            .map(|l| l.duration)
            .or_else(|| self.clip.as_ref().and_then(|c| c.duration()));

        self.state.send_replace(PlaybackSnapshot::compute(
            self.phase,
            self.clip.clone(),
            self.elapsed,
            total,
            self.last_error.clone(),
            self.ticker.is_some(),
        ));
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.ctx.events {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }
}

/// Basename of a clip location with any query string removed.
fn log_name(clip: &ClipReference) -> String {
    let redacted = redact_if_sensitive("clip", &clip.to_string());
    strip_path(&redacted).to_string()
}

async fn recv_or_pending<T: Clone>(
    receiver: &mut Option<broadcast::Receiver<T>>,
) -> std::result::Result<T, RecvError> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn tick_or_pending(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
