//! Observable engine state.

use crate::clip::ClipReference;
use crate::engine::registry::EngineId;
use crate::engine::state::PlaybackPhase;
use crate::error::PlaybackError;
use std::time::Duration;

/// Point-in-time view of one engine, published on every change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    pub clip: Option<ClipReference>,
    pub is_playing: bool,
    pub elapsed_seconds: f64,
    pub total_seconds: f64,
    /// `elapsed / total`, clamped to `[0, 1]`; zero while the total is unknown.
    pub progress: f64,
    pub seconds_left: f64,
    pub last_error: Option<PlaybackError>,
    /// Whether the progress timer is running.
    pub sampling: bool,
}

impl PlaybackSnapshot {
    pub(crate) fn compute(
        phase: PlaybackPhase,
        clip: Option<ClipReference>,
        elapsed: Duration,
        total: Option<Duration>,
        last_error: Option<PlaybackError>,
        sampling: bool,
    ) -> Self {
        let elapsed_seconds = elapsed.as_secs_f64();
        let total_seconds = total.map(|d| d.as_secs_f64()).unwrap_or(0.0);
        let progress = if total_seconds > 0.0 {
            (elapsed_seconds / total_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            phase,
            clip,
            is_playing: phase.is_playing(),
            elapsed_seconds,
            total_seconds,
            progress,
            seconds_left: (total_seconds - elapsed_seconds).max(0.0),
            last_error,
            sampling,
        }
    }
}

/// One-shot notification that a clip played to its end.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipFinished {
    pub engine: EngineId,
    pub clip: ClipReference,
}
