//! Playback state machine.
//!
//! Every phase change of an engine goes through [`transition`]; the actor
//! performs the side effects for the phase it lands in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Failed,
}

impl PlaybackPhase {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackPhase::Playing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackPhase::Idle => "idle",
            PlaybackPhase::Loading => "loading",
            PlaybackPhase::Ready => "ready",
            PlaybackPhase::Playing => "playing",
            PlaybackPhase::Paused => "paused",
            PlaybackPhase::Ended => "ended",
            PlaybackPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// A new clip is being resolved and opened.
    Load,
    /// The backend reported a usable duration.
    BackendReady,
    /// Loading or playback failed.
    Fail,
    /// Output started or resumed.
    Start,
    /// Paused on request.
    Pause,
    /// Paused because another engine claimed the output.
    Preempted,
    /// Position reached the end of the clip.
    ReachedEnd,
    /// Position was rewound after the end.
    Rewound,
    /// A rewound clip was moved away from its start without playing.
    Cue,
    /// Everything released.
    Reset,
}

/// Next phase for `event`, or `None` when the event is not valid in `phase`.
pub fn transition(phase: PlaybackPhase, event: PhaseEvent) -> Option<PlaybackPhase> {
    use PhaseEvent as E;
    use PlaybackPhase as P;

    match (phase, event) {
        (_, E::Load) => Some(P::Loading),
        (_, E::Reset) => Some(P::Idle),
        (_, E::Fail) => Some(P::Failed),

        (P::Loading, E::BackendReady) => Some(P::Ready),

        // Idle with a loaded clip is the rewound state after an end.
        (P::Ready | P::Paused | P::Idle, E::Start) => Some(P::Playing),

        (P::Playing, E::Pause) => Some(P::Paused),
        (P::Playing, E::Preempted) => Some(P::Paused),

        (P::Idle, E::Cue) => Some(P::Ready),

        (P::Playing | P::Paused | P::Ready, E::ReachedEnd) => Some(P::Ended),
        (P::Ended, E::Rewound) => Some(P::Idle),

        _ => None,
    }
}
