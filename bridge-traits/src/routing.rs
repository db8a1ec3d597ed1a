//! Device audio routing.
//!
//! Mobile platforms gate audio output behind a process-wide session
//! (AVAudioSession, AudioManager focus). The session is an exclusive system
//! resource, so the core activates it only while a clip is actually playing.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// What the session is being configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCategory {
    Playback,
    Record,
}

/// Physical output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputRoute {
    /// Loudspeaker, the default for voice messages.
    #[default]
    Speaker,
    /// Receiver held to the ear.
    Earpiece,
}

/// Host facility controlling the device audio session.
#[async_trait::async_trait]
pub trait AudioRouting: Send + Sync {
    /// Configure the session category before activation.
    async fn set_category(&self, category: SessionCategory) -> Result<()>;

    /// Activate or deactivate the session.
    async fn set_active(&self, active: bool) -> Result<()>;

    /// Override the output path. Only meaningful for playback sessions.
    async fn set_output_route(&self, route: OutputRoute) -> Result<()>;
}
