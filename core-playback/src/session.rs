//! Audio session helper.
//!
//! Wraps the host [`AudioRouting`] bridge with idempotent activation, so
//! several engines can ask for playback output without re-issuing routing
//! calls. The device session is shared by every engine in the process.

use crate::error::{PlaybackError, Result};
use bridge_traits::routing::{AudioRouting, OutputRoute, SessionCategory};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, Default)]
struct SessionState {
    active: Option<SessionCategory>,
    route: OutputRoute,
}

/// Process-wide audio session.
pub struct AudioSession {
    routing: Arc<dyn AudioRouting>,
    state: Mutex<SessionState>,
}

impl AudioSession {
    pub fn new(routing: Arc<dyn AudioRouting>) -> Self {
        Self {
            routing,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Activate output for playback on `route`.
    #[instrument(skip(self))]
    pub async fn configure_for_playback(&self, route: OutputRoute) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.active == Some(SessionCategory::Playback) && state.route == route {
            return Ok(());
        }

        self.routing
            .set_category(SessionCategory::Playback)
            .await
            .map_err(output_unavailable)?;
        self.routing.set_active(true).await.map_err(output_unavailable)?;
        state.active = Some(SessionCategory::Playback);

        self.routing
            .set_output_route(route)
            .await
            .map_err(output_unavailable)?;
        state.route = route;

        debug!(?route, "Audio session active for playback");
        Ok(())
    }

    /// Activate the session for recording.
    #[instrument(skip(self))]
    pub async fn configure_for_recording(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.active == Some(SessionCategory::Record) {
            return Ok(());
        }

        self.routing
            .set_category(SessionCategory::Record)
            .await
            .map_err(output_unavailable)?;
        self.routing.set_active(true).await.map_err(output_unavailable)?;
        state.active = Some(SessionCategory::Record);

        debug!("Audio session active for recording");
        Ok(())
    }

    /// Release the device session. No-op when already inactive.
    #[instrument(skip(self))]
    pub async fn deactivate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.active.is_none() {
            return Ok(());
        }

        // Inactive either way: a failed release must not block reactivation.
        state.active = None;
        self.routing.set_active(false).await.map_err(|e| {
            warn!(error = %e, "Failed to deactivate audio session");
            output_unavailable(e)
        })?;

        debug!("Audio session deactivated");
        Ok(())
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active.is_some()
    }

    pub async fn category(&self) -> Option<SessionCategory> {
        self.state.lock().await.active
    }

    pub async fn route(&self) -> OutputRoute {
        self.state.lock().await.route
    }
}

impl std::fmt::Debug for AudioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSession").finish_non_exhaustive()
    }
}

fn output_unavailable(e: bridge_traits::BridgeError) -> PlaybackError {
    PlaybackError::OutputUnavailable(e.to_string())
}
