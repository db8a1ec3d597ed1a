//! Desktop audio routing
//!
//! Desktop operating systems do not arbitrate a per-app audio session, so
//! the implementation only records what the core asked for.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    routing::{AudioRouting, OutputRoute, SessionCategory},
};
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
struct RoutingState {
    category: Option<SessionCategory>,
    active: bool,
    route: OutputRoute,
}

/// No-op routing for desktop hosts.
#[derive(Debug, Default)]
pub struct DesktopAudioRouting {
    state: Mutex<RoutingState>,
}

impl DesktopAudioRouting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last request activated the session.
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Category set by the last configuration, if any.
    pub fn category(&self) -> Option<SessionCategory> {
        self.state.lock().category
    }

    /// Output route requested last.
    pub fn route(&self) -> OutputRoute {
        self.state.lock().route
    }
}

#[async_trait]
impl AudioRouting for DesktopAudioRouting {
    async fn set_category(&self, category: SessionCategory) -> Result<()> {
        debug!(?category, "Desktop audio category set");
        self.state.lock().category = Some(category);
        Ok(())
    }

    async fn set_active(&self, active: bool) -> Result<()> {
        debug!(active, "Desktop audio session toggled");
        self.state.lock().active = active;
        Ok(())
    }

    async fn set_output_route(&self, route: OutputRoute) -> Result<()> {
        debug!(?route, "Desktop output route set");
        self.state.lock().route = route;
        Ok(())
    }
}
