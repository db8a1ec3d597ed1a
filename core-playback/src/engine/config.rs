//! Engine timing configuration

use bridge_traits::routing::OutputRoute;
use std::time::Duration;

/// Timing and routing for playback engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How often backend readiness is polled (default: 100ms)
    pub ready_poll_interval: Duration,

    /// Give up on a backend that is not ready after this long (default: 5s)
    pub ready_timeout: Duration,

    /// Progress sampling interval while playing (default: 200ms)
    pub progress_interval: Duration,

    /// Delay before the first seek on a freshly loaded clip (default: 500ms)
    pub seek_settle_delay: Duration,

    /// Output path requested when playback starts (default: speaker)
    pub output_route: OutputRoute,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ready_poll_interval: Duration::from_millis(100),
            ready_timeout: Duration::from_secs(5),
            progress_interval: Duration::from_millis(200),
            seek_settle_delay: Duration::from_millis(500),
            output_route: OutputRoute::Speaker,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ready_poll_interval(mut self, interval: Duration) -> Self {
        self.ready_poll_interval = interval;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_seek_settle_delay(mut self, delay: Duration) -> Self {
        self.seek_settle_delay = delay;
        self
    }

    pub fn with_output_route(mut self, route: OutputRoute) -> Self {
        self.output_route = route;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.ready_poll_interval.is_zero() {
            return Err("ready_poll_interval must be greater than 0".to_string());
        }

        if self.ready_timeout.is_zero() {
            return Err("ready_timeout must be greater than 0".to_string());
        }

        if self.ready_poll_interval > self.ready_timeout {
            return Err("ready_poll_interval cannot exceed ready_timeout".to_string());
        }

        if self.progress_interval.is_zero() {
            return Err("progress_interval must be greater than 0".to_string());
        }

        Ok(())
    }
}
