//! Clip references.

use crate::error::{PlaybackError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Where a clip's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClipLocation {
    Local(PathBuf),
    Remote(Url),
}

/// An immutable handle on a playable clip.
///
/// The duration is optional: chat payloads usually carry it, but the engine
/// always confirms it with the backend before playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipReference {
    location: ClipLocation,
    duration: Option<Duration>,
}

impl ClipReference {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            location: ClipLocation::Local(path.into()),
            duration: None,
        }
    }

    pub fn remote(url: Url) -> Self {
        Self {
            location: ClipLocation::Remote(url),
            duration: None,
        }
    }

    /// Parse a location string.
    ///
    /// `http`/`https` URLs become remote clips, `file` URLs and bare paths
    /// become local clips. Any other scheme is rejected.
    pub fn parse(location: &str) -> Result<Self> {
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(PlaybackError::InvalidLocation(
                "location is empty".to_string(),
            ));
        }

        if !trimmed.contains("://") {
            return Ok(Self::local(trimmed));
        }

        let url = Url::parse(trimmed)
            .map_err(|e| PlaybackError::InvalidLocation(format!("{}: {}", trimmed, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(Self::remote(url)),
            "file" => url
                .to_file_path()
                .map(Self::local)
                .map_err(|_| PlaybackError::InvalidLocation(trimmed.to_string())),
            other => Err(PlaybackError::InvalidLocation(format!(
                "unsupported scheme '{}'",
                other
            ))),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn location(&self) -> &ClipLocation {
        &self.location
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn remote_url(&self) -> Option<&Url> {
        match &self.location {
            ClipLocation::Remote(url) => Some(url),
            ClipLocation::Local(_) => None,
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match &self.location {
            ClipLocation::Local(path) => Some(path),
            ClipLocation::Remote(_) => None,
        }
    }

    /// Whether both references point at the same bytes, ignoring duration.
    pub fn same_source(&self, other: &ClipReference) -> bool {
        self.location == other.location
    }
}

impl fmt::Display for ClipReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            ClipLocation::Local(path) => write!(f, "{}", path.display()),
            ClipLocation::Remote(url) => write!(f, "{}", url),
        }
    }
}
