//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! audio routing, audio backends) into the shared clip cache, audio session
//! and now-playing registry. Desktop apps typically enable the
//! `desktop-shims` feature so missing bridges fall back to the
//! `bridge-desktop` adapters.
//!
//! ```ignore
//! let core = AudioCore::new(CoreConfig::builder().build()?)?;
//! core.initialize().await?;
//!
//! let engine = core.create_engine(backend.clone())?;
//! engine.play(ClipReference::parse("https://cdn.example.com/voice/42.m4a")?);
//! ```

pub mod error;

pub use error::{CoreError, Result};

use bridge_traits::playback::AudioBackend;
use core_playback::{
    AudioSession, CacheConfig, ClipCache, ClipReference, EngineConfig, EngineContext, EngineId,
    NowPlayingRegistry, PlaybackEngine,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use std::sync::Arc;
use tracing::{debug, info};

/// Primary façade exposed to host applications.
///
/// Owns the process-wide collaborators every engine shares. Clones share
/// them too.
#[derive(Clone)]
pub struct AudioCore {
    cache: ClipCache,
    registry: Arc<NowPlayingRegistry>,
    session: Arc<AudioSession>,
    events: EventBus,
    engine_config: EngineConfig,
}

impl AudioCore {
    /// Build the core with default cache and engine settings.
    pub fn new(config: CoreConfig) -> Result<Self> {
        Self::with_settings(config, CacheConfig::default(), EngineConfig::default())
    }

    /// Build the core with explicit cache and engine settings.
    pub fn with_settings(
        config: CoreConfig,
        cache_config: CacheConfig,
        engine_config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        cache_config.validate().map_err(|e| {
            CoreError::InitializationFailed(format!("Invalid cache configuration: {}", e))
        })?;
        engine_config.validate().map_err(|e| {
            CoreError::InitializationFailed(format!("Invalid engine configuration: {}", e))
        })?;

        let events = EventBus::new(config.event_buffer_size);

        let mut cache = ClipCache::new(
            cache_config,
            config.file_system.clone(),
            config.http_client.clone(),
        )
        .with_event_bus(events.clone());
        if let Some(dir) = &config.cache_dir {
            cache = cache.with_base_directory(dir.clone());
        }

        debug!(?config, "Audio core created");
        Ok(Self {
            cache,
            registry: Arc::new(NowPlayingRegistry::new()),
            session: Arc::new(AudioSession::new(config.audio_routing.clone())),
            events,
            engine_config,
        })
    }

    /// Create the cache directories up front.
    pub async fn initialize(&self) -> Result<()> {
        let path = self.cache.initialize().await?;
        info!(path = ?path, "Audio core initialized");
        Ok(())
    }

    /// Make this core's cache reachable through [`ClipCache::global`].
    ///
    /// Returns `false` when a global cache was already installed.
    pub fn install_global_cache(&self) -> bool {
        ClipCache::install_global(self.cache.clone()).is_ok()
    }

    pub fn cache(&self) -> &ClipCache {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<NowPlayingRegistry> {
        &self.registry
    }

    pub fn session(&self) -> &Arc<AudioSession> {
        &self.session
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine_config
    }

    /// Spawn an engine playing through `backend`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_engine(&self, backend: Arc<dyn AudioBackend>) -> Result<PlaybackEngine> {
        Ok(PlaybackEngine::spawn(self.context(backend), None)?)
    }

    /// Spawn an engine bound to `clip`, e.g. one per chat bubble.
    pub fn create_engine_for(
        &self,
        backend: Arc<dyn AudioBackend>,
        clip: ClipReference,
    ) -> Result<PlaybackEngine> {
        Ok(PlaybackEngine::spawn(self.context(backend), Some(clip))?)
    }

    /// Engine currently holding the audio output, if any.
    pub fn active_engine(&self) -> Option<EngineId> {
        self.registry.holder()
    }

    fn context(&self, backend: Arc<dyn AudioBackend>) -> EngineContext {
        EngineContext {
            backend,
            cache: self.cache.clone(),
            session: self.session.clone(),
            registry: self.registry.clone(),
            events: Some(self.events.clone()),
            config: self.engine_config.clone(),
        }
    }
}

impl std::fmt::Debug for AudioCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCore")
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .field("engine_config", &self.engine_config)
            .finish_non_exhaustive()
    }
}
