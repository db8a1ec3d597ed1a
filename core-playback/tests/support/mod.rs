//! Hand-written fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::{DesktopAudioRouting, TokioFileSystem};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpDownload, HttpRequest};
use bridge_traits::playback::{AudioBackend, BackendEvent, BackendStatus, PlaybackSessionId};
use core_playback::{
    AudioSession, CacheConfig, ClipCache, EngineConfig, EngineContext, NowPlayingRegistry,
    PlaybackSnapshot,
};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;

/// Serves a fixed body per URL and counts transfers.
pub struct FakeHttp {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    default_body: Vec<u8>,
    latency: Duration,
    transfers: AtomicUsize,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            default_body: vec![7u8; 4096],
            latency: Duration::ZERO,
            transfers: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn respond(&self, url: &str, status: u16, body: Vec<u8>) {
        self.routes.lock().insert(url.to_string(), (status, body));
    }

    pub fn transfers(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn download_to(&self, request: HttpRequest, destination: &Path) -> BridgeResult<HttpDownload> {
        self.transfers.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let (status, body) = self
            .routes
            .lock()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| (200, self.default_body.clone()));

        // Error bodies land on disk too, so the cache has to clean them up.
        tokio::fs::write(destination, &body).await?;

        Ok(HttpDownload {
            status,
            headers: HashMap::new(),
            bytes_written: body.len() as u64,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Readiness {
    After(Duration),
    Never,
    Broken,
}

#[derive(Debug)]
struct FakeSession {
    opened_at: Instant,
    started_at: Option<Instant>,
    offset: Duration,
}

/// Audio backend whose position follows the wall clock while playing.
pub struct FakeBackend {
    duration: Duration,
    readiness: Mutex<Readiness>,
    sessions: Mutex<HashMap<PlaybackSessionId, FakeSession>>,
    last_session: Mutex<Option<PlaybackSessionId>>,
    events: broadcast::Sender<BackendEvent>,
    pub opens: AtomicUsize,
    pub plays: AtomicUsize,
    pub pauses: AtomicUsize,
    pub seeks: AtomicUsize,
    pub closes: AtomicUsize,
}

impl FakeBackend {
    pub fn new(duration: Duration) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            duration,
            readiness: Mutex::new(Readiness::After(Duration::ZERO)),
            sessions: Mutex::new(HashMap::new()),
            last_session: Mutex::new(None),
            events,
            opens: AtomicUsize::new(0),
            plays: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            seeks: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn ready_after(self, delay: Duration) -> Self {
        *self.readiness.lock() = Readiness::After(delay);
        self
    }

    pub fn never_ready(self) -> Self {
        *self.readiness.lock() = Readiness::Never;
        self
    }

    pub fn undecodable(self) -> Self {
        *self.readiness.lock() = Readiness::Broken;
        self
    }

    pub fn last_session(&self) -> Option<PlaybackSessionId> {
        *self.last_session.lock()
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn emit(&self, event: BackendEvent) {
        let _ = self.events.send(event);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn unknown(session: PlaybackSessionId) -> BridgeError {
        BridgeError::UnknownSession(session.to_string())
    }
}

#[async_trait]
impl AudioBackend for FakeBackend {
    async fn open(&self, _path: &Path) -> BridgeResult<PlaybackSessionId> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let session = PlaybackSessionId::new();
        self.sessions.lock().insert(
            session,
            FakeSession {
                opened_at: Instant::now(),
                started_at: None,
                offset: Duration::ZERO,
            },
        );
        *self.last_session.lock() = Some(session);
        Ok(session)
    }

    async fn play(&self, session: PlaybackSessionId) -> BridgeResult<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        let mut sessions = self.sessions.lock();
        let state = sessions.get_mut(&session).ok_or_else(|| Self::unknown(session))?;
        if state.started_at.is_none() {
            state.started_at = Some(Instant::now());
        }
        Ok(())
    }

    async fn pause(&self, session: PlaybackSessionId) -> BridgeResult<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        let mut sessions = self.sessions.lock();
        let state = sessions.get_mut(&session).ok_or_else(|| Self::unknown(session))?;
        if let Some(started) = state.started_at.take() {
            state.offset += started.elapsed();
        }
        Ok(())
    }

    async fn seek(&self, session: PlaybackSessionId, position: Duration) -> BridgeResult<()> {
        self.seeks.fetch_add(1, Ordering::SeqCst);
        let mut sessions = self.sessions.lock();
        let state = sessions.get_mut(&session).ok_or_else(|| Self::unknown(session))?;
        state.offset = position;
        if state.started_at.is_some() {
            state.started_at = Some(Instant::now());
        }
        Ok(())
    }

    async fn position(&self, session: PlaybackSessionId) -> BridgeResult<Duration> {
        let sessions = self.sessions.lock();
        let state = sessions.get(&session).ok_or_else(|| Self::unknown(session))?;
        let running = state.started_at.map(|s| s.elapsed()).unwrap_or_default();
        Ok((state.offset + running).min(self.duration))
    }

    async fn status(&self, session: PlaybackSessionId) -> BridgeResult<BackendStatus> {
        let sessions = self.sessions.lock();
        let state = sessions.get(&session).ok_or_else(|| Self::unknown(session))?;
        Ok(match *self.readiness.lock() {
            Readiness::After(delay) if state.opened_at.elapsed() >= delay => BackendStatus::Ready,
            Readiness::After(_) | Readiness::Never => BackendStatus::Loading,
            Readiness::Broken => BackendStatus::Failed {
                message: "unsupported codec".to_string(),
            },
        })
    }

    async fn duration(&self, _session: PlaybackSessionId) -> BridgeResult<Option<Duration>> {
        Ok(Some(self.duration))
    }

    async fn close(&self, session: PlaybackSessionId) -> BridgeResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().remove(&session);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }
}

/// Everything an engine test needs, rooted in a temporary directory.
pub struct Harness {
    pub dir: TempDir,
    pub http: Arc<FakeHttp>,
    pub fs: Arc<TokioFileSystem>,
    pub routing: Arc<DesktopAudioRouting>,
    pub backend: Arc<FakeBackend>,
    pub cache: ClipCache,
    pub registry: Arc<NowPlayingRegistry>,
    pub session: Arc<AudioSession>,
    pub events: EventBus,
}

impl Harness {
    pub fn new(backend: FakeBackend) -> Self {
        Self::with_http(backend, FakeHttp::new())
    }

    pub fn with_http(backend: FakeBackend, http: FakeHttp) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let http = Arc::new(http);
        let fs = Arc::new(TokioFileSystem::with_cache_directory(dir.path().to_path_buf()));
        let routing = Arc::new(DesktopAudioRouting::new());
        let events = EventBus::new(64);

        let cache = ClipCache::new(CacheConfig::default(), fs.clone(), http.clone())
            .with_event_bus(events.clone());

        Self {
            dir,
            http,
            fs,
            routing: routing.clone(),
            backend: Arc::new(backend),
            cache,
            registry: Arc::new(NowPlayingRegistry::new()),
            session: Arc::new(AudioSession::new(routing)),
            events,
        }
    }

    pub fn cache_path(&self, key: &str) -> PathBuf {
        self.dir.path().join("AudioCache").join(key)
    }

    pub fn context(&self) -> EngineContext {
        EngineContext {
            backend: self.backend.clone(),
            cache: self.cache.clone(),
            session: self.session.clone(),
            registry: self.registry.clone(),
            events: Some(self.events.clone()),
            config: fast_config(),
        }
    }
}

pub fn fast_config() -> EngineConfig {
    EngineConfig::new()
        .with_ready_poll_interval(Duration::from_millis(10))
        .with_ready_timeout(Duration::from_millis(200))
        .with_progress_interval(Duration::from_millis(20))
        .with_seek_settle_delay(Duration::from_millis(10))
}

/// Wait until a published snapshot satisfies `predicate`.
pub async fn wait_for(
    state: &mut watch::Receiver<PlaybackSnapshot>,
    predicate: impl FnMut(&PlaybackSnapshot) -> bool,
) -> PlaybackSnapshot {
    tokio::time::timeout(Duration::from_secs(3), state.wait_for(predicate))
        .await
        .expect("timed out waiting for engine state")
        .expect("engine state channel closed")
        .clone()
}
