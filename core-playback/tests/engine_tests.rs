//! Playback engine behaviour against a fake backend.

mod support;

use bridge_traits::playback::{BackendEvent, PlaybackSessionId};
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use core_playback::{ClipReference, PlaybackEngine, PlaybackError, PlaybackPhase};
use core_runtime::events::{CoreEvent, PlaybackEvent};
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use support::{wait_for, FakeBackend, Harness};

const CLIP_A: &str = "https://cdn.example.com/voice/a.m4a";
const CLIP_B: &str = "https://cdn.example.com/voice/b.m4a";

fn clip(location: &str) -> ClipReference {
    ClipReference::parse(location).unwrap()
}

fn three_seconds() -> FakeBackend {
    FakeBackend::new(Duration::from_secs(3))
}

#[tokio::test]
async fn test_play_remote_clip() {
    let h = Harness::new(three_seconds().ready_after(Duration::from_millis(30)));
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    let snapshot = wait_for(&mut state, |s| s.phase == PlaybackPhase::Playing).await;

    assert!(snapshot.is_playing);
    assert!(snapshot.sampling);
    assert_eq!(snapshot.total_seconds, 3.0);
    assert_eq!(h.registry.holder(), Some(engine.id()));
    assert!(h.routing.is_active());
    assert_eq!(h.http.transfers(), 1);

    let progressed = wait_for(&mut state, |s| s.elapsed_seconds > 0.0).await;
    assert!(progressed.progress > 0.0 && progressed.progress < 1.0);
    assert!(progressed.seconds_left < 3.0);
}

#[tokio::test]
async fn test_second_engine_preempts_first() {
    let h = Harness::new(three_seconds());
    let a = PlaybackEngine::spawn(h.context(), None).unwrap();
    let b = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut a_state = a.subscribe();
    let mut b_state = b.subscribe();
    let mut events = h.events.subscribe();

    a.play(clip(CLIP_A));
    wait_for(&mut a_state, |s| s.is_playing).await;

    b.play(clip(CLIP_B));
    wait_for(&mut b_state, |s| s.is_playing).await;
    let a_snapshot = wait_for(&mut a_state, |s| s.phase == PlaybackPhase::Paused).await;

    assert!(!a_snapshot.is_playing);
    assert!(!a_snapshot.sampling);
    assert!(b.snapshot().is_playing);
    assert_eq!(h.registry.holder(), Some(b.id()));
    assert!(h.routing.is_active());

    let mut preempted = false;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Playback(PlaybackEvent::Preempted { engine_id, by }) = event {
            assert_eq!(engine_id, a.id().to_string());
            assert_eq!(by, b.id().to_string());
            preempted = true;
        }
    }
    assert!(preempted);
}

#[tokio::test]
async fn test_resuming_preempted_engine_preempts_the_other() {
    let h = Harness::new(three_seconds());
    let a = PlaybackEngine::spawn(h.context(), None).unwrap();
    let b = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut a_state = a.subscribe();
    let mut b_state = b.subscribe();

    a.play(clip(CLIP_A));
    wait_for(&mut a_state, |s| s.is_playing).await;
    b.play(clip(CLIP_B));
    wait_for(&mut a_state, |s| s.phase == PlaybackPhase::Paused).await;

    a.play(clip(CLIP_A));
    wait_for(&mut a_state, |s| s.is_playing).await;
    wait_for(&mut b_state, |s| s.phase == PlaybackPhase::Paused).await;

    assert_eq!(h.registry.holder(), Some(a.id()));
    // Resumed without reopening.
    assert_eq!(FakeBackend::count(&h.backend.opens), 2);
}

#[tokio::test]
async fn test_pause_while_idle_is_noop() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();

    engine.pause();
    engine.settled().await.unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.phase, PlaybackPhase::Idle);
    assert!(snapshot.last_error.is_none());
    assert_eq!(FakeBackend::count(&h.backend.pauses), 0);
}

#[tokio::test]
async fn test_toggle_pauses_and_resumes() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.toggle(clip(CLIP_A));
    wait_for(&mut state, |s| s.is_playing).await;

    engine.toggle(clip(CLIP_A));
    engine.settled().await.unwrap();
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Paused);
    assert_eq!(h.registry.holder(), None);
    assert!(!h.routing.is_active());

    engine.toggle(clip(CLIP_A));
    engine.settled().await.unwrap();
    assert!(engine.snapshot().is_playing);
    assert_eq!(FakeBackend::count(&h.backend.opens), 1);
}

#[tokio::test]
async fn test_seek_to_end_finishes_and_rewinds() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut finished = engine.finished();

    engine.seek_clip(clip(CLIP_A), 1.0);
    let done = tokio::time::timeout(Duration::from_secs(3), finished.recv())
        .await
        .unwrap()
        .unwrap();
    engine.settled().await.unwrap();

    assert_eq!(done.engine, engine.id());
    assert_eq!(done.clip, clip(CLIP_A));

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.phase, PlaybackPhase::Idle);
    assert_eq!(snapshot.elapsed_seconds, 0.0);
    assert_eq!(snapshot.total_seconds, 3.0);
    assert!(!snapshot.sampling);
    assert_eq!(h.registry.holder(), None);
}

#[tokio::test]
async fn test_seek_to_start_while_playing() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    wait_for(&mut state, |s| s.elapsed_seconds > 0.05).await;

    engine.seek(0.0);
    engine.settled().await.unwrap();

    let snapshot = engine.snapshot();
    assert!(snapshot.is_playing);
    assert!(snapshot.elapsed_seconds < 0.05);
}

#[tokio::test]
async fn test_short_clip_finishes_by_sampling() {
    let h = Harness::new(FakeBackend::new(Duration::from_millis(80)));
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut finished = engine.finished();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    tokio::time::timeout(Duration::from_secs(3), finished.recv())
        .await
        .unwrap()
        .unwrap();
    let snapshot = wait_for(&mut state, |s| s.phase == PlaybackPhase::Idle).await;

    assert_eq!(snapshot.elapsed_seconds, 0.0);
    assert!(!snapshot.sampling);
    assert!(!h.routing.is_active());
}

#[tokio::test]
async fn test_end_of_media_after_sampled_finish_is_ignored() {
    let h = Harness::new(FakeBackend::new(Duration::from_millis(80)));
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut finished = engine.finished();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    tokio::time::timeout(Duration::from_secs(3), finished.recv())
        .await
        .unwrap()
        .unwrap();
    wait_for(&mut state, |s| s.phase == PlaybackPhase::Idle).await;

    h.backend.emit(BackendEvent::Ended {
        session: h.backend.last_session().unwrap(),
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.settled().await.unwrap();

    assert!(matches!(finished.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);
}

#[tokio::test]
async fn test_end_of_media_after_seek_to_end_is_ignored() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut finished = engine.finished();

    engine.seek_clip(clip(CLIP_A), 1.0);
    tokio::time::timeout(Duration::from_secs(3), finished.recv())
        .await
        .unwrap()
        .unwrap();
    engine.settled().await.unwrap();

    h.backend.emit(BackendEvent::Ended {
        session: h.backend.last_session().unwrap(),
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.settled().await.unwrap();

    assert!(matches!(finished.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_seek_to_end_of_rewound_clip_finishes_again() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut finished = engine.finished();

    engine.seek_clip(clip(CLIP_A), 1.0);
    engine.settled().await.unwrap();
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);

    engine.seek(1.0);
    engine.settled().await.unwrap();

    assert!(finished.try_recv().is_ok());
    assert!(finished.try_recv().is_ok());
    assert!(matches!(finished.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);
}

#[tokio::test]
async fn test_spawn_rejects_zero_progress_interval() {
    let h = Harness::new(three_seconds());
    let mut ctx = h.context();
    ctx.config = ctx.config.with_progress_interval(Duration::ZERO);

    let result = PlaybackEngine::spawn(ctx, None);

    assert!(matches!(result, Err(PlaybackError::InvalidConfig(_))));
    assert_eq!(h.registry.holder(), None);
}

#[tokio::test]
async fn test_not_found_fails_with_transfer_failed() {
    let h = Harness::new(three_seconds());
    let url = "https://cdn.example.com/voice/missing.m4a";
    h.http.respond(url, 404, Vec::new());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(url));
    let snapshot = wait_for(&mut state, |s| s.phase == PlaybackPhase::Failed).await;

    assert!(matches!(
        snapshot.last_error,
        Some(PlaybackError::TransferFailed(_))
    ));
    assert!(!h.fs.exists(&h.cache_path("missing.m4a")).await.unwrap());
    assert_eq!(FakeBackend::count(&h.backend.opens), 0);
}

#[tokio::test]
async fn test_backend_never_ready_times_out() {
    let h = Harness::new(three_seconds().never_ready());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    let snapshot = wait_for(&mut state, |s| s.phase == PlaybackPhase::Failed).await;

    assert_eq!(
        snapshot.last_error,
        Some(PlaybackError::BackendTimeout(Duration::from_millis(200)))
    );
    assert!(!snapshot.sampling);
    assert_eq!(h.backend.open_sessions(), 0);
    assert_eq!(h.registry.holder(), None);

    // Nothing keeps mutating the state afterwards.
    let _ = state.borrow_and_update();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!state.has_changed().unwrap());
}

#[tokio::test]
async fn test_undecodable_clip_fails() {
    let h = Harness::new(three_seconds().undecodable());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    let snapshot = wait_for(&mut state, |s| s.phase == PlaybackPhase::Failed).await;

    assert!(matches!(
        snapshot.last_error,
        Some(PlaybackError::BackendDecodeError(_))
    ));
}

#[tokio::test]
async fn test_failed_engine_recovers_on_play() {
    let h = Harness::new(three_seconds());
    let url = "https://cdn.example.com/voice/flaky.m4a";
    h.http.respond(url, 503, Vec::new());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(url));
    wait_for(&mut state, |s| s.phase == PlaybackPhase::Failed).await;

    h.http.respond(url, 200, vec![3u8; 2048]);
    engine.play(clip(url));
    let snapshot = wait_for(&mut state, |s| s.is_playing).await;
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn test_empty_local_clip_is_missing() {
    let h = Harness::new(three_seconds());
    let path = h.dir.path().join("recorded.m4a");
    h.fs.write_file(&path, Bytes::new()).await.unwrap();
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(ClipReference::local(&path));
    let snapshot = wait_for(&mut state, |s| s.phase == PlaybackPhase::Failed).await;

    assert!(matches!(snapshot.last_error, Some(PlaybackError::ClipMissing(_))));
    assert_eq!(FakeBackend::count(&h.backend.opens), 0);

    engine.play(ClipReference::local(h.dir.path().join("absent.m4a")));
    engine.settled().await.unwrap();
    assert!(matches!(
        engine.snapshot().last_error,
        Some(PlaybackError::ClipMissing(_))
    ));
}

#[tokio::test]
async fn test_local_clip_plays_without_network() {
    let h = Harness::new(three_seconds());
    let path = h.dir.path().join("recorded.m4a");
    h.fs.write_file(&path, Bytes::from(vec![9u8; 100])).await.unwrap();
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(ClipReference::local(&path));
    wait_for(&mut state, |s| s.is_playing).await;

    assert_eq!(h.http.transfers(), 0);
}

#[tokio::test]
async fn test_backend_failure_event_fails_engine() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    wait_for(&mut state, |s| s.is_playing).await;

    h.backend.emit(BackendEvent::Failed {
        session: h.backend.last_session().unwrap(),
        message: "corrupt frame".to_string(),
    });
    let snapshot = wait_for(&mut state, |s| s.phase == PlaybackPhase::Failed).await;

    assert_eq!(
        snapshot.last_error,
        Some(PlaybackError::BackendDecodeError("corrupt frame".to_string()))
    );
    assert!(!snapshot.sampling);
    assert_eq!(h.registry.holder(), None);
    assert!(!h.routing.is_active());
}

#[tokio::test]
async fn test_backend_end_event_finishes() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();
    let mut finished = engine.finished();

    engine.play(clip(CLIP_A));
    wait_for(&mut state, |s| s.is_playing).await;

    h.backend.emit(BackendEvent::Ended {
        session: h.backend.last_session().unwrap(),
    });
    let done = tokio::time::timeout(Duration::from_secs(3), finished.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(done.clip, clip(CLIP_A));
    engine.settled().await.unwrap();
    assert_eq!(engine.snapshot().phase, PlaybackPhase::Idle);
}

#[tokio::test]
async fn test_stale_backend_event_is_ignored() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    wait_for(&mut state, |s| s.is_playing).await;

    h.backend.emit(BackendEvent::Ended {
        session: PlaybackSessionId::new(),
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.settled().await.unwrap();

    assert!(engine.snapshot().is_playing);
}

#[tokio::test]
async fn test_reset_releases_everything() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    wait_for(&mut state, |s| s.is_playing).await;

    engine.reset();
    engine.settled().await.unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.phase, PlaybackPhase::Idle);
    assert!(snapshot.clip.is_none());
    assert!(!snapshot.sampling);
    assert_eq!(h.backend.open_sessions(), 0);
    assert_eq!(h.registry.holder(), None);
    assert!(!h.routing.is_active());

    // Still usable afterwards.
    engine.play(clip(CLIP_B));
    wait_for(&mut state, |s| s.is_playing).await;
}

#[tokio::test]
async fn test_initial_snapshot_shows_clip_duration() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(
        h.context(),
        Some(clip(CLIP_A).with_duration(Duration::from_secs(4))),
    )
    .unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.phase, PlaybackPhase::Idle);
    assert_eq!(snapshot.total_seconds, 4.0);
    assert_eq!(snapshot.seconds_left, 4.0);
    assert_eq!(snapshot.progress, 0.0);
}

#[tokio::test]
async fn test_dropping_last_handle_releases_backend() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();
    let mut state = engine.subscribe();

    engine.play(clip(CLIP_A));
    wait_for(&mut state, |s| s.is_playing).await;

    let clone = engine.clone();
    drop(engine);
    assert!(clone.settled().await.is_ok());

    drop(clone);
    let snapshot = wait_for(&mut state, |s| s.phase == PlaybackPhase::Idle).await;

    assert!(!snapshot.sampling);
    assert_eq!(h.backend.open_sessions(), 0);
    assert_eq!(h.registry.holder(), None);
}

#[tokio::test]
async fn test_shutdown_closes_engine() {
    let h = Harness::new(three_seconds());
    let engine = PlaybackEngine::spawn(h.context(), None).unwrap();

    engine.play(clip(CLIP_A));
    engine.settled().await.unwrap();
    engine.shutdown().await;

    assert_eq!(h.backend.open_sessions(), 0);
    assert!(matches!(
        engine.settled().await,
        Err(PlaybackError::EngineClosed)
    ));
}
