//! Timer service on tokio's paused clock.
//!
//! Time only advances when every task is idle, so heartbeats and the
//! auto-start alarm fire deterministically.

use chrono::{TimeZone, Utc};
use std::time::Duration;

use pomotimer_core::timer::ManualTimeSource;
use pomotimer_core::{
    Collaborators, Event, MemoryStore, Reconciler, RunState, SessionType, SharedSettings,
    TimerEngine, TimerService, TimerSettings,
};

fn minute_settings() -> TimerSettings {
    TimerSettings {
        focus_duration: 60,
        short_break_duration: 30,
        long_break_duration: 90,
        sessions_until_long_break: 2,
        ..TimerSettings::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_focus_then_auto_started_break() {
    let settings = SharedSettings::new(TimerSettings {
        auto_start_breaks: true,
        ..minute_settings()
    });
    let store = MemoryStore::new();
    let handle = TimerService::new(settings, Collaborators::new(store.clone())).spawn();
    let mut events = handle.subscribe();

    handle.start().await.unwrap();
    // 60 s of focus, then the 1 s auto-start delay, then 5 s of break.
    tokio::time::sleep(Duration::from_millis(66_500)).await;

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.session_type, SessionType::ShortBreak);
    assert_eq!(snap.state, RunState::Running);
    assert_eq!(snap.remaining_secs, 25);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event);
    }
    assert!(matches!(kinds[0], Event::TimerStarted { session_type: SessionType::Focus, .. }));
    assert!(matches!(
        kinds[1],
        Event::TimerCompleted { auto_start_pending: true, .. }
    ));
    assert!(matches!(
        kinds[2],
        Event::TimerStarted { session_type: SessionType::ShortBreak, .. }
    ));
    assert_eq!(store.sessions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_during_auto_start_delay_cancels_it() {
    let settings = SharedSettings::new(TimerSettings {
        auto_start_breaks: true,
        ..minute_settings()
    });
    let handle = TimerService::new(settings, Collaborators::new(MemoryStore::new())).spawn();

    handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(60_500)).await;
    assert!(handle.pause().await.unwrap().is_empty());
    tokio::time::sleep(Duration::from_secs(10)).await;

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.session_type, SessionType::ShortBreak);
    assert_eq!(snap.state, RunState::Idle);
    assert_eq!(snap.remaining_secs, 30);
}

#[tokio::test(start_paused = true)]
async fn test_suspend_resume_through_the_service() {
    let start = Utc.with_ymd_and_hms(2025, 10, 6, 9, 0, 0).unwrap();
    let time = ManualTimeSource::new(start);
    let handle = TimerService::new(
        SharedSettings::new(minute_settings()),
        Collaborators::new(MemoryStore::new()),
    )
    .with_time_source(time.clone())
    .spawn();

    handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    handle.suspend().await.unwrap();

    // No heartbeats while suspended, however long tokio time runs.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(handle.snapshot().await.unwrap().remaining_secs, 50);

    time.advance_secs(20);
    let events = handle.resume().await.unwrap();
    assert!(matches!(
        events.as_slice(),
        [Event::Reconciled { elapsed_secs: 20, remaining_secs: 30, .. }]
    ));

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.state, RunState::Running);
    assert_eq!(snap.remaining_secs, 25);
}

#[tokio::test(start_paused = true)]
async fn test_restored_running_engine_keeps_counting() {
    let settings = minute_settings();
    let mut engine = TimerEngine::new(&settings);
    engine.start();
    engine.elapse(40);

    let handle = TimerService::new(
        SharedSettings::new(settings),
        Collaborators::new(MemoryStore::new()),
    )
    .with_state(engine, Reconciler::new())
    .spawn();

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.remaining_secs, 15);

    let (engine, _) = handle.shutdown().await.unwrap();
    assert_eq!(engine.remaining_secs(), 15);
    assert_eq!(engine.state(), RunState::Running);
}
