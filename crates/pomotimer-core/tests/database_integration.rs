//! Integration tests for SQLite persistence behind the controller.

use chrono::{Duration, Local, TimeZone, Utc};

use pomotimer_core::timer::ManualTimeSource;
use pomotimer_core::{
    Collaborators, Database, ManualClock, Period, Persistence, SessionType, SharedSettings,
    Statistics, StreakStatistics, TimerController, TimerSession, TimerSettings,
};

#[test]
fn test_controller_records_into_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pomotimer.db");
    let time = ManualTimeSource::new(Utc::now());

    {
        let db = Database::open_at(&path).unwrap();
        let settings = TimerSettings {
            focus_duration: 5,
            ..TimerSettings::default()
        };
        db.save_settings(&settings).unwrap();

        let mut timer = TimerController::new(
            SharedSettings::new(db.load_settings().unwrap()),
            ManualClock::new(),
            Collaborators::new(db),
        )
        .with_time_source(time.clone());
        timer.start();
        for _ in 0..5 {
            timer.tick();
        }
        timer.start();
        time.advance_secs(30);
        for _ in 0..30 {
            timer.tick();
        }
        timer.skip();
    }

    let db = Database::open_at(&path).unwrap();
    let sessions = db.all_sessions().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].session_type, SessionType::Focus);
    assert!(sessions[0].was_completed);
    assert_eq!(sessions[1].session_type, SessionType::ShortBreak);
    assert_eq!(sessions[1].duration_secs, 30);
    assert!(!sessions[1].was_completed);
    assert_eq!(db.load_settings().unwrap().focus_duration, 5);
}

#[test]
fn test_statistics_over_stored_history() {
    let db = Database::open_in_memory().unwrap();
    let now = Local::now();
    let today = now.with_timezone(&Utc);

    for days_ago in 0..3 {
        let at = today - Duration::days(days_ago);
        db.save_session(&TimerSession::completed(SessionType::Focus, 1500, at))
            .unwrap();
    }
    db.save_session(&TimerSession::abandoned(SessionType::ShortBreak, 120, today))
        .unwrap();
    db.save_session(&TimerSession::completed(
        SessionType::Focus,
        1500,
        today - Duration::days(40),
    ))
    .unwrap();

    let sessions = db.all_sessions().unwrap();
    let all = Statistics::compute(&sessions, Period::All, &now);
    assert_eq!(all.total_sessions, 5);
    assert_eq!(all.skipped_sessions, 1);
    assert_eq!(all.focus_secs, 4 * 1500);

    let week = Statistics::compute(&sessions, Period::Week, &now);
    assert_eq!(week.focus_sessions, 3);
    assert_eq!(week.short_breaks, 1);

    let streaks = StreakStatistics::compute(&sessions, &now);
    assert_eq!(streaks.current_streak, 3);
    assert_eq!(streaks.longest_streak, 3);
}

#[test]
fn test_recent_sessions_newest_first() {
    let db = Database::open_in_memory().unwrap();
    let base = Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0).unwrap();
    for i in 0..5 {
        db.save_session(&TimerSession::completed(
            SessionType::Focus,
            1500,
            base + Duration::hours(i),
        ))
        .unwrap();
    }
    let recent = db.recent_sessions(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].completed_at, base + Duration::hours(4));
    assert_eq!(recent[1].completed_at, base + Duration::hours(3));
}
