//! Property tests: arbitrary command sequences never break the timer's
//! invariants.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use pomotimer_core::timer::ManualTimeSource;
use pomotimer_core::{
    Clock, Collaborators, ManualClock, MemoryStore, RunState, SessionType, SharedSettings,
    TimerController, TimerSettings,
};

#[derive(Debug, Clone)]
enum Op {
    Start,
    Pause,
    Reset,
    Skip,
    Ticks(u16),
    Sleep(u32),
    Alarm,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Start),
        1 => Just(Op::Pause),
        1 => Just(Op::Reset),
        1 => Just(Op::Skip),
        4 => (1u16..400).prop_map(Op::Ticks),
        2 => (0u32..4000).prop_map(Op::Sleep),
        1 => Just(Op::Alarm),
    ]
}

fn settings() -> impl Strategy<Value = TimerSettings> {
    (1u64..600, 1u64..120, 1u64..300, 0u32..6, any::<bool>(), any::<bool>()).prop_map(
        |(focus, short, long, every, auto_breaks, auto_focus)| TimerSettings {
            focus_duration: focus,
            short_break_duration: short,
            long_break_duration: long,
            sessions_until_long_break: every,
            auto_start_breaks: auto_breaks,
            auto_start_focus: auto_focus,
            ..TimerSettings::default()
        },
    )
}

proptest! {
    #[test]
    fn test_command_sequences_keep_invariants(
        settings in settings(),
        ops in prop::collection::vec(op(), 1..60),
    ) {
        let store = MemoryStore::new();
        let time = ManualTimeSource::new(Utc.with_ymd_and_hms(2025, 10, 6, 9, 0, 0).unwrap());
        let mut timer = TimerController::new(
            SharedSettings::new(settings.clone()),
            ManualClock::new(),
            Collaborators::new(store.clone()),
        )
        .with_time_source(time.clone());

        let mut last_counter = 0;
        for op in ops {
            match op {
                Op::Start => { timer.start(); }
                Op::Pause => { timer.pause(); }
                Op::Reset => { timer.reset(); }
                Op::Skip => { timer.skip(); }
                Op::Ticks(n) => {
                    for _ in 0..n {
                        timer.tick();
                    }
                }
                Op::Sleep(secs) => {
                    timer.on_suspend();
                    time.advance_secs(i64::from(secs));
                    timer.on_resume();
                }
                Op::Alarm => { timer.on_alarm(); }
            }

            let engine = timer.engine();
            prop_assert!(engine.remaining_secs() <= engine.total_secs());
            prop_assert_eq!(engine.total_secs(), settings.duration_for(engine.session_type()));
            prop_assert!(engine.completed_focus_sessions() >= last_counter);
            last_counter = engine.completed_focus_sessions();

            // The heartbeat runs exactly while the countdown does.
            prop_assert_eq!(timer.clock().is_ticking(), engine.state() == RunState::Running);
            // A pending auto-start only exists while idle.
            if timer.clock().is_armed() {
                prop_assert_eq!(engine.state(), RunState::Idle);
            }
            prop_assert!(timer.reconciler().suspended_at().is_none());
        }

        for session in store.sessions() {
            if session.was_completed {
                prop_assert_eq!(session.duration_secs, settings.duration_for(session.session_type));
            } else {
                prop_assert!(session.duration_secs > 0);
            }
        }
    }

    #[test]
    fn test_long_break_follows_every_nth_focus(every in 0u32..8, rounds in 1usize..30) {
        let settings = TimerSettings {
            sessions_until_long_break: every,
            ..TimerSettings::default()
        };
        let mut timer = TimerController::new(
            SharedSettings::new(settings.clone()),
            ManualClock::new(),
            Collaborators::new(MemoryStore::new()),
        );

        for _ in 0..rounds {
            prop_assert_eq!(timer.session_type(), SessionType::Focus);
            timer.skip();
            let n = timer.completed_focus_sessions();
            let expected = if n % settings.long_break_every() == 0 {
                SessionType::LongBreak
            } else {
                SessionType::ShortBreak
            };
            prop_assert_eq!(timer.session_type(), expected);
            timer.skip();
        }
    }
}
