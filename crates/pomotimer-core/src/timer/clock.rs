//! Clock abstraction.
//!
//! A [`Clock`] is a heartbeat, not a stopwatch: it delivers one tick per
//! interval while started and nothing while the host process is suspended.
//! Lost time is recovered by reconciliation against a [`TimeSource`].
//!
//! The clock also owns the one-shot alarm behind the auto-start delay, the
//! only other deferred action in the timer.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default heartbeat cadence.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default delay between a completion and the auto-started next session.
pub const AUTO_START_DELAY: Duration = Duration::from_secs(1);

/// Source of heartbeats and the auto-start alarm.
///
/// Implementations deliver ticks and alarms back to the owner of the
/// controller serially; `stop` and `disarm` cancel immediately and are
/// idempotent.
pub trait Clock: Send {
    /// Begin (or restart) delivering ticks every `interval`.
    fn start(&mut self, interval: Duration);

    /// Cancel tick delivery.
    fn stop(&mut self);

    fn is_ticking(&self) -> bool;

    /// Schedule a single alarm after `delay`, replacing any pending one.
    fn arm(&mut self, delay: Duration);

    /// Cancel the pending alarm, if any.
    fn disarm(&mut self);

    fn is_armed(&self) -> bool;
}

/// A clock driven by hand: it records what the controller asked for and the
/// owner calls `tick()` / `on_alarm()` itself.
///
/// Used by tests and by the stateless CLI, where each invocation is a
/// suspend/resume pair and no heartbeat runs in between.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    interval: Option<Duration>,
    alarm: Option<Duration>,
    starts: u32,
    stops: u32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval requested by the last `start`, while ticking.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Delay requested by the pending alarm.
    pub fn alarm_delay(&self) -> Option<Duration> {
        self.alarm
    }

    pub fn start_count(&self) -> u32 {
        self.starts
    }

    pub fn stop_count(&self) -> u32 {
        self.stops
    }
}

impl Clock for ManualClock {
    fn start(&mut self, interval: Duration) {
        self.interval = Some(interval);
        self.starts += 1;
    }

    fn stop(&mut self) {
        if self.interval.take().is_some() {
            self.stops += 1;
        }
    }

    fn is_ticking(&self) -> bool {
        self.interval.is_some()
    }

    fn arm(&mut self, delay: Duration) {
        self.alarm = Some(delay);
    }

    fn disarm(&mut self) {
        self.alarm = None;
    }

    fn is_armed(&self) -> bool {
        self.alarm.is_some()
    }
}

/// Wall-clock time used for reconciliation and record timestamps.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable time for tests. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.set(self.now() + ChronoDuration::seconds(secs));
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut guard = match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = at;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_stop_is_idempotent() {
        let mut clock = ManualClock::new();
        clock.start(TICK_INTERVAL);
        assert!(clock.is_ticking());
        clock.stop();
        clock.stop();
        assert!(!clock.is_ticking());
        assert_eq!(clock.stop_count(), 1);
    }

    #[test]
    fn manual_clock_alarm_replaces_pending() {
        let mut clock = ManualClock::new();
        clock.arm(Duration::from_secs(5));
        clock.arm(AUTO_START_DELAY);
        assert_eq!(clock.alarm_delay(), Some(AUTO_START_DELAY));
        clock.disarm();
        assert!(!clock.is_armed());
    }

    #[test]
    fn manual_time_clones_share_instant() {
        let start = Utc::now();
        let time = ManualTimeSource::new(start);
        let other = time.clone();
        other.advance_secs(50);
        assert_eq!(time.now() - start, ChronoDuration::seconds(50));
    }
}
