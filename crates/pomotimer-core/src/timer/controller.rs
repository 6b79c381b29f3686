//! Timer controller: the session state machine with its side effects.
//!
//! The controller wraps a [`TimerEngine`] and is the only thing that talks
//! to the clock and the collaborators. It is single-threaded by
//! construction (`&mut self` everywhere); hosts that need it across threads
//! put it behind the command queue in [`crate::service`].
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = TimerController::new(settings, ManualClock::new(), collaborators);
//! timer.start();
//! // once per heartbeat:
//! let events = timer.tick(); // contains TimerCompleted when the session ends
//! ```

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::clock::{Clock, SystemTimeSource, TimeSource, AUTO_START_DELAY, TICK_INTERVAL};
use super::engine::{Countdown, TimerEngine};
use super::reconcile::Reconciler;
use super::session::{RunState, SessionType, TimerSession};
use super::settings::SharedSettings;
use crate::collaborators::Collaborators;
use crate::error::Result;
use crate::events::Event;
use crate::snapshot::TimerSnapshot;
use crate::stats::{current_streak, today_summary, TodaySummary};

/// Publish a snapshot every this many ticks while running.
pub const SNAPSHOT_EVERY_TICKS: u32 = 10;

/// Tunables the host may override, usually from `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub tick_interval: Duration,
    pub auto_start_delay: Duration,
    /// Zero disables periodic snapshots; transitions still publish.
    pub snapshot_every_ticks: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            tick_interval: TICK_INTERVAL,
            auto_start_delay: AUTO_START_DELAY,
            snapshot_every_ticks: SNAPSHOT_EVERY_TICKS,
        }
    }
}

/// Today's numbers as last read from persistence. Valid until the local
/// date changes or a session is recorded.
#[derive(Debug, Clone, Copy)]
struct DayCounts {
    day: NaiveDate,
    today: TodaySummary,
    streak: u32,
}

pub struct TimerController<C: Clock> {
    pub(super) engine: TimerEngine,
    pub(super) settings: SharedSettings,
    pub(super) clock: C,
    pub(super) time: Arc<dyn TimeSource>,
    pub(super) collaborators: Collaborators,
    reconciler: Reconciler,
    pub(super) options: ControllerOptions,
    ticks_since_snapshot: u32,
    day_counts: Option<DayCounts>,
}

impl<C: Clock> TimerController<C> {
    /// Idle controller with a fresh Focus session.
    pub fn new(settings: SharedSettings, clock: C, collaborators: Collaborators) -> Self {
        let engine = TimerEngine::new(&settings.snapshot());
        Self {
            engine,
            settings,
            clock,
            time: Arc::new(SystemTimeSource),
            collaborators,
            reconciler: Reconciler::new(),
            options: ControllerOptions::default(),
            ticks_since_snapshot: 0,
            day_counts: None,
        }
    }

    pub fn with_time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Arc::new(time);
        self
    }

    pub fn with_boxed_time_source(mut self, time: Box<dyn TimeSource>) -> Self {
        self.time = Arc::from(time);
        self
    }

    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    /// Continue from persisted state.
    ///
    /// A running engine gets its heartbeat back unless it was persisted
    /// while suspended; in that case `on_resume` restarts it after
    /// reconciling.
    pub fn restore(mut self, engine: TimerEngine, reconciler: Reconciler) -> Self {
        self.engine = engine;
        self.reconciler = reconciler;
        if self.engine.is_running() && !self.reconciler.is_suspended() {
            self.clock.start(self.options.tick_interval);
        }
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn session_type(&self) -> SessionType {
        self.engine.session_type()
    }

    pub fn state(&self) -> RunState {
        self.engine.state()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.engine.remaining_secs()
    }

    pub fn completed_focus_sessions(&self) -> u32 {
        self.engine.completed_focus_sessions()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    /// Current shared-state snapshot, with today's counts read from
    /// persistence unless already cached for today.
    pub fn snapshot(&self) -> TimerSnapshot {
        let now = self.time.now();
        let counts = self.day_counts(&now.with_timezone(&Local));
        self.snapshot_with(now, counts)
    }

    fn snapshot_with(&self, now: DateTime<Utc>, counts: Option<DayCounts>) -> TimerSnapshot {
        let (today, streak) = counts.map_or((TodaySummary::default(), 0), |c| (c.today, c.streak));
        TimerSnapshot {
            session_type: self.engine.session_type(),
            label: self.engine.session_type().label().to_string(),
            state: self.engine.state(),
            is_running: self.engine.is_running(),
            remaining_secs: self.engine.remaining_secs(),
            total_secs: self.engine.total_secs(),
            completed_focus_sessions: self.engine.completed_focus_sessions(),
            counts_today: today.completed_focus,
            focus_secs_today: today.focus_secs,
            streak,
            updated_at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────
    //
    // A command that arrives while the host is suspended first counts the
    // suspended time so far, then applies, then suspends again from now.

    /// Idle or Paused -> Running. No-op while running.
    pub fn start(&mut self) -> Vec<Event> {
        self.around_suspension(|timer| {
            timer.clock.disarm();
            timer.begin()
        })
    }

    /// Running -> Paused. No-op otherwise, apart from cancelling a pending
    /// auto-start.
    pub fn pause(&mut self) -> Vec<Event> {
        self.around_suspension(Self::pause_now)
    }

    /// Back to Idle with a full countdown for the current session type.
    /// Never changes the type and never records a session.
    pub fn reset(&mut self) -> Vec<Event> {
        self.around_suspension(Self::reset_now)
    }

    /// Abandon the current session and move to the next one.
    ///
    /// Records the counted seconds as an incomplete session when any time
    /// was counted. Leaving a Focus session still advances the long-break
    /// counter.
    pub fn skip(&mut self) -> Vec<Event> {
        self.around_suspension(Self::skip_now)
    }

    fn pause_now(&mut self) -> Vec<Event> {
        self.clock.disarm();
        if !self.engine.pause() {
            return Vec::new();
        }
        self.clock.stop();
        debug!(remaining = self.engine.remaining_secs(), "timer paused");
        self.publish_snapshot();
        vec![Event::TimerPaused {
            session_type: self.engine.session_type(),
            remaining_secs: self.engine.remaining_secs(),
            at: self.time.now(),
        }]
    }

    fn reset_now(&mut self) -> Vec<Event> {
        self.clock.disarm();
        self.clock.stop();
        self.engine.reset(&self.settings.snapshot());
        report("notifier", self.collaborators.notifier.cancel_pending_notifications());
        debug!(session = ?self.engine.session_type(), "timer reset");
        self.publish_snapshot();
        vec![Event::TimerReset {
            session_type: self.engine.session_type(),
            remaining_secs: self.engine.remaining_secs(),
            at: self.time.now(),
        }]
    }

    fn skip_now(&mut self) -> Vec<Event> {
        self.clock.disarm();
        self.clock.stop();

        let now = self.time.now();
        let from = self.engine.session_type();
        let elapsed = self.engine.elapsed_secs();
        let recorded = elapsed > 0;
        if recorded {
            self.record(&TimerSession::abandoned(from, elapsed, now));
        }

        let settings = self.settings.snapshot();
        let to = self.engine.advance(&settings);
        report("notifier", self.collaborators.notifier.cancel_pending_notifications());
        debug!(?from, ?to, elapsed, "session skipped");
        self.publish_snapshot();

        let mut events = vec![Event::TimerSkipped {
            from,
            to,
            elapsed_secs: elapsed,
            recorded,
            at: now,
        }];
        if settings.auto_starts(to) {
            events.extend(self.begin());
        }
        events
    }

    /// One heartbeat. Returns `TimerCompleted` when the countdown runs out.
    pub fn tick(&mut self) -> Vec<Event> {
        match self.engine.tick() {
            Countdown::Ignored => Vec::new(),
            Countdown::Counting => {
                self.ticks_since_snapshot += 1;
                if self.options.snapshot_every_ticks > 0
                    && self.ticks_since_snapshot >= self.options.snapshot_every_ticks
                {
                    self.publish_snapshot();
                }
                Vec::new()
            }
            Countdown::Exhausted => self.complete_session(),
        }
    }

    /// The auto-start alarm fired. Ignored when no alarm is pending, which
    /// means a manual command cancelled it first.
    pub fn on_alarm(&mut self) -> Vec<Event> {
        if !self.clock.is_armed() {
            return Vec::new();
        }
        self.clock.disarm();
        debug!(session = ?self.engine.session_type(), "auto-starting next session");
        self.begin()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// The host is about to be suspended.
    ///
    /// The heartbeat stops (it would not run while suspended anyway) and a
    /// completion notification is scheduled so the alert still fires.
    pub fn on_suspend(&mut self) {
        let now = self.time.now();
        self.reconciler.suspend(now);
        self.clock.stop();
        if self.engine.is_running() && self.settings.snapshot().notifications_enabled {
            report(
                "notifier",
                self.collaborators.notifier.schedule_completion_notification(
                    self.engine.session_type(),
                    Duration::from_secs(self.engine.remaining_secs()),
                ),
            );
        }
        debug!(state = ?self.engine.state(), "suspended");
    }

    /// The host came back. Counts the suspended time in one step and
    /// completes the session if it ran out meanwhile.
    pub fn on_resume(&mut self) -> Vec<Event> {
        if !self.reconciler.is_suspended() {
            return Vec::new();
        }
        let now = self.time.now();
        let elapsed = self.reconciler.take_elapsed(now);
        report("notifier", self.collaborators.notifier.cancel_pending_notifications());

        if !self.engine.is_running() {
            return Vec::new();
        }
        let Some(elapsed) = elapsed else {
            warn!("suspend timestamp lies in the future; nothing to reconcile");
            self.clock.start(self.options.tick_interval);
            return Vec::new();
        };

        let countdown = self.engine.elapse(elapsed);
        debug!(elapsed, remaining = self.engine.remaining_secs(), "reconciled after resume");
        let mut events = vec![Event::Reconciled {
            elapsed_secs: elapsed,
            remaining_secs: self.engine.remaining_secs(),
            at: now,
        }];
        match countdown {
            Countdown::Exhausted => events.extend(self.complete_session()),
            _ => {
                self.clock.start(self.options.tick_interval);
                self.publish_snapshot();
            }
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn around_suspension(&mut self, command: impl FnOnce(&mut Self) -> Vec<Event>) -> Vec<Event> {
        if !self.reconciler.is_suspended() {
            return command(self);
        }
        let mut events = self.on_resume();
        events.extend(command(self));
        self.on_suspend();
        events
    }

    /// Start without touching the alarm.
    fn begin(&mut self) -> Vec<Event> {
        let Some(previous) = self.engine.start() else {
            return Vec::new();
        };
        self.clock.start(self.options.tick_interval);
        self.ticks_since_snapshot = 0;

        let session_type = self.engine.session_type();
        if session_type == SessionType::Focus && self.settings.snapshot().focus_mode_enabled {
            if let Some(hinter) = &self.collaborators.focus_mode {
                report("focus mode", hinter.request_focus_mode());
            }
        }
        debug!(?session_type, remaining = self.engine.remaining_secs(), "timer running");
        self.publish_snapshot();

        let at = self.time.now();
        let event = match previous {
            RunState::Paused => Event::TimerResumed {
                session_type,
                remaining_secs: self.engine.remaining_secs(),
                at,
            },
            _ => Event::TimerStarted {
                session_type,
                remaining_secs: self.engine.remaining_secs(),
                total_secs: self.engine.total_secs(),
                at,
            },
        };
        vec![event]
    }

    pub(super) fn record(&mut self, session: &TimerSession) {
        self.day_counts = None;
        report("persistence", self.collaborators.persistence.save_session(session));
    }

    fn day_counts(&self, local: &DateTime<Local>) -> Option<DayCounts> {
        let day = local.date_naive();
        if let Some(cached) = self.day_counts.filter(|c| c.day == day) {
            return Some(cached);
        }
        match self.collaborators.persistence.all_sessions() {
            Ok(sessions) => Some(DayCounts {
                day,
                today: today_summary(&sessions, local),
                streak: current_streak(&sessions, local),
            }),
            Err(e) => {
                warn!(error = %e, "failed to load sessions for snapshot");
                None
            }
        }
    }

    pub(super) fn publish_snapshot(&mut self) {
        self.ticks_since_snapshot = 0;
        let now = self.time.now();
        let counts = self.day_counts(&now.with_timezone(&Local));
        if counts.is_some() {
            self.day_counts = counts;
        }
        let snapshot = self.snapshot_with(now, counts);
        report("snapshot publisher", self.collaborators.snapshots.publish_snapshot(&snapshot));
    }
}

/// Log a collaborator failure and carry on.
pub(super) fn report(collaborator: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!(collaborator, error = %e, "collaborator call failed");
    }
}
