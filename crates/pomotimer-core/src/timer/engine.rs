//! Session state machine.
//!
//! The engine is pure state: it owns the current session type, the
//! countdown and the focus-session counter, and applies the transition rule.
//! It has no clock and no side effects; [`TimerController`] drives it and
//! performs persistence, feedback and clock control around it.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!   ^        |          |
//!   +--------+----------+   (complete | skip | reset)
//! ```
//!
//! The session type only changes inside [`TimerEngine::advance`], which
//! returns the engine to `Idle` first.
//!
//! [`TimerController`]: super::TimerController

use serde::{Deserialize, Serialize};

use super::session::{RunState, SessionType};
use super::settings::TimerSettings;

/// Outcome of feeding elapsed seconds into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// The engine was not running; nothing changed.
    Ignored,
    /// Time was counted and the session is still going.
    Counting,
    /// The countdown reached zero while running.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEngine {
    session_type: SessionType,
    state: RunState,
    /// Seconds left in the current session.
    remaining_secs: u64,
    /// Duration of the current session, captured when it became current.
    total_secs: u64,
    #[serde(default)]
    completed_focus_sessions: u32,
}

impl TimerEngine {
    /// Idle engine with a full Focus session ready.
    pub fn new(settings: &TimerSettings) -> Self {
        let total = settings.duration_for(SessionType::Focus);
        Self {
            session_type: SessionType::Focus,
            state: RunState::Idle,
            remaining_secs: total,
            total_secs: total,
            completed_focus_sessions: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs.saturating_sub(self.remaining_secs)
    }

    pub fn completed_focus_sessions(&self) -> u32 {
        self.completed_focus_sessions
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Idle or Paused -> Running. Returns the state it left, or `None` when
    /// already running.
    pub fn start(&mut self) -> Option<RunState> {
        match self.state {
            RunState::Idle | RunState::Paused => {
                let previous = self.state;
                self.state = RunState::Running;
                Some(previous)
            }
            RunState::Running => None,
        }
    }

    /// Running -> Paused. Returns `false` for any other state.
    pub fn pause(&mut self) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        self.state = RunState::Paused;
        true
    }

    /// Back to Idle with the full duration of the current session type,
    /// read from `settings` now.
    pub fn reset(&mut self, settings: &TimerSettings) {
        self.state = RunState::Idle;
        self.total_secs = settings.duration_for(self.session_type);
        self.remaining_secs = self.total_secs;
    }

    /// One heartbeat.
    pub fn tick(&mut self) -> Countdown {
        self.elapse(1)
    }

    /// Count `secs` seconds at once, floored at zero.
    pub fn elapse(&mut self, secs: u64) -> Countdown {
        if self.state != RunState::Running {
            return Countdown::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(secs);
        if self.remaining_secs == 0 {
            Countdown::Exhausted
        } else {
            Countdown::Counting
        }
    }

    /// Stop the countdown where it is and return to Idle.
    pub fn finish(&mut self) {
        self.state = RunState::Idle;
    }

    /// Apply the transition rule and make the next session current.
    ///
    /// Leaving a Focus session always increments the counter, whether it
    /// completed or was skipped.
    pub fn advance(&mut self, settings: &TimerSettings) -> SessionType {
        self.state = RunState::Idle;
        let next = match self.session_type {
            SessionType::Focus => {
                self.completed_focus_sessions = self.completed_focus_sessions.saturating_add(1);
                if self.completed_focus_sessions % settings.long_break_every() == 0 {
                    SessionType::LongBreak
                } else {
                    SessionType::ShortBreak
                }
            }
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Focus,
        };
        self.session_type = next;
        self.total_secs = settings.duration_for(next);
        self.remaining_secs = self.total_secs;
        next
    }
}
