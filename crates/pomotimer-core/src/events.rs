use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::TimerSnapshot;
use crate::timer::SessionType;

/// Every state change in the timer produces an Event.
/// Hosts print them (CLI) or forward them to whatever renders the timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        session_type: SessionType,
        remaining_secs: u64,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        from: SessionType,
        to: SessionType,
        elapsed_secs: u64,
        /// Whether an abandoned-session record was written.
        recorded: bool,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        session_type: SessionType,
        duration_secs: u64,
        next: SessionType,
        completed_focus_sessions: u32,
        /// The next session will start after the auto-start delay.
        auto_start_pending: bool,
        at: DateTime<Utc>,
    },
    /// Wall-clock correction applied after a suspend/resume pair.
    Reconciled {
        elapsed_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot(TimerSnapshot),
}

impl Event {
    pub fn is_completion(&self) -> bool {
        matches!(self, Event::TimerCompleted { .. })
    }
}
