use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{RunState, SessionType};

/// Shared-state record for widgets and status bars.
///
/// Published on every state transition and periodically while running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub session_type: SessionType,
    pub label: String,
    pub state: RunState,
    pub is_running: bool,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub completed_focus_sessions: u32,
    /// Focus sessions completed today.
    #[serde(default)]
    pub counts_today: u32,
    #[serde(default)]
    pub focus_secs_today: u64,
    #[serde(default)]
    pub streak: u32,
    pub updated_at: DateTime<Utc>,
}

impl TimerSnapshot {
    /// `MM:SS` rendering of the remaining time.
    pub fn remaining_display(&self) -> String {
        format!("{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_display_pads_minutes_and_seconds() {
        let snap = TimerSnapshot {
            session_type: SessionType::Focus,
            label: "Focus".into(),
            state: RunState::Running,
            is_running: true,
            remaining_secs: 1490,
            total_secs: 1500,
            completed_focus_sessions: 0,
            counts_today: 0,
            focus_secs_today: 0,
            streak: 0,
            updated_at: Utc::now(),
        };
        assert_eq!(snap.remaining_display(), "24:50");
    }
}
