use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    /// Human-readable label shown by consumers.
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Focus => "Focus",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }

    /// Storage key used in the `sessions` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Focus => "focus",
            SessionType::ShortBreak => "short_break",
            SessionType::LongBreak => "long_break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, SessionType::Focus)
    }
}

impl std::str::FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "focus" => Ok(SessionType::Focus),
            "short_break" => Ok(SessionType::ShortBreak),
            "long_break" => Ok(SessionType::LongBreak),
            other => Err(format!("unknown session type: {other}")),
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// Immutable record of a finished or abandoned session.
///
/// `duration_secs` is the full configured duration for a natural completion
/// and the counted (elapsed) seconds for a skipped session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    pub id: Uuid,
    pub session_type: SessionType,
    pub duration_secs: u64,
    pub completed_at: DateTime<Utc>,
    /// Older records predate skip tracking and were always completions.
    #[serde(default = "default_true")]
    pub was_completed: bool,
}

fn default_true() -> bool {
    true
}

impl TimerSession {
    /// A session whose countdown reached zero.
    pub fn completed(session_type: SessionType, duration_secs: u64, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_type,
            duration_secs,
            completed_at: at,
            was_completed: true,
        }
    }

    /// A session ended early by skip.
    pub fn abandoned(session_type: SessionType, elapsed_secs: u64, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_type,
            duration_secs: elapsed_secs,
            completed_at: at,
            was_completed: false,
        }
    }
}
