//! Timer settings and the shared handle the controller reads them through.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use super::session::SessionType;
use crate::error::ConfigError;
use crate::storage::keypath;

/// User-facing timer settings. Durations are in seconds.
///
/// Every field has a serde default so settings persisted by older versions
/// still load. Values are not validated here; the settings layer owns that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default = "default_focus_duration")]
    pub focus_duration: u64,
    #[serde(default = "default_short_break")]
    pub short_break_duration: u64,
    #[serde(default = "default_long_break")]
    pub long_break_duration: u64,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_focus: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub haptic_enabled: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub focus_mode_enabled: bool,
}

fn default_focus_duration() -> u64 {
    25 * 60
}
fn default_short_break() -> u64 {
    5 * 60
}
fn default_long_break() -> u64 {
    15 * 60
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_duration: default_focus_duration(),
            short_break_duration: default_short_break(),
            long_break_duration: default_long_break(),
            sessions_until_long_break: default_sessions_until_long_break(),
            auto_start_breaks: false,
            auto_start_focus: false,
            sound_enabled: true,
            haptic_enabled: true,
            notifications_enabled: true,
            focus_mode_enabled: false,
        }
    }
}

impl TimerSettings {
    pub fn duration_for(&self, session_type: SessionType) -> u64 {
        match session_type {
            SessionType::Focus => self.focus_duration,
            SessionType::ShortBreak => self.short_break_duration,
            SessionType::LongBreak => self.long_break_duration,
        }
    }

    /// Whether a session of `session_type` should begin on its own once it
    /// becomes current.
    pub fn auto_starts(&self, session_type: SessionType) -> bool {
        match session_type {
            SessionType::Focus => self.auto_start_focus,
            SessionType::ShortBreak | SessionType::LongBreak => self.auto_start_breaks,
        }
    }

    /// Long-break cadence, with 0 treated as 1 so the modulo stays defined.
    pub fn long_break_every(&self) -> u32 {
        self.sessions_until_long_break.max(1)
    }

    /// Check the values a settings editor must reject. The controller itself
    /// tolerates invalid values.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("focus_duration", self.focus_duration),
            ("short_break_duration", self.short_break_duration),
            ("long_break_duration", self.long_break_duration),
        ];
        for (key, secs) in durations {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "duration must be at least one second".into(),
                });
            }
        }
        if self.sessions_until_long_break == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sessions_until_long_break".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Get a setting as string by field name.
    pub fn get(&self, key: &str) -> Option<String> {
        keypath::get(self, key)
    }

    /// Set a setting by field name. Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value has the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        *self = keypath::set(self, key, value)?;
        Ok(())
    }
}

/// Settings shared between the controller and a settings editor.
///
/// The controller never caches values: it takes a [`snapshot`](Self::snapshot)
/// at the moment a duration or auto-start flag is needed, so edits apply to
/// the next session instead of the running countdown.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<TimerSettings>>,
}

impl SharedSettings {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current settings. A poisoned lock still yields the last
    /// written value.
    pub fn snapshot(&self) -> TimerSettings {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, settings: TimerSettings) {
        self.update(|s| *s = settings);
    }

    pub fn update(&self, f: impl FnOnce(&mut TimerSettings)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}
