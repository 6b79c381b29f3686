//! Terminal implementations of the timer's collaborators.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use pomotimer_core::collaborators::{completion_message, Feedback, Notifier, SnapshotPublisher};
use pomotimer_core::error::{CoreError, Result};
use pomotimer_core::{SessionType, TimerSnapshot};

/// Rings the terminal bell. Terminals have no haptics.
pub struct TerminalFeedback;

impl Feedback for TerminalFeedback {
    fn play_completion_sound(&self) -> Result<()> {
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }

    fn trigger_haptic_feedback(&self) -> Result<()> {
        debug!("haptic feedback is not supported in a terminal");
        Ok(())
    }
}

/// Notifications as log lines.
///
/// A terminal cannot deliver an alert after the process exits, so scheduled
/// notifications are only logged.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_completion(&self, session_type: SessionType) -> Result<()> {
        let (title, body) = completion_message(session_type);
        info!(session = %session_type, "{title} {body}");
        Ok(())
    }

    fn schedule_completion_notification(
        &self,
        session_type: SessionType,
        fire_delay: Duration,
    ) -> Result<()> {
        debug!(
            session = %session_type,
            fire_in_secs = fire_delay.as_secs(),
            "completion notification scheduled"
        );
        Ok(())
    }

    fn cancel_pending_notifications(&self) -> Result<()> {
        debug!("pending notifications cancelled");
        Ok(())
    }
}

/// Writes each snapshot as JSON to a file for status bars and widgets.
pub struct FileSnapshotPublisher {
    path: PathBuf,
}

impl FileSnapshotPublisher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SnapshotPublisher for FileSnapshotPublisher {
    /// Write to a sibling temp file and rename, so readers never see a
    /// partial snapshot.
    fn publish_snapshot(&self, snapshot: &TimerSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                CoreError::collaborator("snapshot file", format!("{}: {e}", self.path.display()))
            })
    }
}
