//! Interfaces the timer drives but does not implement.
//!
//! Every call is fire-and-forget from the controller's point of view: an
//! `Err` is logged and the countdown carries on. Nothing is retried.

use std::time::Duration;

use crate::error::Result;
use crate::snapshot::TimerSnapshot;
use crate::timer::{SessionType, TimerSession, TimerSettings};

/// Session history and settings storage.
pub trait Persistence: Send {
    fn save_session(&self, session: &TimerSession) -> Result<()>;

    fn all_sessions(&self) -> Result<Vec<TimerSession>>;

    fn load_settings(&self) -> Result<TimerSettings>;

    fn save_settings(&self, settings: &TimerSettings) -> Result<()>;
}

/// User-visible alerts.
pub trait Notifier: Send {
    /// Immediate alert that `session_type` just finished.
    fn notify_completion(&self, _session_type: SessionType) -> Result<()> {
        Ok(())
    }

    /// Alert that fires after `fire_delay` even if the process is suspended
    /// before the countdown reaches zero in-process.
    fn schedule_completion_notification(
        &self,
        _session_type: SessionType,
        _fire_delay: Duration,
    ) -> Result<()> {
        Ok(())
    }

    fn cancel_pending_notifications(&self) -> Result<()> {
        Ok(())
    }
}

/// Sound and haptics on completion.
pub trait Feedback: Send {
    fn play_completion_sound(&self) -> Result<()> {
        Ok(())
    }

    fn trigger_haptic_feedback(&self) -> Result<()> {
        Ok(())
    }
}

/// Receiver of the shared-state snapshot (widgets, status bars).
pub trait SnapshotPublisher: Send {
    fn publish_snapshot(&self, snapshot: &TimerSnapshot) -> Result<()>;
}

/// Optional platform capability: ask the OS to enter a focus mode when a
/// Focus session starts.
pub trait FocusModeHinter: Send {
    fn request_focus_mode(&self) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFeedback;

impl Feedback for NoopFeedback {}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSnapshots;

impl SnapshotPublisher for NoopSnapshots {
    fn publish_snapshot(&self, _snapshot: &TimerSnapshot) -> Result<()> {
        Ok(())
    }
}

/// Title and body for a completion alert.
pub fn completion_message(session_type: SessionType) -> (&'static str, &'static str) {
    match session_type {
        SessionType::Focus => ("Focus Session Complete!", "Great work! Time for a break."),
        SessionType::ShortBreak => ("Break Complete!", "Ready to focus again?"),
        SessionType::LongBreak => ("Long Break Complete!", "You've earned it! Ready for more?"),
    }
}

/// Everything the controller talks to, injected at construction.
pub struct Collaborators {
    pub persistence: Box<dyn Persistence>,
    pub notifier: Box<dyn Notifier>,
    pub feedback: Box<dyn Feedback>,
    pub snapshots: Box<dyn SnapshotPublisher>,
    pub focus_mode: Option<Box<dyn FocusModeHinter>>,
}

impl Collaborators {
    /// Persistence only; every other collaborator is a no-op.
    pub fn new(persistence: impl Persistence + 'static) -> Self {
        Self {
            persistence: Box::new(persistence),
            notifier: Box::new(NoopNotifier),
            feedback: Box::new(NoopFeedback),
            snapshots: Box::new(NoopSnapshots),
            focus_mode: None,
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_feedback(mut self, feedback: impl Feedback + 'static) -> Self {
        self.feedback = Box::new(feedback);
        self
    }

    pub fn with_snapshots(mut self, snapshots: impl SnapshotPublisher + 'static) -> Self {
        self.snapshots = Box::new(snapshots);
        self
    }

    pub fn with_focus_mode(mut self, hinter: impl FocusModeHinter + 'static) -> Self {
        self.focus_mode = Some(Box::new(hinter));
        self
    }
}
