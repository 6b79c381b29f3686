//! Session completion.
//!
//! Runs when a tick or a reconciliation observes the countdown reach zero
//! while running. Each side effect is gated by its own setting and a
//! failing collaborator never stops the sequence.

use tracing::info;

use super::clock::Clock;
use super::controller::{report, TimerController};
use super::session::TimerSession;
use crate::events::Event;

impl<C: Clock> TimerController<C> {
    pub(super) fn complete_session(&mut self) -> Vec<Event> {
        self.clock.stop();
        self.engine.finish();

        let now = self.time.now();
        let finished = self.engine.session_type();
        let duration = self.engine.total_secs();
        self.record(&TimerSession::completed(finished, duration, now));

        let settings = self.settings.snapshot();
        if settings.sound_enabled {
            report("feedback", self.collaborators.feedback.play_completion_sound());
        }
        if settings.haptic_enabled {
            report("feedback", self.collaborators.feedback.trigger_haptic_feedback());
        }
        if settings.notifications_enabled {
            report("notifier", self.collaborators.notifier.notify_completion(finished));
        }

        let next = self.engine.advance(&settings);
        let auto_start = settings.auto_starts(next);
        if auto_start {
            self.clock.arm(self.options.auto_start_delay);
        }
        info!(
            session = ?finished,
            duration,
            ?next,
            completed_focus = self.engine.completed_focus_sessions(),
            auto_start,
            "session completed"
        );
        self.publish_snapshot();

        vec![Event::TimerCompleted {
            session_type: finished,
            duration_secs: duration,
            next,
            completed_focus_sessions: self.engine.completed_focus_sessions(),
            auto_start_pending: auto_start,
            at: now,
        }]
    }
}
