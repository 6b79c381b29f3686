//! Wall-clock reconciliation across process suspension.
//!
//! The heartbeat does not run while the host is suspended, so instead of
//! accumulating ticks the controller stores the suspend instant and, on
//! resume, counts the whole seconds that passed in one step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciler {
    #[serde(default)]
    suspended_at: Option<DateTime<Utc>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a persisted suspend instant.
    pub fn with_suspended_at(suspended_at: Option<DateTime<Utc>>) -> Self {
        Self { suspended_at }
    }

    pub fn suspended_at(&self) -> Option<DateTime<Utc>> {
        self.suspended_at
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }

    /// Record the suspend instant, replacing an earlier unmatched one.
    pub fn suspend(&mut self, at: DateTime<Utc>) {
        self.suspended_at = Some(at);
    }

    /// Consume the stored instant and return the whole seconds elapsed
    /// since it.
    ///
    /// Returns `None` when nothing was stored (resume without suspend) or
    /// when the stored instant lies after `now`. Either way the stored
    /// instant is cleared, so a second call is always a no-op.
    pub fn take_elapsed(&mut self, now: DateTime<Utc>) -> Option<u64> {
        let since = self.suspended_at.take()?;
        let elapsed = now.signed_duration_since(since).num_seconds();
        u64::try_from(elapsed).ok()
    }
}
