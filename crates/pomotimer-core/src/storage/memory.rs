use std::sync::{Arc, Mutex, MutexGuard};

use crate::collaborators::Persistence;
use crate::error::Result;
use crate::timer::{TimerSession, TimerSettings};

#[derive(Debug, Default)]
struct Inner {
    sessions: Vec<TimerSession>,
    settings: Option<TimerSettings>,
}

/// In-memory persistence for ephemeral runs and tests.
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything saved so far, oldest first.
    pub fn sessions(&self) -> Vec<TimerSession> {
        self.lock().sessions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Persistence for MemoryStore {
    fn save_session(&self, session: &TimerSession) -> Result<()> {
        self.lock().sessions.push(session.clone());
        Ok(())
    }

    fn all_sessions(&self) -> Result<Vec<TimerSession>> {
        Ok(self.sessions())
    }

    fn load_settings(&self) -> Result<TimerSettings> {
        Ok(self.lock().settings.clone().unwrap_or_default())
    }

    fn save_settings(&self, settings: &TimerSettings) -> Result<()> {
        self.lock().settings = Some(settings.clone());
        Ok(())
    }
}
