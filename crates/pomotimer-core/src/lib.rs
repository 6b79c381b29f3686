//! # Pomotimer Core Library
//!
//! Core logic for a Pomodoro session timer: focus sessions alternating with
//! short breaks, and a long break after every N focus sessions.
//!
//! ## Architecture
//!
//! - **Timer**: [`TimerEngine`] is the pure countdown and transition rule;
//!   [`TimerController`] wraps it with the clock, suspend/resume
//!   reconciliation and completion side effects
//! - **Collaborators**: persistence, notifications, feedback and snapshot
//!   publishing are traits injected at construction
//! - **Service**: [`TimerService`] owns a controller on a tokio task and
//!   serializes commands, heartbeats and the auto-start alarm
//! - **Storage**: SQLite session history and TOML host configuration
//! - **Stats**: per-period summaries and day streaks over the history
//!
//! The clock is a heartbeat that stops while the host is suspended. Time
//! lost that way is recovered from the wall clock on resume, so the
//! countdown matches real time regardless of how long the host slept.

pub mod collaborators;
pub mod error;
pub mod events;
pub mod service;
pub mod snapshot;
pub mod stats;
pub mod storage;
pub mod timer;

pub use collaborators::{
    Collaborators, Feedback, FocusModeHinter, Notifier, Persistence, SnapshotPublisher,
};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use service::{Command, TimerHandle, TimerService};
pub use snapshot::TimerSnapshot;
pub use stats::{Period, Statistics, StreakStatistics};
pub use storage::{Config, Database, MemoryStore};
pub use timer::{
    Clock, ControllerOptions, ManualClock, Reconciler, RunState, SessionType, SharedSettings,
    TimerController, TimerEngine, TimerSession, TimerSettings,
};
