mod clock;
mod completion;
mod controller;
mod engine;
mod reconcile;
mod session;
mod settings;

pub use clock::{
    Clock, ManualClock, ManualTimeSource, SystemTimeSource, TimeSource, AUTO_START_DELAY,
    TICK_INTERVAL,
};
pub use controller::{ControllerOptions, TimerController, SNAPSHOT_EVERY_TICKS};
pub use engine::{Countdown, TimerEngine};
pub use reconcile::Reconciler;
pub use session::{RunState, SessionType, TimerSession};
pub use settings::{SharedSettings, TimerSettings};
