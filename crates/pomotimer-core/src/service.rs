//! Async host for a [`TimerController`].
//!
//! The controller is owned by a single background task. User commands,
//! heartbeats and the auto-start alarm all arrive at that task and are
//! applied one at a time, so a tick can never interleave with a pause or a
//! resume halfway through.
//!
//! Heartbeats come from [`TokioClock`], which tags every signal with an
//! epoch. Stopping or restarting the clock bumps the epoch, so a tick that
//! was already queued when the clock stopped is dropped instead of counted.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::collaborators::Collaborators;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::snapshot::TimerSnapshot;
use crate::timer::{
    Clock, ControllerOptions, Reconciler, SharedSettings, SystemTimeSource, TimeSource,
    TimerController, TimerEngine,
};

const EVENT_CAPACITY: usize = 64;

/// User-facing commands accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    Skip,
    /// The host is about to be suspended.
    Suspend,
    /// The host came back from suspension.
    Resume,
}

enum Request {
    Command {
        command: Command,
        reply: oneshot::Sender<Vec<Event>>,
    },
    Snapshot(oneshot::Sender<TimerSnapshot>),
    Shutdown(oneshot::Sender<(TimerEngine, Reconciler)>),
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Tick { epoch: u64 },
    Alarm { epoch: u64 },
}

/// [`Clock`] backed by tokio timers.
///
/// Each `start` spawns a ticker task and each `arm` a one-shot sleep; both
/// report back to the service task over a channel.
pub struct TokioClock {
    signals: mpsc::UnboundedSender<Signal>,
    tick_epoch: u64,
    ticker: Option<JoinHandle<()>>,
    alarm_epoch: u64,
    alarm: Option<JoinHandle<()>>,
}

impl TokioClock {
    fn new(signals: mpsc::UnboundedSender<Signal>) -> Self {
        Self {
            signals,
            tick_epoch: 0,
            ticker: None,
            alarm_epoch: 0,
            alarm: None,
        }
    }

    fn accepts_tick(&self, epoch: u64) -> bool {
        self.ticker.is_some() && epoch == self.tick_epoch
    }

    fn accepts_alarm(&self, epoch: u64) -> bool {
        self.alarm.is_some() && epoch == self.alarm_epoch
    }
}

impl Clock for TokioClock {
    fn start(&mut self, interval: Duration) {
        self.stop();
        let epoch = self.tick_epoch;
        let signals = self.signals.clone();
        self.ticker = Some(tokio::spawn(async move {
            // The first tick is one full interval after start.
            let mut ticks = tokio::time::interval_at(Instant::now() + interval, interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                if signals.send(Signal::Tick { epoch }).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        self.tick_epoch += 1;
    }

    fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    fn arm(&mut self, delay: Duration) {
        self.disarm();
        let epoch = self.alarm_epoch;
        let signals = self.signals.clone();
        self.alarm = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(Signal::Alarm { epoch });
        }));
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.alarm.take() {
            handle.abort();
        }
        self.alarm_epoch += 1;
    }

    fn is_armed(&self) -> bool {
        self.alarm.is_some()
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        if let Some(handle) = self.alarm.take() {
            handle.abort();
        }
    }
}

/// Builder for the background timer task.
pub struct TimerService {
    settings: SharedSettings,
    collaborators: Collaborators,
    options: ControllerOptions,
    time: Box<dyn TimeSource>,
    restore: Option<(TimerEngine, Reconciler)>,
}

impl TimerService {
    pub fn new(settings: SharedSettings, collaborators: Collaborators) -> Self {
        Self {
            settings,
            collaborators,
            options: ControllerOptions::default(),
            time: Box::new(SystemTimeSource),
            restore: None,
        }
    }

    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Box::new(time);
        self
    }

    /// Continue from a previously persisted engine.
    pub fn with_state(mut self, engine: TimerEngine, reconciler: Reconciler) -> Self {
        self.restore = Some((engine, reconciler));
        self
    }

    /// Spawn the service task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> TimerHandle {
        let (request_tx, requests) = mpsc::unbounded_channel();
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let broadcaster = events.clone();
        let worker = tokio::spawn(async move {
            let mut timer =
                TimerController::new(self.settings, TokioClock::new(signal_tx), self.collaborators)
                    .with_options(self.options)
                    .with_boxed_time_source(self.time);
            if let Some((engine, reconciler)) = self.restore {
                timer = timer.restore(engine, reconciler);
            }
            run(timer, requests, signals, broadcaster).await;
        });

        TimerHandle {
            requests: request_tx,
            events,
            _worker: std::sync::Arc::new(worker),
        }
    }
}

async fn run(
    mut timer: TimerController<TokioClock>,
    mut requests: mpsc::UnboundedReceiver<Request>,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    events: broadcast::Sender<Event>,
) {
    info!("timer service started");
    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else { break };
                match request {
                    Request::Command { command, reply } => {
                        let produced = apply(&mut timer, command);
                        for event in &produced {
                            let _ = events.send(event.clone());
                        }
                        let _ = reply.send(produced);
                    }
                    Request::Snapshot(reply) => {
                        let _ = reply.send(timer.snapshot());
                    }
                    Request::Shutdown(reply) => {
                        let _ = reply.send((timer.engine().clone(), timer.reconciler().clone()));
                        break;
                    }
                }
            }
            Some(signal) = signals.recv() => {
                for event in on_signal(&mut timer, signal) {
                    let _ = events.send(event);
                }
            }
        }
    }
    info!("timer service stopped");
}

fn on_signal(timer: &mut TimerController<TokioClock>, signal: Signal) -> Vec<Event> {
    match signal {
        Signal::Tick { epoch } if timer.clock().accepts_tick(epoch) => timer.tick(),
        Signal::Alarm { epoch } if timer.clock().accepts_alarm(epoch) => timer.on_alarm(),
        stale => {
            trace!(?stale, "dropping stale clock signal");
            Vec::new()
        }
    }
}

fn apply(timer: &mut TimerController<TokioClock>, command: Command) -> Vec<Event> {
    debug!(?command, "applying command");
    match command {
        Command::Start => timer.start(),
        Command::Pause => timer.pause(),
        Command::Reset => timer.reset(),
        Command::Skip => timer.skip(),
        Command::Suspend => {
            timer.on_suspend();
            Vec::new()
        }
        Command::Resume => timer.on_resume(),
    }
}

/// Cheap, cloneable handle to a running [`TimerService`].
///
/// Every method fails with [`CoreError::ServiceStopped`] once the service
/// task has shut down.
#[derive(Clone)]
pub struct TimerHandle {
    requests: mpsc::UnboundedSender<Request>,
    events: broadcast::Sender<Event>,
    _worker: std::sync::Arc<JoinHandle<()>>,
}

impl TimerHandle {
    /// Apply `command` and return the events it produced.
    pub async fn send(&self, command: Command) -> Result<Vec<Event>> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Command { command, reply })
            .map_err(|_| CoreError::ServiceStopped)?;
        response.await.map_err(|_| CoreError::ServiceStopped)
    }

    pub async fn start(&self) -> Result<Vec<Event>> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> Result<Vec<Event>> {
        self.send(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<Vec<Event>> {
        self.send(Command::Reset).await
    }

    pub async fn skip(&self) -> Result<Vec<Event>> {
        self.send(Command::Skip).await
    }

    pub async fn suspend(&self) -> Result<()> {
        self.send(Command::Suspend).await.map(|_| ())
    }

    pub async fn resume(&self) -> Result<Vec<Event>> {
        self.send(Command::Resume).await
    }

    pub async fn snapshot(&self) -> Result<TimerSnapshot> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Snapshot(reply))
            .map_err(|_| CoreError::ServiceStopped)?;
        response.await.map_err(|_| CoreError::ServiceStopped)
    }

    /// Stop the service and hand back the final state for persisting.
    pub async fn shutdown(&self) -> Result<(TimerEngine, Reconciler)> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Shutdown(reply))
            .map_err(|_| CoreError::ServiceStopped)?;
        response.await.map_err(|_| CoreError::ServiceStopped)
    }

    /// Every event the service produces from now on, including completions
    /// driven by the heartbeat.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::timer::{RunState, SessionType, TimerSettings};

    fn short_settings() -> SharedSettings {
        SharedSettings::new(TimerSettings {
            focus_duration: 3,
            short_break_duration: 2,
            ..TimerSettings::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_drives_completion() {
        let store = MemoryStore::new();
        let handle = TimerService::new(short_settings(), Collaborators::new(store.clone())).spawn();
        let mut events = handle.subscribe();

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.session_type, SessionType::ShortBreak);
        assert_eq!(snap.state, RunState::Idle);
        assert_eq!(store.sessions().len(), 1);

        let mut saw_completion = false;
        while let Ok(event) = events.try_recv() {
            saw_completion |= event.is_completion();
        }
        assert!(saw_completion);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_the_heartbeat() {
        let handle =
            TimerService::new(short_settings(), Collaborators::new(MemoryStore::new())).spawn();
        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.pause().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.state, RunState::Paused);
        assert_eq!(snap.remaining_secs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restarted_clock_rejects_earlier_epochs() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut clock = TokioClock::new(tx);

        clock.start(Duration::from_secs(1));
        let old = clock.tick_epoch;
        clock.stop();
        assert!(!clock.accepts_tick(old));
        clock.start(Duration::from_secs(1));
        assert!(!clock.accepts_tick(old));
        assert!(clock.accepts_tick(clock.tick_epoch));

        clock.arm(Duration::from_secs(1));
        let first = clock.alarm_epoch;
        clock.arm(Duration::from_secs(1));
        assert!(!clock.accepts_alarm(first));
        assert!(clock.accepts_alarm(clock.alarm_epoch));
        let second = clock.alarm_epoch;
        clock.disarm();
        assert!(!clock.accepts_alarm(second));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_queued_before_reset_is_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = TimerController::new(
            short_settings(),
            TokioClock::new(tx),
            Collaborators::new(MemoryStore::new()),
        );
        timer.start();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let queued = rx.try_recv().unwrap();

        timer.reset();
        assert!(on_signal(&mut timer, queued).is_empty());
        assert_eq!(timer.state(), RunState::Idle);
        assert_eq!(timer.remaining_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn alarm_from_cancelled_auto_start_is_dropped() {
        let settings = SharedSettings::new(TimerSettings {
            focus_duration: 1,
            auto_start_breaks: true,
            ..TimerSettings::default()
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer =
            TimerController::new(settings, TokioClock::new(tx), Collaborators::new(MemoryStore::new()));
        timer.start();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let tick = rx.try_recv().unwrap();
        assert!(on_signal(&mut timer, tick).iter().any(Event::is_completion));
        assert!(timer.clock().is_armed());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let alarm = rx.try_recv().unwrap();
        timer.pause();
        assert!(on_signal(&mut timer, alarm).is_empty());
        assert_eq!(timer.session_type(), SessionType::ShortBreak);
        assert_eq!(timer.state(), RunState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_fails_after_shutdown() {
        let handle =
            TimerService::new(short_settings(), Collaborators::new(MemoryStore::new())).spawn();
        let (engine, reconciler) = handle.shutdown().await.unwrap();
        assert_eq!(engine.state(), RunState::Idle);
        assert!(!reconciler.is_suspended());
        assert!(matches!(handle.start().await, Err(CoreError::ServiceStopped)));
    }
}
