use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use pomotimer_core::{
    Clock, Collaborators, Command, Config, Database, Event, ManualClock, MemoryStore,
    Persistence, Reconciler, SharedSettings, TimerController, TimerEngine, TimerService,
    TimerSettings,
};

use super::{print_json, CliResult};
use crate::adapters::{FileSnapshotPublisher, LogNotifier, TerminalFeedback};

const STATE_KEY: &str = "timer_state";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current session
    Start,
    /// Pause the running session
    Pause,
    /// Restart the current session from its full duration
    Reset,
    /// Abandon the current session and move to the next one
    Skip,
    /// Print current timer state as JSON
    Status,
    /// Run in the foreground, reading commands from stdin
    Run {
        /// Keep sessions in memory and leave the stored timer untouched
        #[arg(long)]
        ephemeral: bool,
    },
}

/// Timer state carried between invocations.
#[derive(Serialize, Deserialize)]
struct StoredTimer {
    engine: TimerEngine,
    #[serde(default)]
    reconciler: Reconciler,
}

fn load_state(db: &Database, settings: &TimerSettings) -> (TimerEngine, Reconciler) {
    match db.kv_get(STATE_KEY) {
        Ok(Some(json)) => match serde_json::from_str::<StoredTimer>(&json) {
            Ok(stored) => return (stored.engine, stored.reconciler),
            Err(e) => warn!(error = %e, "discarding unreadable timer state"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to read timer state"),
    }
    (TimerEngine::new(settings), Reconciler::new())
}

fn save_state(db: &Database, engine: &TimerEngine, reconciler: &Reconciler) -> CliResult {
    let stored = StoredTimer {
        engine: engine.clone(),
        reconciler: reconciler.clone(),
    };
    db.kv_set(STATE_KEY, &serde_json::to_string(&stored)?)?;
    Ok(())
}

fn collaborators(persistence: impl Persistence + 'static, config: &Config) -> CliResult<Collaborators> {
    let mut collaborators = Collaborators::new(persistence)
        .with_notifier(LogNotifier)
        .with_feedback(TerminalFeedback);
    if config.snapshot.enabled {
        collaborators =
            collaborators.with_snapshots(FileSnapshotPublisher::new(config.snapshot_path()?));
    }
    Ok(collaborators)
}

pub async fn run(action: TimerAction, config: &Config) -> CliResult {
    match action {
        TimerAction::Start => run_once(config, |timer| timer.start()),
        TimerAction::Pause => run_once(config, |timer| timer.pause()),
        TimerAction::Reset => run_once(config, |timer| timer.reset()),
        TimerAction::Skip => run_once(config, |timer| timer.skip()),
        TimerAction::Status => run_once(config, |_| Vec::new()),
        TimerAction::Run { ephemeral } => run_foreground(ephemeral, config).await,
    }
}

/// One command against the stored timer.
///
/// The time since the previous invocation is reconciled first, as if the
/// process had been suspended in between. A pending auto-start fires right
/// away since nothing would be around to deliver it later.
fn run_once(
    config: &Config,
    command: impl FnOnce(&mut TimerController<ManualClock>) -> Vec<Event>,
) -> CliResult {
    let db = Database::open()?;
    let settings = db.load_settings()?;
    let (engine, reconciler) = load_state(&db, &settings);

    let mut timer = TimerController::new(
        SharedSettings::new(settings),
        ManualClock::new(),
        collaborators(Database::open()?, config)?,
    )
    .with_options(config.controller_options())
    .restore(engine, reconciler);

    let mut events = timer.on_resume();
    events.extend(command(&mut timer));
    if timer.clock().is_armed() {
        events.extend(timer.on_alarm());
    }
    timer.on_suspend();
    save_state(&db, timer.engine(), timer.reconciler())?;

    print_json(&serde_json::json!({
        "events": events,
        "snapshot": timer.snapshot(),
    }))
}

fn parse_command(line: &str) -> Option<Command> {
    match line {
        "start" => Some(Command::Start),
        "pause" => Some(Command::Pause),
        "reset" => Some(Command::Reset),
        "skip" => Some(Command::Skip),
        "suspend" => Some(Command::Suspend),
        "resume" => Some(Command::Resume),
        _ => None,
    }
}

/// Foreground mode: a real heartbeat, commands from stdin and one JSON
/// event per line on stdout.
async fn run_foreground(ephemeral: bool, config: &Config) -> CliResult {
    let (settings, collaborators, stored, db) = if ephemeral {
        (
            TimerSettings::default(),
            collaborators(MemoryStore::new(), config)?,
            None,
            None,
        )
    } else {
        let db = Database::open()?;
        let settings = db.load_settings()?;
        let stored = load_state(&db, &settings);
        (
            settings,
            collaborators(Database::open()?, config)?,
            Some(stored),
            Some(db),
        )
    };

    let mut service = TimerService::new(SharedSettings::new(settings), collaborators)
        .with_options(config.controller_options());
    if let Some((engine, reconciler)) = stored {
        service = service.with_state(engine, reconciler);
    }
    let handle = service.spawn();

    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!(error = %e, "failed to serialize event"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    handle.resume().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "status" => {
                let snapshot = handle.snapshot().await?;
                println!("{}", serde_json::to_string(&Event::StateSnapshot(snapshot))?);
            }
            other => match parse_command(other) {
                Some(command) => {
                    handle.send(command).await?;
                }
                None => eprintln!("unknown command: {other}"),
            },
        }
    }

    handle.suspend().await?;
    let (engine, reconciler) = handle.shutdown().await?;
    if let Some(db) = db {
        save_state(&db, &engine, &reconciler)?;
    }
    debug!("foreground timer stopped");

    drop(handle);
    let _ = printer.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_commands() {
        assert_eq!(parse_command("start"), Some(Command::Start));
        assert_eq!(parse_command("suspend"), Some(Command::Suspend));
        assert_eq!(parse_command("status"), None);
        assert_eq!(parse_command("Start"), None);
    }

    #[test]
    fn stored_timer_roundtrip_through_kv() {
        let db = Database::open_in_memory().unwrap();
        let settings = TimerSettings::default();
        let (mut engine, mut reconciler) = load_state(&db, &settings);
        assert_eq!(engine, TimerEngine::new(&settings));

        engine.start();
        engine.elapse(100);
        reconciler.suspend(chrono::Utc::now());
        save_state(&db, &engine, &reconciler).unwrap();

        let (loaded, loaded_reconciler) = load_state(&db, &settings);
        assert_eq!(loaded, engine);
        assert_eq!(loaded_reconciler, reconciler);
    }

    #[test]
    fn unreadable_state_starts_fresh() {
        let db = Database::open_in_memory().unwrap();
        db.kv_set(STATE_KEY, "{not json").unwrap();
        let (engine, reconciler) = load_state(&db, &TimerSettings::default());
        assert_eq!(engine.remaining_secs(), 1500);
        assert!(!reconciler.is_suspended());
    }
}
