use chrono::Local;
use clap::{Args, Subcommand};
use pomotimer_core::{Database, Period, Statistics, StreakStatistics};

use super::{print_json, CliResult};

#[derive(Args)]
pub struct StatsArgs {
    #[command(subcommand)]
    action: Option<StatsAction>,

    /// Period to summarize: today, week, month or all
    #[arg(long, default_value = "today")]
    period: Period,
}

#[derive(Subcommand)]
pub enum StatsAction {
    /// Current and longest day streaks
    Streak,
    /// Most recent sessions, newest first
    Sessions {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

pub fn run(args: StatsArgs) -> CliResult {
    let db = Database::open()?;
    let now = Local::now();

    match args.action {
        None => {
            let sessions = db.sessions()?;
            print_json(&Statistics::compute(&sessions, args.period, &now))
        }
        Some(StatsAction::Streak) => {
            let sessions = db.sessions()?;
            print_json(&StreakStatistics::compute(&sessions, &now))
        }
        Some(StatsAction::Sessions { limit }) => print_json(&db.recent_sessions(limit)?),
    }
}
