use clap::{CommandFactory, Parser, Subcommand};
use pomotimer_core::Config;
use tracing::debug;

mod adapters;
mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "pomotimer", version, about = "Pomodoro session timer")]
pub(crate) struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Session statistics
    Stats(commands::stats::StatsArgs),
    /// Timer settings (durations, auto-start, feedback)
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Host configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    logging::init(cli.verbose, &config);
    debug!(verbose = cli.verbose, "pomotimer started");

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action, &config).await,
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "pomotimer", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
