use clap::Subcommand;
use pomotimer_core::{Database, Persistence, TimerSettings};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a setting value
    Get {
        /// Setting name (e.g. "focus_duration", "auto_start_breaks")
        key: String,
    },
    /// Set a setting value
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
    /// Show all settings
    Show,
    /// Reset settings to defaults
    Reset,
}

pub fn run(action: SettingsAction) -> CliResult {
    let db = Database::open()?;

    match action {
        SettingsAction::Get { key } => {
            let settings = db.load_settings()?;
            match settings.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        SettingsAction::Set { key, value } => {
            let mut settings = db.load_settings()?;
            settings.set(&key, &value)?;
            settings.validate()?;
            db.save_settings(&settings)?;
            println!("ok");
        }
        SettingsAction::Show => print_json(&db.load_settings()?)?,
        SettingsAction::Reset => {
            db.save_settings(&TimerSettings::default())?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}
