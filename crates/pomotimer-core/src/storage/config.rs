//! TOML-based application configuration.
//!
//! Stores host-level knobs:
//! - Clock cadence and the auto-start delay
//! - Log level
//! - Where the shared-state snapshot is written
//!
//! Timer settings (durations, auto-start, feedback toggles) are not here;
//! they live with the session history behind [`Persistence`].
//!
//! Configuration is stored at `<data dir>/config.toml`.
//!
//! [`Persistence`]: crate::collaborators::Persistence

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{data_dir, keypath};
use crate::error::{ConfigError, CoreError};
use crate::timer::{ControllerOptions, AUTO_START_DELAY, SNAPSHOT_EVERY_TICKS, TICK_INTERVAL};

/// Clock configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_auto_start_delay_ms")]
    pub auto_start_delay_ms: u64,
    #[serde(default = "default_snapshot_every_ticks")]
    pub snapshot_every_ticks: u32,
}

/// Logging configuration. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Shared-state snapshot output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// File name, relative to the data directory unless absolute.
    #[serde(default = "default_snapshot_file")]
    pub file: String,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

// Default functions
fn default_tick_interval_ms() -> u64 {
    TICK_INTERVAL.as_millis() as u64
}
fn default_auto_start_delay_ms() -> u64 {
    AUTO_START_DELAY.as_millis() as u64
}
fn default_snapshot_every_ticks() -> u32 {
    SNAPSHOT_EVERY_TICKS
}
fn default_log_level() -> String {
    "warn".into()
}
fn default_true() -> bool {
    true
}
fn default_snapshot_file() -> String {
    "snapshot.json".into()
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            auto_start_delay_ms: default_auto_start_delay_ms(),
            snapshot_every_ticks: default_snapshot_every_ticks(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: default_snapshot_file(),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults when the file is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load from disk, returning default on error.
    ///
    /// Runs before logging is set up, so a broken file is reported on
    /// stderr directly.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            eprintln!("warning: {e}; using default config");
            Self::default()
        })
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        keypath::get(self, key)
    }

    /// Set a config value by dot-separated key. Does not save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value has the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        *self = keypath::set(self, key, value)?;
        Ok(())
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            tick_interval: Duration::from_millis(self.clock.tick_interval_ms.max(1)),
            auto_start_delay: Duration::from_millis(self.clock.auto_start_delay_ms),
            snapshot_every_ticks: self.clock.snapshot_every_ticks,
        }
    }

    /// Absolute path of the snapshot file.
    pub fn snapshot_path(&self) -> Result<PathBuf, ConfigError> {
        let file = Path::new(&self.snapshot.file);
        if file.is_absolute() {
            Ok(file.to_path_buf())
        } else {
            Ok(data_dir()?.join(file))
        }
    }
}
