use pomotimer_core::Config;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so stdout stays JSON.
///
/// `RUST_LOG` wins over everything; otherwise `-v` flags raise the level
/// configured under `[log]`.
pub fn init(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => config.log.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_line_number(verbose >= 3)
        .init();
}
