use crate::config::Config;
use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "SEASHELL_LOG";

/// Filter from `SEASHELL_LOG` if it is set and valid, else `default_filter`.
pub fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber for `config`. Logs go to stderr without
/// colors so they do not mix escape codes into the prompt.
pub fn init(config: &Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(&config.log_filter))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install logger: {e}"))
}
