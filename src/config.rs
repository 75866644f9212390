use std::path::PathBuf;

/// Name shown in the prompt and used to prefix diagnostics.
pub const DEFAULT_SYSNAME: &str = "seashell";

/// Filter used when neither `SEASHELL_LOG` nor `--log` is given.
pub const DEFAULT_LOG_FILTER: &str = "warn";

const SHORTDIR_FILE_NAME: &str = ".seashell_shortdirs";

/// Runtime settings of one shell instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Display name of the shell.
    pub sysname: String,
    /// Where `shortdir` keeps its bookmarks.
    pub shortdir_file: PathBuf,
    /// `tracing` filter directive.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sysname: DEFAULT_SYSNAME.to_string(),
            shortdir_file: default_shortdir_file(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// `$HOME/.seashell_shortdirs`, or the bare file name when `HOME` is unset.
pub fn default_shortdir_file() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(SHORTDIR_FILE_NAME),
        _ => PathBuf::from(SHORTDIR_FILE_NAME),
    }
}
