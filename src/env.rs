use crate::command::ExitCode;
use crate::config::Config;
use crate::external::PathResolver;
use crate::process::JobTable;
use crate::reader::LineHistory;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable state of one interactive shell session.
///
/// Everything the read-eval loop would otherwise keep in globals lives here:
/// the history slot, the background job table, variable overrides and the
/// status of the last foreground command. The working directory is the
/// process's own and is queried fresh on every access.
#[derive(Debug)]
pub struct Session {
    config: Config,
    /// Variables overriding the process environment, passed on to children.
    vars: HashMap<String, String>,
    pub history: LineHistory,
    pub jobs: JobTable,
    pub last_status: ExitCode,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            vars: HashMap::new(),
            history: LineHistory::default(),
            jobs: JobTable::default(),
            last_status: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Display name used in the prompt and diagnostics.
    pub fn sysname(&self) -> &str {
        &self.config.sysname
    }

    /// Get the value of a variable.
    ///
    /// Looks up the overrides first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override a variable for this session and its children.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Overrides to apply to spawned processes.
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn current_dir(&self) -> PathBuf {
        stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Resolver over the current directory and `PATH` as they are right now.
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(self.current_dir(), self.get_var("PATH").unwrap_or_default())
    }

    /// Format a diagnostic line: `-<sysname>: <command>: <message>`.
    pub fn diagnostic(&self, command: &str, message: impl std::fmt::Display) -> String {
        format!("-{}: {}: {}", self.sysname(), command, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_set_and_get_var() {
        let mut session = Session::new(Config::default());

        // initially absent
        assert_eq!(session.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        session.set_var("SOME_RANDOM_ENV_VAR_12345", "VALUE");

        assert_eq!(
            session.get_var("SOME_RANDOM_ENV_VAR_12345"),
            Some("VALUE".to_string())
        );
        assert_eq!(session.overrides().count(), 1);
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let session = Session::new(Config::default());
        assert!(session.get_var("PATH").is_some());
    }

    #[test]
    fn diagnostics_carry_shell_and_command_name() {
        let session = Session::new(Config {
            sysname: "sea".to_string(),
            ..Config::default()
        });
        assert_eq!(
            session.diagnostic("echo", "command not found"),
            "-sea: echo: command not found"
        );
    }

    #[test]
    fn resolver_follows_overridden_path() {
        let mut session = Session::new(Config::default());
        session.set_var("PATH", "/first:/second");
        let candidates = session.resolver().candidates("tool");
        assert_eq!(candidates[1], PathBuf::from("/first/tool"));
        assert_eq!(candidates[2], PathBuf::from("/second/tool"));
    }
}
