use super::{BuiltinCommand, BuiltinContext};
use crate::command::ExitCode;
use crate::process::exit_code;
use anyhow::{Context, Result, anyhow, bail};
use argh::FromArgs;
use std::io;
use std::ops::RangeInclusive;
use std::process::{Command, Stdio};
use tracing::debug;

const BASE_URL: &str = "rate.sx/";
const MAX_DAYS: u32 = 90;

#[derive(FromArgs)]
/// Show crypto currency prices from rate.sx.
///
/// Graph mode: cstock <currency> [<days>], e.g. `cstock eth 4` for the last
/// four days of ethereum. Table mode: cstock -a.
pub struct Cstock {
    #[argh(switch, short = 'a')]
    /// show the table of available currencies.
    pub table: bool,

    #[argh(positional)]
    /// currency to graph, e.g. btc or eth, optionally followed by the number
    /// of days to graph, 1 to 90.
    pub args: Vec<String>,
}

impl Cstock {
    /// The rate.sx address for these arguments.
    pub fn url(&self) -> Result<String> {
        match (self.table, self.args.as_slice()) {
            (true, []) => Ok(BASE_URL.to_string()),
            (false, [currency]) => Ok(format!("{BASE_URL}{currency}")),
            (false, [currency, days]) => {
                let days = parse_days(days)?;
                Ok(format!("{BASE_URL}{currency}@{days}d"))
            }
            _ => bail!(
                "Missing, too many, or invalid parameter. Try 'cstock --help' for more options."
            ),
        }
    }
}

fn parse_days(days: &str) -> Result<u32> {
    if days.is_empty() || !days.bytes().all(|b| b.is_ascii_digit()) {
        bail!("Please use positive number input to the second parameter. Range: [1-{MAX_DAYS}]");
    }
    match days.parse::<u32>() {
        Ok(n) if (1..=MAX_DAYS).contains(&n) => Ok(n),
        _ => bail!("Your day parameter should be in range [1-{MAX_DAYS}]. Please try again."),
    }
}

impl BuiltinCommand for Cstock {
    fn name() -> &'static str {
        "cstock"
    }

    fn arity() -> RangeInclusive<usize> {
        1..=2
    }

    fn usage() -> &'static str {
        "Missing or too many parameters. Try 'cstock --help' for more options."
    }

    fn execute(self, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        let url = self.url()?;
        let curl = ctx
            .session
            .resolver()
            .resolve("curl")
            .ok_or_else(|| anyhow!("curl: command not found"))?;
        debug!(%url, curl = %curl.display(), "fetching rates");

        let mut child = Command::new(&curl)
            .arg(&url)
            .envs(ctx.session.overrides())
            .stdout(Stdio::piped())
            .spawn()
            .context("failed to start curl")?;
        if let Some(mut stdout) = child.stdout.take() {
            io::copy(&mut stdout, ctx.out())?;
        }
        let status = child.wait().context("failed to wait for curl")?;
        Ok(exit_code(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{STATUS_USAGE, run_builtin};
    use crate::config::Config;
    use crate::env::Session;

    fn cstock(table: bool, args: &[&str]) -> Cstock {
        Cstock {
            table,
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    #[test]
    fn urls_for_each_mode() {
        assert_eq!(cstock(true, &[]).url().unwrap(), "rate.sx/");
        assert_eq!(cstock(false, &["eth"]).url().unwrap(), "rate.sx/eth");
        assert_eq!(cstock(false, &["btc", "30"]).url().unwrap(), "rate.sx/btc@30d");
    }

    #[test]
    fn days_must_be_in_range() {
        assert!(cstock(false, &["eth", "0"]).url().is_err());
        assert!(cstock(false, &["eth", "91"]).url().is_err());
        assert!(cstock(false, &["eth", "+5"]).url().is_err());
        assert!(cstock(false, &["eth", "-5"]).url().is_err());
        assert!(cstock(false, &["eth", "90"]).url().is_ok());
    }

    #[test]
    fn table_mode_takes_no_currency() {
        assert!(cstock(true, &["eth"]).url().is_err());
        assert!(cstock(false, &[]).url().is_err());
        assert!(cstock(false, &["eth", "4", "5"]).url().is_err());
    }

    #[test]
    fn currency_and_days_are_parsed_from_the_command_line() {
        let command = Cstock::from_args(&["cstock"], &["btc", "30"]).unwrap();
        assert_eq!(command.url().unwrap(), "rate.sx/btc@30d");
        let command = Cstock::from_args(&["cstock"], &["-a"]).unwrap();
        assert_eq!(command.url().unwrap(), "rate.sx/");
    }

    #[test]
    fn rejects_bad_days_before_fetching() {
        let mut session = Session::new(Config::default());
        let (code, out) = run_builtin(&mut session, "cstock", &["eth", "100"]);
        assert_eq!(code, 1);
        assert_eq!(
            out,
            "-seashell: cstock: Your day parameter should be in range [1-90]. Please try again.\n"
        );
    }

    #[test]
    fn help_is_printed() {
        let mut session = Session::new(Config::default());
        let (code, out) = run_builtin(&mut session, "cstock", &["--help"]);
        assert_eq!(code, 0);
        assert!(out.starts_with("Usage: cstock"));
    }

    #[test]
    fn needs_at_least_one_argument() {
        let mut session = Session::new(Config::default());
        let (code, _) = run_builtin(&mut session, "cstock", &[]);
        assert_eq!(code, STATUS_USAGE);
    }
}
