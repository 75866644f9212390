use super::{BuiltinCommand, BuiltinContext};
use crate::command::ExitCode;
use anyhow::{Context, Result, anyhow, bail};
use argh::FromArgs;
use regex::Regex;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

const INVALID: &str =
    "Please use valid inputs. Example Usage: goodMorning 07.21 /home/user/Music/alarm.mp3";
const PLAYER_ENV: &str = "export XAUTHORITY && export DISPLAY=:0";

#[derive(FromArgs)]
/// Schedule an alarm that plays a music file through rhythmbox.
pub struct GoodMorning {
    #[argh(positional)]
    /// time of day as HH.MM, e.g. 07.21.
    pub time: String,

    #[argh(positional)]
    /// music file to play.
    pub file: String,
}

/// Minute of the day the alarm fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmTime {
    pub hour: u32,
    pub minute: u32,
}

impl AlarmTime {
    /// Parse `HH.MM` with hour below 24 and minute below 60.
    pub fn parse(s: &str) -> Option<Self> {
        let re = Regex::new(r"^[0-9][0-9][.][0-9][0-9]$").ok()?;
        if !re.is_match(s) {
            return None;
        }
        let (hour, minute) = s.split_once('.')?;
        let time = Self {
            hour: hour.parse().ok()?,
            minute: minute.parse().ok()?,
        };
        (time.hour < 24 && time.minute < 60).then_some(time)
    }

    /// One minute later, wrapping past midnight.
    pub fn next_minute(self) -> Self {
        if self.minute == 59 {
            Self {
                hour: (self.hour + 1) % 24,
                minute: 0,
            }
        } else {
            Self {
                hour: self.hour,
                minute: self.minute + 1,
            }
        }
    }
}

/// Crontab that starts the player, then stops it and removes itself a
/// minute later.
pub fn crontab(time: AlarmTime, file: &Path) -> String {
    let stop = time.next_minute();
    format!(
        "{} {} * * * {PLAYER_ENV} && rhythmbox-client {} --play\n\
         {} {} * * * {PLAYER_ENV} && rhythmbox-client --exit\n\
         {} {} * * * crontab -r\n",
        time.minute,
        time.hour,
        file.display(),
        stop.minute,
        stop.hour,
        stop.minute,
        stop.hour
    )
}

impl BuiltinCommand for GoodMorning {
    fn name() -> &'static str {
        "goodMorning"
    }

    fn arity() -> RangeInclusive<usize> {
        2..=2
    }

    fn usage() -> &'static str {
        "Please use exactly 2 parameters as an input."
    }

    fn execute(self, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        let Some(time) = AlarmTime::parse(&self.time) else {
            bail!(INVALID);
        };
        // cron runs from the home directory, so the file is made absolute.
        let Ok(file) = fs::canonicalize(&self.file) else {
            bail!(INVALID);
        };

        let crontab_bin = ctx
            .session
            .resolver()
            .resolve("crontab")
            .ok_or_else(|| anyhow!("crontab: command not found"))?;

        let table =
            std::env::temp_dir().join(format!("seashell-crontab-{}.txt", std::process::id()));
        fs::write(&table, crontab(time, &file))
            .with_context(|| format!("{}: write failed", table.display()))?;
        debug!(table = %table.display(), ?time, "installing alarm");

        let status = Command::new(&crontab_bin)
            .arg(&table)
            .envs(ctx.session.overrides())
            .status();
        if let Err(e) = fs::remove_file(&table) {
            warn!(table = %table.display(), error = %e, "failed to remove crontab file");
        }
        let status = status.context("failed to run crontab")?;
        if !status.success() {
            bail!("crontab failed: {status}");
        }

        writeln!(ctx.out(), "SUCCESS: Your alarm has been set.")?;
        Ok(0)
    }
}
