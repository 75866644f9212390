//! Commands the shell runs itself instead of spawning a process.

mod cstock;
mod good_morning;
mod highlight;
mod kdiff;
mod shortdir;

pub use cstock::Cstock;
pub use good_morning::GoodMorning;
pub use highlight::Highlight;
pub use kdiff::Kdiff;
pub use shortdir::Shortdir;

use crate::command::ExitCode;
use crate::env::Session;
use anyhow::{Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::marker::PhantomData;
use std::ops::RangeInclusive;
use tracing::debug;

/// Status returned when the argument count is out of range.
pub const STATUS_USAGE: ExitCode = 2;

/// What a builtin may touch while it runs.
///
/// Diagnostics always reach the shell's own output, even when the command's
/// standard output is redirected to a file.
pub struct BuiltinContext<'a> {
    terminal: &'a mut dyn Write,
    redirect: Option<&'a mut dyn Write>,
    pub session: &'a mut Session,
}

impl<'a> BuiltinContext<'a> {
    pub fn new(terminal: &'a mut dyn Write, session: &'a mut Session) -> Self {
        Self {
            terminal,
            redirect: None,
            session,
        }
    }

    /// Send standard output to `target` instead of the terminal.
    pub fn with_redirect(mut self, target: &'a mut dyn Write) -> Self {
        self.redirect = Some(target);
        self
    }

    /// Standard output of the command.
    pub fn out(&mut self) -> &mut dyn Write {
        match self.redirect.as_mut() {
            Some(target) => &mut **target,
            None => &mut *self.terminal,
        }
    }

    /// Print `-<sysname>: <name>: <message>` on the shell's output.
    pub fn diagnostic(&mut self, name: &str, message: impl std::fmt::Display) -> Result<()> {
        writeln!(self.terminal, "{}", self.session.diagnostic(name, message))?;
        Ok(())
    }
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed with [`argh`] and executed in-process. Before parsing,
/// the argument count is checked against [`BuiltinCommand::arity`] so each
/// command can print its own usage hint.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Name the command is invoked by.
    fn name() -> &'static str;

    /// Accepted number of arguments.
    fn arity() -> RangeInclusive<usize>;

    /// Printed when the argument count is out of range.
    fn usage() -> &'static str;

    /// Build the command from its arguments.
    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], args)
    }

    /// Validate, act, and return a shell status. Errors are reported as
    /// diagnostics by the caller and turn into status 1.
    fn execute(self, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode>;
}

/// A dispatchable builtin: `(name, args) -> status`.
pub trait Builtin {
    fn name(&self) -> &'static str;

    /// Run with `args`, not including the command name. `args.len()` is the
    /// argument count.
    fn run(&self, args: &[&str], ctx: &mut BuiltinContext<'_>) -> Result<ExitCode>;
}

/// Adapts a [`BuiltinCommand`] type to the object-safe [`Builtin`].
pub(crate) struct Factory<T> {
    _phantom: PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> Builtin for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn run(&self, args: &[&str], ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        if !T::arity().contains(&args.len()) {
            ctx.diagnostic(T::name(), T::usage())?;
            return Ok(STATUS_USAGE);
        }

        let command = match T::parse(args) {
            Ok(command) => command,
            Err(EarlyExit { output, status }) => {
                return match status {
                    Ok(()) => {
                        ctx.out().write_all(output.as_bytes())?;
                        Ok(0)
                    }
                    Err(()) => {
                        ctx.diagnostic(T::name(), output.trim_end())?;
                        Ok(1)
                    }
                };
            }
        };

        debug!(name = T::name(), argc = args.len(), "running builtin");
        match command.execute(ctx) {
            Ok(code) => Ok(code),
            Err(e) => {
                ctx.diagnostic(T::name(), format!("{e:#}"))?;
                Ok(1)
            }
        }
    }
}

/// Name to handler mapping consulted before any process is created.
pub struct Builtins {
    handlers: Vec<Box<dyn Builtin>>,
}

impl Builtins {
    pub fn new(handlers: Vec<Box<dyn Builtin>>) -> Self {
        Self { handlers }
    }

    pub fn find(&self, name: &str) -> Option<&dyn Builtin> {
        self.handlers
            .iter()
            .find(|h| h.name() == name)
            .map(|h| h.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().map(|h| h.name())
    }
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new(vec![
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Kdiff>::default()),
            Box::new(Factory::<Highlight>::default()),
            Box::new(Factory::<Cstock>::default()),
            Box::new(Factory::<GoodMorning>::default()),
            Box::new(Factory::<Shortdir>::default()),
        ])
    }
}

#[derive(FromArgs)]
/// Change the shell's working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to, absolute or relative to the current one.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn arity() -> RangeInclusive<usize> {
        0..=1
    }

    fn usage() -> &'static str {
        "too many arguments"
    }

    // The target is taken verbatim, so a directory named `-build` is a path
    // and not an unknown option.
    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            target: args.first().map(|target| target.to_string()),
        })
    }

    fn execute(self, _ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        // Without a target nothing happens.
        let Some(target) = self.target else {
            return Ok(0);
        };
        change_dir(&target)?;
        Ok(0)
    }
}

/// `chdir` reporting the bare OS error text.
pub(crate) fn change_dir(target: &str) -> Result<()> {
    nix::unistd::chdir(target).map_err(|errno| anyhow!(errno.desc()))?;
    debug!(target, "changed directory");
    Ok(())
}

#[cfg(test)]
pub(crate) fn lock_current_dir() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
pub(crate) fn run_builtin(session: &mut Session, name: &str, args: &[&str]) -> (ExitCode, String) {
    let builtins = Builtins::default();
    let handler = builtins.find(name).expect("builtin is registered");
    let mut out = Vec::new();
    let code = handler
        .run(args, &mut BuiltinContext::new(&mut out, session))
        .expect("builtin runs");
    (code, String::from_utf8(out).expect("utf-8 output"))
}
