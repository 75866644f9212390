//! The in-memory representation of one parsed command line.
//!
//! A line parses into a [`Pipeline`]: a head [`Command`] owning an optional
//! chain of further stages through [`Command::next`]. The chain lives only as
//! long as the line it came from.

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Control signal produced by executing one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    /// Keep looping.
    Continue,
    /// Terminate the shell.
    ShellExit,
    /// A stage could not be resolved to an executable; a diagnostic was printed.
    CommandNotFound,
    /// A builtin ran in-process.
    BuiltinHandled,
}

/// One of the three redirect slots a command carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `<path`: standard input is read from `path`.
    Input,
    /// `>path`: standard output truncates or creates `path`.
    Output,
    /// `>>path`: standard output appends to `path`.
    Append,
}

/// Target of a standard output redirect. Only one can be active per command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRedirect {
    Truncate(String),
    Append(String),
}

/// File-path overrides for a single command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirects {
    pub input: Option<String>,
    pub output: Option<OutputRedirect>,
}

impl Redirects {
    /// Fill a slot. The two stdout slots are exclusive; the latest one wins.
    pub fn set(&mut self, kind: RedirectKind, target: String) {
        match kind {
            RedirectKind::Input => self.input = Some(target),
            RedirectKind::Output => self.output = Some(OutputRedirect::Truncate(target)),
            RedirectKind::Append => self.output = Some(OutputRedirect::Append(target)),
        }
    }

    /// Read a slot.
    pub fn get(&self, kind: RedirectKind) -> Option<&str> {
        match (kind, &self.output) {
            (RedirectKind::Input, _) => self.input.as_deref(),
            (RedirectKind::Output, Some(OutputRedirect::Truncate(p))) => Some(p),
            (RedirectKind::Append, Some(OutputRedirect::Append(p))) => Some(p),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

/// One pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Executable or builtin identifier. Empty means "no-op line".
    pub name: String,
    /// Quote-stripped arguments, not including `name`.
    pub arguments: Vec<String>,
    /// The line ended with `&`.
    pub background: bool,
    /// The line ended with `?` or was terminated with Tab.
    pub auto_complete_requested: bool,
    pub redirects: Redirects,
    /// The stage receiving this command's standard output.
    pub next: Option<Box<Command>>,
}

impl Command {
    /// Number of plain arguments, not counting `name`.
    pub fn arg_count(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// The head of a command chain. Owns every stage exclusively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub head: Command,
}

impl Pipeline {
    /// The sentinel produced by an effectively empty line.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_empty()
    }

    pub fn is_background(&self) -> bool {
        self.head.background
    }

    pub fn auto_complete_requested(&self) -> bool {
        self.head.auto_complete_requested
    }

    /// Iterate stages from left to right.
    pub fn stages(&self) -> Stages<'_> {
        Stages {
            current: Some(&self.head),
        }
    }

    pub fn len(&self) -> usize {
        self.stages().count()
    }
}

/// Iterator over the stages of a [`Pipeline`].
pub struct Stages<'a> {
    current: Option<&'a Command>,
}

impl<'a> Iterator for Stages<'a> {
    type Item = &'a Command;

    fn next(&mut self) -> Option<Self::Item> {
        let command = self.current?;
        self.current = command.next.as_deref();
        Some(command)
    }
}
