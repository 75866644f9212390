use crate::builtin::{Builtin, BuiltinContext, Builtins};
use crate::command::{Command, ExitSignal, Pipeline};
use crate::config::Config;
use crate::env::Session;
use crate::parser::parse;
use crate::process::{self, execute_external};
use crate::prompt;
use crate::reader::{LineReader, LineResult};
use anyhow::Result;
use std::fs::File;
use std::io::{self, Read, Write};
use tracing::{debug, info};

/// The read-eval loop.
///
/// Each cycle reaps finished background jobs, prints the prompt, reads one
/// line, parses it and dispatches it: reserved names and builtins run
/// in-process, everything else goes to the process orchestrator.
///
/// Example
/// ```no_run
/// use seashell::{Config, Interpreter};
/// let mut sh = Interpreter::new(Config::default());
/// sh.repl().unwrap();
/// ```
pub struct Interpreter {
    session: Session,
    builtins: Builtins,
    out: Box<dyn Write>,
}

impl Interpreter {
    /// Interpreter writing prompts, echo and diagnostics to standard output.
    pub fn new(config: Config) -> Self {
        Self::with_output(config, Box::new(io::stdout()))
    }

    pub fn with_output(config: Config, out: Box<dyn Write>) -> Self {
        Self {
            session: Session::new(config),
            builtins: Builtins::default(),
            out,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run interactively on the terminal until `exit` or Ctrl-D.
    pub fn repl(&mut self) -> Result<()> {
        let mut reader = LineReader::stdin();
        self.run(&mut reader)
    }

    /// Run the loop over any line source until it asks the shell to stop.
    pub fn run<R: Read>(&mut self, reader: &mut LineReader<R>) -> Result<()> {
        info!(sysname = self.session.sysname(), "session started");
        loop {
            self.session.jobs.reap();
            write!(self.out, "{}", prompt::render(&self.session))?;
            let line = reader.read_line(&self.session.history, &mut *self.out)?;
            if self.step(line)? == ExitSignal::ShellExit {
                writeln!(self.out)?;
                break;
            }
        }
        self.out.flush()?;
        info!(jobs = self.session.jobs.len(), "session finished");
        Ok(())
    }

    /// One read-eval cycle on an already-read line. Only `ShellExit` and
    /// `Continue` come out of here.
    pub fn step(&mut self, line: LineResult) -> io::Result<ExitSignal> {
        let text = match line {
            LineResult::EndOfInput => return Ok(ExitSignal::ShellExit),
            LineResult::Completed(text) => text,
        };
        self.session.history.remember(&text);

        let pipeline = parse(&text);
        debug!(?pipeline, "parsed");
        Ok(match self.execute(&pipeline)? {
            ExitSignal::ShellExit => ExitSignal::ShellExit,
            ExitSignal::Continue | ExitSignal::CommandNotFound | ExitSignal::BuiltinHandled => {
                ExitSignal::Continue
            }
        })
    }

    /// Dispatch a parsed line.
    pub fn execute(&mut self, pipeline: &Pipeline) -> io::Result<ExitSignal> {
        if pipeline.is_empty() {
            return Ok(ExitSignal::Continue);
        }
        if pipeline.auto_complete_requested() {
            debug!(name = %pipeline.head.name, "auto-complete requested, not executing");
            return Ok(ExitSignal::Continue);
        }

        let head = &pipeline.head;
        if head.name == "exit" {
            return Ok(ExitSignal::ShellExit);
        }
        if let Some(builtin) = self.builtins.find(&head.name) {
            if head.next.is_some() {
                writeln!(
                    self.out,
                    "{}",
                    self.session.diagnostic(&head.name, "builtins cannot be used in a pipeline")
                )?;
                return Ok(ExitSignal::BuiltinHandled);
            }
            run_builtin(builtin, head, &mut self.session, &mut *self.out)?;
            return Ok(ExitSignal::BuiltinHandled);
        }

        execute_external(pipeline, &mut self.session, &mut *self.out)
    }
}

/// Run a builtin in-process, honouring its stdout redirect.
fn run_builtin(
    builtin: &dyn Builtin,
    command: &Command,
    session: &mut Session,
    out: &mut dyn Write,
) -> io::Result<()> {
    let mut redirected: Option<File> = None;
    if let Some(target) = &command.redirects.output {
        match process::open_output(target) {
            Ok(file) => redirected = Some(file),
            Err(e) => {
                writeln!(out, "{}", session.diagnostic(&command.name, e))?;
                session.last_status = 1;
                return Ok(());
            }
        }
    }
    if command.redirects.input.is_some() {
        debug!(name = %command.name, "builtins do not read standard input, ignoring redirect");
    }

    let args: Vec<&str> = command.arguments.iter().map(String::as_str).collect();
    let mut ctx = BuiltinContext::new(&mut *out, &mut *session);
    if let Some(file) = redirected.as_mut() {
        ctx = ctx.with_redirect(file);
    }
    let result = builtin.run(&args, &mut ctx);
    match result {
        Ok(code) => session.last_status = code,
        Err(e) => {
            writeln!(out, "{}", session.diagnostic(&command.name, format!("{e:#}")))?;
            session.last_status = 1;
        }
    }
    out.flush()
}
