//! Launching pipelines as OS processes.
//!
//! A [`Pipeline`] is first turned into a [`SpawnPlan`] saying where each
//! stage reads from and writes to. Pipes are wired first and redirects are
//! applied on top, so an explicit redirect on an interior stage replaces that
//! stage's pipe end. All stages are spawned before anything is awaited.

use crate::command::{Command, ExitCode, ExitSignal, OutputRedirect, Pipeline};
use crate::env::Session;
use crate::external::{PathResolver, is_exec_failure};
use nix::fcntl::OFlag;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::os::unix::process::CommandExt;
use std::process::{self, Child, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Status recorded when a stage never ran because it was not found.
pub const STATUS_NOT_FOUND: ExitCode = 127;
/// Status recorded when a stage could not be started.
pub const STATUS_NOT_STARTED: ExitCode = 126;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to create pipe: {0}")]
    Pipe(#[from] nix::Error),
    #[error("{path}: {source}")]
    Redirect { path: String, source: io::Error },
    #[error("command not found")]
    NotFound,
    #[error("{0}")]
    Spawn(io::Error),
    #[error("wait failed: {0}")]
    Wait(io::Error),
}

/// Where a stage's standard input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Inherit,
    Pipe(usize),
    File(String),
}

/// Where a stage's standard output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Inherit,
    Pipe(usize),
    Truncate(String),
    Append(String),
}

#[derive(Debug)]
pub struct StagePlan<'a> {
    pub command: &'a Command,
    pub stdin: Source,
    pub stdout: Sink,
}

/// Wiring for every stage of a pipeline. Pipe `k` connects stage `k` to
/// stage `k + 1`.
#[derive(Debug)]
pub struct SpawnPlan<'a> {
    pub stages: Vec<StagePlan<'a>>,
    pub pipes: usize,
    pub background: bool,
}

pub fn plan(pipeline: &Pipeline) -> SpawnPlan<'_> {
    let commands: Vec<&Command> = pipeline.stages().collect();
    let count = commands.len();

    let stages = commands
        .into_iter()
        .enumerate()
        .map(|(k, command)| {
            let mut stdin = if k == 0 { Source::Inherit } else { Source::Pipe(k - 1) };
            let mut stdout = if k + 1 == count { Sink::Inherit } else { Sink::Pipe(k) };

            if let Some(path) = &command.redirects.input {
                stdin = Source::File(path.clone());
            }
            match &command.redirects.output {
                Some(OutputRedirect::Truncate(path)) => stdout = Sink::Truncate(path.clone()),
                Some(OutputRedirect::Append(path)) => stdout = Sink::Append(path.clone()),
                None => {}
            }
            StagePlan { command, stdin, stdout }
        })
        .collect();

    SpawnPlan {
        stages,
        pipes: count.saturating_sub(1),
        background: pipeline.is_background(),
    }
}

/// A running process belonging to one pipeline stage.
#[derive(Debug)]
pub struct Spawned {
    pub stage: usize,
    pub name: String,
    pub child: Child,
}

/// A stage that did not start.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: usize,
    pub name: String,
    pub error: ExecError,
}

/// Result of spawning a plan.
#[derive(Debug, Default)]
pub struct Launch {
    pub spawned: Vec<Spawned>,
    pub failures: Vec<StageFailure>,
}

/// What a child needs from the session to be started.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub resolver: PathResolver,
    pub vars: Vec<(String, String)>,
}

impl LaunchContext {
    pub fn from_session(session: &Session) -> Self {
        Self {
            resolver: session.resolver(),
            vars: session
                .overrides()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Create the pipes and spawn every stage, left to right.
///
/// A stage that fails (not found, redirect target unavailable, spawn error)
/// is recorded in [`Launch::failures`] and the others still run. Only a
/// failure to create the pipes aborts the whole launch.
pub fn launch(plan: &SpawnPlan<'_>, ctx: &LaunchContext) -> Result<Launch, ExecError> {
    let mut pipes: Vec<(Option<OwnedFd>, Option<OwnedFd>)> = Vec::with_capacity(plan.pipes);
    for _ in 0..plan.pipes {
        let (read, write) = nix::unistd::pipe2(OFlag::O_CLOEXEC)?;
        pipes.push((Some(read), Some(write)));
    }
    debug!(stages = plan.stages.len(), pipes = plan.pipes, "launching pipeline");

    let mut launch = Launch::default();
    for (index, stage) in plan.stages.iter().enumerate() {
        // Take this stage's pipe ends first, so ends replaced by a redirect
        // are dropped here and the neighbour sees EOF or EPIPE.
        let stdin_pipe = match &stage.stdin {
            Source::Pipe(k) => pipes[*k].0.take(),
            _ => None,
        };
        let stdout_pipe = match &stage.stdout {
            Sink::Pipe(k) => pipes[*k].1.take(),
            _ => None,
        };
        if let Some(k) = index.checked_sub(1).filter(|k| *k < pipes.len()) {
            pipes[k].0.take();
        }
        if index < pipes.len() {
            pipes[index].1.take();
        }

        let result = open_ends(stage, stdin_pipe, stdout_pipe).and_then(|(stdin, stdout)| {
            spawn_stage(stage.command, stdin.as_ref(), stdout.as_ref(), ctx)
        });
        match result {
            Ok(child) => {
                info!(stage = index, name = %stage.command.name, pid = child.id(), "spawned");
                launch.spawned.push(Spawned {
                    stage: index,
                    name: stage.command.name.clone(),
                    child,
                });
            }
            Err(error) => {
                debug!(stage = index, name = %stage.command.name, %error, "stage not started");
                launch.failures.push(StageFailure {
                    stage: index,
                    name: stage.command.name.clone(),
                    error,
                });
            }
        }
    }
    Ok(launch)
}

/// Resolve a stage's standard streams to descriptors. `None` means inherit.
fn open_ends(
    stage: &StagePlan<'_>,
    stdin_pipe: Option<OwnedFd>,
    stdout_pipe: Option<OwnedFd>,
) -> Result<(Option<OwnedFd>, Option<OwnedFd>), ExecError> {
    let stdin = match &stage.stdin {
        Source::Inherit => None,
        Source::Pipe(_) => stdin_pipe,
        Source::File(path) => Some(open_redirect(path, OpenOptions::new().read(true))?),
    };
    let stdout = match &stage.stdout {
        Sink::Inherit => None,
        Sink::Pipe(_) => stdout_pipe,
        Sink::Truncate(path) => Some(open_redirect(
            path,
            OpenOptions::new().write(true).create(true).truncate(true),
        )?),
        Sink::Append(path) => Some(open_redirect(
            path,
            OpenOptions::new().append(true).create(true),
        )?),
    };
    Ok((stdin, stdout))
}

fn open_redirect(path: &str, options: &OpenOptions) -> Result<OwnedFd, ExecError> {
    options
        .open(path)
        .map(OwnedFd::from)
        .map_err(|source| ExecError::Redirect {
            path: path.to_string(),
            source,
        })
}

/// Open a redirect target for an in-process writer.
pub fn open_output(redirect: &OutputRedirect) -> Result<File, ExecError> {
    let (path, options) = match redirect {
        OutputRedirect::Truncate(path) => {
            (path, OpenOptions::new().write(true).create(true).truncate(true).clone())
        }
        OutputRedirect::Append(path) => {
            (path, OpenOptions::new().append(true).create(true).clone())
        }
    };
    open_redirect(path, &options).map(File::from)
}

/// Try each candidate path in order until the OS accepts one.
fn spawn_stage(
    command: &Command,
    stdin: Option<&OwnedFd>,
    stdout: Option<&OwnedFd>,
    ctx: &LaunchContext,
) -> Result<Child, ExecError> {
    for candidate in ctx.resolver.candidates(&command.name) {
        let mut cmd = process::Command::new(&candidate);
        cmd.arg0(&command.name)
            .args(&command.arguments)
            .envs(ctx.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(fd) = stdin {
            cmd.stdin(Stdio::from(fd.try_clone().map_err(ExecError::Spawn)?));
        }
        if let Some(fd) = stdout {
            cmd.stdout(Stdio::from(fd.try_clone().map_err(ExecError::Spawn)?));
        }

        match cmd.spawn() {
            Ok(child) => return Ok(child),
            Err(e) if is_exec_failure(&e) => {
                trace!(candidate = %candidate.display(), error = %e, "candidate rejected");
            }
            Err(e) => return Err(ExecError::Spawn(e)),
        }
    }
    Err(ExecError::NotFound)
}

/// Run an external pipeline: spawn, report failed stages, then wait for the
/// last stage unless the line was backgrounded.
pub fn execute_external(
    pipeline: &Pipeline,
    session: &mut Session,
    out: &mut dyn Write,
) -> io::Result<ExitSignal> {
    let plan = plan(pipeline);
    let ctx = LaunchContext::from_session(session);
    let launch = match launch(&plan, &ctx) {
        Ok(launch) => launch,
        Err(e) => {
            writeln!(out, "{}", session.diagnostic(&pipeline.head.name, &e))?;
            session.last_status = STATUS_NOT_STARTED;
            return Ok(ExitSignal::Continue);
        }
    };

    let last_stage = plan.stages.len() - 1;
    let mut signal = ExitSignal::Continue;
    for failure in &launch.failures {
        writeln!(out, "{}", session.diagnostic(&failure.name, &failure.error))?;
        if matches!(failure.error, ExecError::NotFound) {
            signal = ExitSignal::CommandNotFound;
        }
        if failure.stage == last_stage {
            session.last_status = match failure.error {
                ExecError::NotFound => STATUS_NOT_FOUND,
                ExecError::Redirect { .. } => 1,
                _ => STATUS_NOT_STARTED,
            };
        }
    }
    out.flush()?;

    let description = describe(pipeline);
    let mut spawned = launch.spawned;
    if plan.background {
        if !spawned.is_empty() {
            let id = session.jobs.push(description, spawned);
            debug!(job = id, "running in background");
        }
        return Ok(signal);
    }

    let Some(pos) = spawned.iter().position(|s| s.stage == last_stage) else {
        // The last stage never started: wait for the ones that did.
        for stage in &mut spawned {
            if let Err(e) = stage.child.wait() {
                warn!(name = %stage.name, error = %e, "wait failed");
            }
        }
        return Ok(signal);
    };
    let mut last = spawned.remove(pos);
    match last.child.wait() {
        Ok(status) => {
            session.last_status = exit_code(status);
            debug!(
                name = %last.name,
                status = session.last_status,
                "foreground stage finished"
            );
        }
        Err(e) => {
            warn!(name = %last.name, error = %e, "wait failed");
            writeln!(out, "{}", session.diagnostic(&last.name, ExecError::Wait(e)))?;
        }
    }

    // Earlier stages usually finish with the last one; anything still
    // running is reaped later.
    spawned.retain_mut(|s| !matches!(s.child.try_wait(), Ok(Some(_))));
    if !spawned.is_empty() {
        session.jobs.push(description, spawned);
    }
    Ok(signal)
}

fn describe(pipeline: &Pipeline) -> String {
    pipeline
        .stages()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Convert a wait status to a shell exit code.
pub fn exit_code(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(code) = exit_status.code() {
        code
    } else if let Some(signal) = exit_status.signal() {
        128 + signal
    } else {
        -1
    }
}

#[derive(Debug)]
pub struct Job {
    pub id: usize,
    pub description: String,
    pub processes: Vec<Spawned>,
}

/// Processes the shell is not waiting on. Reaped without blocking.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: usize,
}

impl JobTable {
    pub fn push(&mut self, description: String, processes: Vec<Spawned>) -> usize {
        self.next_id += 1;
        self.jobs.push(Job {
            id: self.next_id,
            description,
            processes,
        });
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Collect finished processes. Returns the jobs that are now complete.
    pub fn reap(&mut self) -> Vec<Job> {
        for job in &mut self.jobs {
            job.processes.retain_mut(|p| match p.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(job = job.id, name = %p.name, status = exit_code(status), "reaped");
                    false
                }
                Ok(None) => true,
                Err(e) => {
                    warn!(job = job.id, name = %p.name, error = %e, "try_wait failed");
                    false
                }
            });
        }
        let (done, running): (Vec<Job>, Vec<Job>) = std::mem::take(&mut self.jobs)
            .into_iter()
            .partition(|job| job.processes.is_empty());
        self.jobs = running;
        for job in &done {
            info!(job = job.id, description = %job.description, "job finished");
        }
        done
    }
}
