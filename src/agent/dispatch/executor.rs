//! Agent subprocess executor.
//!
//! Lifecycle of one run:
//!
//! ```text
//! IDLE -> SPAWNED -> RUNNING -> COMPLETED | TIMED_OUT | SPAWN_FAILED | CRASHED
//! ```
//!
//! Two reader threads forward output to the [`LogSink`] and a writer thread
//! feeds the prompt to stdin, while the calling thread polls the child for
//! exit. The timeout clock starts before the prompt is written, so an agent
//! that never reads stdin cannot stall the run. The sink serializes appends.

use crate::agent::log::{LogLevel, LogSink};
use crate::exit_codes;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Default wall-clock budget for one agent run.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default time the readers get to drain after the process is gone.
const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A fully resolved agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    program: String,
    args: Vec<String>,
}

impl AgentCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for AgentCommand {
    /// Shell-quoted form, for diagnostics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        write!(f, "{}", shell_words::join(words))
    }
}

/// Time budget for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Kill the agent if it is still running after this long.
    pub timeout: Duration,
    /// How long to wait for the output readers once the process is gone.
    pub drain_grace: Duration,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process exited on its own (any exit code).
    Completed,
    /// The timeout expired and the process was killed.
    TimedOut,
    /// The executable could not be found.
    SpawnFailed,
    /// Anything else went wrong while starting or talking to the process.
    Crashed,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed => write!(f, "completed"),
            Termination::TimedOut => write!(f, "timed out"),
            Termination::SpawnFailed => write!(f, "failed to start"),
            Termination::Crashed => write!(f, "crashed"),
        }
    }
}

/// Terminal state of a supervised run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisedRun {
    pub exit_code: i32,
    pub termination: Termination,
}

impl SupervisedRun {
    fn failed(termination: Termination) -> Self {
        Self {
            exit_code: exit_codes::FAILURE,
            termination,
        }
    }
}

/// Run `command` with `prompt` on stdin, capturing output into `sink`.
///
/// Always returns; never leaves the child running. Every failure is logged
/// to `sink` at ERROR level and reported as exit code 1.
pub fn execute_agent(
    command: &AgentCommand,
    prompt: &str,
    sink: &Arc<LogSink>,
    limits: &ExecutionLimits,
) -> SupervisedRun {
    let mut child = match spawn(command) {
        Ok(child) => child,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log_error(
                sink,
                &format!(
                    "Agent executable '{}' not found. Make sure it is installed and on PATH, \
                     or set `agent.command` in the config file.",
                    command.program
                ),
            );
            return SupervisedRun::failed(Termination::SpawnFailed);
        }
        Err(e) => {
            log_error(
                sink,
                &format!("Failed to start agent '{}': {}", command.program, e),
            );
            return SupervisedRun::failed(Termination::Crashed);
        }
    };
    tracing::debug!(pid = child.id(), program = %command.program, "agent spawned");

    let (done_tx, done_rx) = mpsc::channel();
    let readers = match start_readers(&mut child, sink, &done_tx) {
        Ok(count) => count,
        Err(e) => {
            kill_process(&mut child);
            log_error(sink, &format!("Failed to capture agent output: {}", e));
            return SupervisedRun::failed(Termination::Crashed);
        }
    };
    drop(done_tx);

    let deadline = Deadline::after(limits.timeout);
    let written = match start_writer(&mut child, prompt) {
        Ok(rx) => rx,
        Err(e) => {
            kill_process(&mut child);
            log_error(sink, &format!("Failed to deliver prompt to agent: {}", e));
            join_readers(&done_rx, readers, limits.drain_grace);
            return SupervisedRun::failed(Termination::Crashed);
        }
    };

    let waited = wait_with_timeout(&mut child, deadline, &written);

    let run = match waited {
        Ok(Some(status)) => SupervisedRun {
            exit_code: exit_code_of(status, sink),
            termination: Termination::Completed,
        },
        Ok(None) => {
            kill_process(&mut child);
            log_error(
                sink,
                &format!(
                    "Agent run timed out after {:?}; process killed",
                    limits.timeout
                ),
            );
            SupervisedRun::failed(Termination::TimedOut)
        }
        Err(e) => {
            kill_process(&mut child);
            log_error(sink, &format!("Agent run failed: {}", e));
            SupervisedRun::failed(Termination::Crashed)
        }
    };

    join_readers(&done_rx, readers, limits.drain_grace);
    tracing::debug!(exit_code = run.exit_code, termination = %run.termination, "agent finished");
    run
}

fn spawn(command: &AgentCommand) -> io::Result<Child> {
    Command::new(command.program())
        .args(command.args())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}

/// Start one reader thread per captured stream. Returns how many started.
fn start_readers(child: &mut Child, sink: &Arc<LogSink>, done: &Sender<()>) -> io::Result<usize> {
    let mut started = 0;
    if let Some(stdout) = child.stdout.take() {
        spawn_reader("agent-stdout", stdout, LogLevel::Info, sink, done)?;
        started += 1;
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader("agent-stderr", stderr, LogLevel::Error, sink, done)?;
        started += 1;
    }
    Ok(started)
}

fn spawn_reader<R: Read + Send + 'static>(
    name: &str,
    stream: R,
    level: LogLevel,
    sink: &Arc<LogSink>,
    done: &Sender<()>,
) -> io::Result<()> {
    let sink = Arc::clone(sink);
    let done = done.clone();
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            drain_lines(stream, level, &sink);
            let _ = done.send(());
        })?;
    Ok(())
}

/// Forward each line of `stream` to the sink as soon as it is complete.
fn drain_lines<R: Read>(stream: R, level: LogLevel, sink: &LogSink) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                if let Err(e) = sink.append(level, line) {
                    // Keep reading so the child never blocks on a full pipe.
                    tracing::warn!(error = %e, "dropping agent output line");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, %level, "agent output stream failed");
                break;
            }
        }
    }
}

/// Point in time after which the agent is killed.
///
/// `None` means the budget does not fit in an `Instant`; the run is then
/// effectively unbounded.
#[derive(Debug, Clone, Copy)]
struct Deadline(Option<Instant>);

impl Deadline {
    fn after(budget: Duration) -> Self {
        Self(Instant::now().checked_add(budget))
    }

    fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Write the prompt to stdin on its own thread, then close it.
///
/// The receiver yields the outcome of the write. An agent that exits (or
/// closes stdin) before reading everything shows up as a broken pipe; that is
/// left for the exit code to judge. Killing the child unblocks a stuck write.
fn start_writer(child: &mut Child, prompt: &str) -> io::Result<Receiver<io::Result<()>>> {
    let (tx, rx) = mpsc::channel();
    let Some(mut stdin) = child.stdin.take() else {
        let _ = tx.send(Ok(()));
        return Ok(rx);
    };
    let prompt = prompt.to_string();
    thread::Builder::new()
        .name("agent-stdin".to_string())
        .spawn(move || {
            let result = match stdin.write_all(prompt.as_bytes()).and_then(|()| stdin.flush()) {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    tracing::debug!("agent closed stdin before the prompt was fully written");
                    Ok(())
                }
                other => other,
            };
            drop(stdin);
            let _ = tx.send(result);
        })?;
    Ok(rx)
}

/// Wait for a child process until `deadline`.
///
/// Returns `Ok(None)` when the deadline passed with the process still
/// running. A failed prompt write is reported as an error.
fn wait_with_timeout(
    child: &mut Child,
    deadline: Deadline,
    written: &Receiver<io::Result<()>>,
) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if let Ok(Err(e)) = written.try_recv() {
            return Err(e);
        }
        let pause = match deadline.remaining() {
            Some(remaining) if remaining.is_zero() => return Ok(None),
            Some(remaining) => POLL_INTERVAL.min(remaining),
            None => POLL_INTERVAL,
        };
        thread::sleep(pause);
    }
}

/// Kill a process and reap it.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "kill failed (process may already have exited)");
    }
    if let Err(e) = child.wait() {
        tracing::warn!(error = %e, "failed to reap agent process");
    }
}

fn exit_code_of(status: ExitStatus, sink: &LogSink) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            log_error(
                sink,
                &format!("Agent process ended without an exit code ({})", status),
            );
            exit_codes::FAILURE
        }
    }
}

/// Wait up to `grace` for `count` readers to report completion.
fn join_readers(done: &Receiver<()>, count: usize, grace: Duration) {
    let deadline = Deadline::after(grace);
    for finished in 0..count {
        let received = match deadline.remaining() {
            Some(remaining) => done.recv_timeout(remaining).is_ok(),
            None => done.recv().is_ok(),
        };
        if !received {
            tracing::warn!(
                pending = count - finished,
                grace_ms = grace.as_millis() as u64,
                "agent output readers still busy after grace period; detaching"
            );
            return;
        }
    }
}

fn log_error(sink: &LogSink, message: &str) {
    tracing::error!("{}", message);
    if let Err(e) = sink.error(message) {
        tracing::warn!(error = %e, "failed to record error in run log");
    }
}
