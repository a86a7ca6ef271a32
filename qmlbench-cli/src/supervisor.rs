//! Supervisor Process
//!
//! Launches one worker process per benchmark and watches it until it exits or
//! hangs.
//!
//! Both output pipes are drained by dedicated reader threads for the whole
//! lifetime of the child. A worker blocked on a full pipe never exits, so the
//! coordinating thread only polls for termination and never reads itself.
//!
//! On unix the worker leads its own process group. Anything it forks inherits
//! the output pipes, so after a hang, or when descendants still hold the pipes
//! once the worker itself is gone, the whole group is killed. Readers that
//! still do not finish after that are abandoned and the run moves on.

use crate::classifier::{OutputSink, Stream, StreamClassifier};
use qmlbench_core::{OutputMode, WorkerInvocation};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

/// How long a worker may run before it is declared hung (10 minutes)
pub const DEFAULT_HANG_TIMEOUT: Duration = Duration::from_millis(600_000);

/// Interval between exit checks while a worker runs
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long readers get to reach end of stream once the worker is gone,
/// before and again after the process group is killed
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Size of a single pipe read
const READ_CHUNK: usize = 8192;

/// Errors that prevent observing a worker at all
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The worker process could not be started
    #[error("Failed to spawn worker {program}: {source}")]
    SpawnFailed {
        /// Program that was started
        program: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Polling the running worker failed; it was killed
    #[error("Failed waiting for worker: {0}")]
    Wait(#[source] std::io::Error),
}

/// How a worker process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    /// Normal exit with the given code (any code)
    Exited(i32),
    /// Abnormal termination, e.g. killed by a signal
    Crashed,
    /// Still running when the hang timeout elapsed; killed by the supervisor
    TimedOut,
}

impl TerminalStatus {
    /// Classify a finished process's exit status
    pub fn from_exit_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => TerminalStatus::Exited(code),
            None => TerminalStatus::Crashed,
        }
    }
}

/// Everything captured from one worker run
#[derive(Debug, Clone)]
pub struct WorkerOutput {
    /// Terminal status
    pub status: TerminalStatus,
    /// Non-empty stdout lines buffered for parsing (structured mode only)
    pub structured_stdout: Vec<u8>,
    /// Raw stdout bytes as read
    pub stdout: Vec<u8>,
    /// Raw stderr bytes as read
    pub stderr: Vec<u8>,
    /// Wall-clock time from spawn to termination
    pub elapsed: Duration,
    /// Set when a stream reader panicked or had to be abandoned; its capture
    /// is then empty
    pub reader_failure: Option<String>,
}

/// Starts a worker for an invocation and blocks until it has terminated.
///
/// The run coordinator only talks to workers through this trait.
pub trait Launcher {
    /// Run one worker to completion
    fn launch(&mut self, invocation: &WorkerInvocation) -> Result<WorkerOutput, SupervisorError>;
}

/// Bytes collected by one reader thread
#[derive(Default)]
struct StreamCapture {
    raw: Vec<u8>,
    structured: Vec<u8>,
}

/// Live worker process; its readers report back over `captures`
struct WorkerProcess {
    child: Child,
    captures: Receiver<(Stream, StreamCapture)>,
    started: Instant,
}

impl WorkerProcess {
    fn spawn(
        invocation: &WorkerInvocation,
        mode: OutputMode,
        sink: &Arc<dyn OutputSink>,
    ) -> Result<Self, SupervisorError> {
        let spawn_failed = |source| SupervisorError::SpawnFailed {
            program: invocation.program().to_path_buf(),
            source,
        };

        let mut command = Command::new(invocation.program());
        command
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(spawn_failed)?;
        let started = Instant::now();

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_failed(std::io::Error::other(
                "worker pipes were not captured",
            )));
        };

        let (tx, captures) = mpsc::channel();
        spawn_reader(
            stdout,
            StreamClassifier::new(Stream::Stdout, mode, Arc::clone(sink)),
            Stream::Stdout,
            tx.clone(),
        );
        spawn_reader(
            stderr,
            StreamClassifier::new(Stream::Stderr, mode, Arc::clone(sink)),
            Stream::Stderr,
            tx,
        );

        Ok(Self {
            child,
            captures,
            started,
        })
    }

    /// Poll for termination until `timeout` elapses; `None` means still running
    fn wait_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status));
            }
            let remaining = timeout.saturating_sub(self.started.elapsed());
            if remaining.is_zero() {
                return Ok(None);
            }
            thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }

    /// Force kill the worker with its descendants and reap it
    fn kill(&mut self) {
        self.kill_group();
        if let Err(e) = self.child.kill() {
            debug!(error = %e, pid = self.child.id(), "Worker already gone");
        }
        let _ = self.child.wait();
    }

    /// SIGKILL every process left in the worker's process group
    #[cfg(unix)]
    fn kill_group(&self) {
        let pgid = self.child.id() as libc::pid_t;
        let ret = unsafe { libc::kill(-pgid, libc::SIGKILL) };
        if ret == -1 {
            let e = std::io::Error::last_os_error();
            if e.raw_os_error() != Some(libc::ESRCH) {
                warn!(error = %e, pgid, "Failed to kill worker process group");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&self) {}

    /// Collect both reader captures.
    ///
    /// Readers normally finish right after the worker is gone. If they have
    /// not within the grace period the process group is killed to close any
    /// inherited pipes; readers still running after a second grace period are
    /// abandoned.
    fn drain(self, status: TerminalStatus) -> WorkerOutput {
        let elapsed = self.started.elapsed();
        let mut stdout = None;
        let mut stderr = None;
        let mut deadline = Instant::now() + DRAIN_GRACE;
        let mut group_killed = false;

        while stdout.is_none() || stderr.is_none() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.captures.recv_timeout(remaining) {
                Ok((Stream::Stdout, capture)) => stdout = Some(capture),
                Ok((Stream::Stderr, capture)) => stderr = Some(capture),
                Err(RecvTimeoutError::Timeout) if !group_killed => {
                    debug!(
                        pid = self.child.id(),
                        "Worker descendants still hold its output pipes, killing process group"
                    );
                    self.kill_group();
                    group_killed = true;
                    deadline = Instant::now() + DRAIN_GRACE;
                }
                Err(_) => break,
            }
        }

        let missing: Vec<&str> = [
            (Stream::Stdout, stdout.is_none()),
            (Stream::Stderr, stderr.is_none()),
        ]
        .into_iter()
        .filter(|(_, missing)| *missing)
        .map(|(stream, _)| stream.name())
        .collect();
        let reader_failure = (!missing.is_empty()).then(|| {
            let message = format!(
                "{} output incomplete: reader did not finish",
                missing.join(" and ")
            );
            warn!(pid = self.child.id(), "{}", message);
            message
        });

        let stdout = stdout.unwrap_or_default();
        let stderr = stderr.unwrap_or_default();
        WorkerOutput {
            status,
            structured_stdout: stdout.structured,
            stdout: stdout.raw,
            stderr: stderr.raw,
            elapsed,
            reader_failure,
        }
    }
}

/// Reader threads are detached; a capture only arrives once its stream hits
/// end of file. A panicking reader drops its sender without reporting.
fn spawn_reader<R: Read + Send + 'static>(
    mut reader: R,
    mut classifier: StreamClassifier,
    stream: Stream,
    done: Sender<(Stream, StreamCapture)>,
) {
    thread::spawn(move || {
        let mut raw = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    raw.extend_from_slice(&buf[..n]);
                    classifier.feed(&buf[..n]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(stream = stream.name(), error = %e, "Failed reading worker output");
                    break;
                }
            }
        }
        let capture = StreamCapture {
            raw,
            structured: classifier.finish(),
        };
        // the supervisor may have abandoned this reader already
        let _ = done.send((stream, capture));
    });
}

/// Runs workers as child processes with a hang timeout
pub struct Supervisor {
    hang_timeout: Duration,
    mode: OutputMode,
    sink: Arc<dyn OutputSink>,
}

impl Supervisor {
    /// Create a supervisor relaying worker output to `sink`
    pub fn new(mode: OutputMode, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            hang_timeout: DEFAULT_HANG_TIMEOUT,
            mode,
            sink,
        }
    }

    /// Override the hang timeout
    pub fn with_hang_timeout(mut self, hang_timeout: Duration) -> Self {
        self.hang_timeout = hang_timeout;
        self
    }

    /// Spawn the worker, stream its output, and classify how it ended
    pub fn run(&self, invocation: &WorkerInvocation) -> Result<WorkerOutput, SupervisorError> {
        let mut process = WorkerProcess::spawn(invocation, self.mode, &self.sink)?;
        debug!(
            pid = process.child.id(),
            args = %invocation.display_args(),
            "Worker started"
        );

        let status = match process.wait_timeout(self.hang_timeout) {
            Ok(Some(exit)) => TerminalStatus::from_exit_status(exit),
            Ok(None) => {
                error!(
                    timeout_ms = self.hang_timeout.as_millis() as u64,
                    "Test hung (probably indefinitely) when run with arguments: {}",
                    invocation.display_args()
                );
                process.kill();
                TerminalStatus::TimedOut
            }
            Err(e) => {
                process.kill();
                let _ = process.drain(TerminalStatus::Crashed);
                return Err(SupervisorError::Wait(e));
            }
        };

        if status == TerminalStatus::Crashed {
            warn!(
                "Test crashed when run with arguments: {}",
                invocation.display_args()
            );
        }

        let output = process.drain(status);
        debug!(
            status = ?output.status,
            elapsed_ms = output.elapsed.as_millis() as u64,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "Worker finished"
        );
        Ok(output)
    }
}

impl Launcher for Supervisor {
    fn launch(&mut self, invocation: &WorkerInvocation) -> Result<WorkerOutput, SupervisorError> {
        self.run(invocation)
    }
}
