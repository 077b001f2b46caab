//! External process execution
//!
//! This module is the single place the crate launches external programs. It
//! distinguishes the three launch-level failure classes the rest of the crate
//! branches on (binary not found, permission denied, nonzero exit), applies a
//! per-invocation wall-clock timeout, and offers a streaming variant for
//! follow-style commands.
//!
//! A command that writes to stderr but exits zero is a success; many runtime
//! CLIs log progress there.

use crate::errors::{Result, RuntimeError};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// Default per-invocation timeout for runtime commands
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Options for a single process invocation
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Wall-clock budget for the invocation
    pub timeout: Duration,
    /// Working directory for the child process
    pub cwd: Option<PathBuf>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cwd: None,
        }
    }
}

impl ExecOptions {
    /// Options with a specific timeout and no working directory
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            cwd: None,
        }
    }
}

/// Captured output of a completed invocation
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A line-delimited event from a streaming invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Stdout(String),
    Stderr(String),
}

/// Live handle to a streaming child process.
///
/// Events arrive via [`StreamHandle::next_event`]; the stream ends (returns
/// `None`) when both pipes close. [`StreamHandle::stop`] kills the child.
#[derive(Debug)]
pub struct StreamHandle {
    child: Child,
    events: mpsc::UnboundedReceiver<StreamEvent>,
}

impl StreamHandle {
    /// Receive the next output line, or `None` once the process has closed
    /// both pipes.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Kill the child process and reap it.
    pub async fn stop(&mut self) -> Result<()> {
        // start_kill is a no-op error if the child already exited
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
        Ok(())
    }
}

/// Executes external programs with timeout and failure classification
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `binary` with `args`, capturing stdout/stderr.
    ///
    /// Fails with [`RuntimeError::BinaryNotFound`] /
    /// [`RuntimeError::PermissionDenied`] on launch failure,
    /// [`RuntimeError::CommandFailed`] on nonzero exit (carrying trimmed
    /// stderr when non-empty, else the exit status), and
    /// [`RuntimeError::Timeout`] when the wall-clock budget expires.
    #[instrument(skip(self, opts), fields(binary = binary))]
    pub async fn run(&self, binary: &str, args: &[&str], opts: &ExecOptions) -> Result<ExecOutput> {
        debug!("Executing: {} {}", binary, args.join(" "));

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &opts.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|e| classify_spawn_error(binary, &e))?;

        let output = match timeout(opts.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(RuntimeError::CommandFailed {
                    message: format!("Failed to collect output of '{}': {}", binary, e),
                }
                .into());
            }
            // kill_on_drop reaps the abandoned child
            Err(_) => {
                return Err(RuntimeError::Timeout {
                    command: format!("{} {}", binary, args.join(" ")),
                    timeout_secs: opts.timeout.as_secs(),
                }
                .into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let trimmed = stderr.trim();
            let message = if trimmed.is_empty() {
                format!("'{}' exited with {}", binary, output.status)
            } else {
                trimmed.to_string()
            };
            return Err(RuntimeError::CommandFailed { message }.into());
        }

        Ok(ExecOutput { stdout, stderr })
    }

    /// Spawn `binary` with `args` and return a live streaming handle.
    ///
    /// Used for follow-style commands (`logs --follow`) where output must be
    /// surfaced line by line and the invocation is stopped by the caller
    /// rather than by exit.
    #[instrument(skip(self), fields(binary = binary))]
    pub fn stream(&self, binary: &str, args: &[&str]) -> Result<StreamHandle> {
        debug!("Streaming: {} {}", binary, args.join(" "));

        let mut child = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| classify_spawn_error(binary, &e))?;

        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(stdout) = child.stdout.take() {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send(StreamEvent::Stdout(line)).is_err() {
                        break;
                    }
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send(StreamEvent::Stderr(line)).is_err() {
                        break;
                    }
                }
            });
        }

        Ok(StreamHandle { child, events: rx })
    }
}

fn classify_spawn_error(binary: &str, error: &std::io::Error) -> RuntimeError {
    match error.kind() {
        std::io::ErrorKind::NotFound => RuntimeError::BinaryNotFound {
            binary: binary.to_string(),
        },
        std::io::ErrorKind::PermissionDenied => RuntimeError::PermissionDenied {
            binary: binary.to_string(),
        },
        _ => RuntimeError::CommandFailed {
            message: format!("Failed to launch '{}': {}", binary, error),
        },
    }
}
