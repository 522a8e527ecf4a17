//! Command execution for running checks.
//!
//! Every check tool is an opaque subprocess. Each invocation is bounded by
//! two independent ceilings: a total wall-clock timeout and an idle-output
//! timeout (no output for that long counts as a hang). Output can be
//! captured quietly or forwarded line-by-line to a sink as it arrives,
//! which is how the test-runner stage streams live.

use crate::core::error::{Error, Result};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Which stream a subprocess output line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// Which ceiling a subprocess exceeded before being killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// Total wall-clock ceiling.
    Total,
    /// No output for longer than the idle ceiling.
    Idle,
}

impl TimeoutKind {
    /// Returns the tag appended to recorded failures for this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Total => "timed out",
            Self::Idle => "idle timeout",
        }
    }
}

/// Callback invoked for each output line as it arrives.
pub type LineSink = Arc<dyn Fn(OutputStream, &str) + Send + Sync>;

/// Output from a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Set when the command was killed for exceeding a timeout.
    pub timed_out: Option<TimeoutKind>,
    /// Duration the command took to run.
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if the command succeeded (exit code 0, no timeout).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0 && self.timed_out.is_none()
    }

    /// Returns combined stdout and stderr output.
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Options for command execution.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    /// Working directory for the command.
    pub cwd: Option<std::path::PathBuf>,
    /// Total wall-clock ceiling. `None` means unbounded.
    pub total_timeout: Option<Duration>,
    /// Idle-output ceiling. `None` means unbounded.
    pub idle_timeout: Option<Duration>,
    /// Environment variables to set.
    pub env: Vec<(String, String)>,
    /// Sink receiving each output line as it arrives.
    pub sink: Option<LineSink>,
}

impl std::fmt::Debug for ExecuteOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("cwd", &self.cwd)
            .field("total_timeout", &self.total_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("env", &self.env)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl ExecuteOptions {
    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, path: impl AsRef<Path>) -> Self {
        self.cwd = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the total wall-clock timeout.
    #[must_use]
    pub const fn total_timeout(mut self, duration: Duration) -> Self {
        self.total_timeout = Some(duration);
        self
    }

    /// Sets the idle-output timeout.
    #[must_use]
    pub const fn idle_timeout(mut self, duration: Duration) -> Self {
        self.idle_timeout = Some(duration);
        self
    }

    /// Sets an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Sets the line sink for streaming output.
    #[must_use]
    pub fn sink(mut self, sink: LineSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

/// Executor for running shell commands.
#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
    /// Creates a new executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes a shell command.
    ///
    /// Timeout expiry kills the process and is reported in the returned
    /// [`CommandOutput`], not as an `Err`: to the pipeline a hung tool is a
    /// failed check, not broken infrastructure.
    pub async fn execute(&self, command: &str, options: ExecuteOptions) -> Result<CommandOutput> {
        let start = std::time::Instant::now();

        let (shell, shell_arg) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg).arg(command);

        if let Some(ref cwd) = options.cwd {
            cmd.current_dir(cwd);
        }

        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| Error::io("spawn command", e))?;

        let (tx, mut rx) = mpsc::channel::<(OutputStream, String)>(64);

        if let Some(stdout) = child.stdout.take() {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if tx.send((OutputStream::Stdout, line)).await.is_err() {
                        break;
                    }
                }
            });
        }

        if let Some(stderr) = child.stderr.take() {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if tx.send((OutputStream::Stderr, line)).await.is_err() {
                        break;
                    }
                }
            });
        }

        // The readers hold the only remaining senders; rx ends at EOF.
        drop(tx);

        let mut stdout_buf = String::new();
        let mut stderr_buf = String::new();
        let mut timed_out: Option<TimeoutKind> = None;

        loop {
            let remaining = match options.total_timeout {
                Some(total) => match total.checked_sub(start.elapsed()) {
                    Some(left) => Some(left),
                    None => {
                        timed_out = Some(TimeoutKind::Total);
                        break;
                    },
                },
                None => None,
            };

            let wait = match (remaining, options.idle_timeout) {
                (Some(left), Some(idle)) => Some(left.min(idle)),
                (Some(left), None) => Some(left),
                (None, idle) => idle,
            };

            let received = match wait {
                Some(wait) => match tokio::time::timeout(wait, rx.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        let total_hit = matches!((remaining, options.idle_timeout),
                            (Some(left), Some(idle)) if left <= idle);
                        timed_out = Some(if total_hit || options.idle_timeout.is_none() {
                            TimeoutKind::Total
                        } else {
                            TimeoutKind::Idle
                        });
                        break;
                    },
                },
                None => rx.recv().await,
            };

            match received {
                Some((stream, line)) => {
                    if let Some(ref sink) = options.sink {
                        sink(stream, &line);
                    }
                    let buf = match stream {
                        OutputStream::Stdout => &mut stdout_buf,
                        OutputStream::Stderr => &mut stderr_buf,
                    };
                    buf.push_str(&line);
                    buf.push('\n');
                },
                None => break,
            }
        }

        if timed_out.is_some() {
            // Kill result ignored - the wait below observes the death anyway
            drop(child.kill().await);
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::io("wait for command", e))?;

        let exit_code = if timed_out.is_some() {
            124
        } else {
            status.code().unwrap_or(1)
        };

        Ok(CommandOutput {
            exit_code,
            stdout: stdout_buf,
            stderr: stderr_buf,
            timed_out,
            duration: start.elapsed(),
        })
    }

    /// Checks if a command exists in PATH.
    #[must_use]
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }
}
