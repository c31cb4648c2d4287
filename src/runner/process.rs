//! Spawning the engine and settling each invocation exactly once.
//!
//! A single `select!` loop owns the child, both output pipes and the
//! deadline. Whichever of {process closed, wait failed, deadline reached}
//! wins returns from the loop, which drops every other pending future and
//! the pipe readers before the result is handed back. After a timeout the
//! child moves into a detached reaper task that escalates from the
//! graceful signal to a forceful kill once the grace period runs out.

use std::future;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{CommandRunner, InvocationRequest, RawOutput};
use crate::config::BridgeConfig;
use crate::consts::{HOME_VAR, MANAGED_FLAGS, SIGNAL_EXIT_CODE};
use crate::error::BridgeError;
use crate::events::{Event, EventBus, Settlement};
use crate::resolver;

const READ_CHUNK: usize = 8 * 1024;

/// Runs requests against the real engine binary.
pub struct ProcessRunner {
    config: Arc<BridgeConfig>,
    events: Option<Arc<EventBus>>,
}

impl ProcessRunner {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config: Arc::new(config),
            events: None,
        }
    }

    /// Publish lifecycle events on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Spawn `program` directly, skipping binary resolution.
    pub async fn run_program(
        &self,
        program: &Path,
        request: &InvocationRequest,
    ) -> Result<RawOutput, BridgeError> {
        let command_line = request.command_line(program);
        let timeout = request.effective_timeout(self.config.command_timeout);

        let mut child = match self.command(program, request).spawn() {
            Ok(child) => child,
            Err(source) => {
                warn!(command = %command_line, error = %source, "failed to launch engine");
                self.emit(Event::Settled {
                    pid: None,
                    settlement: Settlement::LaunchFailed,
                });
                return Err(BridgeError::LaunchFailure {
                    command: command_line,
                    source,
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
        };

        let pid = child.id();
        debug!(command = %command_line, ?pid, ?timeout, "spawned engine");
        self.emit(Event::Spawned {
            pid,
            command: command_line.clone(),
        });

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut stdout_chunk = [0u8; READ_CHUNK];
        let mut stderr_chunk = [0u8; READ_CHUNK];
        let mut status: Option<ExitStatus> = None;

        // A deadline past the clock's range never fires.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let expiry = until(deadline);
        tokio::pin!(expiry);

        // Closed means exited and both pipes at EOF.
        while status.is_none() || stdout_pipe.is_some() || stderr_pipe.is_some() {
            tokio::select! {
                read = read_some(&mut stdout_pipe, &mut stdout_chunk) => {
                    append(read, &mut stdout_pipe, &mut stdout, &stdout_chunk, "stdout");
                }
                read = read_some(&mut stderr_pipe, &mut stderr_chunk) => {
                    append(read, &mut stderr_pipe, &mut stderr, &stderr_chunk, "stderr");
                }
                exited = child.wait(), if status.is_none() => match exited {
                    Ok(exit) => status = Some(exit),
                    Err(source) => {
                        let _ = child.start_kill();
                        drop(stdout_pipe);
                        drop(stderr_pipe);
                        warn!(command = %command_line, error = %source, "failed waiting on engine");
                        self.emit(Event::Settled {
                            pid,
                            settlement: Settlement::LaunchFailed,
                        });
                        return Err(BridgeError::LaunchFailure {
                            command: command_line,
                            source,
                            stdout: lossy(&stdout),
                            stderr: lossy(&stderr),
                        });
                    }
                },
                _ = &mut expiry => {
                    let timeout = timeout.unwrap_or_default();
                    drop(stdout_pipe);
                    drop(stderr_pipe);
                    warn!(
                        command = %command_line,
                        ?pid,
                        timeout_ms = timeout.as_millis() as u64,
                        "engine command timed out"
                    );
                    if status.is_none() {
                        self.escalate(child, pid);
                    }
                    self.emit(Event::Settled {
                        pid,
                        settlement: Settlement::TimedOut,
                    });
                    return Err(BridgeError::Timeout {
                        command: command_line,
                        timeout,
                        stdout: lossy(&stdout),
                        stderr: lossy(&stderr),
                    });
                }
            }
        }

        // The loop only ends once `status` is set.
        let status = status.unwrap_or_default();
        let output = RawOutput {
            command: command_line,
            stdout: lossy(&stdout),
            stderr: lossy(&stderr),
            exit_code: status.code().unwrap_or(SIGNAL_EXIT_CODE),
            signal: signal_name(&status),
        };
        debug!(
            command = %output.command,
            exit_code = output.exit_code,
            signal = ?output.signal,
            "engine command completed"
        );
        self.emit(Event::Settled {
            pid,
            settlement: Settlement::Completed {
                exit_code: output.exit_code,
            },
        });
        Ok(output)
    }

    fn command(&self, program: &Path, request: &InvocationRequest) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env(HOME_VAR, &self.config.home);
        for (key, value) in MANAGED_FLAGS {
            cmd.env(key, value);
        }
        cmd.envs(request.env());
        if let Some(dir) = request.cwd() {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Ask the child to stop, then hand it to a background task that
    /// force-kills it if it is still alive after the grace period.
    fn escalate(&self, mut child: Child, pid: Option<u32>) {
        if let Err(e) = terminate(&mut child) {
            warn!(?pid, error = %e, "failed to send graceful termination");
        }
        self.emit(Event::TerminateSent { pid });

        let grace = self.config.kill_grace;
        let events = self.events.clone();
        tokio::spawn(async move {
            let forced = tokio::select! {
                _ = child.wait() => false,
                _ = tokio::time::sleep(grace) => true,
            };
            if forced {
                warn!(
                    ?pid,
                    grace_ms = grace.as_millis() as u64,
                    "engine ignored termination; killing"
                );
                if let Some(bus) = &events {
                    bus.emit(Event::KillSent { pid });
                }
                if let Err(e) = child.kill().await {
                    warn!(?pid, error = %e, "failed to kill engine");
                }
            }
            debug!(?pid, forced, "reaped timed-out engine");
            if let Some(bus) = &events {
                bus.emit(Event::Reaped { pid, forced });
            }
        });
    }

    fn emit(&self, event: Event) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, request: InvocationRequest) -> Result<RawOutput, BridgeError> {
        let program = resolver::resolve_binary(&self.config)?;
        resolver::ensure_home(&self.config, request.needs_logs_dir())?;
        self.run_program(&program, &request).await
    }
}

/// Read from a pipe that may already be closed. A closed pipe never
/// becomes ready.
async fn read_some<R: AsyncRead + Unpin>(
    pipe: &mut Option<R>,
    buf: &mut [u8],
) -> io::Result<usize> {
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => future::pending().await,
    }
}

fn append<R>(
    read: io::Result<usize>,
    pipe: &mut Option<R>,
    buffer: &mut Vec<u8>,
    chunk: &[u8],
    stream: &str,
) {
    match read {
        Ok(0) => *pipe = None,
        Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        Err(e) => {
            warn!(stream, error = %e, "engine output stream failed");
            *pipe = None;
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => future::pending().await,
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

#[cfg(unix)]
fn signal_name(status: &ExitStatus) -> Option<String> {
    use nix::sys::signal::Signal;
    use std::os::unix::process::ExitStatusExt;

    let raw = status.signal()?;
    Some(
        Signal::try_from(raw)
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|_| format!("SIG{raw}")),
    )
}

#[cfg(not(unix))]
fn signal_name(_status: &ExitStatus) -> Option<String> {
    None
}
