pub mod mock;
pub mod process;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// One engine invocation: argv, timeout, working directory, env overlay.
///
/// Built once and then only read. `timeout` follows three-state semantics:
/// `None` means "use the configured default", `Some(Duration::ZERO)`
/// disables the timeout, and any other value is used as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationRequest {
    args: Vec<String>,
    timeout: Option<Duration>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    needs_logs_dir: bool,
}

impl InvocationRequest {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Layer a variable over the inherited environment.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Ask the runner to create `<home>/logs` before spawning.
    pub fn requiring_logs_dir(mut self) -> Self {
        self.needs_logs_dir = true;
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn needs_logs_dir(&self) -> bool {
        self.needs_logs_dir
    }

    /// The timeout to enforce, given the configured default.
    pub fn effective_timeout(&self, default: Duration) -> Option<Duration> {
        match self.timeout {
            None => Some(default),
            Some(t) if t.is_zero() => None,
            Some(t) => Some(t),
        }
    }

    /// Render `program arg1 arg2 ...` for messages.
    pub fn command_line(&self, program: &Path) -> String {
        let mut line = program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// What a finished process left behind. Produced once per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOutput {
    /// The command line that was executed.
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// Falls back to [`SIGNAL_EXIT_CODE`](crate::consts::SIGNAL_EXIT_CODE)
    /// when the process was terminated by a signal.
    pub exit_code: i32,
    /// Name of the terminating signal, e.g. `"SIGKILL"`.
    pub signal: Option<String>,
}

impl RawOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs one engine invocation to completion.
///
/// [`process::ProcessRunner`] spawns the real binary; [`mock::MockRunner`]
/// replays scripted results for tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, request: InvocationRequest) -> Result<RawOutput, BridgeError>;
}
