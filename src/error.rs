//! Diagnostic errors surfaced by the bridge.
//!
//! Every variant carries enough raw context (command line, captured
//! streams, exit code, signal, timeout) that its `Display` output can be
//! logged or shown without looking anything else up.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::consts::BINARY_OVERRIDE_VARS;
use crate::runner::RawOutput;

/// Coarse classification of a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BinaryNotFound,
    StateDirectory,
    LaunchFailure,
    NonZeroExit,
    Timeout,
    MalformedPayload,
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Resolution exhausted every candidate.
    #[error("{}", describe_not_found(.searched))]
    BinaryNotFound { searched: Vec<PathBuf> },

    /// The state directory (or its logs subdirectory) could not be created.
    #[error("failed to create state directory {}: {source}", .path.display())]
    StateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The process could not be spawned or waited on.
    #[error("failed to launch engine command: {command}\n{source}{}", describe_streams(.stdout, .stderr))]
    LaunchFailure {
        command: String,
        #[source]
        source: io::Error,
        stdout: String,
        stderr: String,
    },

    /// The process ran and exited non-zero without a usable payload.
    #[error("{}", describe_exit(.output, .message))]
    NonZeroExit { message: String, output: RawOutput },

    /// The configured timeout elapsed before the process closed.
    #[error("engine command timed out after {}ms\ncommand: {command}{}", .timeout.as_millis(), describe_streams(.stdout, .stderr))]
    Timeout {
        command: String,
        timeout: Duration,
        stdout: String,
        stderr: String,
    },

    /// Stdout was not the JSON the command promises.
    #[error("{}", describe_malformed(.output, .reason))]
    MalformedPayload { reason: String, output: RawOutput },
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BinaryNotFound { .. } => ErrorKind::BinaryNotFound,
            Self::StateDirectory { .. } => ErrorKind::StateDirectory,
            Self::LaunchFailure { .. } => ErrorKind::LaunchFailure,
            Self::NonZeroExit { .. } => ErrorKind::NonZeroExit,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::MalformedPayload { .. } => ErrorKind::MalformedPayload,
        }
    }

    /// Captured standard output, if the failure happened after spawning.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::LaunchFailure { stdout, .. } | Self::Timeout { stdout, .. } => Some(stdout),
            Self::NonZeroExit { output, .. } | Self::MalformedPayload { output, .. } => {
                Some(&output.stdout)
            }
            _ => None,
        }
    }

    /// Captured standard error, if the failure happened after spawning.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::LaunchFailure { stderr, .. } | Self::Timeout { stderr, .. } => Some(stderr),
            Self::NonZeroExit { output, .. } | Self::MalformedPayload { output, .. } => {
                Some(&output.stderr)
            }
            _ => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { output, .. } | Self::MalformedPayload { output, .. } => {
                Some(output.exit_code)
            }
            _ => None,
        }
    }

    pub fn signal(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { output, .. } | Self::MalformedPayload { output, .. } => {
                output.signal.as_deref()
            }
            _ => None,
        }
    }

    /// The timeout that elapsed, for [`ErrorKind::Timeout`] only.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Timeout { timeout, .. } => Some(*timeout),
            _ => None,
        }
    }
}

fn describe_not_found(searched: &[PathBuf]) -> String {
    let mut message = format!(
        "unable to locate the codex engine binary. Set {} to the compiled codex executable.",
        BINARY_OVERRIDE_VARS[0]
    );
    if !searched.is_empty() {
        message.push_str("\nsearched:");
        for path in searched {
            message.push_str(&format!("\n  {}", path.display()));
        }
    }
    message
}

fn describe_exit(output: &RawOutput, message: &str) -> String {
    let signal = output
        .signal
        .as_deref()
        .map(|s| format!(" (signal {s})"))
        .unwrap_or_default();
    format!(
        "`{}` failed with exit code {}{}: {}{}",
        output.command,
        output.exit_code,
        signal,
        message,
        describe_streams(&output.stdout, &output.stderr)
    )
}

fn describe_malformed(output: &RawOutput, reason: &str) -> String {
    format!(
        "malformed payload from `{}`: {}{}",
        output.command,
        reason,
        describe_streams(&output.stdout, &output.stderr)
    )
}

fn describe_streams(stdout: &str, stderr: &str) -> String {
    let mut out = String::new();
    if !stdout.is_empty() {
        out.push_str(&format!("\n\nstdout:\n{stdout}"));
    }
    if !stderr.is_empty() {
        out.push_str(&format!("\n\nstderr:\n{stderr}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str, code: i32) -> RawOutput {
        RawOutput {
            command: "codex agents list --json".to_string(),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: code,
            signal: None,
        }
    }

    #[test]
    fn not_found_mentions_override_variable() {
        let err = BridgeError::BinaryNotFound {
            searched: vec![PathBuf::from("/a/codex"), PathBuf::from("/b/codex")],
        };
        let text = err.to_string();
        assert!(text.contains("CODEX_CLI_BIN"));
        assert!(text.contains("/a/codex"));
        assert!(text.contains("/b/codex"));
        assert_eq!(err.kind(), ErrorKind::BinaryNotFound);
        assert!(err.stdout().is_none());
    }

    #[test]
    fn timeout_message_is_self_contained() {
        let err = BridgeError::Timeout {
            command: "/bin/codex hooks list --json".to_string(),
            timeout: Duration::from_millis(50),
            stdout: "partial".to_string(),
            stderr: String::new(),
        };
        let text = err.to_string();
        assert!(text.contains("timed out after 50ms"));
        assert!(text.contains("/bin/codex hooks list --json"));
        assert!(text.contains("stdout:\npartial"));
        assert!(!text.contains("stderr:"));
        assert_eq!(err.timeout(), Some(Duration::from_millis(50)));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn exit_message_includes_signal() {
        let mut raw = output("", "boom", 1);
        raw.signal = Some("SIGKILL".to_string());
        let err = BridgeError::NonZeroExit {
            message: "boom".to_string(),
            output: raw,
        };
        assert_eq!(
            err.to_string(),
            "`codex agents list --json` failed with exit code 1 (signal SIGKILL): boom\n\nstderr:\nboom"
        );
        assert_eq!(err.signal(), Some("SIGKILL"));
        assert_eq!(err.stderr(), Some("boom"));
    }

    #[test]
    fn exit_message_keeps_both_streams() {
        let err = BridgeError::NonZeroExit {
            message: "No subagent named 'ghost'".to_string(),
            output: output(r#"{"error": "No subagent named 'ghost'"}"#, "trace: lookup failed", 1),
        };
        let text = err.to_string();
        assert!(text.contains("exit code 1: No subagent named 'ghost'"));
        assert!(text.contains("stdout:\n{\"error\""));
        assert!(text.contains("stderr:\ntrace: lookup failed"));
    }

    #[test]
    fn malformed_payload_carries_streams() {
        let err = BridgeError::MalformedPayload {
            reason: "expected value at line 1 column 1".to_string(),
            output: output("not json", "warn: x", 0),
        };
        let text = err.to_string();
        assert!(text.contains("malformed payload"));
        assert!(text.contains("not json"));
        assert!(text.contains("warn: x"));
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
        assert_eq!(err.exit_code(), Some(0));
    }

    #[test]
    fn launch_failure_exposes_source() {
        let err = BridgeError::LaunchFailure {
            command: "/missing/codex agents list".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/missing/codex agents list"));
        assert!(err.to_string().contains("no such file"));
    }
}
