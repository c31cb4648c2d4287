use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{CommandRunner, InvocationRequest, RawOutput};
use crate::error::BridgeError;

/// A scripted runner for tests. Returns pre-defined results in order and
/// records every request it receives.
pub struct MockRunner {
    responses: Mutex<VecDeque<Result<RawOutput, BridgeError>>>,
    requests: Mutex<Vec<InvocationRequest>>,
}

impl MockRunner {
    pub fn new(responses: Vec<Result<RawOutput, BridgeError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A runner that answers once with the given stdout and exit code.
    pub fn replying(stdout: &str, exit_code: i32) -> Self {
        Self::new(vec![Ok(output(stdout, "", exit_code))])
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<InvocationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Build a [`RawOutput`] as if `codex` had printed it.
pub fn output(stdout: &str, stderr: &str, exit_code: i32) -> RawOutput {
    RawOutput {
        command: "codex".to_string(),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code,
        signal: None,
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, request: InvocationRequest) -> Result<RawOutput, BridgeError> {
        let command = request.command_line(Path::new("codex"));
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Ok(mut raw)) => {
                raw.command = command;
                Ok(raw)
            }
            Some(Err(err)) => Err(err),
            None => Err(BridgeError::LaunchFailure {
                command,
                source: io::Error::other("MockRunner: no more responses"),
                stdout: String::new(),
                stderr: String::new(),
            }),
        }
    }
}
