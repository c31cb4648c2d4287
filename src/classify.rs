//! Turning a failed invocation into a single [`BridgeError`].

use serde_json::Value;

use crate::error::BridgeError;
use crate::runner::RawOutput;

/// Shown when a failed process printed nothing at all.
pub const NO_OUTPUT: &str = "(no output)";

/// Build the error for a process that exited non-zero.
///
/// The human-readable part prefers, in order: an `error` field from a
/// JSON object on stdout, stderr, stdout, and finally [`NO_OUTPUT`]. The
/// full raw output is attached either way.
pub fn classify_exit(output: RawOutput) -> BridgeError {
    let message = failure_message(&output);
    BridgeError::NonZeroExit { message, output }
}

/// Pass a successful result through, classify anything else.
pub fn ensure_success(output: RawOutput) -> Result<RawOutput, BridgeError> {
    if output.success() {
        Ok(output)
    } else {
        Err(classify_exit(output))
    }
}

pub fn failure_message(output: &RawOutput) -> String {
    if let Some(message) = structured_error(&output.stdout) {
        return message;
    }
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    NO_OUTPUT.to_string()
}

/// The `error` field of a JSON object, if stdout holds one.
pub fn structured_error(stdout: &str) -> Option<String> {
    let value: Value = serde_json::from_str(stdout.trim()).ok()?;
    match value.get("error")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(inner) => inner
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
