//! Hook commands: `codex hooks list|validate|exec-log|reload`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::{classify_exit, ensure_success, structured_error};
use crate::error::BridgeError;
use crate::normalize::fields::{Field, Object};
use crate::normalize::{FromPayload, expect_object, normalize, parse_payload, type_name};
use crate::runner::{CommandRunner, InvocationRequest, RawOutput};

/// Sentinel for discriminators the engine did not report.
pub const UNKNOWN: &str = "unknown";

mod keys {
    use super::Field;

    pub const SCOPE: Field = Field::new(&["scope"]);
    pub const PATH: Field = Field::new(&["path"]);
    pub const CHECKSUM: Field = Field::new(&["checksum"]);
    pub const LOADED_HOOKS: Field = Field::new(&["loadedHooks", "loaded_hooks"]);
    pub const SKIPPED_HOOKS: Field = Field::new(&["skippedHooks", "skipped_hooks"]);
    pub const HOOK_ID: Field = Field::new(&["hookId", "hook_id"]);
    pub const REASON: Field = Field::new(&["reason"]);
    pub const DETAILS: Field = Field::new(&["details"]);
    pub const LAYERS: Field = Field::new(&["layers"]);
    pub const EVENTS: Field = Field::new(&["events"]);
    pub const EVENT: Field = Field::new(&["event"]);
    pub const HOOKS: Field = Field::new(&["hooks"]);
    pub const ID: Field = Field::new(&["id"]);
    pub const COMMAND: Field = Field::new(&["command"]);
    pub const NOTES: Field = Field::new(&["notes"]);
    pub const STATUS: Field = Field::new(&["status"]);
    pub const ERRORS: Field = Field::new(&["errors"]);
    pub const WARNINGS: Field = Field::new(&["warnings"]);
    pub const RECORDS: Field = Field::new(&["records"]);
    pub const TIMESTAMP: Field = Field::new(&["timestamp", "time"]);
    pub const LOG_HOOK_ID: Field = Field::new(&["hookId", "hook_id", "hook"]);
    pub const DECISION: Field = Field::new(&["decision"]);
    pub const MESSAGE: Field = Field::new(&["message"]);
    pub const RELOADED: Field = Field::new(&["reloaded"]);
}

/// Configuration layer a hook came from. Unrecognized values become `Local`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookScope {
    Managed,
    Project,
    #[default]
    Local,
}

impl HookScope {
    pub fn normalize(value: Option<&str>) -> Self {
        let folded = value.map(|v| v.trim().to_ascii_lowercase().replace(['_', '-'], ""));
        match folded.as_deref() {
            Some("managed" | "managedpolicy") => Self::Managed,
            Some("project") => Self::Project,
            _ => Self::Local,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Managed => "managed",
            Self::Project => "project",
            Self::Local => "local",
        }
    }

    /// Scope values may arrive as a string or as `{"type": "..."}`.
    fn from_field(obj: &Object) -> Self {
        match keys::SCOPE.lookup(obj) {
            Some(Value::Object(tagged)) => {
                Self::normalize(tagged.get("type").and_then(Value::as_str))
            }
            _ => Self::normalize(keys::SCOPE.string(obj).as_deref()),
        }
    }
}

/// Overall validation verdict. Unrecognized values become `Error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Ok,
    Warning,
    Error,
}

impl ValidationStatus {
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ok" => Self::Ok,
            "warning" | "warn" => Self::Warning,
            _ => Self::Error,
        }
    }

    /// Engine exit codes for `hooks validate`: 0 ok, 3 warning, else error.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            3 => Self::Warning,
            _ => Self::Error,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedHook {
    pub hook_id: Option<String>,
    pub reason: String,
    pub details: Option<String>,
}

impl SkippedHook {
    fn from_object(obj: &Object) -> Self {
        Self {
            hook_id: keys::HOOK_ID.string(obj),
            reason: keys::REASON.string_or(obj, UNKNOWN),
            details: keys::DETAILS.string(obj),
        }
    }
}

/// Load metadata for one configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookLayerSummary {
    pub scope: HookScope,
    pub path: String,
    pub checksum: String,
    pub loaded_hooks: usize,
    pub skipped_hooks: Vec<SkippedHook>,
}

impl HookLayerSummary {
    fn from_object(obj: &Object) -> Self {
        Self {
            scope: HookScope::from_field(obj),
            path: keys::PATH.string_or(obj, ""),
            checksum: keys::CHECKSUM.string_or(obj, ""),
            loaded_hooks: keys::LOADED_HOOKS.count(obj),
            skipped_hooks: keys::SKIPPED_HOOKS
                .objects(obj)
                .into_iter()
                .map(SkippedHook::from_object)
                .collect(),
        }
    }
}

impl FromPayload for HookLayerSummary {
    fn from_payload(value: &Value) -> Result<Self, String> {
        expect_object(value, "a hook layer").map(Self::from_object)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookEntry {
    pub id: String,
    pub scope: HookScope,
    pub command: Vec<String>,
    pub notes: Option<String>,
}

impl HookEntry {
    fn from_object(obj: &Object) -> Self {
        Self {
            id: keys::ID.string_or(obj, ""),
            scope: HookScope::from_field(obj),
            command: keys::COMMAND.strings(obj),
            notes: keys::NOTES.string(obj),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookEventEntry {
    pub event: String,
    pub hooks: Vec<HookEntry>,
}

impl HookEventEntry {
    fn from_object(obj: &Object) -> Self {
        Self {
            event: keys::EVENT.string_or(obj, UNKNOWN),
            hooks: keys::HOOKS
                .objects(obj)
                .into_iter()
                .map(HookEntry::from_object)
                .collect(),
        }
    }
}

/// Output of `hooks list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookRegistrySnapshot {
    pub layers: Vec<HookLayerSummary>,
    pub events: Vec<HookEventEntry>,
}

impl FromPayload for HookRegistrySnapshot {
    fn from_payload(value: &Value) -> Result<Self, String> {
        let obj = expect_object(value, "a hook registry snapshot")?;
        Ok(Self {
            layers: layers(obj),
            events: keys::EVENTS
                .objects(obj)
                .into_iter()
                .map(HookEventEntry::from_object)
                .collect(),
        })
    }
}

/// Output of `hooks validate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookValidation {
    pub status: ValidationStatus,
    pub layers: Vec<HookLayerSummary>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl HookValidation {
    /// Build from a parsed body; `exit_code` decides the status when the
    /// body does not carry one.
    fn from_body(obj: &Object, exit_code: i32) -> Self {
        let status = match keys::STATUS.string(obj) {
            Some(status) => ValidationStatus::normalize(&status),
            None => ValidationStatus::from_exit_code(exit_code),
        };
        Self {
            status,
            layers: layers(obj),
            errors: keys::ERRORS.strings(obj),
            warnings: keys::WARNINGS.strings(obj),
        }
    }
}

impl FromPayload for HookValidation {
    fn from_payload(value: &Value) -> Result<Self, String> {
        expect_object(value, "a validation summary").map(|obj| Self::from_body(obj, 0))
    }
}

/// One line of the hook execution log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecLogRecord {
    pub timestamp: String,
    pub event: String,
    pub hook_id: String,
    pub decision: String,
    pub message: Option<String>,
}

impl ExecLogRecord {
    fn from_object(obj: &Object) -> Self {
        // Newer engines nest the outcome: {"decision": {"decision": "Allow", "message": ...}}.
        let nested = match keys::DECISION.lookup(obj) {
            Some(Value::Object(inner)) => Some(inner),
            _ => None,
        };
        let decision = match nested {
            Some(inner) => keys::DECISION.string_or(inner, UNKNOWN),
            None => keys::DECISION.string_or(obj, UNKNOWN),
        };
        let message = keys::MESSAGE
            .string(obj)
            .or_else(|| nested.and_then(|inner| keys::MESSAGE.string(inner)));

        Self {
            timestamp: keys::TIMESTAMP.string_or(obj, ""),
            event: keys::EVENT.string_or(obj, UNKNOWN),
            hook_id: keys::LOG_HOOK_ID.string_or(obj, ""),
            decision,
            message,
        }
    }
}

impl FromPayload for ExecLogRecord {
    fn from_payload(value: &Value) -> Result<Self, String> {
        expect_object(value, "an execution log record").map(Self::from_object)
    }
}

/// Output of `hooks exec-log`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookExecLog {
    pub records: Vec<ExecLogRecord>,
}

impl FromPayload for HookExecLog {
    fn from_payload(value: &Value) -> Result<Self, String> {
        let records: Vec<&Object> = match value {
            Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
            Value::Object(obj) => keys::RECORDS.objects(obj),
            other => {
                return Err(format!(
                    "expected a JSON array of log records, got {}",
                    type_name(other)
                ));
            }
        };
        Ok(Self {
            records: records.into_iter().map(ExecLogRecord::from_object).collect(),
        })
    }
}

/// Output of `hooks reload`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookReload {
    pub reloaded: bool,
    pub message: Option<String>,
}

impl HookReload {
    /// `hooks reload` prints plain text; a JSON object is honored if a
    /// newer engine sends one.
    fn from_output(output: &RawOutput) -> Self {
        if let Ok(Some(Value::Object(obj))) = parse_payload(&output.stdout) {
            return Self {
                reloaded: keys::RELOADED.flag(&obj).unwrap_or(false),
                message: keys::MESSAGE.string(&obj),
            };
        }
        let text = output.stdout.trim();
        Self {
            reloaded: false,
            message: (!text.is_empty()).then(|| text.to_string()),
        }
    }
}

/// An error report carries an `error` message and none of the summary fields.
fn is_error_body(obj: &Object, stdout: &str) -> bool {
    let summary = [keys::STATUS, keys::LAYERS, keys::ERRORS, keys::WARNINGS];
    structured_error(stdout).is_some()
        && summary.iter().all(|field| field.lookup(obj).is_none())
}

fn layers(obj: &Object) -> Vec<HookLayerSummary> {
    keys::LAYERS
        .objects(obj)
        .into_iter()
        .map(HookLayerSummary::from_object)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct HookListOptions {
    pub event: Option<String>,
    pub scope: Option<HookScope>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub scope: Option<HookScope>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecLogOptions {
    /// RFC 3339 timestamp; only records at or after it are returned.
    pub since: Option<String>,
    pub event: Option<String>,
    pub hook_id: Option<String>,
    /// Keep only the most recent N records.
    pub tail: Option<u32>,
    pub timeout: Option<Duration>,
}

/// Typed front for the `hooks` command family.
pub struct HooksClient {
    runner: Arc<dyn CommandRunner>,
}

impl HooksClient {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn list(
        &self,
        options: &HookListOptions,
    ) -> Result<HookRegistrySnapshot, BridgeError> {
        let request = InvocationRequest::new(list_args(options)).with_timeout(options.timeout);
        let output = ensure_success(self.runner.run(request).await?)?;
        normalize(output)
    }

    /// Validation embeds its verdict in the body, and the engine exits
    /// non-zero for warnings and errors. The body is parsed first; an empty
    /// or unparseable body, or a bare `{"error": ...}` body, on a non-zero
    /// exit becomes an error.
    pub async fn validate(
        &self,
        options: &ValidateOptions,
    ) -> Result<HookValidation, BridgeError> {
        let request = InvocationRequest::new(validate_args(options)).with_timeout(options.timeout);
        let output = self.runner.run(request).await?;

        if output.success() {
            return normalize(output);
        }
        match parse_payload(&output.stdout) {
            Ok(Some(Value::Object(obj))) if !is_error_body(&obj, &output.stdout) => {
                Ok(HookValidation::from_body(&obj, output.exit_code))
            }
            _ => Err(classify_exit(output)),
        }
    }

    pub async fn exec_log(&self, options: &ExecLogOptions) -> Result<HookExecLog, BridgeError> {
        let request = InvocationRequest::new(exec_log_args(options))
            .with_timeout(options.timeout)
            .requiring_logs_dir();
        let output = ensure_success(self.runner.run(request).await?)?;
        normalize(output)
    }

    pub async fn reload(&self, timeout: Option<Duration>) -> Result<HookReload, BridgeError> {
        let request = InvocationRequest::new(["hooks", "reload"]).with_timeout(timeout);
        let output = ensure_success(self.runner.run(request).await?)?;
        Ok(HookReload::from_output(&output))
    }
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

pub fn list_args(options: &HookListOptions) -> Vec<String> {
    let mut args = vec!["hooks".to_string(), "list".to_string(), "--json".to_string()];
    push_flag(&mut args, "--event", options.event.as_deref());
    push_flag(&mut args, "--scope", options.scope.map(HookScope::as_str));
    args
}

pub fn validate_args(options: &ValidateOptions) -> Vec<String> {
    let mut args = vec!["hooks".to_string(), "validate".to_string(), "--json".to_string()];
    push_flag(&mut args, "--scope", options.scope.map(HookScope::as_str));
    args
}

pub fn exec_log_args(options: &ExecLogOptions) -> Vec<String> {
    let mut args = vec!["hooks".to_string(), "exec-log".to_string(), "--json".to_string()];
    push_flag(&mut args, "--since", options.since.as_deref());
    push_flag(&mut args, "--event", options.event.as_deref());
    push_flag(&mut args, "--hook-id", options.hook_id.as_deref());
    let tail = options.tail.map(|n| n.to_string());
    push_flag(&mut args, "--tail", tail.as_deref());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scope_aliases() {
        assert_eq!(HookScope::normalize(Some("managed")), HookScope::Managed);
        assert_eq!(HookScope::normalize(Some("managedPolicy")), HookScope::Managed);
        assert_eq!(HookScope::normalize(Some("managed_policy")), HookScope::Managed);
        assert_eq!(HookScope::normalize(Some("Project")), HookScope::Project);
        assert_eq!(HookScope::normalize(Some("localUser")), HookScope::Local);
        assert_eq!(HookScope::normalize(Some("enterprise")), HookScope::Local);
        assert_eq!(HookScope::normalize(None), HookScope::Local);
    }

    #[test]
    fn tagged_scope_object() {
        let layer = HookLayerSummary::from_payload(&json!({
            "scope": {"type": "managedPolicy", "name": "corp"},
            "path": "/etc/codex/hooks/policy.toml",
        }))
        .unwrap();
        assert_eq!(layer.scope, HookScope::Managed);
    }

    #[test]
    fn validation_status_fallback_is_error() {
        assert_eq!(ValidationStatus::normalize("ok"), ValidationStatus::Ok);
        assert_eq!(ValidationStatus::normalize("WARNING"), ValidationStatus::Warning);
        assert_eq!(ValidationStatus::normalize("exploded"), ValidationStatus::Error);
    }

    #[test]
    fn validation_status_from_exit_codes() {
        assert_eq!(ValidationStatus::from_exit_code(0), ValidationStatus::Ok);
        assert_eq!(ValidationStatus::from_exit_code(3), ValidationStatus::Warning);
        assert_eq!(ValidationStatus::from_exit_code(2), ValidationStatus::Error);
    }

    #[test]
    fn layer_conventions_normalize_identically() {
        let camel = HookLayerSummary::from_payload(&json!({
            "scope": "project",
            "path": "/repo/.codex/hooks.toml",
            "checksum": "abc",
            "loadedHooks": 2,
            "skippedHooks": [{"hookId": "fmt", "reason": "duplicateId"}],
        }))
        .unwrap();
        let snake = HookLayerSummary::from_payload(&json!({
            "scope": "project",
            "path": "/repo/.codex/hooks.toml",
            "checksum": "abc",
            "loaded_hooks": 2,
            "skipped_hooks": [{"hook_id": "fmt", "reason": "duplicateId"}],
        }))
        .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.skipped_hooks[0].hook_id.as_deref(), Some("fmt"));
    }

    #[test]
    fn skipped_hook_defaults() {
        let layer = HookLayerSummary::from_payload(&json!({"skippedHooks": [{}]})).unwrap();
        let skipped = &layer.skipped_hooks[0];
        assert_eq!(skipped.reason, UNKNOWN);
        assert!(skipped.hook_id.is_none());
        assert!(skipped.details.is_none());
    }

    #[test]
    fn snapshot_events_and_hooks() {
        let snapshot = HookRegistrySnapshot::from_payload(&json!({
            "layers": [],
            "events": [{
                "event": "PreToolUse",
                "hooks": [{
                    "id": "guard",
                    "scope": "managed",
                    "command": ["./guard.sh", "--strict"],
                }],
            }, {}],
        }))
        .unwrap();
        assert_eq!(snapshot.events.len(), 2);
        assert_eq!(snapshot.events[0].hooks[0].command, ["./guard.sh", "--strict"]);
        assert_eq!(snapshot.events[1].event, UNKNOWN);
        assert!(snapshot.events[1].hooks.is_empty());
    }

    #[test]
    fn exec_log_flat_and_nested_decisions() {
        let log = HookExecLog::from_payload(&json!([
            {"time": "2025-01-01T00:00:00.000Z", "event": "PreToolUse", "hook": "guard",
             "decision": "Allow"},
            {"timestamp": "2025-01-02T00:00:00.000Z", "event": "Stop", "hookId": "notify",
             "decision": {"decision": "Deny", "message": "blocked"}},
        ]))
        .unwrap();
        assert_eq!(log.records[0].hook_id, "guard");
        assert_eq!(log.records[0].timestamp, "2025-01-01T00:00:00.000Z");
        assert_eq!(log.records[0].decision, "Allow");
        assert_eq!(log.records[1].decision, "Deny");
        assert_eq!(log.records[1].message.as_deref(), Some("blocked"));
    }

    #[test]
    fn exec_log_wrapped_records() {
        let log = HookExecLog::from_payload(&json!({"records": [{"event": "Stop"}]})).unwrap();
        assert_eq!(log.records.len(), 1);
        assert_eq!(log.records[0].decision, UNKNOWN);
        assert_eq!(log.records[0].hook_id, "");
    }

    #[test]
    fn exec_log_rejects_scalars() {
        assert!(HookExecLog::from_payload(&json!(42)).is_err());
    }

    #[test]
    fn reload_plain_text_and_json() {
        let text = crate::runner::mock::output(
            "Hook reload requests are only supported inside an active Codex session.\n",
            "",
            0,
        );
        let reload = HookReload::from_output(&text);
        assert!(!reload.reloaded);
        assert!(reload.message.unwrap().starts_with("Hook reload requests"));

        let json = crate::runner::mock::output(r#"{"reloaded": true}"#, "", 0);
        assert_eq!(
            HookReload::from_output(&json),
            HookReload {
                reloaded: true,
                message: None
            }
        );

        let empty = crate::runner::mock::output("", "", 0);
        assert_eq!(HookReload::from_output(&empty), HookReload::default());
    }

    #[test]
    fn args_append_only_present_flags() {
        assert_eq!(list_args(&HookListOptions::default()), ["hooks", "list", "--json"]);
        assert_eq!(
            exec_log_args(&ExecLogOptions {
                since: Some("2025-01-01T00:00:00Z".into()),
                tail: Some(5),
                ..ExecLogOptions::default()
            }),
            ["hooks", "exec-log", "--json", "--since", "2025-01-01T00:00:00Z", "--tail", "5"]
        );
        assert_eq!(
            validate_args(&ValidateOptions {
                scope: Some(HookScope::Managed),
                timeout: None,
            }),
            ["hooks", "validate", "--json", "--scope", "managed"]
        );
    }
}
