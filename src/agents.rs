//! Subagent commands: `codex agents list|show|run`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::{classify_exit, ensure_success};
use crate::error::BridgeError;
use crate::normalize::fields::{Field, Object};
use crate::normalize::{FromPayload, expect_object, normalize, type_name};
use crate::runner::{CommandRunner, InvocationRequest};

mod keys {
    use super::Field;

    pub const NAME: Field = Field::new(&["name"]);
    pub const SCOPE: Field = Field::new(&["scope"]);
    pub const DESCRIPTION: Field = Field::new(&["description"]);
    pub const TOOLS: Field = Field::new(&["tools"]);
    pub const MODEL: Field = Field::new(&["model"]);
    pub const STATUS: Field = Field::new(&["status"]);
    pub const SOURCE_PATH: Field = Field::new(&["sourcePath", "source_path"]);
    pub const VALIDATION_ERRORS: Field = Field::new(&["validationErrors", "validation_errors"]);
    pub const SUBAGENTS: Field = Field::new(&["subagents"]);
    pub const INVALID: Field = Field::new(&["invalid"]);
    pub const SUMMARY: Field = Field::new(&["summary"]);
    pub const DETAIL_ARTIFACTS: Field = Field::new(&["detailArtifacts", "detail_artifacts"]);
}

/// Where a subagent definition lives. Unrecognized values become `All`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubagentScope {
    Project,
    User,
    #[default]
    All,
}

impl SubagentScope {
    pub fn normalize(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("project") => Self::Project,
            Some("user") => Self::User,
            _ => Self::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::User => "user",
            Self::All => "all",
        }
    }
}

/// Unrecognized values become `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubagentStatus {
    Active,
    Invalid,
    Disabled,
    #[default]
    Unknown,
}

impl SubagentStatus {
    pub fn normalize(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("active") => Self::Active,
            Some("invalid") => Self::Invalid,
            Some("disabled") => Self::Disabled,
            _ => Self::Unknown,
        }
    }
}

/// One subagent definition as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubagentRecord {
    pub name: String,
    pub scope: SubagentScope,
    pub description: String,
    pub tools: Vec<String>,
    pub model: Option<String>,
    pub status: SubagentStatus,
    pub source_path: String,
    pub validation_errors: Vec<String>,
}

impl SubagentRecord {
    fn from_object(obj: &Object) -> Self {
        Self {
            name: keys::NAME.string_or(obj, ""),
            scope: SubagentScope::normalize(keys::SCOPE.string(obj).as_deref()),
            description: keys::DESCRIPTION.string_or(obj, ""),
            tools: keys::TOOLS.strings(obj),
            model: keys::MODEL.string(obj),
            status: SubagentStatus::normalize(keys::STATUS.string(obj).as_deref()),
            source_path: keys::SOURCE_PATH.string_or(obj, ""),
            validation_errors: keys::VALIDATION_ERRORS.strings(obj),
        }
    }
}

impl FromPayload for SubagentRecord {
    fn from_payload(value: &Value) -> Result<Self, String> {
        expect_object(value, "a subagent record").map(Self::from_object)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubagentList {
    pub subagents: Vec<SubagentRecord>,
    pub invalid: Vec<SubagentRecord>,
}

impl FromPayload for SubagentList {
    fn from_payload(value: &Value) -> Result<Self, String> {
        let records = |field: Field, obj: &Object| -> Vec<SubagentRecord> {
            field
                .objects(obj)
                .into_iter()
                .map(SubagentRecord::from_object)
                .collect()
        };
        match value {
            Value::Object(obj) => Ok(Self {
                subagents: records(keys::SUBAGENTS, obj),
                invalid: records(keys::INVALID, obj),
            }),
            // Older engines printed a bare array of records.
            Value::Array(_) => Ok(Self {
                subagents: Vec::<SubagentRecord>::from_payload(value)?,
                invalid: Vec::new(),
            }),
            other => Err(format!(
                "expected a JSON object for a subagent list, got {}",
                type_name(other)
            )),
        }
    }
}

/// The outcome of invoking a subagent directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubagentRun {
    pub name: String,
    pub summary: Option<String>,
    pub model: Option<String>,
    pub tools: Vec<String>,
    pub detail_artifacts: Vec<String>,
}

impl FromPayload for SubagentRun {
    fn from_payload(value: &Value) -> Result<Self, String> {
        let obj = expect_object(value, "a subagent run result")?;
        Ok(Self {
            name: keys::NAME.string_or(obj, ""),
            summary: keys::SUMMARY.string(obj),
            model: keys::MODEL.string(obj),
            tools: keys::TOOLS.strings(obj),
            detail_artifacts: keys::DETAIL_ARTIFACTS.strings(obj),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// `None` and `Some(All)` both list every scope.
    pub scope: Option<SubagentScope>,
    pub include_invalid: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Restrict the invocation to these tools.
    pub tools: Vec<String>,
    pub timeout: Option<Duration>,
}

/// Typed front for the `agents` command family.
pub struct AgentsClient {
    runner: Arc<dyn CommandRunner>,
}

impl AgentsClient {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn list(&self, options: &ListOptions) -> Result<SubagentList, BridgeError> {
        let request = InvocationRequest::new(list_args(options)).with_timeout(options.timeout);
        let output = ensure_success(self.runner.run(request).await?)?;
        normalize(output)
    }

    pub async fn show(
        &self,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<SubagentRecord, BridgeError> {
        let request =
            InvocationRequest::new(["agents", "show", name, "--json"]).with_timeout(timeout);
        let output = ensure_success(self.runner.run(request).await?)?;
        normalize(output)
    }

    /// Invoke `name`. An empty success payload yields a result carrying
    /// only the requested name.
    pub async fn run(&self, name: &str, options: &RunOptions) -> Result<SubagentRun, BridgeError> {
        let request = InvocationRequest::new(run_args(name, options)).with_timeout(options.timeout);
        let output = self.runner.run(request).await?;
        if !output.success() {
            return Err(classify_exit(output));
        }
        if output.stdout.trim().is_empty() {
            return Ok(SubagentRun {
                name: name.to_string(),
                ..SubagentRun::default()
            });
        }
        normalize(output)
    }
}

pub fn list_args(options: &ListOptions) -> Vec<String> {
    let mut args: Vec<String> = ["agents", "list", "--json"].map(String::from).into();
    if let Some(scope) = options.scope.filter(|s| *s != SubagentScope::All) {
        args.extend(["--scope".to_string(), scope.as_str().to_string()]);
    }
    if options.include_invalid {
        args.push("--invalid".to_string());
    }
    args
}

pub fn run_args(name: &str, options: &RunOptions) -> Vec<String> {
    let mut args: Vec<String> = vec!["agents".into(), "run".into(), name.into(), "--json".into()];
    for tool in &options.tools {
        args.extend(["--tool".to_string(), tool.clone()]);
    }
    args
}
