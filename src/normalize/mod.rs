//! Converting engine stdout into canonical records.
//!
//! The engine has changed its JSON shape across versions, so records are
//! built field by field from a [`serde_json::Value`] through the lookup
//! tables in [`fields`] rather than deserialized with a fixed schema.
//! Empty output normalizes to the record's default; unparseable output is
//! always a [`BridgeError::MalformedPayload`].

pub mod fields;

use serde_json::Value;

use crate::error::BridgeError;
use crate::runner::RawOutput;

/// A canonical record that can be built from a loosely-typed payload.
pub trait FromPayload: Default + Sized {
    /// Build from a parsed, non-empty payload. Returns `Err(reason)` when
    /// the top-level shape cannot represent this record at all.
    fn from_payload(value: &Value) -> Result<Self, String>;
}

/// Parse stdout as JSON. `Ok(None)` means there was nothing to parse.
pub fn parse_payload(stdout: &str) -> Result<Option<Value>, serde_json::Error> {
    let text = stdout.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text).map(Some)
}

/// Normalize the stdout of `output` into `T`.
pub fn normalize<T: FromPayload>(output: RawOutput) -> Result<T, BridgeError> {
    match parse_payload(&output.stdout) {
        Ok(None) => Ok(T::default()),
        Ok(Some(value)) => T::from_payload(&value)
            .map_err(|reason| BridgeError::MalformedPayload { reason, output }),
        Err(e) => Err(BridgeError::MalformedPayload {
            reason: e.to_string(),
            output,
        }),
    }
}

/// Require a JSON object at the top level.
pub fn expect_object<'a>(value: &'a Value, what: &str) -> Result<&'a fields::Object, String> {
    value
        .as_object()
        .ok_or_else(|| format!("expected a JSON object for {what}, got {}", type_name(value)))
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl<T: FromPayload> FromPayload for Vec<T> {
    fn from_payload(value: &Value) -> Result<Self, String> {
        match value {
            Value::Array(items) => items.iter().map(T::from_payload).collect(),
            other => Err(format!("expected a JSON array, got {}", type_name(other))),
        }
    }
}
