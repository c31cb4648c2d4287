//! Ordered key lookup for fields the engine may spell more than one way.
//!
//! Each canonical field owns a [`Field`] listing its accepted source keys,
//! preferred spelling first. A key whose value is `null` counts as absent,
//! so lookup falls through to the next spelling. Values of the wrong JSON
//! type also count as absent and the caller's default applies.

use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

#[derive(Debug, Clone, Copy)]
pub struct Field {
    keys: &'static [&'static str],
}

impl Field {
    pub const fn new(keys: &'static [&'static str]) -> Self {
        Self { keys }
    }

    /// First non-null value among the accepted keys.
    pub fn lookup<'a>(&self, obj: &'a Object) -> Option<&'a Value> {
        self.keys
            .iter()
            .filter_map(|key| obj.get(*key))
            .find(|value| !value.is_null())
    }

    /// Strings pass through; numbers and booleans are rendered.
    pub fn string(&self, obj: &Object) -> Option<String> {
        match self.lookup(obj)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn string_or(&self, obj: &Object, default: &str) -> String {
        self.string(obj).unwrap_or_else(|| default.to_string())
    }

    /// An array of strings. A lone string becomes a one-element list;
    /// non-string entries are dropped.
    pub fn strings(&self, obj: &Object) -> Vec<String> {
        match self.lookup(obj) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// A non-negative count, accepting numeric strings.
    pub fn count(&self, obj: &Object) -> usize {
        match self.lookup(obj) {
            Some(Value::Number(n)) => n.as_u64().map(|n| n as usize).unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        }
    }

    pub fn flag(&self, obj: &Object) -> Option<bool> {
        match self.lookup(obj)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_u64().map(|n| n != 0),
            _ => None,
        }
    }

    /// The object entries of an array field; other entries are skipped.
    pub fn objects<'a>(&self, obj: &'a Object) -> Vec<&'a Object> {
        match self.lookup(obj) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SOURCE_PATH: Field = Field::new(&["sourcePath", "source_path"]);

    fn obj(value: Value) -> Object {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn preferred_key_wins() {
        let o = obj(json!({"source_path": "/snake", "sourcePath": "/camel"}));
        assert_eq!(SOURCE_PATH.string(&o).as_deref(), Some("/camel"));
    }

    #[test]
    fn falls_through_null_to_alternate() {
        let o = obj(json!({"sourcePath": null, "source_path": "/snake"}));
        assert_eq!(SOURCE_PATH.string(&o).as_deref(), Some("/snake"));
    }

    #[test]
    fn missing_uses_default() {
        let o = obj(json!({}));
        assert_eq!(SOURCE_PATH.string_or(&o, ""), "");
    }

    #[test]
    fn wrong_type_counts_as_absent() {
        let o = obj(json!({"sourcePath": {"nested": true}}));
        assert_eq!(SOURCE_PATH.string(&o), None);
    }

    #[test]
    fn strings_tolerates_scalars_and_junk() {
        let tools = Field::new(&["tools"]);
        assert_eq!(tools.strings(&obj(json!({"tools": ["a", 1, "b"]}))), ["a", "b"]);
        assert_eq!(tools.strings(&obj(json!({"tools": "shell"}))), ["shell"]);
        assert!(tools.strings(&obj(json!({"tools": 3}))).is_empty());
    }

    #[test]
    fn count_accepts_numbers_and_strings() {
        let loaded = Field::new(&["loadedHooks", "loaded_hooks"]);
        assert_eq!(loaded.count(&obj(json!({"loaded_hooks": 4}))), 4);
        assert_eq!(loaded.count(&obj(json!({"loadedHooks": "7"}))), 7);
        assert_eq!(loaded.count(&obj(json!({"loadedHooks": -1}))), 0);
    }

    #[test]
    fn flag_parses_common_spellings() {
        let reloaded = Field::new(&["reloaded"]);
        assert_eq!(reloaded.flag(&obj(json!({"reloaded": true}))), Some(true));
        assert_eq!(reloaded.flag(&obj(json!({"reloaded": "no"}))), Some(false));
        assert_eq!(reloaded.flag(&obj(json!({"reloaded": "maybe"}))), None);
    }

    #[test]
    fn objects_skips_non_objects() {
        let layers = Field::new(&["layers"]);
        let o = obj(json!({"layers": [{"path": "a"}, 3, "x", {"path": "b"}]}));
        assert_eq!(layers.objects(&o).len(), 2);
    }
}
