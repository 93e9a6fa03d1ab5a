//! Declarative parameter rewriting
//!
//! Upstream providers that share a wire format still diverge on individual
//! field names and values (`max_tokens` vs `max_reasoning_token`, pinned
//! `temperature` for specific models). Those divergences are configuration
//! data, not adapter code: each model carries a `ParamRules` block that is
//! applied to the outbound payload before dispatch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter rules for one model, applied in a fixed order:
/// `add`, then `update`, then `rename`, then `delete`.
///
/// `add` and `update` both insert-or-overwrite; running `update` after
/// `add` means a configured update always wins over an added default.
/// `rename` runs on the final values so it relocates a field regardless of
/// whether the caller, `add`, or `update` produced it; renaming an absent
/// key is a no-op. `delete` runs last.
///
/// Rerunning the rules on their own output is idempotent as long as no
/// rename target equals another rule's source key; that precondition is on
/// the config author, not enforced here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamRules {
    pub add: Map<String, Value>,
    pub update: Map<String, Value>,
    pub rename: BTreeMap<String, String>,
    pub delete: Vec<String>,
}

impl ParamRules {
    /// Whether any rule is configured
    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.update.is_empty()
            && self.rename.is_empty()
            && self.delete.is_empty()
    }

    /// Apply the rules to a payload, returning a new map
    ///
    /// Pure: the input map is never mutated.
    pub fn apply(&self, payload: &Map<String, Value>) -> Map<String, Value> {
        let mut out = payload.clone();

        for (key, value) in &self.add {
            out.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.update {
            out.insert(key.clone(), value.clone());
        }
        for (old_key, new_key) in &self.rename {
            if let Some(value) = out.remove(old_key) {
                out.insert(new_key.clone(), value);
            }
        }
        for key in &self.delete {
            out.remove(key);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn empty_rules_return_payload_unchanged() {
        let input = payload(json!({"temperature": 0.2, "messages": []}));
        let out = ParamRules::default().apply(&input);
        assert_eq!(out, input);
    }

    #[test]
    fn add_overwrites_existing_values() {
        let rules: ParamRules =
            serde_yaml::from_str("add:\n  reasoning_effort: high\n").unwrap();
        let input = payload(json!({"reasoning_effort": "low"}));
        assert_eq!(rules.apply(&input)["reasoning_effort"], "high");
    }

    #[test]
    fn update_wins_over_add_on_the_same_key() {
        let mut rules = ParamRules::default();
        rules.add.insert("temperature".into(), json!(1.0));
        rules.update.insert("temperature".into(), json!(0.6));

        let out = rules.apply(&payload(json!({})));
        assert_eq!(out["temperature"], json!(0.6));
    }

    #[test]
    fn rename_moves_the_final_value_and_removes_the_source() {
        let mut rules = ParamRules::default();
        rules
            .rename
            .insert("max_tokens".into(), "max_reasoning_token".into());

        let out = rules.apply(&payload(json!({"max_tokens": 8192})));
        assert!(out.get("max_tokens").is_none());
        assert_eq!(out["max_reasoning_token"], json!(8192));
    }

    #[test]
    fn rename_of_absent_key_is_a_noop() {
        let mut rules = ParamRules::default();
        rules.rename.insert("logit_bias".into(), "bias".into());

        let input = payload(json!({"temperature": 0.2}));
        assert_eq!(rules.apply(&input), input);
    }

    #[test]
    fn delete_removes_keys_last() {
        let mut rules = ParamRules::default();
        rules.add.insert("stream_options".into(), json!({"include_usage": true}));
        rules.delete.push("stream_options".into());

        let out = rules.apply(&payload(json!({})));
        assert!(out.get("stream_options").is_none());
    }

    #[test]
    fn input_is_not_mutated() {
        let mut rules = ParamRules::default();
        rules.update.insert("temperature".into(), json!(0.6));
        rules
            .rename
            .insert("max_tokens".into(), "max_reasoning_token".into());

        let input = payload(json!({"max_tokens": 8192, "temperature": 0.2}));
        let before = input.clone();
        let _ = rules.apply(&input);
        assert_eq!(input, before);
    }

    // Scenario from the deepseek-reasoner configuration: rename max_tokens,
    // pin temperature, leave everything else untouched.
    #[test]
    fn reasoner_rules_transform_payload() {
        let mut rules = ParamRules::default();
        rules.update.insert("temperature".into(), json!(0.6));
        rules
            .rename
            .insert("max_tokens".into(), "max_reasoning_token".into());

        let input = payload(json!({
            "max_tokens": 8192,
            "temperature": 0.2,
            "messages": [{"role": "user", "content": "hi"}]
        }));

        let out = rules.apply(&input);
        assert_eq!(
            Value::Object(out),
            json!({
                "max_reasoning_token": 8192,
                "temperature": 0.6,
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }
}
