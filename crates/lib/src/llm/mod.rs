//! Typed LLM access: transcript building, schema-constrained asks, and
//! script generation on top of an OpenAI-style chat API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod client;
pub mod openai;
pub mod scripting;

pub use client::{ResponseShape, TypedClient};
pub use openai::OpenAiClient;
pub use scripting::{clean_markdown_fences, ScriptingClient};

/// One chat message in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("No schema specified. Call `with_schema(...)` before `ask(...)`.")]
    NoSchema,
    #[error("llm request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("llm api error: {0}")]
    Api(String),
    /// Schema-validation retries exhausted; nothing left to do locally.
    #[error("model failed to produce a schema-conformant answer after {attempts} attempts: {detail}")]
    Service { attempts: u32, detail: String },
    #[error("{0}")]
    MissingConfig(String),
}

/// The structured-completion service: given a transcript and an optional
/// JSON schema, produce assistant text (conformant JSON when a schema is
/// set, retrying internally).
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        schema: Option<&Value>,
    ) -> Result<String, LlmError>;
}

/// Structural check of a JSON value against a schema subset: `type`,
/// `properties`, and `required`.
pub(crate) fn conforms(value: &Value, schema: &Value) -> Result<(), String> {
    let ty = schema.get("type").and_then(Value::as_str).unwrap_or("object");
    match ty {
        "object" => {
            let Some(obj) = value.as_object() else {
                return Err(format!("expected an object, got {}", kind_of(value)));
            };
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for key in required.iter().filter_map(Value::as_str) {
                    if !obj.contains_key(key) {
                        return Err(format!("missing required key '{key}'"));
                    }
                }
            }
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (key, prop) in props {
                    if let Some(v) = obj.get(key) {
                        conforms(v, prop).map_err(|e| format!("key '{key}': {e}"))?;
                    }
                }
            }
            Ok(())
        }
        "string" => check(value.is_string(), "a string", value),
        "integer" => check(value.is_i64() || value.is_u64(), "an integer", value),
        "number" => check(value.is_number(), "a number", value),
        "boolean" => check(value.is_boolean(), "a boolean", value),
        "array" => check(value.is_array(), "an array", value),
        _ => Ok(()),
    }
}

fn check(ok: bool, expected: &str, value: &Value) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(format!("expected {expected}, got {}", kind_of(value)))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_with_required_keys_passes() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "count": {"type": "integer"}},
            "required": ["name"]
        });
        assert!(conforms(&json!({"name": "a", "count": 3}), &schema).is_ok());
        assert!(conforms(&json!({"name": "a"}), &schema).is_ok());
    }

    #[test]
    fn missing_required_key_is_named() {
        let schema = json!({"type": "object", "required": ["name"]});
        let err = conforms(&json!({}), &schema).unwrap_err();
        assert_eq!(err, "missing required key 'name'");
    }

    #[test]
    fn property_type_mismatch_is_attributed() {
        let schema = json!({
            "type": "object",
            "properties": {"count": {"type": "integer"}}
        });
        let err = conforms(&json!({"count": "three"}), &schema).unwrap_err();
        assert_eq!(err, "key 'count': expected an integer, got string");
    }

    #[test]
    fn non_object_against_object_schema_fails() {
        let schema = json!({"type": "object"});
        assert!(conforms(&json!([1, 2]), &schema).is_err());
    }

    #[test]
    fn scalar_schemas_check_directly() {
        assert!(conforms(&json!(1.5), &json!({"type": "number"})).is_ok());
        assert!(conforms(&json!(2), &json!({"type": "number"})).is_ok());
        assert!(conforms(&json!(1.5), &json!({"type": "integer"})).is_err());
        assert!(conforms(&json!(true), &json!({"type": "boolean"})).is_ok());
    }
}
