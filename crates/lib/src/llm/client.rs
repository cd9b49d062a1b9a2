//! Fluent, typed completion client.
//!
//! Builder calls append to an ordered transcript; `ask` sends it with a
//! response schema and unwraps the reply, `ask_raw` skips schema
//! enforcement entirely. Scalar shapes are wrapped in a single-field
//! object schema so the backend always validates against an object, and
//! unwrapped transparently on the way back.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use super::{ChatMessage, CompletionBackend, LlmError};

/// Expected shape of an `ask` reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    Text,
    Integer,
    Float,
    Boolean,
    /// A full object schema; passed to the backend as-is.
    Object { name: String, schema: Value },
}

impl ResponseShape {
    pub fn object(name: impl Into<String>, schema: Value) -> Self {
        Self::Object {
            name: name.into(),
            schema,
        }
    }

    fn is_object(&self) -> bool {
        matches!(self, Self::Object { .. })
    }

    /// Stable cache key for wrapper definitions.
    fn id(&self) -> String {
        match self {
            Self::Text => "string".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Float => "float".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Object { name, .. } => format!("object:{name}"),
        }
    }

    fn type_tag(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Boolean => "boolean",
            Self::Object { .. } => "object",
        }
    }
}

/// Transcript-building client over a completion backend.
pub struct TypedClient<B> {
    backend: B,
    messages: Vec<ChatMessage>,
    shape: Option<ResponseShape>,
    /// Wrapper schemas built so far, keyed by shape id. Owned by this
    /// instance; never shared across clients.
    wrappers: HashMap<String, Arc<Value>>,
}

impl<B: CompletionBackend> TypedClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            messages: Vec::new(),
            shape: None,
            wrappers: HashMap::new(),
        }
    }

    /// System instructions guiding overall behavior.
    pub fn with_instructions(&mut self, text: &str) -> &mut Self {
        self.messages.push(ChatMessage::system(text));
        self
    }

    /// One example exchange shaping the output format.
    pub fn with_example(&mut self, user: &str, assistant: &str) -> &mut Self {
        self.messages.push(ChatMessage::user(user));
        self.messages.push(ChatMessage::assistant(assistant));
        self
    }

    pub fn with_examples<'a, I>(&mut self, pairs: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (user, assistant) in pairs {
            self.with_example(user, assistant);
        }
        self
    }

    /// A named context document, acknowledged by a synthetic assistant turn.
    pub fn with_doc(&mut self, name: &str, content: &str) -> &mut Self {
        self.messages
            .push(ChatMessage::user(format!("Context document [{name}]:\n{content}")));
        self.messages.push(ChatMessage::assistant(format!(
            "Document '{name}' received and understood."
        )));
        self
    }

    /// Declare the expected reply shape for subsequent `ask` calls.
    pub fn with_schema(&mut self, shape: ResponseShape) -> &mut Self {
        self.shape = Some(shape);
        self.messages.push(ChatMessage::system(
            "Output constraint: You MUST return ONLY valid JSON. No text outside the JSON.",
        ));
        self
    }

    /// Clear the transcript and shape for a fresh session. The wrapper
    /// cache survives.
    pub fn reset(&mut self) -> &mut Self {
        self.messages.clear();
        self.shape = None;
        self
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn schema_for(&mut self, shape: &ResponseShape) -> Arc<Value> {
        if let Some(cached) = self.wrappers.get(&shape.id()) {
            return Arc::clone(cached);
        }
        let schema = match shape {
            ResponseShape::Object { schema, .. } => Arc::new(schema.clone()),
            scalar => Arc::new(json!({
                "type": "object",
                "properties": {
                    "value": {
                        "type": scalar.type_tag(),
                        "description": "Return the result in this field named 'value'"
                    }
                },
                "required": ["value"]
            })),
        };
        self.wrappers.insert(shape.id(), Arc::clone(&schema));
        schema
    }

    /// Send the transcript plus `prompt`, enforce the declared shape, and
    /// return the unwrapped value.
    pub async fn ask(&mut self, prompt: &str) -> Result<Value, LlmError> {
        let shape = self.shape.clone().ok_or(LlmError::NoSchema)?;
        let schema = self.schema_for(&shape);
        self.messages.push(ChatMessage::user(prompt));
        let reply = self
            .backend
            .complete(&self.messages, Some(schema.as_ref()))
            .await?;
        let value: Value = serde_json::from_str(&reply)
            .map_err(|e| LlmError::Api(format!("model returned invalid JSON: {e}")))?;
        if shape.is_object() {
            Ok(value)
        } else {
            value
                .get("value")
                .cloned()
                .ok_or_else(|| LlmError::Api("wrapper object missing the 'value' field".to_string()))
        }
    }

    /// Send the transcript plus `prompt` with no schema enforcement.
    pub async fn ask_raw(&mut self, prompt: &str) -> Result<String, LlmError> {
        self.messages.push(ChatMessage::user(prompt));
        self.backend.complete(&self.messages, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct MockBackend {
        replies: Mutex<VecDeque<String>>,
        calls: Mutex<Vec<(Vec<ChatMessage>, Option<Value>)>>,
    }

    impl MockBackend {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn last_schema(&self) -> Option<Value> {
            self.calls.lock().unwrap().last().and_then(|(_, s)| s.clone())
        }
    }

    #[async_trait::async_trait]
    impl CompletionBackend for MockBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            schema: Option<&Value>,
        ) -> Result<String, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), schema.cloned()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Api("mock ran out of replies".to_string()))
        }
    }

    fn client(replies: &[&str]) -> TypedClient<MockBackend> {
        TypedClient::new(MockBackend::new(replies))
    }

    #[tokio::test]
    async fn ask_without_schema_is_a_hard_error() {
        let mut client = client(&[]);
        let err = client.ask("2+2?").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "No schema specified. Call `with_schema(...)` before `ask(...)`."
        );
    }

    #[tokio::test]
    async fn scalar_shapes_are_wrapped_and_unwrapped() {
        let mut client = client(&[r#"{"value": 7}"#]);
        client.with_schema(ResponseShape::Integer);
        let value = client.ask("how many?").await.unwrap();
        assert_eq!(value, json!(7));
        let schema = client.backend.last_schema().unwrap();
        assert_eq!(schema["properties"]["value"]["type"], json!("integer"));
        assert_eq!(schema["required"], json!(["value"]));
    }

    #[tokio::test]
    async fn object_shapes_pass_through_unwrapped() {
        let shape = ResponseShape::object(
            "report",
            json!({
                "type": "object",
                "properties": {"title": {"type": "string"}},
                "required": ["title"]
            }),
        );
        let mut client = client(&[r#"{"title": "ok"}"#]);
        client.with_schema(shape.clone());
        let value = client.ask("report please").await.unwrap();
        assert_eq!(value, json!({"title": "ok"}));
        let ResponseShape::Object { schema, .. } = shape else {
            unreachable!()
        };
        assert_eq!(client.backend.last_schema().unwrap(), schema);
    }

    #[tokio::test]
    async fn wrapper_definitions_are_cached_per_shape() {
        let mut client = client(&[]);
        let first = client.schema_for(&ResponseShape::Text);
        let again = client.schema_for(&ResponseShape::Text);
        assert!(Arc::ptr_eq(&first, &again));
        let other = client.schema_for(&ResponseShape::Boolean);
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(client.wrappers.len(), 2);
    }

    #[tokio::test]
    async fn builders_append_in_call_order() {
        let mut client = client(&[]);
        client
            .with_instructions("Do this.")
            .with_example("UserQ", "AssistantA")
            .with_doc("README", "Some content");
        let roles: Vec<&str> = client
            .transcript()
            .iter()
            .map(|m| m.role.as_str())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user", "assistant"]);
        assert_eq!(
            client.transcript()[4].content,
            "Document 'README' received and understood."
        );
        assert!(client.transcript()[3]
            .content
            .starts_with("Context document [README]:\n"));
    }

    #[tokio::test]
    async fn with_schema_appends_the_output_constraint() {
        let mut client = client(&[]);
        client.with_schema(ResponseShape::Text);
        let last = client.transcript().last().unwrap();
        assert_eq!(last.role, "system");
        assert_eq!(
            last.content,
            "Output constraint: You MUST return ONLY valid JSON. No text outside the JSON."
        );
    }

    #[tokio::test]
    async fn reset_clears_transcript_and_shape_but_keeps_the_cache() {
        let mut client = client(&[r#"{"value": true}"#]);
        client.with_instructions("x").with_schema(ResponseShape::Boolean);
        client.ask("?").await.unwrap();
        assert_eq!(client.wrappers.len(), 1);
        client.reset();
        assert!(client.transcript().is_empty());
        let err = client.ask("?").await.unwrap_err();
        assert!(matches!(err, LlmError::NoSchema));
        assert_eq!(client.wrappers.len(), 1);
    }

    #[tokio::test]
    async fn ask_raw_passes_no_schema_and_returns_text_verbatim() {
        let mut client = client(&["plain text, not JSON"]);
        let reply = client.ask_raw("say something").await.unwrap();
        assert_eq!(reply, "plain text, not JSON");
        assert!(client.backend.last_schema().is_none());
    }

    #[tokio::test]
    async fn ask_keeps_the_prompt_in_the_transcript() {
        let mut client = client(&[r#"{"value": "hi"}"#]);
        client.with_schema(ResponseShape::Text);
        client.ask("greet me").await.unwrap();
        let last = client.transcript().last().unwrap();
        assert_eq!(last.role, "user");
        assert_eq!(last.content, "greet me");
    }

    #[tokio::test]
    async fn malformed_json_reply_surfaces_as_an_api_error() {
        let mut client = client(&["not json"]);
        client.with_schema(ResponseShape::Text);
        let err = client.ask("?").await.unwrap_err();
        assert!(matches!(err, LlmError::Api(_)));
    }
}
