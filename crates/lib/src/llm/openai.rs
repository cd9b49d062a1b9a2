//! OpenAI-compatible chat backend (https://api.openai.com/v1 by default).
//!
//! Implements the structured-completion service: schema asks request JSON
//! output and are re-validated locally, feeding the model a correction on
//! each failure until the retry budget runs out.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{conforms, ChatMessage, CompletionBackend, LlmError};
use crate::config::AiConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Client for an OpenAI-style chat completion API.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Build from the `ai` config section. A missing token falls back to
    /// the `OPENAI_API_KEY` environment variable.
    pub fn new(config: &AiConfig) -> Self {
        let base_url = config
            .url
            .as_ref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_key = config
            .token
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        Self {
            base_url,
            api_key,
            model,
            temperature: config.temperature,
            max_retries: config.max_retries,
            client: reqwest::Client::new(),
        }
    }

    /// POST /chat/completions: one round, first choice's content.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        response_format: Option<&Value>,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            response_format,
        };
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let res = request.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, body)));
        }
        let data: ChatCompletion = res.json().await?;
        data.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Api("completion returned no choices".to_string()))
    }
}

#[async_trait::async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        schema: Option<&Value>,
    ) -> Result<String, LlmError> {
        let Some(schema) = schema else {
            return self.chat(messages, None).await;
        };
        let format = json!({"type": "json_object"});
        let mut transcript = messages.to_vec();
        let attempts = self.max_retries + 1;
        let mut detail = String::new();
        for _ in 0..attempts {
            let reply = self.chat(&transcript, Some(&format)).await?;
            match checked(&reply, schema) {
                Ok(()) => return Ok(reply),
                Err(problem) => {
                    log::debug!("schema check failed, asking for a correction: {problem}");
                    transcript.push(ChatMessage::assistant(&reply));
                    transcript.push(ChatMessage::user(format!(
                        "The previous reply did not satisfy the required schema: {problem}. \
                         Return ONLY corrected JSON, nothing else."
                    )));
                    detail = problem;
                }
            }
        }
        Err(LlmError::Service { attempts, detail })
    }
}

fn checked(reply: &str, schema: &Value) -> Result<(), String> {
    let value: Value =
        serde_json::from_str(reply).map_err(|e| format!("reply is not valid JSON: {e}"))?;
    conforms(&value, schema)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}
