//! Script generation: turn a plain-language description into a Footman
//! automation script.

use super::client::TypedClient;
use super::openai::OpenAiClient;
use super::{CompletionBackend, LlmError};
use crate::config::Config;

const SCRIPT_GUIDE: &str = include_str!("../../assets/script_guide.md");
const SCRIPT_TEMPLATE: &str = include_str!("../../assets/blank_script.rs");

const ROLE: &str = "You are a seasoned Rust developer, attentive to idiomatic style and the \
standard toolchain. Your code (in English only) must be readable, documented where it \
matters, and modular.";

const MISSION: &str = "Your mission is to generate a valid Footman automation script:
- Your output MUST strictly follow the structure shown in the example script and the script guide.
- Use the example script as a skeleton for your output.
- Do NOT output anything except the code itself, and do NOT add any extra text or explanations outside the code.
- The script must implement the Script trait with path, description, params and run.";

/// Generates automation scripts from instructions and project context.
pub struct ScriptingClient<B: CompletionBackend = OpenAiClient> {
    client: TypedClient<B>,
}

impl ScriptingClient<OpenAiClient> {
    /// Build from the loaded configuration; the `ai` section must name at
    /// least a url and a model.
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let Some(ai) = &config.ai else {
            return Err(missing_ai_config());
        };
        if ai.url.is_none() || ai.model.is_none() {
            return Err(missing_ai_config());
        }
        Ok(Self::with_backend(OpenAiClient::new(ai)))
    }
}

impl<B: CompletionBackend> ScriptingClient<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            client: TypedClient::new(backend),
        }
    }

    /// Generate a script from user instructions, with the guide and the
    /// blank template as context. Markdown fences are stripped from the
    /// reply before it is returned.
    pub async fn generate_script(&mut self, instructions: &str) -> Result<String, LlmError> {
        self.client.reset();
        self.client
            .with_instructions(&format!("{ROLE}\n\n{MISSION}"))
            .with_doc("script guide", SCRIPT_GUIDE)
            .with_example("Show me an example Footman script.", SCRIPT_TEMPLATE.trim());
        let raw = self.client.ask_raw(instructions).await?;
        Ok(clean_markdown_fences(&raw))
    }
}

fn missing_ai_config() -> LlmError {
    LlmError::MissingConfig(
        "AI config missing in ~/.footman/config.json (need 'ai': { 'url', 'model', ... })"
            .to_string(),
    )
}

/// Strip a surrounding fenced code block, including an optional language
/// tag, from generated text. Inner fences and anything unfenced pass
/// through untouched.
pub fn clean_markdown_fences(text: &str) -> String {
    let text = text.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }
    let mut lines: Vec<&str> = text.lines().collect();
    lines.remove(0);
    if lines.last().is_some_and(|l| l.trim() == "```") {
        lines.pop();
    }
    // A language tag sometimes lands on its own line below the fence.
    if lines
        .first()
        .is_some_and(|l| matches!(l.trim().to_ascii_lowercase().as_str(), "rust" | "rs"))
    {
        lines.remove(0);
    }
    lines.join("\n").trim().to_string()
}
