//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.footman/config.json`).
//! Kept minimal: an optional AI section for script generation, and extra
//! environment entries for `${VAR}` parameter defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// AI backend settings for script generation. Absent means the
    /// generate command is unavailable.
    #[serde(default)]
    pub ai: Option<AiConfig>,

    /// Extra entries visible to `${VAR}` defaults, on top of the process
    /// environment. Config entries win on collision.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// AI backend: endpoint, model, and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    /// Base URL of an OpenAI-compatible API. Unset means the OpenAI default.
    pub url: Option<String>,

    pub model: Option<String>,

    /// API token. Overridden by OPENAI_API_KEY env when unset.
    pub token: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Schema-validation retries before giving up (default 2).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_retries() -> u32 {
    2
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            url: None,
            model: None,
            token: None,
            temperature: default_temperature(),
            max_retries: default_max_retries(),
        }
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("FOOTMAN_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".footman").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or FOOTMAN_CONFIG_PATH). Missing file
/// => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Environment mapping for parameter defaults: the process environment with
/// the config's extra entries layered on top.
pub fn collection_env(config: &Config) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    for (key, value) in &config.env {
        env.insert(key.clone(), value.clone());
    }
    env
}

/// Template directory next to the config file (e.g. `~/.footman/templates`).
pub fn templates_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("templates")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_defaults() {
        let ai = AiConfig::default();
        assert_eq!(ai.temperature, 0.0);
        assert_eq!(ai.max_retries, 2);
        assert!(ai.url.is_none());
    }

    #[test]
    fn parses_camel_case_sections() {
        let config: Config = serde_json::from_str(
            r#"{"ai": {"url": "http://api", "model": "m", "maxRetries": 5}}"#,
        )
        .unwrap();
        let ai = config.ai.unwrap();
        assert_eq!(ai.url.as_deref(), Some("http://api"));
        assert_eq!(ai.max_retries, 5);
        assert_eq!(ai.temperature, 0.0);
    }

    #[test]
    fn empty_json_is_the_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.ai.is_none());
        assert!(config.env.is_empty());
    }

    #[test]
    fn config_env_entries_override_process_entries() {
        let mut config = Config::default();
        config.env.insert("PATH".to_string(), "overridden".to_string());
        let env = collection_env(&config);
        assert_eq!(env.get("PATH").map(String::as_str), Some("overridden"));
    }

    #[test]
    fn templates_dir_sits_next_to_the_config() {
        let path = Path::new("/home/user/.footman/config.json");
        assert_eq!(
            templates_dir(path),
            PathBuf::from("/home/user/.footman/templates")
        );
    }
}
