// src/config/llm.rs
use anyhow::bail;
use serde::Deserialize;

use super::{env_value, require, set_from_env, ENV_MARKER};

fn default_max_input_chars() -> usize {
    50_000
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "gemini" | "openai" | "mock" (case-insensitive)
    pub provider: String,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    pub api_key: String,
    /// Provider default when absent.
    pub model: Option<String>,
    /// Override of the provider endpoint, mostly for tests.
    pub base_url: Option<String>,
    /// Markdown beyond this many chars is cut before prompting.
    pub max_input_chars: usize,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key: ENV_MARKER.to_string(),
            model: None,
            base_url: None,
            max_input_chars: default_max_input_chars(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    pub fn provider_normalized(&self) -> String {
        self.provider.trim().to_lowercase()
    }

    pub(crate) fn apply_env(&mut self) {
        set_from_env(&mut self.provider, "LLM_PROVIDER");
        self.provider = self.provider_normalized();

        let (key_var, model_var) = match self.provider.as_str() {
            "gemini" => ("GEMINI_API_KEY", "GEMINI_MODEL_NAME"),
            "openai" => ("OPENAI_API_KEY", "OPENAI_MODEL_NAME"),
            _ => return,
        };
        // Explicit keys in the file win unless they are the ENV marker.
        if self.api_key.trim().is_empty() || self.api_key.trim().eq_ignore_ascii_case(ENV_MARKER) {
            set_from_env(&mut self.api_key, key_var);
        }
        if let Some(model) = env_value(model_var) {
            self.model = Some(model);
        }
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        match self.provider_normalized().as_str() {
            "mock" => Ok(()),
            "gemini" => require(&self.api_key, "GEMINI_API_KEY"),
            "openai" => require(&self.api_key, "OPENAI_API_KEY"),
            other => bail!("Unsupported LLM provider in config: {other}"),
        }
    }
}
