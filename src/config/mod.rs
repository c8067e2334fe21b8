//! Service configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file
//! (`$LINKSAVER_CONFIG` or `config/linksaver.toml`), then environment
//! variables. Secrets normally come from the environment; a TOML value of
//! `"ENV"` marks a field that must be supplied that way.

pub mod llm;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use llm::LlmConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/linksaver.toml";
pub const ENV_CONFIG_PATH: &str = "LINKSAVER_CONFIG";

/// Marker meaning "read this value from the environment".
pub const ENV_MARKER: &str = "ENV";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Public base URL of this service, linked from chat replies.
    pub app_url: String,
    /// How many previously saved entries are given to the model as context.
    pub context_entries: usize,
    /// How many tag-related entries feed the insight prompt.
    pub related_limit: usize,
    pub telegram: TelegramConfig,
    pub reader: ReaderConfig,
    pub llm: LlmConfig,
    pub store: StoreConfig,
    pub telegraph: TelegraphConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:8000".to_string(),
            context_entries: 5,
            related_limit: 5,
            telegram: TelegramConfig::default(),
            reader: ReaderConfig::default(),
            llm: LlmConfig::default(),
            store: StoreConfig::default(),
            telegraph: TelegraphConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`; unchecked when absent.
    pub secret_token: Option<String>,
    pub api_base: String,
    /// Per-call timeout for Bot API requests.
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: ENV_MARKER.to_string(),
            secret_token: None,
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://r.jina.ai".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Notion,
    /// Process-local store, for local runs without a Notion workspace.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub api_key: String,
    pub database_id: String,
    pub api_base: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Notion,
            api_key: ENV_MARKER.to_string(),
            database_id: ENV_MARKER.to_string(),
            api_base: "https://api.notion.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegraphConfig {
    /// Created on first publish when absent.
    pub access_token: Option<String>,
    pub short_name: String,
    pub author_name: String,
    pub api_base: String,
}

impl Default for TelegraphConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            short_name: "LinkSaver".to_string(),
            author_name: "AI Link Saver".to_string(),
            api_base: "https://api.telegra.ph".to_string(),
        }
    }
}

impl AppConfig {
    /// Load defaults + optional file + environment, then validate.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    bail!("{ENV_CONFIG_PATH} points to non-existent path {}", path.display());
                }
                Self::load_from_file(&path)?
            }
            Err(_) => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load_from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Override fields from well-known environment variables.
    pub fn apply_env(&mut self) {
        set_from_env(&mut self.app_url, "APP_URL");
        set_from_env(&mut self.telegram.bot_token, "TELEGRAM_BOT_TOKEN");
        set_opt_from_env(&mut self.telegram.secret_token, "TELEGRAM_SECRET_TOKEN");
        set_opt_from_env(&mut self.reader.api_key, "JINA_API_KEY");
        set_from_env(&mut self.store.api_key, "NOTION_KEY");
        set_from_env(&mut self.store.database_id, "NOTION_DATABASE_ID");
        set_opt_from_env(&mut self.telegraph.access_token, "TELEGRAPH_ACCESS_TOKEN");
        if let Some(backend) = env_value("STORE_BACKEND") {
            match backend.to_ascii_lowercase().as_str() {
                "memory" => self.store.backend = StoreBackend::Memory,
                "notion" => self.store.backend = StoreBackend::Notion,
                other => tracing::warn!(backend = other, "ignoring unknown STORE_BACKEND"),
            }
        }
        self.llm.apply_env();
    }

    /// Reject configurations that cannot reach the required services.
    pub fn validate(&self) -> Result<()> {
        require(&self.telegram.bot_token, "TELEGRAM_BOT_TOKEN")?;
        if self.store.backend == StoreBackend::Notion {
            require(&self.store.api_key, "NOTION_KEY")?;
            require(&self.store.database_id, "NOTION_DATABASE_ID")?;
        }
        self.llm.validate()?;
        if self.app_url.trim().is_empty() {
            bail!("app_url must not be empty");
        }
        Ok(())
    }
}

pub(crate) fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn set_from_env(field: &mut String, name: &str) {
    if let Some(v) = env_value(name) {
        *field = v;
    }
}

fn set_opt_from_env(field: &mut Option<String>, name: &str) {
    if let Some(v) = env_value(name) {
        *field = Some(v);
    }
}

pub(crate) fn require(value: &str, env_name: &str) -> Result<()> {
    let v = value.trim();
    if v.is_empty() || v.eq_ignore_ascii_case(ENV_MARKER) {
        return Err(anyhow!("Missing {env_name} env var"));
    }
    Ok(())
}
