//! Low-level model providers. Each one turns a prompt into raw text; prompt
//! construction and response parsing live one level up.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Ask the provider for a JSON object.
    Json,
    Text,
}

/// Does a *real* remote call (or a deterministic fake one).
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String>;
    fn name(&self) -> &'static str;
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("link-saver/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("building llm http client")
}

// ------------------------------------------------------------
// Gemini
// ------------------------------------------------------------

/// Google Gemini `generateContent`. Defaults to `gemini-1.5-flash`.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(cfg.timeout_secs)?,
            api_key: cfg.api_key.clone(),
            model: cfg
                .model
                .clone()
                .unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            base_url: cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiReq<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenCfg>,
}
#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPartOut<'a>>,
}
#[derive(Serialize)]
struct GeminiPartOut<'a> {
    text: &'a str,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenCfg {
    response_mime_type: &'static str,
}
#[derive(Deserialize)]
struct GeminiResp {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}
#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}
#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPartIn>,
}
#[derive(Deserialize)]
struct GeminiPartIn {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        let req = GeminiReq {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPartOut { text: prompt }],
            }],
            generation_config: (format == ResponseFormat::Json).then_some(GeminiGenCfg {
                response_mime_type: "application/json",
            }),
        };
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .context("gemini request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("gemini HTTP {status}: {}", truncate(&body, 300)));
        }
        let body: GeminiResp = resp.json().await.context("gemini response body")?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(anyhow!("gemini returned no text"));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// OpenAI
// ------------------------------------------------------------

/// OpenAI Chat Completions. Defaults to `gpt-4o-mini`.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(cfg.timeout_secs)?,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct RespFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<RespFormat>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
            response_format: (format == ResponseFormat::Json).then_some(RespFormat {
                kind: "json_object",
            }),
        };

        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("openai HTTP {status}: {}", truncate(&body, 300)));
        }
        let body: Resp = resp.json().await.context("openai response body")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow!("openai returned no content"))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Mock
// ------------------------------------------------------------

/// Deterministic provider for local runs/tests: fixed JSON for JSON
/// requests, fixed text otherwise.
#[derive(Clone)]
pub struct MockProvider {
    pub json: String,
    pub text: String,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            json: r#"{"summary":"Mock summary.","tags":["mock","testing"],"category":"Other"}"#
                .to_string(),
            text: "Mock insight.".to_string(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, _prompt: &str, format: ResponseFormat) -> Result<String> {
        Ok(match format {
            ResponseFormat::Json => self.json.clone(),
            ResponseFormat::Text => self.text.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
