//! Summaries, tags and insights from a language model.

pub mod prompt;
pub mod provider;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::{Result, ServiceError};
use crate::model::{Category, Entry};
use provider::{GeminiProvider, MockProvider, OpenAiProvider, Provider, ResponseFormat};

pub struct SummaryRequest<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub markdown: &'a str,
    /// Recently saved entries, most recent first.
    pub context: &'a [Entry],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub summary: String,
    pub tags: Vec<String>,
    /// Category proposed by the model, when it named a known one.
    pub category: Option<Category>,
}

pub struct InsightRequest<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub summary: &'a str,
    pub related: &'a [Entry],
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, req: &SummaryRequest<'_>) -> Result<Summary>;
    async fn insight(&self, req: &InsightRequest<'_>) -> Result<String>;
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Prompts a [`Provider`] and parses what comes back.
pub struct LlmSummarizer<P: Provider> {
    inner: P,
    max_input_chars: usize,
}

impl<P: Provider> LlmSummarizer<P> {
    pub fn new(inner: P, max_input_chars: usize) -> Self {
        Self {
            inner,
            max_input_chars,
        }
    }
}

#[async_trait]
impl<P: Provider> Summarizer for LlmSummarizer<P> {
    async fn summarize(&self, req: &SummaryRequest<'_>) -> Result<Summary> {
        let prompt = prompt::summary_prompt(req, self.max_input_chars);
        let raw = self
            .inner
            .complete(&prompt, ResponseFormat::Json)
            .await
            .map_err(|e| ServiceError::from_anyhow(ServiceError::Llm, e))?;
        prompt::parse_summary(&raw)
    }

    async fn insight(&self, req: &InsightRequest<'_>) -> Result<String> {
        let prompt = prompt::insight_prompt(req);
        let raw = self
            .inner
            .complete(&prompt, ResponseFormat::Text)
            .await
            .map_err(|e| ServiceError::from_anyhow(ServiceError::Llm, e))?;
        let text = raw.trim();
        if text.is_empty() {
            return Err(ServiceError::MalformedResponse("empty insight".to_string()));
        }
        Ok(text.to_string())
    }

    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Factory: build a summarizer according to config and environment.
///
/// * If `AI_TEST_MODE=mock` or the provider is `mock`, returns the
///   deterministic mock.
/// * Otherwise builds the configured remote provider.
pub fn build_summarizer(cfg: &LlmConfig) -> Result<DynSummarizer> {
    let mock_env = std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false);
    let provider = cfg.provider_normalized();
    if mock_env || provider == "mock" {
        return Ok(Arc::new(LlmSummarizer::new(
            MockProvider::default(),
            cfg.max_input_chars,
        )));
    }
    let init_err = |e: anyhow::Error| ServiceError::from_anyhow(ServiceError::Config, e);
    match provider.as_str() {
        "gemini" => Ok(Arc::new(LlmSummarizer::new(
            GeminiProvider::new(cfg).map_err(init_err)?,
            cfg.max_input_chars,
        ))),
        "openai" => Ok(Arc::new(LlmSummarizer::new(
            OpenAiProvider::new(cfg).map_err(init_err)?,
            cfg.max_input_chars,
        ))),
        other => Err(ServiceError::Config(format!(
            "unsupported LLM provider '{other}'"
        ))),
    }
}
