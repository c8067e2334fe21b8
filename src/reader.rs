//! Content extraction: URL in, article title + Markdown out.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use crate::config::ReaderConfig;
use crate::error::{Result, ServiceError};

/// A fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub url: String,
    pub title: Option<String>,
    pub markdown: String,
}

static RE_FIRST_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#*\s*(.+)").expect("first line regex"));

impl Article {
    /// Title reported by the extractor, else the first Markdown line with
    /// leading `#`s removed, else the URL.
    pub fn resolved_title(&self) -> String {
        if let Some(t) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return t.to_string();
        }
        RE_FIRST_LINE
            .captures(&self.markdown)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.url.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.markdown.trim().is_empty()
    }
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Article>;
    fn name(&self) -> &'static str;
}

/// Jina Reader (`https://r.jina.ai/<url>`).
pub struct JinaReader {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JinaEnvelope {
    data: Option<JinaData>,
}

#[derive(Debug, Deserialize)]
struct JinaData {
    title: Option<String>,
    content: Option<String>,
}

impl JinaReader {
    pub fn new(cfg: &ReaderConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("link-saver/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building reader http client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }

    async fn fetch_raw(&self, url: &str) -> anyhow::Result<String> {
        let mut req = self
            .client
            .get(format!("{}/{}", self.base_url, url))
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let body = req
            .send()
            .await
            .context("reader request")?
            .error_for_status()
            .context("reader non-2xx")?
            .text()
            .await
            .context("reader body")?;
        Ok(body)
    }
}

/// JSON envelope when present, otherwise the body is taken as Markdown.
/// An envelope with empty content yields an empty article.
fn parse_body(url: &str, body: &str) -> Article {
    if let Ok(JinaEnvelope {
        data: Some(JinaData { title, content }),
    }) = serde_json::from_str::<JinaEnvelope>(body)
    {
        return Article {
            url: url.to_string(),
            title,
            markdown: content.unwrap_or_default(),
        };
    }
    Article {
        url: url.to_string(),
        title: None,
        markdown: body.to_string(),
    }
}

#[async_trait]
impl ContentFetcher for JinaReader {
    async fn fetch(&self, url: &str) -> Result<Article> {
        let body = self.fetch_raw(url).await.map_err(|e| {
            tracing::warn!(error = ?e, url, "reader fetch failed");
            ServiceError::from_anyhow(ServiceError::Fetch, e)
        })?;
        Ok(parse_body(url, &body))
    }

    fn name(&self) -> &'static str {
        "jina"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_envelope_is_unwrapped() {
        let body = r##"{"code":200,"data":{"title":"Hello","content":"# Hello\n\nBody"}}"##;
        let a = parse_body("https://x.test", body);
        assert_eq!(a.title.as_deref(), Some("Hello"));
        assert_eq!(a.markdown, "# Hello\n\nBody");
    }

    #[test]
    fn envelope_with_empty_content_is_empty() {
        let a = parse_body(
            "https://x.test",
            r#"{"code":200,"data":{"title":"T","content":""}}"#,
        );
        assert!(a.is_empty());
        assert_eq!(a.title.as_deref(), Some("T"));

        let missing = parse_body("https://x.test", r#"{"data":{"title":"T"}}"#);
        assert!(missing.is_empty());
    }

    #[test]
    fn plain_body_is_markdown() {
        let a = parse_body("https://x.test", "Title: x\n\nText");
        assert_eq!(a.title, None);
        assert_eq!(a.markdown, "Title: x\n\nText");
    }

    #[test]
    fn title_falls_back_to_first_line_then_url() {
        let a = Article {
            url: "https://x.test".into(),
            title: None,
            markdown: "\n## Deep Dive\n\nbody".into(),
        };
        assert_eq!(a.resolved_title(), "Deep Dive");

        let empty = Article {
            url: "https://x.test".into(),
            title: Some("  ".into()),
            markdown: String::new(),
        };
        assert_eq!(empty.resolved_title(), "https://x.test");
    }
}
