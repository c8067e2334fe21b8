//! Telegra.ph publishing: Markdown in, public page URL out.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::config::TelegraphConfig;
use crate::error::{Result, ServiceError};
use crate::markdown;
use crate::node::Node;

/// Telegra.ph rejects longer titles.
pub const MAX_TITLE_CHARS: usize = 256;
/// Dates in the author line are shown in the operator's zone (UTC+8).
const AUTHOR_TZ_OFFSET_SECS: i32 = 8 * 3600;

#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub title: String,
    pub markdown: String,
    pub source_url: String,
    /// Author link on the page; the source URL when unset.
    pub author_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page {
    pub path: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub content: Vec<Node>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a new page and return its public URL.
    async fn publish(&self, req: &ArchiveRequest) -> Result<String>;
    async fn fetch_page(&self, path: &str) -> Result<Page>;
}

/// `https://telegra.ph/Some-Title-02-04` -> `Some-Title-02-04`.
pub fn path_from_url(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://telegra.ph/")
        .or_else(|| url.strip_prefix("http://telegra.ph/"))?;
    let path = rest.split(['?', '#']).next().unwrap_or(rest).trim_end_matches('/');
    (!path.is_empty()).then_some(path)
}

pub fn author_name(now: DateTime<Utc>) -> String {
    let date = match FixedOffset::east_opt(AUTHOR_TZ_OFFSET_SECS) {
        Some(tz) => now.with_timezone(&tz).format("%Y/%m/%d").to_string(),
        None => now.format("%Y/%m/%d").to_string(),
    };
    format!("LinkSaver • {date}")
}

pub fn truncate_title(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return "Untitled".to_string();
    }
    title.chars().take(MAX_TITLE_CHARS).collect()
}

pub struct TelegraphClient {
    client: Client,
    api_base: String,
    short_name: String,
    account_author: String,
    token: OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Account {
    access_token: String,
}

#[derive(Serialize)]
struct CreateAccount<'a> {
    short_name: &'a str,
    author_name: &'a str,
}

#[derive(Serialize)]
struct CreatePage<'a> {
    access_token: &'a str,
    title: &'a str,
    author_name: &'a str,
    author_url: &'a str,
    content: &'a [Node],
    return_content: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    url: String,
}

impl TelegraphClient {
    pub fn new(cfg: &TelegraphConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("link-saver/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building telegraph http client")?;
        let token = OnceCell::new_with(
            cfg.access_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
        Ok(Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            short_name: cfg.short_name.clone(),
            account_author: cfg.author_name.clone(),
            token,
        })
    }

    async fn call<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder, method: &str) -> anyhow::Result<T> {
        let resp: ApiResponse<T> = req
            .send()
            .await
            .with_context(|| format!("telegraph {method}"))?
            .error_for_status()
            .with_context(|| format!("telegraph {method} non-2xx"))?
            .json()
            .await
            .with_context(|| format!("telegraph {method} body"))?;
        match (resp.ok, resp.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(anyhow!(
                "telegraph {method}: {}",
                resp.error.unwrap_or_else(|| "unknown error".to_string())
            )),
        }
    }

    /// Configured token, or one account created on first use and reused.
    async fn access_token(&self) -> anyhow::Result<&str> {
        let token = self
            .token
            .get_or_try_init(|| async {
                tracing::warn!("no telegraph access token configured; creating an account");
                let body = CreateAccount {
                    short_name: &self.short_name,
                    author_name: &self.account_author,
                };
                let account: Account = self
                    .call(
                        self.client
                            .post(format!("{}/createAccount", self.api_base))
                            .json(&body),
                        "createAccount",
                    )
                    .await?;
                Ok::<_, anyhow::Error>(account.access_token)
            })
            .await?;
        Ok(token.as_str())
    }

    async fn create_page(&self, req: &ArchiveRequest) -> anyhow::Result<String> {
        let token = self.access_token().await?;
        let content = markdown::to_nodes(&req.markdown);
        let title = truncate_title(&req.title);
        let author = author_name(Utc::now());
        let body = CreatePage {
            access_token: token,
            title: &title,
            author_name: &author,
            author_url: req.author_url.as_deref().unwrap_or(&req.source_url),
            content: &content,
            return_content: false,
        };
        let page: CreatedPage = self
            .call(
                self.client
                    .post(format!("{}/createPage", self.api_base))
                    .json(&body),
                "createPage",
            )
            .await?;
        Ok(page.url)
    }
}

#[async_trait]
impl Publisher for TelegraphClient {
    async fn publish(&self, req: &ArchiveRequest) -> Result<String> {
        self.create_page(req)
            .await
            .map_err(|e| ServiceError::from_anyhow(ServiceError::Publish, e))
    }

    async fn fetch_page(&self, path: &str) -> Result<Page> {
        let req = self
            .client
            .get(format!("{}/getPage/{}", self.api_base, path))
            .query(&[("return_content", "true")]);
        self.call(req, "getPage")
            .await
            .map_err(|e| ServiceError::from_anyhow(ServiceError::Publish, e))
    }
}
