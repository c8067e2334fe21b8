//! Notion database store.
//!
//! Database properties: `Name` (title), `URL` (url), `Archive` (url),
//! `Tags` (multi_select), `Category` (select), `Summary` (rich_text),
//! `Insight` (rich_text). Ordering uses the page `created_time`.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::Store;
use crate::config::StoreConfig;
use crate::error::{Result, ServiceError};
use crate::model::{Category, Entry, NewEntry};

const NOTION_VERSION: &str = "2022-06-28";
/// Notion caps a single rich-text fragment at 2000 characters.
const RICH_TEXT_CHUNK: usize = 2000;
/// Notion caps `page_size` at 100.
const MAX_PAGE_SIZE: usize = 100;
/// Upper bound on pages followed when listing everything.
const MAX_QUERY_PAGES: usize = 20;

pub struct NotionStore {
    client: Client,
    api_base: String,
    api_key: String,
    database_id: String,
}

impl NotionStore {
    pub fn new(cfg: &StoreConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("link-saver/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building notion http client")?;
        Ok(Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            database_id: cfg.database_id.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/v1/{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send_json(&self, req: reqwest::RequestBuilder, what: &str) -> anyhow::Result<Value> {
        let resp = req.send().await.with_context(|| format!("notion {what}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("notion {what} HTTP {status}: {}", notion_message(&body)));
        }
        resp.json::<Value>()
            .await
            .with_context(|| format!("notion {what} body"))
    }

    /// Query the database newest first, following cursors until `limit`.
    async fn query(&self, filter: Option<Value>, limit: usize) -> anyhow::Result<Vec<Entry>> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_QUERY_PAGES {
            let remaining = limit.saturating_sub(out.len());
            if remaining == 0 {
                break;
            }
            let mut body = json!({
                "sorts": [{ "timestamp": "created_time", "direction": "descending" }],
                "page_size": remaining.min(MAX_PAGE_SIZE),
            });
            if let Some(f) = &filter {
                body["filter"] = f.clone();
            }
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }
            let req = self
                .request(
                    reqwest::Method::POST,
                    &format!("databases/{}/query", self.database_id),
                )
                .json(&body);
            let value = self.send_json(req, "query").await?;
            let page: QueryResponse =
                serde_json::from_value(value).context("decoding notion query response")?;
            out.extend(page.results.into_iter().map(NotionPage::into_entry));
            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }
        out.truncate(limit);
        Ok(out)
    }
}

fn store_err(e: anyhow::Error) -> ServiceError {
    ServiceError::from_anyhow(ServiceError::Store, e)
}

/// Pull the `message` field out of a Notion error body when there is one.
fn notion_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(300).collect())
}

/// Split `text` into rich-text fragments Notion accepts.
pub fn rich_text(text: &str) -> Value {
    let chars: Vec<char> = text.chars().collect();
    let parts: Vec<Value> = chars
        .chunks(RICH_TEXT_CHUNK)
        .map(|c| json!({ "text": { "content": c.iter().collect::<String>() } }))
        .collect();
    Value::Array(parts)
}

/// Select option names may not contain commas.
fn option_name(tag: &str) -> String {
    tag.replace(',', " ").trim().to_string()
}

pub fn page_properties(entry: &NewEntry) -> Value {
    let tags: Vec<Value> = entry
        .tags
        .iter()
        .map(|t| option_name(t))
        .filter(|t| !t.is_empty())
        .map(|t| json!({ "name": t }))
        .collect();
    json!({
        "Name": { "title": rich_text(&entry.title) },
        "URL": { "url": entry.url },
        "Archive": { "url": entry.archive_url },
        "Tags": { "multi_select": tags },
        "Category": { "select": { "name": entry.category.as_str() } },
        "Summary": { "rich_text": rich_text(&entry.summary) },
        "Insight": { "rich_text": rich_text(&entry.insight) },
    })
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<NotionPage>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotionPage {
    id: String,
    created_time: DateTime<Utc>,
    #[serde(default)]
    properties: Props,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Props {
    #[serde(rename = "Name")]
    name: TextProp,
    #[serde(rename = "URL")]
    url: UrlProp,
    #[serde(rename = "Archive")]
    archive: UrlProp,
    #[serde(rename = "Tags")]
    tags: MultiSelectProp,
    #[serde(rename = "Category")]
    category: SelectProp,
    #[serde(rename = "Summary")]
    summary: TextProp,
    #[serde(rename = "Insight")]
    insight: TextProp,
}

/// Covers both `title` and `rich_text` properties.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TextProp {
    title: Vec<RichTextItem>,
    rich_text: Vec<RichTextItem>,
}

impl TextProp {
    fn plain(&self) -> String {
        self.title
            .iter()
            .chain(self.rich_text.iter())
            .map(|t| t.plain_text.as_str())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RichTextItem {
    plain_text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UrlProp {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MultiSelectProp {
    multi_select: Vec<SelectOption>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SelectProp {
    select: Option<SelectOption>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SelectOption {
    name: String,
}

impl NotionPage {
    fn into_entry(self) -> Entry {
        let p = self.properties;
        let title = p.name.plain();
        Entry {
            id: self.id,
            title: if title.trim().is_empty() {
                "Untitled".to_string()
            } else {
                title
            },
            url: p.url.url.unwrap_or_default(),
            archive_url: p.archive.url.filter(|u| !u.is_empty()),
            summary: p.summary.plain(),
            insight: p.insight.plain(),
            category: p
                .category
                .select
                .and_then(|s| s.name.parse().ok())
                .unwrap_or(Category::Other),
            tags: p.tags.multi_select.into_iter().map(|o| o.name).collect(),
            created_at: self.created_time,
        }
    }
}

#[async_trait]
impl Store for NotionStore {
    async fn create(&self, entry: &NewEntry) -> Result<String> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": page_properties(entry),
        });
        let req = self.request(reqwest::Method::POST, "pages").json(&body);
        let value = self.send_json(req, "create page").await.map_err(store_err)?;
        value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Store("notion create page: response has no id".into()))
    }

    async fn set_archive_url(&self, id: &str, archive_url: &str) -> Result<()> {
        let body = json!({ "properties": { "Archive": { "url": archive_url } } });
        let req = self
            .request(reqwest::Method::PATCH, &format!("pages/{id}"))
            .json(&body);
        self.send_json(req, "update page").await.map_err(store_err)?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Entry>> {
        self.query(None, limit).await.map_err(store_err)
    }

    async fn related(&self, tags: &[String], limit: usize) -> Result<Vec<Entry>> {
        let conditions: Vec<Value> = tags
            .iter()
            .map(|t| option_name(t))
            .filter(|t| !t.is_empty())
            .map(|t| json!({ "property": "Tags", "multi_select": { "contains": t } }))
            .collect();
        if conditions.is_empty() {
            return Ok(Vec::new());
        }
        self.query(Some(json!({ "or": conditions })), limit)
            .await
            .map_err(store_err)
    }

    async fn list(&self, tag: Option<&str>) -> Result<Vec<Entry>> {
        let filter = tag.map(|t| json!({ "property": "Tags", "multi_select": { "contains": t } }));
        self.query(filter, usize::MAX).await.map_err(store_err)
    }

    async fn get(&self, id: &str) -> Result<Option<Entry>> {
        let resp = self
            .request(reqwest::Method::GET, &format!("pages/{id}"))
            .send()
            .await
            .map_err(|e| ServiceError::Store(format!("notion get page: {e}")))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Store(format!(
                "notion get page HTTP {status}: {}",
                notion_message(&body)
            )));
        }
        let page: NotionPage = resp
            .json()
            .await
            .map_err(|e| ServiceError::Store(format!("notion get page body: {e}")))?;
        Ok(Some(page.into_entry()))
    }
}
