//! The save pipeline: fetch, summarize, enrich, store, publish, notify.
//!
//! One run per inbound link, stages strictly sequential. Errors before the
//! entry is stored abort the run with a single failure message in the chat;
//! publishing to the archive is best effort.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::llm::{DynSummarizer, InsightRequest, SummaryRequest};
use crate::model::{Category, NewEntry};
use crate::notify::format::{self, SavedView};
use crate::notify::{Notifier, OutboundMessage};
use crate::reader::ContentFetcher;
use crate::store::DynStore;
use crate::telegraph::{ArchiveRequest, Publisher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Received,
    Extracted,
    Summarized,
    Enriched,
    InsightGenerated,
    Stored,
    Published,
    Notified,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Extracted => "extracted",
            Stage::Summarized => "summarized",
            Stage::Enriched => "enriched",
            Stage::InsightGenerated => "insight_generated",
            Stage::Stored => "stored",
            Stage::Published => "published",
            Stage::Notified => "notified",
            Stage::Failed => "failed",
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// `Notified` on full success, `Failed` when the run aborted. A run
    /// whose final message could not be delivered stops at `Published`.
    pub state: Stage,
    pub entry_id: Option<String>,
    pub archive_url: Option<String>,
    /// Chat-facing error text for failed runs.
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub app_url: String,
    pub context_entries: usize,
    pub related_limit: usize,
}

impl PipelineSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            app_url: cfg.app_url.clone(),
            context_entries: cfg.context_entries,
            related_limit: cfg.related_limit,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

pub struct Collaborators {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub summarizer: DynSummarizer,
    pub store: DynStore,
    pub publisher: Arc<dyn Publisher>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Pipeline {
    fetcher: Arc<dyn ContentFetcher>,
    summarizer: DynSummarizer,
    store: DynStore,
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
}

/// A stage that could not be reached, with the error that stopped it.
#[derive(Debug)]
struct Failure {
    stage: Stage,
    error: ServiceError,
}

impl Failure {
    fn at(stage: Stage) -> impl FnOnce(ServiceError) -> Failure {
        move |error| Failure { stage, error }
    }
}

/// What the success message reports.
struct Saved {
    id: String,
    title: String,
    category: Category,
    tags: Vec<String>,
    summary: String,
    insight: String,
    source_url: String,
    archive_url: Option<String>,
}

impl Pipeline {
    pub fn new(parts: Collaborators, settings: PipelineSettings) -> Self {
        Self {
            fetcher: parts.fetcher,
            summarizer: parts.summarizer,
            store: parts.store,
            publisher: parts.publisher,
            notifier: parts.notifier,
            settings,
        }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    pub fn publisher(&self) -> &Arc<dyn Publisher> {
        &self.publisher
    }

    /// Process one link sent from `chat_id`. Never fails; the outcome is in
    /// the report and in the chat.
    pub async fn run(&self, chat_id: i64, url: &str) -> RunReport {
        let span = tracing::info_span!("pipeline", chat_id, url);
        self.run_inner(chat_id, url).instrument(span).await
    }

    async fn run_inner(&self, chat_id: i64, url: &str) -> RunReport {
        counter!("pipeline_runs_total").increment(1);
        let started = Instant::now();
        tracing::info!(stage = Stage::Received.as_str(), "link received");

        let status_id = match self.notifier.send(chat_id, &format::processing(url)).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "could not send processing message");
                None
            }
        };

        let report = match self.process(url).await {
            Ok(saved) => {
                let link = saved.archive_url.as_deref().unwrap_or(&saved.source_url);
                let msg = format::success(&SavedView {
                    title: &saved.title,
                    category: saved.category,
                    tags: &saved.tags,
                    summary: &saved.summary,
                    insight: &saved.insight,
                    link,
                    app_url: &self.settings.app_url,
                });
                let delivered = self.deliver(chat_id, status_id, &msg).await;
                let state = if delivered {
                    Stage::Notified
                } else {
                    Stage::Published
                };
                tracing::info!(stage = state.as_str(), entry_id = %saved.id, "run finished");
                RunReport {
                    state,
                    entry_id: Some(saved.id),
                    archive_url: saved.archive_url,
                    error: None,
                }
            }
            Err(Failure { stage, error }) => {
                counter!("pipeline_failures_total", "stage" => stage.as_str()).increment(1);
                tracing::warn!(stage = stage.as_str(), error = %error, "run failed");
                let text = error.to_string();
                self.deliver(chat_id, status_id, &format::failure(&text)).await;
                RunReport {
                    state: Stage::Failed,
                    entry_id: None,
                    archive_url: None,
                    error: Some(text),
                }
            }
        };

        histogram!("pipeline_duration_ms").record(started.elapsed().as_millis() as f64);
        report
    }

    async fn process(&self, url: &str) -> Result<Saved, Failure> {
        let article = self
            .fetcher
            .fetch(url)
            .await
            .map_err(Failure::at(Stage::Extracted))?;
        if article.is_empty() {
            return Err(Failure {
                stage: Stage::Extracted,
                error: ServiceError::Fetch(format!(
                    "No content could be extracted from {url} ({})",
                    self.fetcher.name()
                )),
            });
        }
        let title = article.resolved_title();
        tracing::info!(stage = Stage::Extracted.as_str(), %title, chars = article.markdown.len(), "article fetched");

        // context only sharpens the summary; a store hiccup here is not fatal
        let context = match self.store.recent(self.settings.context_entries).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "recent entries unavailable; summarizing without context");
                Vec::new()
            }
        };
        let summary = self
            .summarizer
            .summarize(&SummaryRequest {
                url,
                title: &title,
                markdown: &article.markdown,
                context: &context,
            })
            .await
            .map_err(Failure::at(Stage::Summarized))?;
        tracing::info!(
            stage = Stage::Summarized.as_str(),
            provider = self.summarizer.provider_name(),
            tags = ?summary.tags,
            "summary ready"
        );

        let related = self
            .store
            .related(&summary.tags, self.settings.related_limit)
            .await
            .map_err(Failure::at(Stage::Enriched))?;
        tracing::info!(stage = Stage::Enriched.as_str(), related = related.len(), "related entries found");

        let insight = self
            .summarizer
            .insight(&InsightRequest {
                title: &title,
                url,
                summary: &summary.summary,
                related: &related,
            })
            .await
            .map_err(Failure::at(Stage::InsightGenerated))?;
        tracing::info!(stage = Stage::InsightGenerated.as_str(), "insight ready");

        let category = summary
            .category
            .unwrap_or_else(|| Category::infer(&summary.tags));
        let entry = NewEntry {
            title: title.clone(),
            url: url.to_string(),
            archive_url: None,
            summary: summary.summary,
            insight: insight.trim().to_string(),
            category,
            tags: summary.tags,
        };
        let id = self
            .store
            .create(&entry)
            .await
            .map_err(Failure::at(Stage::Stored))?;
        tracing::info!(stage = Stage::Stored.as_str(), entry_id = %id, %category, "entry stored");

        let archive_url = self.archive(&id, &title, url, &article.markdown).await;

        Ok(Saved {
            id,
            title,
            category,
            tags: entry.tags,
            summary: entry.summary,
            insight: entry.insight,
            source_url: entry.url,
            archive_url,
        })
    }

    /// Publish the readable copy and attach it to the entry. Returns the
    /// archive URL only when both steps succeeded.
    async fn archive(&self, id: &str, title: &str, url: &str, markdown: &str) -> Option<String> {
        let req = ArchiveRequest {
            title: title.to_string(),
            markdown: markdown.to_string(),
            source_url: url.to_string(),
            author_url: None,
        };
        let archive_url = match self.publisher.publish(&req).await {
            Ok(u) => u,
            Err(e) => {
                counter!("archive_soft_failures_total").increment(1);
                tracing::warn!(error = %e, "publishing archive copy failed; continuing");
                return None;
            }
        };
        if let Err(e) = self.store.set_archive_url(id, &archive_url).await {
            counter!("archive_soft_failures_total").increment(1);
            tracing::warn!(error = %e, %archive_url, "attaching archive url failed; continuing");
            return None;
        }
        tracing::info!(stage = Stage::Published.as_str(), %archive_url, "archive published");
        Some(archive_url)
    }

    /// Edit the status message into `msg`, else send `msg` fresh.
    async fn deliver(&self, chat_id: i64, status_id: Option<i64>, msg: &OutboundMessage) -> bool {
        if let Some(message_id) = status_id {
            match self.notifier.edit(chat_id, message_id, msg).await {
                Ok(()) => return true,
                Err(e) => tracing::warn!(error = %e, "editing status message failed; sending new one"),
            }
        }
        match self.notifier.send(chat_id, msg).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "could not deliver message");
                false
            }
        }
    }
}
