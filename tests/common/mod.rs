// tests/common/mod.rs
//
// In-memory collaborators for driving the pipeline without network access.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use link_saver::error::{Result, ServiceError};
use link_saver::llm::provider::MockProvider;
use link_saver::llm::LlmSummarizer;
use link_saver::model::{Entry, NewEntry};
use link_saver::node::{Node, Tag};
use link_saver::notify::{Notifier, OutboundMessage};
use link_saver::pipeline::{Collaborators, Pipeline, PipelineSettings};
use link_saver::reader::{Article, ContentFetcher};
use link_saver::store::{DynStore, MemoryStore, Store};
use link_saver::telegraph::{ArchiveRequest, Page, Publisher};

pub const APP_URL: &str = "https://links.test";

/// Returns a fixed article, or fails when built with `failing`.
pub struct FakeFetcher {
    pub result: std::result::Result<Article, String>,
}

impl FakeFetcher {
    pub fn article(markdown: &str) -> Self {
        Self {
            result: Ok(Article {
                url: String::new(),
                title: Some("Fake Article".to_string()),
                markdown: markdown.to_string(),
            }),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            result: Err(msg.to_string()),
        }
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Article> {
        match &self.result {
            Ok(a) => Ok(Article {
                url: url.to_string(),
                ..a.clone()
            }),
            Err(m) => Err(ServiceError::Fetch(m.clone())),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Publishes to a predictable URL and remembers requests.
#[derive(Default)]
pub struct FakePublisher {
    pub fail: bool,
    pub published: Mutex<Vec<ArchiveRequest>>,
}

impl FakePublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, req: &ArchiveRequest) -> Result<String> {
        if self.fail {
            return Err(ServiceError::Publish("telegraph createPage: FLOOD_WAIT".into()));
        }
        self.published.lock().unwrap().push(req.clone());
        Ok("https://telegra.ph/Fake-Article-02-04".to_string())
    }

    async fn fetch_page(&self, path: &str) -> Result<Page> {
        if self.fail {
            return Err(ServiceError::Publish("telegraph getPage: PAGE_NOT_FOUND".into()));
        }
        Ok(Page {
            path: path.to_string(),
            url: format!("https://telegra.ph/{path}"),
            title: "Fake Article".to_string(),
            content: vec![
                Node::element(Tag::H3, vec![Node::text("Archived")]),
                Node::element(Tag::P, vec![Node::text("Body text.")]),
            ],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Send { chat_id: i64, text: String },
    Edit { chat_id: i64, message_id: i64, text: String },
}

impl Sent {
    pub fn text(&self) -> &str {
        match self {
            Sent::Send { text, .. } | Sent::Edit { text, .. } => text,
        }
    }
}

/// Records every delivery; edits can be made to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail_edits: bool,
    pub log: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat_id: i64, msg: &OutboundMessage) -> Result<i64> {
        let mut log = self.log.lock().unwrap();
        log.push(Sent::Send {
            chat_id,
            text: msg.text.clone(),
        });
        Ok(100 + log.len() as i64)
    }

    async fn edit(&self, chat_id: i64, message_id: i64, msg: &OutboundMessage) -> Result<()> {
        if self.fail_edits {
            return Err(ServiceError::Notify("message to edit not found".into()));
        }
        self.log.lock().unwrap().push(Sent::Edit {
            chat_id,
            message_id,
            text: msg.text.clone(),
        });
        Ok(())
    }
}

/// Delegates to a [`MemoryStore`] but refuses every `create`.
#[derive(Default)]
pub struct RejectingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl Store for RejectingStore {
    async fn create(&self, _entry: &NewEntry) -> Result<String> {
        Err(ServiceError::Store("notion pages: 400 validation_error".into()))
    }

    async fn set_archive_url(&self, id: &str, archive_url: &str) -> Result<()> {
        self.inner.set_archive_url(id, archive_url).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Entry>> {
        self.inner.recent(limit).await
    }

    async fn related(&self, tags: &[String], limit: usize) -> Result<Vec<Entry>> {
        self.inner.related(tags, limit).await
    }

    async fn list(&self, tag: Option<&str>) -> Result<Vec<Entry>> {
        self.inner.list(tag).await
    }

    async fn get(&self, id: &str) -> Result<Option<Entry>> {
        self.inner.get(id).await
    }
}

pub struct Harness {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<MemoryStore>,
    pub publisher: Arc<FakePublisher>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness(fetcher: FakeFetcher, publisher: FakePublisher, notifier: RecordingNotifier) -> Harness {
    harness_with_model(fetcher, MockProvider::default(), publisher, notifier)
}

/// Same as [`harness`] with a scripted model.
pub fn harness_with_model(
    fetcher: FakeFetcher,
    model: MockProvider,
    publisher: FakePublisher,
    notifier: RecordingNotifier,
) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let publisher = Arc::new(publisher);
    let notifier = Arc::new(notifier);
    let pipeline = pipeline(Arc::new(fetcher), model, store.clone(), publisher.clone(), notifier.clone());
    Harness {
        pipeline: Arc::new(pipeline),
        store,
        publisher,
        notifier,
    }
}

pub fn pipeline(
    fetcher: Arc<dyn ContentFetcher>,
    model: MockProvider,
    store: DynStore,
    publisher: Arc<FakePublisher>,
    notifier: Arc<RecordingNotifier>,
) -> Pipeline {
    Pipeline::new(
        Collaborators {
            fetcher,
            summarizer: Arc::new(LlmSummarizer::new(model, 10_000)),
            store,
            publisher,
            notifier,
        },
        PipelineSettings {
            app_url: APP_URL.to_string(),
            context_entries: 5,
            related_limit: 5,
        },
    )
}
