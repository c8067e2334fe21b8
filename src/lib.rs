// src/lib.rs
// Library surface shared by the binary and the integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod markdown;
pub mod metrics;
pub mod model;
pub mod node;
pub mod notify;
pub mod pipeline;
pub mod reader;
pub mod store;
pub mod telegraph;
pub mod webhook;

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::axum::Router;

pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;

use crate::notify::TelegramNotifier;
use crate::pipeline::{Collaborators, Pipeline, PipelineSettings};
use crate::reader::JinaReader;
use crate::telegraph::TelegraphClient;

/// Build every collaborator client from `cfg` and wrap them into the
/// shared handler state.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let parts = Collaborators {
        fetcher: Arc::new(JinaReader::new(&cfg.reader)?),
        summarizer: llm::build_summarizer(&cfg.llm).context("building summarizer")?,
        store: store::build_store(&cfg.store).context("building store")?,
        publisher: Arc::new(TelegraphClient::new(&cfg.telegraph)?),
        notifier: Arc::new(TelegramNotifier::new(&cfg.telegram)),
    };
    tracing::info!(
        llm = parts.summarizer.provider_name(),
        reader = parts.fetcher.name(),
        store = ?cfg.store.backend,
        "collaborators ready"
    );
    Ok(AppState {
        pipeline: Arc::new(Pipeline::new(parts, PipelineSettings::from_config(cfg))),
        secret_token: cfg.telegram.secret_token.clone(),
    })
}

/// Full application router: API routes plus `/metrics`.
pub fn app(state: AppState, metrics: &metrics::Metrics) -> Router {
    router(state).merge(metrics.router())
}
