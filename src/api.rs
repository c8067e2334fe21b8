use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use shuttle_axum::axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::error::ServiceError;
use crate::graph::{self, Graph};
use crate::model::Entry;
use crate::node;
use crate::pipeline::Pipeline;
use crate::telegraph;
use crate::webhook::Update;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Expected webhook secret; requests are not checked when unset.
    pub secret_token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/api/webhook/telegram",
            get(webhook_alive).post(webhook),
        )
        .route("/api/links", get(list_links))
        .route("/api/links/{id}", get(get_link))
        .route("/api/graph", get(get_graph))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    Unauthorized,
    BadRequest(String),
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Page not found".to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Service(e) => {
                tracing::error!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

async fn webhook_alive() -> Json<serde_json::Value> {
    Json(json!({ "status": "alive" }))
}

/// Telegram update in, `{ok:true}` out once the link (if any) is handled.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(expected) = state.secret_token.as_deref() {
        let got = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if got != Some(expected) {
            tracing::warn!("webhook call with missing or wrong secret token");
            return Err(ApiError::Unauthorized);
        }
    }
    let update: Update = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid update: {e}")))?;

    if let Some((chat_id, url)) = update.link() {
        let report = state.pipeline.run(chat_id, url).await;
        tracing::debug!(update_id = update.update_id, ?report, "update handled");
    }
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
struct LinksQuery {
    tag: Option<String>,
}

async fn list_links(
    State(state): State<AppState>,
    Query(q): Query<LinksQuery>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    let tag = q.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());
    Ok(Json(state.pipeline.store().list(tag).await?))
}

#[derive(Debug, Serialize)]
struct LinkDetail {
    #[serde(flatten)]
    entry: Entry,
    /// Plain text of the archived copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LinkDetail>, ApiError> {
    let entry = state
        .pipeline
        .store()
        .get(&id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let content = archived_text(&state, &entry).await;
    Ok(Json(LinkDetail { entry, content }))
}

/// Archived page content, when the entry has one and it can be fetched.
async fn archived_text(state: &AppState, entry: &Entry) -> Option<String> {
    let path = telegraph::path_from_url(entry.archive_url.as_deref()?)?;
    match state.pipeline.publisher().fetch_page(path).await {
        Ok(page) => Some(node::render_text(&page.content)),
        Err(e) => {
            tracing::warn!(error = %e, path, "archived page unavailable");
            None
        }
    }
}

async fn get_graph(State(state): State<AppState>) -> Result<Json<Graph>, ApiError> {
    let entries = state.pipeline.store().list(None).await?;
    Ok(Json(graph::build(&entries)))
}
