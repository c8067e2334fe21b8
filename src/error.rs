//! Errors surfaced at collaborator boundaries.
//!
//! The `Display` text of a variant is what the requesting chat sees when a
//! save aborts, so messages stay short and free of secrets.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Content extraction failed or returned nothing.
    #[error("{0}")]
    Fetch(String),

    /// The language model could not be reached or refused the request.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The model answered with something that is not the expected JSON.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Notify error: {0}")]
    Notify(String),
}

impl ServiceError {
    /// Wrap an `anyhow` chain into `ctor`, keeping the full context text.
    pub fn from_anyhow(ctor: fn(String) -> ServiceError, err: anyhow::Error) -> ServiceError {
        ctor(format!("{err:#}"))
    }
}
