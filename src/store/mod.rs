//! Bookmark persistence.

pub mod memory;
pub mod notion;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{Result, ServiceError};
use crate::model::{Entry, NewEntry};

pub use memory::MemoryStore;
pub use notion::NotionStore;

/// All listing operations return entries most recent first.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a new entry and return its id.
    async fn create(&self, entry: &NewEntry) -> Result<String>;
    /// Attach the published archive URL to an existing entry.
    async fn set_archive_url(&self, id: &str, archive_url: &str) -> Result<()>;
    async fn recent(&self, limit: usize) -> Result<Vec<Entry>>;
    /// Entries sharing at least one of `tags`.
    async fn related(&self, tags: &[String], limit: usize) -> Result<Vec<Entry>>;
    /// Every entry, optionally restricted to one tag.
    async fn list(&self, tag: Option<&str>) -> Result<Vec<Entry>>;
    async fn get(&self, id: &str) -> Result<Option<Entry>>;
}

pub type DynStore = Arc<dyn Store>;

pub fn build_store(cfg: &StoreConfig) -> Result<DynStore> {
    match cfg.backend {
        StoreBackend::Notion => Ok(Arc::new(
            NotionStore::new(cfg).map_err(|e| ServiceError::from_anyhow(ServiceError::Config, e))?,
        )),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; entries are lost on restart");
            Ok(Arc::new(MemoryStore::with_capacity(10_000)))
        }
    }
}
