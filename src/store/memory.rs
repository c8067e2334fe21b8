//! Process-local store, used for local runs and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::Store;
use crate::error::{Result, ServiceError};
use crate::model::{Entry, NewEntry};

#[derive(Debug)]
pub struct MemoryStore {
    // insertion order: oldest first
    inner: Mutex<Inner>,
    cap: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    next_id: u64,
}

impl MemoryStore {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: Vec::with_capacity(cap.min(1_000)),
                next_id: 1,
            }),
            cap: cap.max(1),
        }
    }

    /// Seed an existing entry as-is (tests, fixtures).
    pub fn insert(&self, entry: Entry) -> Result<()> {
        let mut g = self.lock()?;
        g.entries.push(entry);
        let cap = self.cap;
        if g.entries.len() > cap {
            let excess = g.entries.len() - cap;
            g.entries.drain(0..excess);
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<Entry> {
        self.lock().map(|g| g.entries.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| ServiceError::Store("memory store mutex poisoned".to_string()))
    }

    fn newest_first(&self, pred: impl Fn(&Entry) -> bool, limit: usize) -> Result<Vec<Entry>> {
        let g = self.lock()?;
        Ok(g.entries
            .iter()
            .rev()
            .filter(|e| pred(*e))
            .take(limit)
            .cloned()
            .collect())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(10_000)
    }
}

fn has_tag(entry: &Entry, tag: &str) -> bool {
    entry.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

#[async_trait]
impl Store for MemoryStore {
    async fn create(&self, entry: &NewEntry) -> Result<String> {
        let id = {
            let mut g = self.lock()?;
            let id = format!("mem-{}", g.next_id);
            g.next_id += 1;
            id
        };
        self.insert(Entry {
            id: id.clone(),
            title: entry.title.clone(),
            url: entry.url.clone(),
            archive_url: entry.archive_url.clone(),
            summary: entry.summary.clone(),
            insight: entry.insight.clone(),
            category: entry.category,
            tags: entry.tags.clone(),
            created_at: Utc::now(),
        })?;
        Ok(id)
    }

    async fn set_archive_url(&self, id: &str, archive_url: &str) -> Result<()> {
        let mut g = self.lock()?;
        let entry = g
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| ServiceError::Store(format!("no entry with id {id}")))?;
        entry.archive_url = Some(archive_url.to_string());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Entry>> {
        self.newest_first(|_| true, limit)
    }

    async fn related(&self, tags: &[String], limit: usize) -> Result<Vec<Entry>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        self.newest_first(|e| tags.iter().any(|t| has_tag(e, t)), limit)
    }

    async fn list(&self, tag: Option<&str>) -> Result<Vec<Entry>> {
        match tag {
            Some(t) => self.newest_first(|e| has_tag(e, t), usize::MAX),
            None => self.newest_first(|_| true, usize::MAX),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Entry>> {
        let g = self.lock()?;
        Ok(g.entries.iter().find(|e| e.id == id).cloned())
    }
}
