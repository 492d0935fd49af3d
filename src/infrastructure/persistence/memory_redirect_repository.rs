//! In-process implementation of the redirect repository.
//!
//! Evaluates the same filter and ordering semantics as the SQL store. Used for
//! local development without a database and by the HTTP integration tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

use crate::domain::entities::{NewRedirect, RedirectEntry, RedirectPatch};
use crate::domain::listing::{ListFilter, ListQuery};
use crate::domain::repositories::{BatchInsert, RedirectRepository};
use crate::error::AppError;

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    entries: BTreeMap<i64, RedirectEntry>,
}

/// Redirect store held in memory behind a single `RwLock`.
///
/// Writers take the lock exclusively, which gives batch inserts and purges the
/// same all-or-nothing behavior as a database transaction.
#[derive(Default)]
pub struct MemoryRedirectRepository {
    state: RwLock<MemoryState>,
}

impl MemoryRedirectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RedirectRepository for MemoryRedirectRepository {
    async fn list(&self, query: &ListQuery) -> Result<Vec<RedirectEntry>, AppError> {
        let state = self.state.read().await;

        let mut matching: Vec<&RedirectEntry> = state
            .entries
            .values()
            .filter(|e| query.filter.matches(e))
            .collect();
        matching.sort_by(|a, b| query.ordering.compare(a, b));

        let offset = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.page.limit()).unwrap_or(0);

        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &ListFilter) -> Result<i64, AppError> {
        let state = self.state.read().await;
        Ok(state.entries.values().filter(|e| filter.matches(e)).count() as i64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<RedirectEntry>, AppError> {
        Ok(self.state.read().await.entries.get(&id).cloned())
    }

    async fn find_by_old_url(&self, old_url: &str) -> Result<Option<RedirectEntry>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .values()
            .find(|e| e.old_url == old_url)
            .cloned())
    }

    async fn find_existing(&self, old_urls: &[String]) -> Result<Vec<String>, AppError> {
        let wanted: HashSet<&str> = old_urls.iter().map(String::as_str).collect();
        let state = self.state.read().await;

        Ok(state
            .entries
            .values()
            .filter(|e| wanted.contains(e.old_url.as_str()))
            .map(|e| e.old_url.clone())
            .collect())
    }

    async fn insert_batch(&self, batch: Vec<NewRedirect>) -> Result<BatchInsert, AppError> {
        let mut state = self.state.write().await;

        let mut taken: HashSet<String> = state
            .entries
            .values()
            .map(|e| e.old_url.clone())
            .collect();

        let mut outcome = BatchInsert::default();
        for new in batch {
            if !taken.insert(new.old_url.clone()) {
                outcome.conflicts.push(new.old_url);
                continue;
            }

            state.next_id += 1;
            let id = state.next_id;
            state.entries.insert(
                id,
                RedirectEntry {
                    id,
                    old_url: new.old_url,
                    new_url: new.new_url,
                    referer: Some(new.referer),
                    comment: Some(new.comment),
                    hits: 0,
                    published: new.published,
                    created_date: new.created_date,
                },
            );
            outcome.inserted += 1;
        }

        Ok(outcome)
    }

    async fn update(
        &self,
        id: i64,
        patch: RedirectPatch,
    ) -> Result<Option<RedirectEntry>, AppError> {
        let mut state = self.state.write().await;
        let Some(entry) = state.entries.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(new_url) = patch.new_url {
            entry.new_url = new_url;
        }
        if let Some(published) = patch.published {
            entry.published = published;
        }
        if let Some(comment) = patch.comment {
            entry.comment = comment;
        }

        Ok(Some(entry.clone()))
    }

    async fn increment_hits(&self, id: i64) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        match state.entries.get_mut(&id) {
            Some(entry) => {
                entry.hits = entry.hits.saturating_add(1);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.state.write().await.entries.remove(&id).is_some())
    }

    async fn purge_disabled(&self) -> Result<u64, AppError> {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, e| !e.is_disabled());
        Ok((before - state.entries.len()) as u64)
    }

    async fn ping(&self) -> bool {
        true
    }
}
