//! Repository trait for redirect entry storage.

use crate::domain::entities::{NewRedirect, RedirectEntry, RedirectPatch};
use crate::domain::listing::{ListFilter, ListQuery};
use crate::error::AppError;
use async_trait::async_trait;

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchInsert {
    /// Number of rows written.
    pub inserted: u64,
    /// `old_url`s that already existed when the insert transaction re-checked them
    /// (a concurrent writer got there first). These were not written.
    pub conflicts: Vec<String>,
}

/// Repository interface for redirect entries.
///
/// Stores evaluate filters, ordering and paging themselves; callers never load the
/// full table.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgRedirectRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryRedirectRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_redirect.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedirectRepository: Send + Sync {
    /// Returns one page of entries matching the query, in query order.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] on storage errors.
    async fn list(&self, query: &ListQuery) -> Result<Vec<RedirectEntry>, AppError>;

    /// Counts entries matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] on storage errors.
    async fn count(&self, filter: &ListFilter) -> Result<i64, AppError>;

    /// Finds an entry by id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] on storage errors.
    async fn find_by_id(&self, id: i64) -> Result<Option<RedirectEntry>, AppError>;

    /// Finds the entry whose stored `old_url` equals `old_url` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] on storage errors.
    async fn find_by_old_url(&self, old_url: &str) -> Result<Option<RedirectEntry>, AppError>;

    /// Returns the subset of `old_urls` already stored, compared by exact equality.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] on storage errors.
    async fn find_existing(&self, old_urls: &[String]) -> Result<Vec<String>, AppError>;

    /// Inserts a batch atomically.
    ///
    /// Writers are serialized for the duration of the call; every `old_url` is
    /// re-checked inside the same transaction and skipped (reported in
    /// [`BatchInsert::conflicts`]) when it already exists. Either every remaining
    /// row is written or none is.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the transaction fails; nothing is persisted.
    async fn insert_batch(&self, batch: Vec<NewRedirect>) -> Result<BatchInsert, AppError>;

    /// Applies a partial update. Returns `Ok(None)` if the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] on storage errors.
    async fn update(
        &self,
        id: i64,
        patch: RedirectPatch,
    ) -> Result<Option<RedirectEntry>, AppError>;

    /// Increments the hit counter by one. Returns `Ok(false)` if the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] on storage errors.
    async fn increment_hits(&self, id: i64) -> Result<bool, AppError>;

    /// Deletes one entry. Returns `Ok(false)` if the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] on storage errors.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Deletes every disabled entry in a single atomic operation and returns how
    /// many rows were removed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the delete fails; no row is removed.
    async fn purge_disabled(&self) -> Result<u64, AppError>;

    /// Cheap connectivity check used by the health endpoint.
    async fn ping(&self) -> bool;
}
