//! Redirect registry service: listing, ingestion, purge and single-entry operations.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::clock::Clock;
use crate::domain::entities::{NewRedirect, RedirectEntry, RedirectPatch};
use crate::domain::listing::ListQuery;
use crate::domain::repositories::{BatchInsert, RedirectRepository};
use crate::error::{AppError, IngestFailure};
use crate::infrastructure::cache::CacheService;
use crate::utils::url_normalizer::{SiteRoot, normalize_destination};

/// Key prefix shared by every cached listing page.
pub const LISTING_CACHE_NAMESPACE: &str = "redirects:list:";

/// Counter bumped by every mutation; cached pages are keyed by its value.
///
/// Lives outside [`LISTING_CACHE_NAMESPACE`] so prefix invalidation never resets it.
pub const LISTING_GENERATION_KEY: &str = "redirects:generation";

/// One page of a filtered listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedirectPage {
    pub items: Vec<RedirectEntry>,
    /// Number of entries matching the filter across all pages.
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl RedirectPage {
    pub fn total_pages(&self) -> u64 {
        let total = u64::try_from(self.total).unwrap_or(0);
        total.div_ceil(u64::from(self.page_size.max(1)))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Result of a successful batch ingestion.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: u64,
    /// Normalized source URLs skipped as duplicates, in input order.
    pub rejected: Vec<String>,
}

/// Input for a single create.
#[derive(Debug, Clone, Default)]
pub struct CreateRedirect {
    pub old_url: String,
    pub new_url: Option<String>,
    pub referer: Option<String>,
    pub comment: Option<String>,
}

/// Service over the redirect store.
///
/// Listings are read through the cache; every mutation clears the listing
/// namespace afterwards. The site root is injected so source URLs normalize the
/// same way no matter which surface submits them.
pub struct RedirectService<R: RedirectRepository + ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    site_root: SiteRoot,
    clock: Arc<dyn Clock>,
    cache_ttl: Option<u64>,
}

impl<R: RedirectRepository + ?Sized> RedirectService<R> {
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn CacheService>,
        site_root: SiteRoot,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            cache,
            site_root,
            clock,
            cache_ttl: None,
        }
    }

    /// Overrides the TTL used for cached listings (cache default otherwise).
    pub fn with_cache_ttl(mut self, ttl_seconds: u64) -> Self {
        self.cache_ttl = Some(ttl_seconds);
        self
    }

    pub fn site_root(&self) -> &SiteRoot {
        &self.site_root
    }

    /// Returns one page of entries matching `query` together with the total count.
    ///
    /// The page and its count are cached as one value under the current listing
    /// generation, read before the store is queried. A fill racing a mutation lands
    /// under a superseded generation and is never served. If the generation cannot
    /// be read the cache is bypassed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the store query fails.
    pub async fn list(&self, query: &ListQuery) -> Result<RedirectPage, AppError> {
        let key = self
            .listing_generation()
            .await
            .map(|generation| query.cache_key(LISTING_CACHE_NAMESPACE, generation));

        if let Some(key) = &key {
            if let Some(page) = self.cached::<RedirectPage>(key).await {
                return Ok(page);
            }
        }

        let total = self.repository.count(&query.filter).await?;
        let items = self.repository.list(query).await?;
        let page = RedirectPage {
            items,
            total,
            page: query.page.page,
            page_size: query.page.page_size,
        };

        if let Some(key) = &key {
            self.fill(key, &page).await;
        }
        Ok(page)
    }

    /// Ingests a batch of `(source, destination)` pairs.
    ///
    /// Source URLs are normalized against the site root, then deduplicated within
    /// the batch (first occurrence wins), checked against the store in one query,
    /// and the survivors inserted in one transaction. Every skipped source URL is
    /// reported in input order.
    ///
    /// # Errors
    ///
    /// Returns an [`IngestFailure`] wrapping [`AppError::Validation`] when a source
    /// URL is blank, or [`AppError::Store`] when the store fails. In both cases
    /// nothing is persisted and the rejected list computed so far is kept.
    pub async fn ingest(
        &self,
        pairs: Vec<(String, Option<String>)>,
    ) -> Result<IngestReport, IngestFailure> {
        if let Some(position) = pairs.iter().position(|(old, _)| old.trim().is_empty()) {
            return Err(IngestFailure {
                rejected: Vec::new(),
                source: AppError::bad_request(
                    "Source URL must not be blank",
                    json!({ "index": position }),
                ),
            });
        }

        let total = pairs.len();
        let mut seen = HashSet::with_capacity(total);
        let mut candidates = Vec::with_capacity(total);
        // Input position of every rejected URL, so the final list keeps input order.
        let mut rejected: Vec<(usize, String)> = Vec::new();

        for (position, (old, new)) in pairs.iter().enumerate() {
            let old_url = self.site_root.normalize_source(old);
            if seen.insert(old_url.clone()) {
                candidates.push((position, old_url, normalize_destination(new.as_deref())));
            } else {
                rejected.push((position, old_url));
            }
        }

        let urls: Vec<String> = candidates.iter().map(|(_, old, _)| old.clone()).collect();
        let existing: HashSet<String> = match self.repository.find_existing(&urls).await {
            Ok(existing) => existing.into_iter().collect(),
            Err(source) => {
                return Err(IngestFailure {
                    rejected: in_input_order(rejected),
                    source,
                });
            }
        };

        let created_date = self.clock.now();
        let mut fresh = Vec::with_capacity(candidates.len());
        let mut positions = Vec::with_capacity(candidates.len());
        for (position, old_url, new_url) in candidates {
            if existing.contains(&old_url) {
                rejected.push((position, old_url));
            } else {
                positions.push((position, old_url.clone()));
                fresh.push(NewRedirect::imported(old_url, new_url, created_date));
            }
        }

        let outcome = if fresh.is_empty() {
            BatchInsert::default()
        } else {
            match self.repository.insert_batch(fresh).await {
                Ok(outcome) => outcome,
                Err(source) => {
                    tracing::warn!(error = %source, "Batch ingestion failed");
                    return Err(IngestFailure {
                        rejected: in_input_order(rejected),
                        source,
                    });
                }
            }
        };

        if !outcome.conflicts.is_empty() {
            let conflicts: HashSet<&str> = outcome.conflicts.iter().map(String::as_str).collect();
            rejected.extend(
                positions
                    .into_iter()
                    .filter(|(_, old)| conflicts.contains(old.as_str())),
            );
        }

        if outcome.inserted > 0 {
            self.invalidate_listings().await;
        }

        let report = IngestReport {
            accepted: outcome.inserted,
            rejected: in_input_order(rejected),
        };
        tracing::info!(
            submitted = total,
            accepted = report.accepted,
            rejected = report.rejected.len(),
            "Batch ingested"
        );

        Ok(report)
    }

    /// Creates a single entry through the ingestion path.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the normalized source URL already exists,
    /// [`AppError::Validation`] if it is blank.
    pub async fn create(&self, input: CreateRedirect) -> Result<RedirectEntry, AppError> {
        if input.old_url.trim().is_empty() {
            return Err(AppError::bad_request(
                "Source URL must not be blank",
                json!({}),
            ));
        }

        let old_url = self.site_root.normalize_source(&input.old_url);
        if !self
            .repository
            .find_existing(std::slice::from_ref(&old_url))
            .await?
            .is_empty()
        {
            return Err(duplicate(&old_url));
        }

        let new = NewRedirect {
            referer: input.referer.unwrap_or_default(),
            comment: input.comment.unwrap_or_default(),
            ..NewRedirect::imported(
                old_url.clone(),
                normalize_destination(input.new_url.as_deref()),
                self.clock.now(),
            )
        };

        let outcome = self.repository.insert_batch(vec![new]).await?;
        if outcome.inserted == 0 {
            return Err(duplicate(&old_url));
        }
        self.invalidate_listings().await;

        self.repository
            .find_by_old_url(&old_url)
            .await?
            .ok_or_else(|| {
                AppError::internal(
                    "Created entry could not be read back",
                    json!({ "old_url": old_url }),
                )
            })
    }

    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no entry has this id.
    pub async fn get(&self, id: i64) -> Result<RedirectEntry, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Applies a partial update and returns the updated entry.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no entry has this id.
    pub async fn update(&self, id: i64, patch: RedirectPatch) -> Result<RedirectEntry, AppError> {
        let changed = !patch.is_empty();
        let entry = self
            .repository
            .update(id, patch)
            .await?
            .ok_or_else(|| not_found(id))?;

        if changed {
            self.invalidate_listings().await;
        }
        Ok(entry)
    }

    /// Increments the hit counter of one entry.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no entry has this id.
    pub async fn record_hit(&self, id: i64) -> Result<(), AppError> {
        if !self.repository.increment_hits(id).await? {
            return Err(not_found(id));
        }

        self.invalidate_listings().await;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no entry has this id.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }

        self.invalidate_listings().await;
        tracing::info!(id, "Redirect deleted");
        Ok(())
    }

    /// Deletes every disabled entry and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Store`] if the delete fails; nothing is removed then.
    pub async fn purge(&self) -> Result<u64, AppError> {
        let removed = self.repository.purge_disabled().await?;
        if removed > 0 {
            self.invalidate_listings().await;
        }

        tracing::info!(removed, "Disabled redirects purged");
        Ok(removed)
    }

    /// Same as [`Self::purge`], reporting only whether it succeeded.
    pub async fn try_purge(&self) -> bool {
        match self.purge().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Purge failed");
                false
            }
        }
    }

    /// Store connectivity check.
    pub async fn ping(&self) -> bool {
        self.repository.ping().await
    }

    /// Moves listings to a new generation, then drops the cached pages.
    pub async fn invalidate_listings(&self) {
        match self.cache.increment(LISTING_GENERATION_KEY).await {
            Ok(generation) => tracing::debug!(generation, "Listing generation bumped"),
            Err(e) => tracing::warn!(error = %e, "Failed to bump listing generation"),
        }
        if let Err(e) = self.cache.invalidate_prefix(LISTING_CACHE_NAMESPACE).await {
            tracing::warn!(error = %e, "Failed to invalidate listing cache");
        }
    }

    async fn listing_generation(&self) -> Option<u64> {
        match self.cache.get(LISTING_GENERATION_KEY).await {
            Ok(None) => Some(0),
            Ok(Some(raw)) => match raw.parse() {
                Ok(generation) => Some(generation),
                Err(e) => {
                    tracing::warn!(raw, error = %e, "Unreadable listing generation");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Listing generation read failed, bypassing cache");
                None
            }
        }
    }

    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    tracing::debug!(key, "Listing cache hit");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "Discarding unreadable cache entry");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(key, "Listing cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn fill<T: Serialize>(&self, key: &str, value: &T) {
        let Ok(raw) = serde_json::to_string(value) else {
            return;
        };
        if let Err(e) = self.cache.set(key, &raw, self.cache_ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }
}

fn in_input_order(mut rejected: Vec<(usize, String)>) -> Vec<String> {
    rejected.sort_by_key(|(position, _)| *position);
    rejected.into_iter().map(|(_, url)| url).collect()
}

fn duplicate(old_url: &str) -> AppError {
    AppError::conflict(
        "A redirect for this source URL already exists",
        json!({ "old_url": old_url }),
    )
}

fn not_found(id: i64) -> AppError {
    AppError::not_found("Redirect not found", json!({ "id": id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::entities::PublishState;
    use crate::domain::listing::{ListFilter, ListOrdering, PageRequest};
    use crate::domain::repositories::MockRedirectRepository;
    use crate::infrastructure::cache::NullCache;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()))
    }

    fn service(repo: MockRedirectRepository) -> RedirectService<MockRedirectRepository> {
        RedirectService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            SiteRoot::parse("https://site.test/").unwrap(),
            fixed_clock(),
        )
    }

    fn pair(old: &str, new: &str) -> (String, Option<String>) {
        (old.to_string(), Some(new.to_string()))
    }

    fn entry(id: i64, old_url: &str) -> RedirectEntry {
        RedirectEntry {
            id,
            old_url: old_url.to_string(),
            new_url: String::new(),
            referer: Some(String::new()),
            comment: Some(String::new()),
            hits: 0,
            published: PublishState::Disabled,
            created_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_ingest_rejects_second_occurrence_in_batch() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_find_existing()
            .withf(|urls| urls.len() == 1 && urls[0] == "https://site.test/old-page")
            .times(1)
            .returning(|_| Ok(vec![]));
        repo.expect_insert_batch()
            .withf(|batch| {
                batch.len() == 1
                    && batch[0].old_url == "https://site.test/old-page"
                    && batch[0].new_url == "https://example.com/new"
                    && batch[0].published == PublishState::Disabled
            })
            .times(1)
            .returning(|_| {
                Ok(BatchInsert {
                    inserted: 1,
                    conflicts: vec![],
                })
            });

        let report = service(repo)
            .ingest(vec![
                pair("/old-page", "https://example.com/new"),
                pair("/old-page", "https://example.com/other"),
            ])
            .await
            .unwrap();

        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, vec!["https://site.test/old-page"]);
    }

    #[tokio::test]
    async fn test_ingest_rejects_existing_in_input_order() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_find_existing()
            .returning(|_| Ok(vec!["https://site.test/b".to_string()]));
        repo.expect_insert_batch().returning(|batch| {
            Ok(BatchInsert {
                inserted: batch.len() as u64,
                conflicts: vec![],
            })
        });

        let report = service(repo)
            .ingest(vec![
                pair("a", ""),
                pair("b", ""),
                pair("a", ""),
                pair("c", ""),
            ])
            .await
            .unwrap();

        assert_eq!(report.accepted, 2);
        assert_eq!(
            report.rejected,
            vec!["https://site.test/b", "https://site.test/a"]
        );
    }

    #[tokio::test]
    async fn test_ingest_uses_one_timestamp_and_empty_destination() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_find_existing().returning(|_| Ok(vec![]));
        repo.expect_insert_batch()
            .withf(|batch| {
                let stamp = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
                batch.iter().all(|n| n.created_date == stamp)
                    && batch[1].new_url.is_empty()
                    && batch.iter().all(|n| n.referer.is_empty() && n.comment.is_empty())
            })
            .returning(|_| {
                Ok(BatchInsert {
                    inserted: 2,
                    conflicts: vec![],
                })
            });

        let report = service(repo)
            .ingest(vec![pair("/x", "https://e.test/"), ("/y".to_string(), None)])
            .await
            .unwrap();
        assert!(report.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_reports_concurrent_conflicts() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_find_existing().returning(|_| Ok(vec![]));
        repo.expect_insert_batch().returning(|_| {
            Ok(BatchInsert {
                inserted: 1,
                conflicts: vec!["https://site.test/a".to_string()],
            })
        });

        let report = service(repo)
            .ingest(vec![pair("a", ""), pair("b", "")])
            .await
            .unwrap();

        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, vec!["https://site.test/a"]);
    }

    #[tokio::test]
    async fn test_ingest_store_failure_keeps_rejected() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_find_existing()
            .returning(|_| Ok(vec!["https://site.test/a".to_string()]));
        repo.expect_insert_batch()
            .returning(|_| Err(AppError::store("Database error", json!({}))));

        let failure = service(repo)
            .ingest(vec![pair("a", ""), pair("b", "")])
            .await
            .unwrap_err();

        assert_eq!(failure.rejected, vec!["https://site.test/a"]);
        assert!(matches!(failure.source, AppError::Store { .. }));
    }

    #[tokio::test]
    async fn test_ingest_blank_source_rejects_batch() {
        let repo = MockRedirectRepository::new();

        let failure = service(repo)
            .ingest(vec![pair("a", ""), pair("   ", "")])
            .await
            .unwrap_err();

        assert!(matches!(failure.source, AppError::Validation { .. }));
        assert!(failure.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_all_duplicates_skips_insert() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_find_existing()
            .returning(|_| Ok(vec!["https://site.test/a".to_string()]));
        repo.expect_insert_batch().never();

        let report = service(repo).ingest(vec![pair("a", "")]).await.unwrap();
        assert_eq!(report.accepted, 0);
        assert_eq!(report.rejected, vec!["https://site.test/a"]);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_find_existing()
            .returning(|_| Ok(vec!["https://site.test/a".to_string()]));

        let err = service(repo)
            .create(CreateRedirect {
                old_url: "/a".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_keeps_comment() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_find_existing().returning(|_| Ok(vec![]));
        repo.expect_insert_batch()
            .withf(|batch| batch[0].comment == "moved")
            .returning(|_| {
                Ok(BatchInsert {
                    inserted: 1,
                    conflicts: vec![],
                })
            });
        repo.expect_find_by_old_url()
            .withf(|url| url == "https://site.test/a")
            .returning(|url| {
                let mut e = entry(7, url);
                e.comment = Some("moved".to_string());
                Ok(Some(e))
            });

        let created = service(repo)
            .create(CreateRedirect {
                old_url: "/a".to_string(),
                comment: Some("moved".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.id, 7);
        assert_eq!(created.comment.as_deref(), Some("moved"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_find_by_id().with(eq(3)).returning(|_| Ok(None));

        let err = service(repo).get(3).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_record_hit_missing_is_not_found() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_increment_hits().returning(|_| Ok(false));

        assert!(matches!(
            service(repo).record_hit(1).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_purge_and_try_purge() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_purge_disabled().times(1).returning(|| Ok(4));
        assert_eq!(service(repo).purge().await.unwrap(), 4);

        let mut failing = MockRedirectRepository::new();
        failing
            .expect_purge_disabled()
            .returning(|| Err(AppError::store("Database error", json!({}))));
        assert!(!service(failing).try_purge().await);
    }

    #[tokio::test]
    async fn test_list_reports_total() {
        let mut repo = MockRedirectRepository::new();
        repo.expect_count().returning(|_| Ok(3));
        repo.expect_list()
            .returning(|_| Ok(vec![entry(1, "https://site.test/a")]));

        let query = ListQuery::new(
            ListFilter::default(),
            ListOrdering::default(),
            PageRequest::new(1, 1).unwrap(),
        );
        let page = service(repo).list(&query).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
    }
}
