#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use redirect_registry::api::handlers::health_handler;
use redirect_registry::api::routes::redirect_routes;
use redirect_registry::application::services::RedirectService;
use redirect_registry::domain::clock::FixedClock;
use redirect_registry::domain::entities::{NewRedirect, RedirectEntry, RedirectPatch};
use redirect_registry::domain::listing::{ListFilter, ListQuery};
use redirect_registry::domain::repositories::{BatchInsert, RedirectRepository};
use redirect_registry::error::AppError;
use redirect_registry::infrastructure::cache::{CacheError, CacheResult, CacheService, NullCache};
use redirect_registry::infrastructure::persistence::MemoryRedirectRepository;
use redirect_registry::state::AppState;
use redirect_registry::utils::url_normalizer::SiteRoot;

pub const SITE_ROOT: &str = "https://site.test/";

pub fn create_test_state_with(
    repository: Arc<dyn RedirectRepository>,
    cache: Arc<dyn CacheService>,
) -> AppState {
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
    let service = RedirectService::new(
        repository,
        cache.clone(),
        SiteRoot::parse(SITE_ROOT).unwrap(),
        clock,
    );

    AppState::new(Arc::new(service), cache)
}

pub fn create_test_state() -> AppState {
    create_test_state_with(
        Arc::new(MemoryRedirectRepository::new()),
        Arc::new(NullCache::new()),
    )
}

pub fn make_server(state: AppState) -> TestServer {
    let app = Router::new()
        .route("/health", axum::routing::get(health_handler))
        .nest("/api", redirect_routes())
        .with_state(state);

    TestServer::new(app).unwrap()
}

/// Ingests `(source, destination)` pairs through the batch endpoint.
pub async fn seed(server: &TestServer, pairs: &[(&str, &str)]) {
    let pairs: Vec<_> = pairs
        .iter()
        .map(|(old, new)| json!({ "old_url": old, "new_url": new }))
        .collect();

    server
        .post("/api/redirects/batch")
        .json(&json!({ "pairs": pairs }))
        .await
        .assert_status_ok();
}

pub fn create_test_service(
    repository: Arc<dyn RedirectRepository>,
    cache: Arc<dyn CacheService>,
) -> Arc<redirect_registry::state::DynRedirectService> {
    create_test_state_with(repository, cache).redirect_service
}

/// In-process cache keeping every value until it is invalidated.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str, _ttl_seconds: Option<u64>) -> CacheResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> CacheResult<()> {
        self.entries
            .lock()
            .unwrap()
            .retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    async fn increment(&self, key: &str) -> CacheResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let next = entries
            .get(key)
            .map_or(0, |v| v.parse::<u64>().unwrap())
            + 1;
        entries.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Cache whose backend is always unreachable.
pub struct DownCache;

fn unreachable_cache() -> CacheError {
    CacheError::ConnectionError("connection refused".to_string())
}

#[async_trait]
impl CacheService for DownCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(unreachable_cache())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_seconds: Option<u64>) -> CacheResult<()> {
        Err(unreachable_cache())
    }

    async fn invalidate_prefix(&self, _prefix: &str) -> CacheResult<()> {
        Err(unreachable_cache())
    }

    async fn increment(&self, _key: &str) -> CacheResult<u64> {
        Err(unreachable_cache())
    }

    async fn health_check(&self) -> bool {
        false
    }
}

/// Store that reports `existing` as already registered and fails every write.
pub struct FailingWrites {
    pub existing: Vec<String>,
}

#[async_trait]
impl RedirectRepository for FailingWrites {
    async fn list(&self, _query: &ListQuery) -> Result<Vec<RedirectEntry>, AppError> {
        Ok(vec![])
    }

    async fn count(&self, _filter: &ListFilter) -> Result<i64, AppError> {
        Ok(0)
    }

    async fn find_by_id(&self, _id: i64) -> Result<Option<RedirectEntry>, AppError> {
        Ok(None)
    }

    async fn find_by_old_url(&self, _old_url: &str) -> Result<Option<RedirectEntry>, AppError> {
        Ok(None)
    }

    async fn find_existing(&self, old_urls: &[String]) -> Result<Vec<String>, AppError> {
        Ok(old_urls
            .iter()
            .filter(|u| self.existing.contains(*u))
            .cloned()
            .collect())
    }

    async fn insert_batch(&self, _batch: Vec<NewRedirect>) -> Result<BatchInsert, AppError> {
        Err(AppError::store("Database error", json!({})))
    }

    async fn update(
        &self,
        _id: i64,
        _patch: RedirectPatch,
    ) -> Result<Option<RedirectEntry>, AppError> {
        Err(AppError::store("Database error", json!({})))
    }

    async fn increment_hits(&self, _id: i64) -> Result<bool, AppError> {
        Err(AppError::store("Database error", json!({})))
    }

    async fn delete(&self, _id: i64) -> Result<bool, AppError> {
        Err(AppError::store("Database error", json!({})))
    }

    async fn purge_disabled(&self) -> Result<u64, AppError> {
        Err(AppError::store("Database error", json!({})))
    }

    async fn ping(&self) -> bool {
        false
    }
}

/// In-memory store whose next listing pauses after reading, until released.
pub struct GatedList {
    pub inner: MemoryRedirectRepository,
    armed: AtomicBool,
    pub read_done: Notify,
    pub release: Notify,
}

impl GatedList {
    pub fn new() -> Self {
        Self {
            inner: MemoryRedirectRepository::new(),
            armed: AtomicBool::new(false),
            read_done: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Makes the next `list` call wait for [`Self::release`].
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RedirectRepository for GatedList {
    async fn list(&self, query: &ListQuery) -> Result<Vec<RedirectEntry>, AppError> {
        let items = self.inner.list(query).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.read_done.notify_one();
            self.release.notified().await;
        }
        items
    }

    async fn count(&self, filter: &ListFilter) -> Result<i64, AppError> {
        self.inner.count(filter).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<RedirectEntry>, AppError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_old_url(&self, old_url: &str) -> Result<Option<RedirectEntry>, AppError> {
        self.inner.find_by_old_url(old_url).await
    }

    async fn find_existing(&self, old_urls: &[String]) -> Result<Vec<String>, AppError> {
        self.inner.find_existing(old_urls).await
    }

    async fn insert_batch(&self, batch: Vec<NewRedirect>) -> Result<BatchInsert, AppError> {
        self.inner.insert_batch(batch).await
    }

    async fn update(
        &self,
        id: i64,
        patch: RedirectPatch,
    ) -> Result<Option<RedirectEntry>, AppError> {
        self.inner.update(id, patch).await
    }

    async fn increment_hits(&self, id: i64) -> Result<bool, AppError> {
        self.inner.increment_hits(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        self.inner.delete(id).await
    }

    async fn purge_disabled(&self) -> Result<u64, AppError> {
        self.inner.purge_disabled().await
    }

    async fn ping(&self) -> bool {
        self.inner.ping().await
    }
}
