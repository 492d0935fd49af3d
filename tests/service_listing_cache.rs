mod common;

use chrono::Utc;
use std::sync::Arc;

use redirect_registry::application::services::{
    CreateRedirect, LISTING_CACHE_NAMESPACE, LISTING_GENERATION_KEY,
};
use redirect_registry::domain::entities::{NewRedirect, PublishState, RedirectPatch};
use redirect_registry::domain::listing::{ListFilter, ListQuery};
use redirect_registry::domain::repositories::RedirectRepository;
use redirect_registry::infrastructure::persistence::MemoryRedirectRepository;

fn pair(old: &str) -> (String, Option<String>) {
    (old.to_string(), None)
}

fn all() -> ListQuery {
    ListQuery::default()
}

fn disabled() -> ListQuery {
    ListQuery {
        filter: ListFilter::parse(None, Some("0")).unwrap(),
        ..ListQuery::default()
    }
}

#[tokio::test]
async fn test_repeated_listing_is_served_from_cache() {
    let repo = Arc::new(MemoryRedirectRepository::new());
    let cache = Arc::new(common::MemoryCache::default());
    let service = common::create_test_service(repo.clone(), cache.clone());

    service.ingest(vec![pair("/a")]).await.unwrap();
    let first = service.list(&all()).await.unwrap();
    assert_eq!(first.total, 1);
    assert_eq!(cache.keys_with_prefix(LISTING_CACHE_NAMESPACE).len(), 1);

    // Written behind the service's back, so only a store read would see it.
    repo.insert_batch(vec![NewRedirect::imported(
        "https://site.test/b".to_string(),
        String::new(),
        Utc::now(),
    )])
    .await
    .unwrap();

    let second = service.list(&all()).await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_every_mutation_refreshes_listings() {
    let cache = Arc::new(common::MemoryCache::default());
    let service = common::create_test_service(
        Arc::new(MemoryRedirectRepository::new()),
        cache.clone(),
    );

    service.ingest(vec![pair("/a"), pair("/b")]).await.unwrap();
    assert_eq!(service.list(&all()).await.unwrap().total, 2);

    service
        .create(CreateRedirect {
            old_url: "/c".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(service.list(&all()).await.unwrap().total, 3);

    service.record_hit(1).await.unwrap();
    let page = service.list(&all()).await.unwrap();
    assert_eq!(page.items.iter().find(|e| e.id == 1).unwrap().hits, 1);

    service
        .update(
            2,
            RedirectPatch {
                published: Some(PublishState::Enabled),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(service.list(&disabled()).await.unwrap().total, 2);

    service.delete(3).await.unwrap();
    assert_eq!(service.list(&all()).await.unwrap().total, 2);

    assert_eq!(service.purge().await.unwrap(), 1);
    assert_eq!(service.list(&disabled()).await.unwrap().total, 0);
    assert_eq!(service.list(&all()).await.unwrap().total, 1);
}

#[tokio::test]
async fn test_invalidation_moves_generation_and_drops_pages() {
    let cache = Arc::new(common::MemoryCache::default());
    let service = common::create_test_service(
        Arc::new(MemoryRedirectRepository::new()),
        cache.clone(),
    );

    service.list(&all()).await.unwrap();
    service.list(&disabled()).await.unwrap();
    assert_eq!(cache.keys_with_prefix(LISTING_CACHE_NAMESPACE).len(), 2);
    assert_eq!(cache.value(LISTING_GENERATION_KEY), None);

    service.ingest(vec![pair("/a")]).await.unwrap();

    assert!(cache.keys_with_prefix(LISTING_CACHE_NAMESPACE).is_empty());
    assert_eq!(cache.value(LISTING_GENERATION_KEY).as_deref(), Some("1"));

    service.list(&all()).await.unwrap();
    let keys = cache.keys_with_prefix(LISTING_CACHE_NAMESPACE);
    assert_eq!(keys, vec![all().cache_key(LISTING_CACHE_NAMESPACE, 1)]);
}

#[tokio::test]
async fn test_listing_read_before_ingest_is_not_served_after_it() {
    let repo = Arc::new(common::GatedList::new());
    let cache = Arc::new(common::MemoryCache::default());
    let service = common::create_test_service(repo.clone(), cache.clone());

    repo.arm();
    let slow = tokio::spawn({
        let service = service.clone();
        async move { service.list(&all()).await }
    });

    repo.read_done.notified().await;
    let report = service.ingest(vec![pair("/a")]).await.unwrap();
    assert_eq!(report.accepted, 1);
    repo.release.notify_one();

    let stale = slow.await.unwrap().unwrap();
    assert_eq!(stale.total, 0);

    let fresh = service.list(&all()).await.unwrap();
    assert_eq!(fresh.total, 1);
    assert_eq!(fresh.items.len(), 1);
    assert_eq!(fresh.items[0].old_url, "https://site.test/a");
}

#[tokio::test]
async fn test_unreachable_cache_falls_back_to_store() {
    let service = common::create_test_service(
        Arc::new(MemoryRedirectRepository::new()),
        Arc::new(common::DownCache),
    );

    service.ingest(vec![pair("/a")]).await.unwrap();
    assert_eq!(service.list(&all()).await.unwrap().total, 1);

    service.record_hit(1).await.unwrap();
    let page = service.list(&all()).await.unwrap();
    assert_eq!(page.items[0].hits, 1);
    assert!(service.try_purge().await);
}
