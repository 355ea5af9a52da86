//! Read-through caching and invalidation against an in-memory database

use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::{create_user, listing_fields, params, sample_listing, setup, FailingCache};
use crate::api::error::ApiError;
use crate::cache::{CacheKey, CacheLayer, MokaCacheLayer};
use crate::config::Config;
use crate::db::favorite;
use crate::filter::{ListingQuery, Pagination};
use crate::models::ListingPatch;
use crate::service::{Invalidator, Mutation, QueryService};
use crate::state::AppState;

fn query(pairs: &[(&str, &str)]) -> ListingQuery {
    ListingQuery::from_params(&params(pairs), 100).unwrap()
}

fn item_ids(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_cache_hit_and_miss() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;
    for (id, price) in [("P1", 100.0), ("P2", 200.0), ("P3", 300.0)] {
        ctx.state.listings.create(&owner, sample_listing(id, price)).await.unwrap();
    }

    let q = query(&[("city", "Pune")]);
    let first = ctx.state.queries.search(&q).await.unwrap();
    assert!(!first.hit, "First query should miss");

    let page: Value = first.parse().unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 1);
    assert_eq!(page["pageSize"], 3);
    assert_eq!(item_ids(&page), vec!["P1", "P2", "P3"]);
    assert_eq!(page["items"][0]["createdBy"]["name"], "owner");

    let second = ctx.state.queries.search(&q).await.unwrap();
    assert!(second.hit, "Identical query should hit");
    assert_eq!(first.body, second.body);

    let reordered = query(&[("city", "Pune"), ("page", "1"), ("limit", "10")]);
    assert!(ctx.state.queries.search(&reordered).await.unwrap().hit);

    let next_page = query(&[("city", "Pune"), ("limit", "2"), ("page", "2")]);
    let page: Value = ctx.state.queries.search(&next_page).await.unwrap().parse().unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["pageSize"], 1);
    assert_eq!(item_ids(&page), vec!["P3"]);
}

#[tokio::test]
async fn test_empty_results_are_cached() {
    let ctx = setup().await;
    let q = query(&[("city", "Nowhere")]);

    let first = ctx.state.queries.search(&q).await.unwrap();
    let page: Value = first.parse().unwrap();
    assert_eq!(page["total"], 0);
    assert_eq!(page["items"], json!([]));

    assert!(ctx.state.queries.search(&q).await.unwrap().hit);
}

#[tokio::test]
async fn test_update_purges_stale_search() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;
    ctx.state.listings.create(&owner, sample_listing("L1", 100.0)).await.unwrap();

    let q = query(&[("price[gte]", "50")]);
    let key = CacheKey::listing_search(&q).to_string();

    let page: Value = ctx.state.queries.search(&q).await.unwrap().parse().unwrap();
    assert_eq!(item_ids(&page), vec!["L1"]);
    assert!(ctx.cache.get(&key).await.unwrap().is_some(), "Result should be cached under its key");

    let patch = ListingPatch { price: Some(10.0), ..Default::default() };
    ctx.state.listings.update(&owner, "L1", patch).await.unwrap();
    assert!(ctx.cache.keys("properties:*").await.unwrap().is_empty());

    let after = ctx.state.queries.search(&q).await.unwrap();
    assert!(!after.hit);
    let page: Value = after.parse().unwrap();
    assert_eq!(page["total"], 0);
    assert!(ctx.cache.get(&key).await.unwrap().is_some(), "Fresh result should be cached again");

    let cheap: Value = ctx
        .state
        .queries
        .search(&query(&[("price[lte]", "10")]))
        .await
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(item_ids(&cheap), vec!["L1"]);
}

#[tokio::test]
async fn test_create_purges_every_search() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;

    ctx.state.queries.search(&query(&[])).await.unwrap();
    ctx.state.queries.search(&query(&[("city", "Pune")])).await.unwrap();
    assert_eq!(ctx.cache.keys("properties:*").await.unwrap().len(), 2);

    ctx.state.listings.create(&owner, sample_listing("P1", 1.0)).await.unwrap();
    assert!(ctx.cache.keys("properties:*").await.unwrap().is_empty());

    let page: Value = ctx.state.queries.search(&query(&[])).await.unwrap().parse().unwrap();
    assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn test_unfavorite_is_visible_immediately() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;
    let user = create_user(&ctx.pool, "u").await;
    ctx.state.listings.create(&owner, sample_listing("P1", 100.0)).await.unwrap();

    ctx.state.favorites.add(&user, "P1").await.unwrap();

    let pagination = Pagination { page: 1, limit: 10 };
    let page: Value = ctx
        .state
        .queries
        .list_favorites(&user.id, &pagination)
        .await
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["property"]["id"], "P1");

    let key = format!("favorites:{}:1:10", user.id);
    assert!(ctx.cache.get(&key).await.unwrap().is_some());

    ctx.state.favorites.remove(&user, "P1").await.unwrap();
    assert!(ctx.cache.get(&key).await.unwrap().is_none());

    let after = ctx.state.queries.list_favorites(&user.id, &pagination).await.unwrap();
    assert!(!after.hit);
    let page: Value = after.parse().unwrap();
    assert_eq!(page["total"], 0);
    assert_eq!(page["items"], json!([]));
}

#[tokio::test]
async fn test_favorite_changes_do_not_touch_other_users() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;
    let alice = create_user(&ctx.pool, "alice").await;
    let bob = create_user(&ctx.pool, "bob").await;
    ctx.state.listings.create(&owner, sample_listing("P1", 100.0)).await.unwrap();
    ctx.state.listings.create(&owner, sample_listing("P2", 100.0)).await.unwrap();
    ctx.state.favorites.add(&bob, "P2").await.unwrap();

    let pagination = Pagination::default();
    ctx.state.queries.list_favorites(&alice.id, &pagination).await.unwrap();
    ctx.state.queries.list_favorites(&bob.id, &pagination).await.unwrap();
    ctx.state.queries.search(&query(&[])).await.unwrap();

    ctx.state.favorites.add(&alice, "P1").await.unwrap();

    let bob_key = CacheKey::favorites(&bob.id, &pagination).to_string();
    let alice_key = CacheKey::favorites(&alice.id, &pagination).to_string();
    assert!(ctx.cache.get(&bob_key).await.unwrap().is_some(), "Bob's page must survive");
    assert!(ctx.cache.get(&alice_key).await.unwrap().is_none());
    assert_eq!(ctx.cache.keys("properties:*").await.unwrap().len(), 1);

    ctx.state.favorites.remove(&alice, "P1").await.unwrap();
    assert!(ctx.cache.get(&bob_key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_listing_update_refreshes_favoriting_users() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;
    let fan = create_user(&ctx.pool, "fan").await;
    let bystander = create_user(&ctx.pool, "bystander").await;
    ctx.state.listings.create(&owner, sample_listing("P1", 100.0)).await.unwrap();
    ctx.state.favorites.add(&fan, "P1").await.unwrap();

    let pagination = Pagination::default();
    ctx.state.queries.list_favorites(&fan.id, &pagination).await.unwrap();
    ctx.state.queries.list_favorites(&bystander.id, &pagination).await.unwrap();

    let patch = ListingPatch { title: Some("Renovated".to_string()), ..Default::default() };
    ctx.state.listings.update(&owner, "P1", patch).await.unwrap();

    let bystander_key = CacheKey::favorites(&bystander.id, &pagination).to_string();
    assert!(ctx.cache.get(&bystander_key).await.unwrap().is_some());

    let refreshed = ctx.state.queries.list_favorites(&fan.id, &pagination).await.unwrap();
    assert!(!refreshed.hit);
    let page: Value = refreshed.parse().unwrap();
    assert_eq!(page["items"][0]["property"]["title"], "Renovated");
}

#[tokio::test]
async fn test_delete_cascades_to_favorites_and_their_caches() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;
    ctx.state.listings.create(&owner, sample_listing("P1", 100.0)).await.unwrap();
    ctx.state.listings.create(&owner, sample_listing("P2", 100.0)).await.unwrap();

    let pagination = Pagination::default();
    let mut fans = Vec::new();
    for name in ["a", "b", "c"] {
        let fan = create_user(&ctx.pool, name).await;
        ctx.state.favorites.add(&fan, "P1").await.unwrap();
        ctx.state.favorites.add(&fan, "P2").await.unwrap();
        ctx.state.queries.list_favorites(&fan.id, &pagination).await.unwrap();
        fans.push(fan);
    }

    let row_id = ctx.state.listings.get("P1").await.unwrap().row_id;
    assert_eq!(favorite::count_for_listing(&ctx.pool, row_id).await.unwrap(), 3);

    ctx.state.listings.delete(&owner, "P1").await.unwrap();

    assert_eq!(favorite::count_for_listing(&ctx.pool, row_id).await.unwrap(), 0);
    assert!(ctx.cache.keys("favorites:*").await.unwrap().is_empty());
    assert!(matches!(ctx.state.listings.get("P1").await, Err(ApiError::NotFound(_))));

    for fan in &fans {
        let page: Value = ctx
            .state
            .queries
            .list_favorites(&fan.id, &pagination)
            .await
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(page["total"], 1);
        assert_eq!(page["items"][0]["property"]["id"], "P2");
    }
}

#[tokio::test]
async fn test_duplicate_favorite_conflicts() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;
    let user = create_user(&ctx.pool, "u").await;
    ctx.state.listings.create(&owner, sample_listing("P1", 100.0)).await.unwrap();

    ctx.state.favorites.add(&user, "P1").await.unwrap();
    let second = ctx.state.favorites.add(&user, "P1").await;
    assert!(matches!(second, Err(ApiError::Conflict(_))), "got {:?}", second);

    let row_id = ctx.state.listings.get("P1").await.unwrap().row_id;
    assert_eq!(favorite::count_for_listing(&ctx.pool, row_id).await.unwrap(), 1);

    assert!(matches!(
        ctx.state.favorites.add(&user, "missing").await,
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        ctx.state.favorites.remove(&owner, "P1").await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_only_owner_may_mutate() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;
    let intruder = create_user(&ctx.pool, "intruder").await;
    ctx.state.listings.create(&owner, sample_listing("P1", 100.0)).await.unwrap();

    ctx.state.queries.search(&query(&[])).await.unwrap();

    let patch = ListingPatch { price: Some(1.0), ..Default::default() };
    assert!(matches!(
        ctx.state.listings.update(&intruder, "P1", patch.clone()).await,
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        ctx.state.listings.delete(&intruder, "P1").await,
        Err(ApiError::Forbidden(_))
    ));
    assert!(matches!(
        ctx.state.listings.update(&owner, "nope", patch).await,
        Err(ApiError::NotFound(_))
    ));

    // Rejected mutations leave the cache alone.
    assert_eq!(ctx.cache.keys("properties:*").await.unwrap().len(), 1);
    assert_eq!(ctx.state.listings.get("P1").await.unwrap().fields.price, Some(100.0));
}

#[tokio::test]
async fn test_create_validation_and_duplicate_ids() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;

    let mut bad = sample_listing("P1", 100.0);
    bad.rating = Some(7.0);
    assert!(matches!(
        ctx.state.listings.create(&owner, bad).await,
        Err(ApiError::Validation(_))
    ));

    ctx.state.listings.create(&owner, sample_listing("P1", 100.0)).await.unwrap();
    assert!(matches!(
        ctx.state.listings.create(&owner, sample_listing("P1", 50.0)).await,
        Err(ApiError::Conflict(_))
    ));
}

#[tokio::test]
async fn test_filter_semantics() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;

    let fixtures = [
        json!({"id": "A", "price": 100, "amenities": ["gym", "pool"], "tags": ["sea"],
               "availableFrom": "2024-01-15T00:00:00Z", "isVerified": true, "bedrooms": 2,
               "location": {"state": "Goa", "city": "Panaji"}}),
        json!({"id": "B", "price": 200, "amenities": ["gym"], "tags": ["city", "new"],
               "availableFrom": "2024-03-01T00:00:00Z", "isVerified": false, "bedrooms": 3,
               "location": {"state": "Goa", "city": "Margao"}}),
        json!({"id": "C", "price": 300, "amenities": ["pool", "gym", "lift"], "tags": [],
               "isVerified": true, "bedrooms": 3,
               "location": {"state": "Kerala", "city": "Kochi"}}),
    ];
    for fixture in fixtures {
        ctx.state.listings.create(&owner, listing_fields(fixture)).await.unwrap();
    }

    async fn ids(ctx: &super::TestContext, pairs: &[(&str, &str)]) -> Vec<String> {
        let page: Value = ctx.state.queries.search(&query(pairs)).await.unwrap().parse().unwrap();
        item_ids(&page)
    }

    assert_eq!(ids(&ctx, &[("amenities", "pool,gym")]).await, vec!["A", "C"]);
    assert_eq!(ids(&ctx, &[("tags", "sea,new")]).await, vec!["A", "B"]);
    assert_eq!(ids(&ctx, &[("price[gt]", "100"), ("price[lt]", "300")]).await, vec!["B"]);
    assert_eq!(ids(&ctx, &[("bedrooms", "3"), ("isVerified", "true")]).await, vec!["C"]);
    assert_eq!(ids(&ctx, &[("state", "Goa"), ("city", "Margao")]).await, vec!["B"]);
    assert_eq!(ids(&ctx, &[("availableFrom[gte]", "2024-02-01")]).await, vec!["B"]);
    assert_eq!(ids(&ctx, &[("availableFrom[lte]", "2024-02-01")]).await, vec!["A"]);
    assert_eq!(ids(&ctx, &[("sort", "-price")]).await, vec!["C", "B", "A"]);
    assert_eq!(ids(&ctx, &[("sort", "-price"), ("limit", "1"), ("page", "3")]).await, vec!["A"]);
}

#[tokio::test]
async fn test_available_from_keeps_sub_second_precision() {
    let ctx = setup().await;
    let owner = create_user(&ctx.pool, "owner").await;

    let created = ctx
        .state
        .listings
        .create(
            &owner,
            listing_fields(json!({"id": "A", "availableFrom": "2024-01-01T00:00:00.500Z"})),
        )
        .await
        .unwrap();
    assert_eq!(
        created.fields.available_from.map(|date| date.timestamp_millis()),
        Some(1_704_067_200_500)
    );

    let page: Value = ctx
        .state
        .queries
        .search(&query(&[("availableFrom[gt]", "2024-01-01T00:00:00Z")]))
        .await
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["availableFrom"], "2024-01-01T00:00:00.500Z");

    let page: Value = ctx
        .state
        .queries
        .search(&query(&[("availableFrom[gt]", "2024-01-01T00:00:00.500Z")]))
        .await
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_cache_failures_fall_back_to_database() {
    let ctx = setup().await;
    let failing = Arc::new(FailingCache::default());
    let state = AppState::new(Config::default(), ctx.pool.clone(), failing.clone());
    let owner = create_user(&ctx.pool, "owner").await;
    let user = create_user(&ctx.pool, "u").await;

    state.listings.create(&owner, sample_listing("P1", 100.0)).await.unwrap();
    state.favorites.add(&user, "P1").await.unwrap();

    let first = state.queries.search(&query(&[])).await.unwrap();
    let second = state.queries.search(&query(&[])).await.unwrap();
    assert!(!first.hit && !second.hit);
    let page: Value = second.parse().unwrap();
    assert_eq!(page["total"], 1);

    let favorites: Value = state
        .queries
        .list_favorites(&user.id, &Pagination::default())
        .await
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(favorites["total"], 1);

    assert!(failing.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_entries_expire_after_ttl() {
    let ctx = setup().await;
    let cache = Arc::new(MokaCacheLayer::new(100));
    let queries = QueryService::new(ctx.pool.clone(), cache.clone(), Duration::from_millis(100));

    assert!(!queries.search(&query(&[])).await.unwrap().hit);
    assert!(queries.search(&query(&[])).await.unwrap().hit);

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert!(!queries.search(&query(&[])).await.unwrap().hit, "Entry should be gone after its TTL");
}

#[tokio::test]
async fn test_invalidator_counts_purged_entries() {
    let cache = Arc::new(MokaCacheLayer::new(100));
    let ttl = Duration::from_secs(60);
    for key in ["properties:a", "properties:b", "favorites:u1:1:10", "favorites:u2:1:10"] {
        cache.set(key, "{}".to_string(), ttl).await.unwrap();
    }

    let invalidator = Invalidator::new(cache.clone());
    let removed = invalidator
        .apply(&Mutation::ListingUpdated { favorited_by: vec!["u1".into()] })
        .await;

    assert_eq!(removed, 3);
    assert_eq!(cache.keys("*").await.unwrap(), vec!["favorites:u2:1:10".to_string()]);
    assert_eq!(invalidator.invalidate("properties:").await, 0);
}
