mod cache_tests;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheError, CacheLayer, MokaCacheLayer};
use crate::config::Config;
use crate::db::{connection, user};
use crate::models::{ListingFields, User};
use crate::state::AppState;

pub(crate) struct TestContext {
    pub state: Arc<AppState>,
    pub cache: Arc<MokaCacheLayer>,
    pub pool: SqlitePool,
}

pub(crate) async fn setup() -> TestContext {
    setup_with_config(Config::default()).await
}

pub(crate) async fn setup_with_config(config: Config) -> TestContext {
    let pool = connection::establish_connection("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    let cache = Arc::new(MokaCacheLayer::new(1_000));
    let state = Arc::new(AppState::new(config, pool.clone(), cache.clone()));

    TestContext { state, cache, pool }
}

pub(crate) async fn create_user(pool: &SqlitePool, name: &str) -> User {
    user::create_user(pool, &format!("{}@example.com", name), name)
        .await
        .expect("Failed to create user")
}

pub(crate) fn listing_fields(value: Value) -> ListingFields {
    serde_json::from_value(value).expect("Invalid listing fixture")
}

pub(crate) fn sample_listing(id: &str, price: f64) -> ListingFields {
    listing_fields(json!({
        "id": id,
        "title": format!("Listing {}", id),
        "type": "Apartment",
        "price": price,
        "location": { "state": "Maharashtra", "city": "Pune" },
        "areaSqFt": 900,
        "bedrooms": 2,
        "bathrooms": 1,
        "amenities": ["gym", "pool"],
        "furnished": "Semi",
        "listedBy": "Owner",
        "tags": ["new"],
        "rating": 4.2,
        "isVerified": true,
        "listingType": "rent"
    }))
}

pub(crate) fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Cache backend that fails every call, counting attempts.
#[derive(Default)]
pub(crate) struct FailingCache {
    pub calls: AtomicUsize,
}

impl FailingCache {
    fn fail(&self) -> CacheError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CacheError::Unavailable("connection refused".to_string())
    }
}

#[async_trait]
impl CacheLayer for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(self.fail())
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(self.fail())
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(self.fail())
    }

    async fn delete(&self, _keys: &[String]) -> Result<usize, CacheError> {
        Err(self.fail())
    }
}
