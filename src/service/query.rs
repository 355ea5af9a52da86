//! Read-through cache for listing searches and favorites pages

use serde::Serialize;
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::error::ApiError;
use crate::cache::{CacheKey, CacheLayer};
use crate::db::{favorite, listing};
use crate::filter::{ListingQuery, Pagination};
use crate::models::ResultPage;

/// A serialized response page and whether it came from the cache.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub body: String,
    pub hit: bool,
}

#[cfg(test)]
impl CachedPage {
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Clone)]
pub struct QueryService {
    pool: SqlitePool,
    cache: Arc<dyn CacheLayer>,
    ttl: Duration,
}

impl QueryService {
    pub fn new(pool: SqlitePool, cache: Arc<dyn CacheLayer>, ttl: Duration) -> Self {
        Self { pool, cache, ttl }
    }

    pub async fn search(&self, query: &ListingQuery) -> Result<CachedPage, ApiError> {
        let key = CacheKey::listing_search(query);
        self.read_through(&key, || async {
            let (listings, total) = listing::search_listings(&self.pool, query).await?;
            Ok::<_, ApiError>(ResultPage::new(total, query.pagination.page, listings))
        })
        .await
    }

    pub async fn list_favorites(&self, user_id: &str, pagination: &Pagination) -> Result<CachedPage, ApiError> {
        let key = CacheKey::favorites(user_id, pagination);
        self.read_through(&key, || async {
            let (favorites, total) = favorite::list_favorites(&self.pool, user_id, pagination).await?;
            Ok::<_, ApiError>(ResultPage::new(total, pagination.page, favorites))
        })
        .await
    }

    /// Serves `key` from the cache, or runs `load` and caches its result.
    /// Cache failures fall through to `load` rather than failing the request.
    async fn read_through<T, F, Fut>(&self, key: &CacheKey, load: F) -> Result<CachedPage, ApiError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResultPage<T>, ApiError>>,
    {
        let key = key.to_string();

        match self.cache.get(&key).await {
            Ok(Some(body)) => {
                debug!("Cache hit for key: {}", key);
                return Ok(CachedPage { body, hit: true });
            }
            Ok(None) => debug!("Cache miss for key: {}", key),
            Err(e) => warn!("Cache read failed for {}, querying database: {}", key, e),
        }

        let page = load().await?;
        let body = serde_json::to_string(&page)?;

        if let Err(e) = self.cache.set(&key, body.clone(), self.ttl).await {
            warn!("Cache write failed for {}: {}", key, e);
        }

        Ok(CachedPage { body, hit: false })
    }
}
