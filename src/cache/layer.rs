//! Key-value cache layer with per-entry TTL and prefix enumeration

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Operations the query layer needs from a cache backend.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Keys matching `pattern`. A trailing `*` matches any suffix; otherwise the match is exact.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Removes the given keys and returns how many were present.
    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError>;
}

pub fn matches_pattern(key: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[derive(Clone)]
struct CachedValue {
    body: Arc<str>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CachedValue, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backed by Moka
#[derive(Clone)]
pub struct MokaCacheLayer {
    cache: Cache<String, CachedValue>,
}

impl MokaCacheLayer {
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl CacheLayer for MokaCacheLayer {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).await.map(|value| value.body.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let value = CachedValue {
            body: Arc::from(value),
            ttl,
        };
        self.cache.insert(key.to_string(), value).await;
        debug!("Cached {} with TTL: {:?}", key, ttl);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .cache
            .iter()
            .filter(|(key, _)| matches_pattern(key, pattern))
            .map(|(key, _)| key.to_string())
            .collect())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        let mut removed = 0;
        for key in keys {
            if self.cache.remove(key).await.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Stand-in used when caching is switched off: every lookup misses.
#[derive(Debug, Default, Clone)]
pub struct DisabledCache;

#[async_trait]
impl CacheLayer for DisabledCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _keys: &[String]) -> Result<usize, CacheError> {
        Ok(0)
    }
}
