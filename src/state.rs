use crate::cache::CacheLayer;
use crate::config::Config;
use crate::service::{FavoriteService, Invalidator, ListingService, QueryService, RecommendationService};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db_pool: SqlitePool,
    pub queries: QueryService,
    pub listings: ListingService,
    pub favorites: FavoriteService,
    pub recommendations: RecommendationService,
}

impl AppState {
    pub fn new(config: Config, db_pool: SqlitePool, cache: Arc<dyn CacheLayer>) -> Self {
        let invalidator = Invalidator::new(cache.clone());

        Self {
            queries: QueryService::new(db_pool.clone(), cache, config.cache_ttl),
            listings: ListingService::new(db_pool.clone(), invalidator.clone()),
            favorites: FavoriteService::new(db_pool.clone(), invalidator),
            recommendations: RecommendationService::new(db_pool.clone()),
            config,
            db_pool,
        }
    }
}
