pub mod keys;
pub mod layer;

use std::sync::Arc;
use tracing::info;

use crate::config::Config;

pub use keys::CacheKey;
pub use layer::{CacheError, CacheLayer, DisabledCache, MokaCacheLayer};

pub fn init_cache(config: &Config) -> Arc<dyn CacheLayer> {
    if config.cache_enabled {
        info!(
            "Cache enabled with TTL: {:?} and capacity: {}",
            config.cache_ttl, config.cache_max_capacity
        );
        Arc::new(MokaCacheLayer::new(config.cache_max_capacity))
    } else {
        info!("Cache disabled; all reads go to the database");
        Arc::new(DisabledCache)
    }
}
