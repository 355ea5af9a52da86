//! Prefix-based cache invalidation for mutations
//!
//! Every write that can change a cached page maps to a [`Mutation`], whose
//! prefixes are purged before the write reaches the database. A reader that
//! repopulates a purged prefix between the purge and the write commit can
//! still cache the pre-write state until its TTL runs out.

use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheLayer};

/// Writes that make cached pages stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    ListingCreated,
    /// `favorited_by` lists every user whose favorites embed the listing.
    ListingUpdated { favorited_by: Vec<String> },
    ListingDeleted { favorited_by: Vec<String> },
    FavoriteAdded { user_id: String },
    FavoriteRemoved { user_id: String },
}

impl Mutation {
    /// Cache prefixes made stale by this mutation, without duplicates.
    pub fn prefixes(&self) -> Vec<String> {
        match self {
            Mutation::ListingCreated => vec![CacheKey::listings_prefix()],
            Mutation::ListingUpdated { favorited_by } | Mutation::ListingDeleted { favorited_by } => {
                let users: BTreeSet<&String> = favorited_by.iter().collect();
                std::iter::once(CacheKey::listings_prefix())
                    .chain(users.into_iter().map(|user| CacheKey::favorites_prefix(user)))
                    .collect()
            }
            Mutation::FavoriteAdded { user_id } | Mutation::FavoriteRemoved { user_id } => {
                vec![CacheKey::favorites_prefix(user_id)]
            }
        }
    }
}

#[derive(Clone)]
pub struct Invalidator {
    cache: Arc<dyn CacheLayer>,
}

impl Invalidator {
    pub fn new(cache: Arc<dyn CacheLayer>) -> Self {
        Self { cache }
    }

    /// Deletes every cached entry whose key starts with `prefix` and returns
    /// how many were removed. Cache failures are logged and count as zero.
    pub async fn invalidate(&self, prefix: &str) -> usize {
        let pattern = format!("{}*", prefix);

        let keys = match self.cache.keys(&pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Could not enumerate cache keys for {}: {}", pattern, e);
                return 0;
            }
        };
        if keys.is_empty() {
            debug!("No cache entries under {}", prefix);
            return 0;
        }

        match self.cache.delete(&keys).await {
            Ok(removed) => {
                debug!("Invalidated {} cache entries under {}", removed, prefix);
                removed
            }
            Err(e) => {
                warn!("Could not delete {} cache entries under {}: {}", keys.len(), prefix, e);
                0
            }
        }
    }

    /// Purges every prefix affected by `mutation`; completes before returning.
    pub async fn apply(&self, mutation: &Mutation) -> usize {
        let prefixes = mutation.prefixes();
        let removed: usize = join_all(prefixes.iter().map(|prefix| self.invalidate(prefix)))
            .await
            .into_iter()
            .sum();

        info!(
            "Cache invalidation for {:?}: {} entries across {} prefixes",
            mutation,
            removed,
            prefixes.len()
        );
        removed
    }
}
