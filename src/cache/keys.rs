//! Cache key derivation

use std::fmt;

use crate::filter::{ListingQuery, Pagination};

pub const LISTINGS_NAMESPACE: &str = "properties:";
pub const FAVORITES_NAMESPACE: &str = "favorites:";

/// A structured cache key that can be converted to a string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Key for a listing search; holds the canonical JSON of the effective parameters
    ListingSearch(String),
    /// Key for one page of a user's favorites
    Favorites {
        user_id: String,
        page: i64,
        limit: i64,
    },
}

impl CacheKey {
    pub fn listing_search(query: &ListingQuery) -> Self {
        // A BTreeMap of strings always serializes; the fallback keeps this infallible.
        let canonical = serde_json::to_string(&query.canonical_params())
            .unwrap_or_else(|_| format!("{:?}", query.canonical_params()));
        Self::ListingSearch(canonical)
    }

    pub fn favorites(user_id: &str, pagination: &Pagination) -> Self {
        Self::Favorites {
            user_id: user_id.to_string(),
            page: pagination.page,
            limit: pagination.limit,
        }
    }

    /// Prefix shared by every cached listing search.
    pub fn listings_prefix() -> String {
        LISTINGS_NAMESPACE.to_string()
    }

    /// Prefix shared by every cached favorites page of one user.
    pub fn favorites_prefix(user_id: &str) -> String {
        format!("{}{}:", FAVORITES_NAMESPACE, user_id)
    }

    /// Prefix this key is invalidated under.
    #[cfg(test)]
    pub fn prefix(&self) -> String {
        match self {
            Self::ListingSearch(_) => Self::listings_prefix(),
            Self::Favorites { user_id, .. } => Self::favorites_prefix(user_id),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListingSearch(canonical) => write!(f, "{}{}", LISTINGS_NAMESPACE, canonical),
            Self::Favorites { user_id, page, limit } => {
                write!(f, "{}{}:{}:{}", FAVORITES_NAMESPACE, user_id, page, limit)
            }
        }
    }
}
