use sqlx::SqlitePool;
use tracing::info;

use crate::api::error::{conflict_on_unique, ApiError};
use crate::db::{favorite, listing};
use crate::models::{Listing, User};
use crate::service::invalidation::{Invalidator, Mutation};

#[derive(Clone)]
pub struct FavoriteService {
    pool: SqlitePool,
    invalidator: Invalidator,
}

impl FavoriteService {
    pub fn new(pool: SqlitePool, invalidator: Invalidator) -> Self {
        Self { pool, invalidator }
    }

    pub async fn add(&self, user: &User, listing_id: &str) -> Result<(), ApiError> {
        let listing = self.listing(listing_id).await?;

        self.invalidator
            .apply(&Mutation::FavoriteAdded { user_id: user.id.clone() })
            .await;

        favorite::add_favorite(&self.pool, &user.id, listing.row_id)
            .await
            .map_err(|e| conflict_on_unique(e, "Property already in favorites"))?;

        info!("User {} favorited listing {}", user.id, listing_id);
        Ok(())
    }

    pub async fn remove(&self, user: &User, listing_id: &str) -> Result<(), ApiError> {
        let listing = self.listing(listing_id).await?;

        self.invalidator
            .apply(&Mutation::FavoriteRemoved { user_id: user.id.clone() })
            .await;

        let removed = favorite::remove_favorite(&self.pool, &user.id, listing.row_id).await?;
        if !removed {
            return Err(ApiError::NotFound("Favorite not found".to_string()));
        }

        info!("User {} unfavorited listing {}", user.id, listing_id);
        Ok(())
    }

    async fn listing(&self, listing_id: &str) -> Result<Listing, ApiError> {
        listing::find_by_external_id(&self.pool, listing_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Property not found".to_string()))
    }
}
