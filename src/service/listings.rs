use sqlx::SqlitePool;
use tracing::info;

use crate::api::error::{conflict_on_unique, ApiError};
use crate::db::{favorite, listing};
use crate::models::{Listing, ListingFields, ListingPatch, User};
use crate::service::invalidation::{Invalidator, Mutation};
use crate::validation::validate_listing;

#[derive(Clone)]
pub struct ListingService {
    pool: SqlitePool,
    invalidator: Invalidator,
}

impl ListingService {
    pub fn new(pool: SqlitePool, invalidator: Invalidator) -> Self {
        Self { pool, invalidator }
    }

    pub async fn get(&self, id: &str) -> Result<Listing, ApiError> {
        listing::find_by_external_id(&self.pool, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Property not found".to_string()))
    }

    pub async fn create(&self, owner: &User, fields: ListingFields) -> Result<Listing, ApiError> {
        validate_listing(&fields)?;

        self.invalidator.apply(&Mutation::ListingCreated).await;

        let created = listing::insert_listing(&self.pool, &owner.id, &fields)
            .await
            .map_err(|e| conflict_on_unique(e, "A property with this id already exists"))?;

        info!("Listing {} created by {}", created.fields.id, owner.id);
        Ok(created)
    }

    pub async fn update(&self, actor: &User, id: &str, patch: ListingPatch) -> Result<Listing, ApiError> {
        let existing = self.owned_listing(actor, id).await?;

        let mut fields = existing.fields.clone();
        patch.apply(&mut fields);
        validate_listing(&fields)?;

        let favorited_by = favorite::users_for_listing(&self.pool, existing.row_id).await?;
        self.invalidator
            .apply(&Mutation::ListingUpdated { favorited_by })
            .await;

        let updated = listing::update_listing(&self.pool, existing.row_id, &fields)
            .await
            .map_err(|e| conflict_on_unique(e, "A property with this id already exists"))?;

        info!("Listing {} updated by {}", updated.fields.id, actor.id);
        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: &str) -> Result<(), ApiError> {
        let existing = self.owned_listing(actor, id).await?;

        let favorited_by = favorite::users_for_listing(&self.pool, existing.row_id).await?;
        self.invalidator
            .apply(&Mutation::ListingDeleted { favorited_by })
            .await;

        let favorites_removed = listing::delete_listing(&self.pool, existing.row_id).await?;

        info!(
            "Listing {} deleted by {} along with {} favorites",
            existing.fields.id, actor.id, favorites_removed
        );
        Ok(())
    }

    /// Looks up a listing the actor is allowed to change.
    async fn owned_listing(&self, actor: &User, id: &str) -> Result<Listing, ApiError> {
        let existing = self.get(id).await?;
        if !existing.is_owned_by(&actor.id) {
            return Err(ApiError::Forbidden(format!(
                "property {} belongs to another user",
                id
            )));
        }
        Ok(existing)
    }
}
