use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::api::error::{conflict_on_unique, ApiError};
use crate::db::{from_timestamp, listing, now_timestamp, recommendation, user};
use crate::models::{Recommendation, User};
use crate::validation::validate_email;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    pub property_id: Option<String>,
    pub to_user_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Inbox {
    pub total: usize,
    pub recommendations: Vec<Recommendation>,
}

/// User directory and peer recommendations; neither is cached.
#[derive(Clone)]
pub struct RecommendationService {
    pool: SqlitePool,
}

impl RecommendationService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, email: &str, name: &str) -> Result<User, ApiError> {
        validate_email(email)?;

        let created = user::create_user(&self.pool, email, name)
            .await
            .map_err(|e| conflict_on_unique(e, "Email already registered"))?;

        info!("Registered user {}", created.id);
        Ok(created)
    }

    pub async fn find_user(&self, email: &str) -> Result<User, ApiError> {
        if email.trim().is_empty() {
            return Err(ApiError::BadRequest("Email query is required".to_string()));
        }

        user::find_by_email(&self.pool, email)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    pub async fn recommend(&self, from: &User, request: RecommendRequest) -> Result<Recommendation, ApiError> {
        let (property_id, to_user_id) = match (request.property_id, request.to_user_id) {
            (Some(p), Some(t)) if !p.trim().is_empty() && !t.trim().is_empty() => (p, t),
            _ => {
                return Err(ApiError::BadRequest(
                    "Property ID and recipient User ID are required".to_string(),
                ))
            }
        };

        let property = listing::find_by_external_id(&self.pool, &property_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Property not found".to_string()))?;
        let recipient = user::find_by_id(&self.pool, &to_user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Recipient user not found".to_string()))?;

        let message = request.message.unwrap_or_default();
        let created_at = from_timestamp(now_timestamp());
        let id = recommendation::add_recommendation(
            &self.pool,
            property.row_id,
            &from.id,
            &recipient.id,
            &message,
            created_at.timestamp(),
        )
        .await?;

        info!("User {} recommended {} to {}", from.id, property_id, recipient.id);

        Ok(Recommendation {
            id,
            property: Some(property),
            from_user: from.summary(),
            to_user: recipient.id,
            message,
            created_at,
        })
    }

    pub async fn inbox(&self, user: &User) -> Result<Inbox, ApiError> {
        let recommendations = recommendation::recommendations_for(&self.pool, &user.id).await?;
        Ok(Inbox {
            total: recommendations.len(),
            recommendations,
        })
    }
}
