use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use crate::{api::error::ApiError, db::user, models::User, state::AppState};

pub const USER_HEADER: &str = "x-user-id";

/// The authenticated caller, resolved from the `X-User-Id` header.
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        user::find_by_id(&state.db_pool, user_id)
            .await?
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}
