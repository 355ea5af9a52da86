use crate::{
    api::{auth::AuthUser, error::ApiError, response::cached_page},
    filter::{ListingQuery, Pagination},
    models::{ListingFields, ListingPatch},
    service::recommendations::RecommendRequest,
    state::AppState,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub struct RegisterRequest {
    email: String,
    name: String,
}

#[derive(Deserialize)]
pub struct UserSearchQuery {
    email: Option<String>,
}

// Create router with all routes
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/properties", get(search_properties).post(create_property))
        .route(
            "/properties/{id}",
            get(get_property).put(update_property).delete(delete_property),
        )
        .route("/favorites", get(list_favorites))
        .route(
            "/favorites/{property_id}",
            post(add_favorite).delete(remove_favorite),
        )
        .route("/users", post(register_user))
        .route("/users/search", get(search_user))
        .route("/recommend", post(recommend))
        .route("/recommendations", get(recommendations))
        .with_state(app_state)
}

// GET /properties
async fn search_properties(
    State(state): State<Arc<AppState>>,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let query = ListingQuery::from_params(&params, state.config.max_page_size)?;
    info!(
        "Searching properties with {} filters, page {} (limit {})",
        query.filters.len(),
        query.pagination.page,
        query.pagination.limit
    );

    let page = state.queries.search(&query).await?;
    Ok(cached_page(page))
}

// GET /properties/{id}
async fn get_property(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let listing = state.listings.get(&id).await?;
    Ok(Json(listing).into_response())
}

// POST /properties
async fn create_property(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<ListingFields>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(fields) = payload?;
    let created = state.listings.create(&user, fields).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

// PUT /properties/{id}
async fn update_property(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<ListingPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(patch) = payload?;
    let updated = state.listings.update(&user, &id, patch).await?;
    Ok(Json(updated).into_response())
}

// DELETE /properties/{id}
async fn delete_property(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    state.listings.delete(&user, &id).await?;
    Ok(Json(json!({ "message": "Property deleted" })).into_response())
}

// GET /favorites
async fn list_favorites(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let pagination = Pagination::from_params(&params, state.config.max_page_size);
    let page = state.queries.list_favorites(&user.id, &pagination).await?;
    Ok(cached_page(page))
}

// POST /favorites/{property_id}
async fn add_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(property_id): Path<String>,
) -> Result<Response, ApiError> {
    state.favorites.add(&user, &property_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Property added to favorites" })),
    )
        .into_response())
}

// DELETE /favorites/{property_id}
async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(property_id): Path<String>,
) -> Result<Response, ApiError> {
    state.favorites.remove(&user, &property_id).await?;
    Ok(Json(json!({ "message": "Favorite removed" })).into_response())
}

// POST /users
async fn register_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let user = state.recommendations.register(&request.email, &request.name).await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

// GET /users/search
async fn search_user(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
    params: Result<Query<UserSearchQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let user = state
        .recommendations
        .find_user(params.email.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(user.summary()).into_response())
}

// POST /recommend
async fn recommend(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let recommendation = state.recommendations.recommend(&user, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Property recommended successfully",
            "recommendation": recommendation,
        })),
    )
        .into_response())
}

// GET /recommendations
async fn recommendations(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Response, ApiError> {
    let inbox = state.recommendations.inbox(&user).await?;
    Ok(Json(inbox).into_response())
}
