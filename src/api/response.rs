use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::service::CachedPage;

/// Writes a pre-serialized page, tagging whether it was served from cache.
pub fn cached_page(page: CachedPage) -> Response {
    let status = if page.hit { "HIT" } else { "MISS" };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::HeaderName::from_static("x-cache"), HeaderValue::from_static(status)),
        ],
        page.body,
    )
        .into_response()
}
