//! The fallback handler for requests to routes that do not exist.

use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Respond with a JSON 404 naming the path that was requested.
pub async fn get_404_not_found(uri: Uri) -> Response {
    tracing::debug!("No route matched {uri}");

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": format!("No route for {}", uri.path()),
        })),
    )
        .into_response()
}
