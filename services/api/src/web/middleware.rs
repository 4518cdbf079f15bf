//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::warn;
use uuid::Uuid;

/// Header carrying the caller's user id. Sign-in itself happens upstream.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that reads the caller's user id and inserts it into request extensions
/// for handlers to use.
///
/// A missing header is 401 Unauthorized, a malformed one 400 Bad Request.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, (StatusCode, String)> {
    let raw = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                "Missing x-user-id header".to_string(),
            )
        })?;

    let user_id = Uuid::parse_str(raw.trim()).map_err(|e| {
        warn!("Rejected malformed user id '{}': {}", raw, e);
        (
            StatusCode::BAD_REQUEST,
            "Invalid x-user-id header".to_string(),
        )
    })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
