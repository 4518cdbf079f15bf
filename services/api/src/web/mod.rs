pub mod ai;
pub mod generation;
pub mod generation_task;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use crate::error::ApiError;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{require_user, USER_ID_HEADER};
pub use state::AppState;

/// Headroom above the PDF size limit for multipart framing and other fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

async fn health_handler() -> &'static str {
    "ok"
}

/// Builds the API router: a public health check plus every route that requires the
/// `x-user-id` header.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| {
            ApiError::Internal(format!(
                "Invalid CORS origin '{}': {}",
                app_state.config.cors_origin, e
            ))
        })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
        ]);

    // Public routes (no identity required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Protected routes (x-user-id required)
    let protected_routes = Router::new()
        .route(
            "/notes",
            post(rest::create_note_handler).get(rest::list_notes_handler),
        )
        .route("/notes/{id}", patch(rest::update_note_handler))
        .route("/notes/{id}/study", get(rest::study_handler))
        .route("/notes/{id}/quiz/score", post(rest::score_quiz_handler))
        .route(
            "/notes/{id}/generate",
            post(generation::start_generation_handler),
        )
        .route("/history", get(rest::history_handler))
        .route("/ai/generate", post(ai::generate_handler))
        .route("/parse-pdf", post(ai::parse_pdf_handler))
        .route("/generation", get(generation::generation_status_handler))
        .route(
            "/generation/events",
            get(generation::generation_events_handler),
        )
        .route("/generation/reset", post(generation::reset_generation_handler))
        .layer(axum_middleware::from_fn(require_user));

    let body_limit = app_state.config.max_upload_bytes + MULTIPART_OVERHEAD;
    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state))
}
