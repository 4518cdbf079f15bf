//! services/api/src/web/generation.rs
//!
//! Handlers for starting, observing and resetting a user's generation session.

use crate::web::{
    generation_task::{start_generation, GenerationError},
    protocol::ProgressEvent,
    rest::port_error_response,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
    Extension,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_notes_core::board::GenerationBoard;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema, Default)]
pub struct StartGenerationRequest {
    /// Text to generate from. Defaults to the note's stored input.
    text: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ResultView {
    kind: String,
    text: String,
    /// `pending`, `generating`, `ready` or `error`.
    status: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    epoch: u64,
    is_generating: bool,
    results: Vec<ResultView>,
}

impl From<&GenerationBoard> for BoardView {
    fn from(board: &GenerationBoard) -> Self {
        Self {
            epoch: board.epoch(),
            is_generating: board.is_generating(),
            results: board
                .results()
                .iter()
                .map(|r| ResultView {
                    kind: r.kind.as_str().to_string(),
                    text: r.text.clone(),
                    status: r.status.as_str().to_string(),
                })
                .collect(),
        }
    }
}

/// Generate all four kinds of study material for a note.
///
/// Returns once the summary has resolved; the remaining kinds are generated in the
/// background and announced on `/generation/events`.
#[utoipa::path(
    post,
    path = "/notes/{id}/generate",
    request_body = StartGenerationRequest,
    responses(
        (status = 200, description = "Summary resolved, background generation started", body = BoardView),
        (status = 400, description = "Text too long"),
        (status = 404, description = "Note not found"),
        (status = 409, description = "A generation is already in progress for this user or note"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "The note to generate for."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn start_generation_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(note_id): Path<Uuid>,
    payload: Option<Json<StartGenerationRequest>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let note = app_state
        .db
        .get_note(note_id, user_id)
        .await
        .map_err(|e| port_error_response(e, "fetch note"))?;
    let Json(payload) = payload.unwrap_or_default();
    let text = payload.text.unwrap_or(note.input_text);

    let board = start_generation(app_state, user_id, note_id, text)
        .await
        .map_err(|e| match e {
            GenerationError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            GenerationError::AlreadyRunning => (
                StatusCode::CONFLICT,
                GenerationError::AlreadyRunning.to_string(),
            ),
            GenerationError::Port(e) => port_error_response(e, "start generation"),
        })?;

    Ok(Json(BoardView::from(&board)))
}

/// The caller's current generation board.
#[utoipa::path(
    get,
    path = "/generation",
    responses(
        (status = 200, description = "The current board", body = BoardView)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn generation_status_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> impl IntoResponse {
    let board = app_state.sessions.tracker(user_id).await.snapshot().await;
    Json(BoardView::from(&board))
}

/// Clear the board. Any session still running keeps persisting its own note but no
/// longer updates the board.
#[utoipa::path(
    post,
    path = "/generation/reset",
    responses(
        (status = 200, description = "The cleared board", body = BoardView)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn reset_generation_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> impl IntoResponse {
    let tracker = app_state.sessions.tracker(user_id).await;
    let board = {
        let mut board = tracker.board.lock().await;
        board.reset();
        board.clone()
    };
    tracker.publish(ProgressEvent::SessionReset {
        epoch: board.epoch(),
    });
    info!(%user_id, epoch = board.epoch(), "Generation board reset.");
    Json(BoardView::from(&board))
}

/// Server-sent progress events: a `snapshot` of the board, then one `progress` event
/// per change.
#[utoipa::path(
    get,
    path = "/generation/events",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn generation_events_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let tracker = app_state.sessions.tracker(user_id).await;
    let mut events = tracker.subscribe();
    let snapshot = BoardView::from(&tracker.snapshot().await);
    let shutdown = app_state.shutdown.clone();

    let stream = async_stream::stream! {
        yield Event::default().event("snapshot").json_data(&snapshot);
        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = events.recv() => received,
            };
            match received {
                Ok(event) => yield Event::default().event("progress").json_data(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%user_id, skipped, "Progress subscriber lagged behind.");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
