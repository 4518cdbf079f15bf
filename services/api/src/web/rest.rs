//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the note endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{ai, generation, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use study_notes_core::domain::{
    default_note_title, ContentKind, InputType, NewNote, Note, NoteOutputs, NoteStatus, NoteUpdate,
};
use study_notes_core::parsing::{parse_flashcards, parse_quiz};
use study_notes_core::ports::PortError;
use study_notes_core::scoring::score_quiz;
use study_notes_core::validation::{validate_input_length, RequiredInput, ValidationError};
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

/// Most entries returned by the history view.
const HISTORY_LIMIT: usize = 50;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_note_handler,
        list_notes_handler,
        update_note_handler,
        history_handler,
        study_handler,
        score_quiz_handler,
        ai::generate_handler,
        ai::parse_pdf_handler,
        generation::start_generation_handler,
        generation::generation_status_handler,
        generation::reset_generation_handler,
        generation::generation_events_handler,
    ),
    components(
        schemas(
            NoteView, NoteResponse, NoteListResponse, CreateNoteRequest, UpdateNoteRequest,
            HistoryResponse, StudyResponse, FlashcardView, QuizQuestionView,
            ScoreQuizRequest, QuizScoreResponse,
            ai::GenerateRequest, ai::GenerateResponse, ai::ParsePdfResponse,
            generation::StartGenerationRequest, generation::BoardView, generation::ResultView,
        )
    ),
    tags(
        (name = "Study Notes API", description = "API endpoints for generating and reviewing AI study material.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A note as returned to the browser.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    id: Uuid,
    title: String,
    input_text: String,
    input_type: String,
    file_name: Option<String>,
    output_type: Option<String>,
    output_text: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Note> for NoteView {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            input_text: note.input_text,
            input_type: note.input_type.as_str().to_string(),
            file_name: note.file_name,
            output_type: note.output_type,
            output_text: note.output_text,
            status: note.status.as_str().to_string(),
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct NoteResponse {
    note: NoteView,
    success: bool,
}

#[derive(Serialize, ToSchema)]
pub struct NoteListResponse {
    notes: Vec<NoteView>,
    success: bool,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    title: Option<String>,
    input_text: Option<String>,
    /// `text` or `pdf`.
    input_type: Option<String>,
    file_name: Option<String>,
    /// Defaults to `pending`.
    status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    input_text: Option<String>,
    output_type: Option<String>,
    output_text: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Case-insensitive search over title, input, output and file name.
    q: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    notes: Vec<NoteView>,
}

#[derive(Serialize, ToSchema)]
pub struct FlashcardView {
    question: String,
    answer: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestionView {
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: Option<String>,
}

/// The generated material of a note, raw and parsed into study items.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudyResponse {
    note_id: Uuid,
    outputs: BTreeMap<String, String>,
    flashcards: Vec<FlashcardView>,
    quiz: Vec<QuizQuestionView>,
}

#[derive(Deserialize, ToSchema)]
pub struct ScoreQuizRequest {
    /// The chosen option index per question; `null` for unanswered.
    answers: Vec<Option<usize>>,
}

#[derive(Serialize, ToSchema)]
pub struct QuizScoreResponse {
    correct: usize,
    total: usize,
    percentage: u32,
    grade: String,
    message: String,
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Maps a port failure to a response, logging anything unexpected.
pub(crate) fn port_error_response(e: PortError, action: &str) -> (StatusCode, String) {
    match e {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, "Note not found".to_string()),
        PortError::RateLimited(message) => (StatusCode::TOO_MANY_REQUESTS, message),
        PortError::Unexpected(message) => {
            error!("Failed to {}: {}", action, message);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {}", action))
        }
    }
}

fn bad_request(message: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.into())
}

fn matches_search(note: &Note, needle: &str) -> bool {
    [
        Some(note.title.as_str()),
        Some(note.input_text.as_str()),
        note.output_text.as_deref(),
        note.file_name.as_deref(),
        note.output_type.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Completed notes only, newest first, optionally filtered by `query`.
fn history_entries(notes: Vec<Note>, query: Option<&str>) -> Vec<Note> {
    let needle = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    notes
        .into_iter()
        .filter(|n| n.status == NoteStatus::Completed)
        .filter(|n| needle.as_deref().map_or(true, |q| matches_search(n, q)))
        .take(HISTORY_LIMIT)
        .collect()
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Create a note from pasted text or extracted PDF text.
#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Missing fields or text too long"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn create_note_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (Some(input_text), Some(input_type)) = (payload.input_text, payload.input_type) else {
        return Err(bad_request(
            ValidationError::from(RequiredInput::NoteFields).to_string(),
        ));
    };
    let input_type: InputType = input_type.parse().map_err(bad_request)?;
    let status = match payload.status {
        Some(s) => s.parse::<NoteStatus>().map_err(bad_request)?,
        None => NoteStatus::Pending,
    };
    validate_input_length(&input_text, app_state.config.max_input_chars)
        .map_err(|e| bad_request(e.to_string()))?;

    let title = default_note_title(
        payload.title.as_deref(),
        input_type,
        payload.file_name.as_deref(),
        Utc::now().date_naive(),
    );
    let note = app_state
        .db
        .create_note(NewNote {
            user_id,
            title,
            input_text,
            input_type,
            file_name: payload.file_name,
            status,
        })
        .await
        .map_err(|e| port_error_response(e, "create note"))?;

    Ok((
        StatusCode::CREATED,
        Json(NoteResponse {
            note: note.into(),
            success: true,
        }),
    ))
}

/// List the caller's notes, newest first.
#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (status = 200, description = "The caller's notes", body = NoteListResponse),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_notes_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let notes = app_state
        .db
        .list_notes(user_id)
        .await
        .map_err(|e| port_error_response(e, "fetch notes"))?;

    Ok(Json(NoteListResponse {
        notes: notes.into_iter().map(NoteView::from).collect(),
        success: true,
    }))
}

/// Update a note's input, output or status.
#[utoipa::path(
    patch,
    path = "/notes/{id}",
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated", body = NoteResponse),
        (status = 400, description = "Invalid status or text too long"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "The note to update."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn update_note_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(note_id): Path<Uuid>,
    Json(payload): Json<UpdateNoteRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if let Some(text) = &payload.input_text {
        validate_input_length(text, app_state.config.max_input_chars)
            .map_err(|e| bad_request(e.to_string()))?;
    }
    let status = payload
        .status
        .map(|s| s.parse::<NoteStatus>())
        .transpose()
        .map_err(bad_request)?;

    let update = NoteUpdate {
        input_text: payload.input_text,
        output_type: payload.output_type,
        output_text: payload.output_text,
        status,
    };
    let note = app_state
        .db
        .update_note(note_id, user_id, update)
        .await
        .map_err(|e| port_error_response(e, "update note"))?;

    Ok(Json(NoteResponse {
        note: note.into(),
        success: true,
    }))
}

/// Completed notes, newest first, optionally filtered by a search term.
#[utoipa::path(
    get,
    path = "/history",
    responses(
        (status = 200, description = "Matching completed notes", body = HistoryResponse),
        (status = 500, description = "Internal server error")
    ),
    params(
        HistoryQuery,
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let notes = app_state
        .db
        .list_notes(user_id)
        .await
        .map_err(|e| port_error_response(e, "fetch history"))?;

    let notes = history_entries(notes, query.q.as_deref());
    Ok(Json(HistoryResponse {
        notes: notes.into_iter().map(NoteView::from).collect(),
    }))
}

/// A note's generated material with flashcards and quiz parsed for study mode.
#[utoipa::path(
    get,
    path = "/notes/{id}/study",
    responses(
        (status = 200, description = "Parsed study material", body = StudyResponse),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "The note to study."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn study_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(note_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let note = app_state
        .db
        .get_note(note_id, user_id)
        .await
        .map_err(|e| port_error_response(e, "fetch note"))?;

    let outputs = NoteOutputs::from_note(note.output_type.as_deref(), note.output_text.as_deref());
    let flashcards = parse_flashcards(outputs.get(ContentKind::Flashcards).unwrap_or_default())
        .into_iter()
        .map(|card| FlashcardView {
            question: card.question,
            answer: card.answer,
        })
        .collect();
    let quiz = parse_quiz(outputs.get(ContentKind::Quiz).unwrap_or_default())
        .into_iter()
        .map(|q| QuizQuestionView {
            question: q.question,
            options: q.options,
            correct_answer: q.correct_answer,
            explanation: q.explanation,
        })
        .collect();

    Ok(Json(StudyResponse {
        note_id: note.id,
        outputs: outputs
            .0
            .into_iter()
            .map(|(kind, text)| (kind.as_str().to_string(), text))
            .collect(),
        flashcards,
        quiz,
    }))
}

/// Score a set of answers against the note's quiz.
#[utoipa::path(
    post,
    path = "/notes/{id}/quiz/score",
    request_body = ScoreQuizRequest,
    responses(
        (status = 200, description = "The score", body = QuizScoreResponse),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "The note whose quiz was taken."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn score_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(note_id): Path<Uuid>,
    Json(payload): Json<ScoreQuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let note = app_state
        .db
        .get_note(note_id, user_id)
        .await
        .map_err(|e| port_error_response(e, "fetch note"))?;

    let outputs = NoteOutputs::from_note(note.output_type.as_deref(), note.output_text.as_deref());
    let quiz = parse_quiz(outputs.get(ContentKind::Quiz).unwrap_or_default());
    let score = score_quiz(&quiz, &payload.answers);

    Ok(Json(QuizScoreResponse {
        correct: score.correct,
        total: score.total,
        percentage: score.percentage,
        grade: score.grade.as_str().to_string(),
        message: score.grade.message().to_string(),
    }))
}
