//! services/api/src/web/ai.rs
//!
//! Single-shot generation and PDF text extraction endpoints.

use crate::web::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_notes_core::domain::ContentKind;
use study_notes_core::ports::PortError;
use study_notes_core::validation::{
    clean_extracted_text, ensure_extracted, validate_input_length, validate_pdf_upload,
    RequiredInput, ValidationError,
};
use tracing::{error, info};
use utoipa::ToSchema;

/// Multipart field carrying the uploaded document.
const PDF_FIELD: &str = "pdf";

#[derive(Deserialize, ToSchema)]
pub struct GenerateRequest {
    text: Option<String>,
    /// `summary`, `bullets`, `flashcards` or `quiz`.
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateResponse {
    result: String,
}

#[derive(Serialize, ToSchema)]
pub struct ParsePdfResponse {
    text: String,
    success: bool,
}

/// Generate one kind of study material for the given text.
#[utoipa::path(
    post,
    path = "/ai/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated Markdown", body = GenerateResponse),
        (status = 400, description = "Missing parameters, unknown type or text too long"),
        (status = 429, description = "Every model stayed rate-limited"),
        (status = 500, description = "Generation failed")
    ),
    params(
        ("x-user-id" = String, Header, description = "The UUID of the user.")
    )
)]
pub async fn generate_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (Some(text), Some(kind)) = (payload.text, payload.kind) else {
        return Err((
            StatusCode::BAD_REQUEST,
            ValidationError::from(RequiredInput::GenerateParams).to_string(),
        ));
    };
    validate_input_length(&text, app_state.config.max_input_chars)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let kind: ContentKind = kind
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid type parameter".to_string()))?;

    match app_state.generator.generate(kind, &text).await {
        Ok(result) => Ok(Json(GenerateResponse { result })),
        Err(PortError::RateLimited(message)) => Err((StatusCode::TOO_MANY_REQUESTS, message)),
        Err(e) => {
            error!(%kind, "AI generation error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.into_message()))
        }
    }
}

/// Extract the text of an uploaded PDF.
///
/// Accepts a multipart/form-data request with the document in the `pdf` field.
#[utoipa::path(
    post,
    path = "/parse-pdf",
    request_body(content_type = "multipart/form-data", description = "The PDF to extract, in the `pdf` field."),
    responses(
        (status = 200, description = "Extracted text", body = ParsePdfResponse),
        (status = 400, description = "Missing, non-PDF, oversized, empty or too-long document"),
        (status = 500, description = "The PDF could not be parsed")
    ),
    params(
        ("x-user-id" = String, Header, description = "The UUID of the user.")
    )
)]
pub async fn parse_pdf_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bad_request = |message: String| (StatusCode::BAD_REQUEST, message);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() != Some(PDF_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Failed to read file bytes: {}", e)))?;

        validate_pdf_upload(content_type.as_deref(), data.len(), app_state.config.max_upload_bytes)
            .map_err(|e| bad_request(e.to_string()))?;

        let raw = app_state.extractor.extract_pdf_text(&data).await.map_err(|e| {
            error!(file = %file_name, "PDF parsing error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.into_message())
        })?;

        let text = clean_extracted_text(&raw);
        ensure_extracted(&text).map_err(|e| bad_request(e.to_string()))?;
        validate_input_length(&text, app_state.config.max_input_chars)
            .map_err(|e| bad_request(e.to_string()))?;

        info!(file = %file_name, chars = text.chars().count(), "Parsed PDF upload.");
        return Ok(Json(ParsePdfResponse {
            text,
            success: true,
        }));
    }

    Err(bad_request(ValidationError::from(RequiredInput::PdfFile).to_string()))
}
