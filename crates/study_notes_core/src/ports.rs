//! crates/study_notes_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use crate::domain::{ContentKind, NewNote, Note, NoteUpdate};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// Shown to users when every model stayed rate-limited through the whole retry budget.
pub const RATE_LIMITED_MESSAGE: &str =
    "All AI models are temporarily rate-limited. Please wait a few minutes and try again.";

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The AI provider kept answering 429 after all fallbacks and backoff cycles.
    #[error("{0}")]
    RateLimited(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The bare message, without the variant prefix.
    pub fn into_message(self) -> String {
        match self {
            PortError::NotFound(m) | PortError::RateLimited(m) | PortError::Unexpected(m) => m,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    async fn create_note(&self, note: NewNote) -> PortResult<Note>;

    /// Applies a partial update to a note owned by `user_id`.
    async fn update_note(&self, note_id: Uuid, user_id: Uuid, update: NoteUpdate)
        -> PortResult<Note>;

    async fn get_note(&self, note_id: Uuid, user_id: Uuid) -> PortResult<Note>;

    /// All notes of a user, newest first.
    async fn list_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>>;
}

#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    /// Produces the Markdown text of one content kind for the given study material.
    async fn generate(&self, kind: ContentKind, text: &str) -> PortResult<String>;
}

#[async_trait]
pub trait TextExtractionService: Send + Sync {
    /// Extracts the raw text layer of a PDF document.
    async fn extract_pdf_text(&self, pdf_data: &[u8]) -> PortResult<String>;
}
