//! crates/study_notes_core/src/domain.rs
//!
//! Defines the core data structures for the application: the four content kinds,
//! their generation state, the structured study items parsed from model output,
//! and the persisted note.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Content Kinds and Generation State
//=========================================================================================

/// One of the four generation categories produced for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Summary,
    Bullets,
    Flashcards,
    Quiz,
}

impl ContentKind {
    /// The fixed generation order. Summary always comes first.
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Summary,
        ContentKind::Bullets,
        ContentKind::Flashcards,
        ContentKind::Quiz,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Summary => "summary",
            ContentKind::Bullets => "bullets",
            ContentKind::Flashcards => "flashcards",
            ContentKind::Quiz => "quiz",
        }
    }

    /// The text shown in place of content when this kind failed to generate.
    pub fn error_message(self) -> String {
        format!("Error generating {}. Please try again.", self.as_str())
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known content kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid type parameter: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ContentKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(ContentKind::Summary),
            "bullets" => Ok(ContentKind::Bullets),
            "flashcards" => Ok(ContentKind::Flashcards),
            "quiz" => Ok(ContentKind::Quiz),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Generating,
    Ready,
    Error,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Generating => "generating",
            GenerationStatus::Ready => "ready",
            GenerationStatus::Error => "error",
        }
    }
}

/// The current output for one kind within a generation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub kind: ContentKind,
    pub text: String,
    pub status: GenerationStatus,
}

impl GenerationResult {
    pub fn pending(kind: ContentKind) -> Self {
        Self {
            kind,
            text: String::new(),
            status: GenerationStatus::Pending,
        }
    }
}

//=========================================================================================
// Structured Study Items
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`, always within 0..=3.
    pub correct_answer: usize,
    pub explanation: Option<String>,
}

//=========================================================================================
// Notes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Pdf,
}

impl InputType {
    pub fn as_str(self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Pdf => "pdf",
        }
    }
}

impl FromStr for InputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(InputType::Text),
            "pdf" => Ok(InputType::Pdf),
            other => Err(format!("unknown input type '{}'", other)),
        }
    }
}

/// Lifecycle of a persisted note: pending -> generating -> completed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

impl NoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteStatus::Pending => "pending",
            NoteStatus::Generating => "generating",
            NoteStatus::Completed => "completed",
            NoteStatus::Failed => "failed",
        }
    }
}

impl FromStr for NoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NoteStatus::Pending),
            "generating" => Ok(NoteStatus::Generating),
            "completed" => Ok(NoteStatus::Completed),
            "failed" => Ok(NoteStatus::Failed),
            other => Err(format!("unknown note status '{}'", other)),
        }
    }
}

/// A user's submitted study material together with its generated output.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub input_text: String,
    pub input_type: InputType,
    pub file_name: Option<String>,
    pub output_type: Option<String>,
    pub output_text: Option<String>,
    pub status: NoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a note is first created.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub user_id: Uuid,
    pub title: String,
    pub input_text: String,
    pub input_type: InputType,
    pub file_name: Option<String>,
    pub status: NoteStatus,
}

/// A partial update; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub input_text: Option<String>,
    pub output_type: Option<String>,
    pub output_text: Option<String>,
    pub status: Option<NoteStatus>,
}

impl NoteUpdate {
    pub fn status(status: NoteStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Picks the title for a new note when the caller did not supply one.
pub fn default_note_title(
    title: Option<&str>,
    input_type: InputType,
    file_name: Option<&str>,
    today: NaiveDate,
) -> String {
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    match (input_type, file_name) {
        (InputType::Pdf, Some(name)) if !name.trim().is_empty() => {
            name.trim().trim_end_matches(".pdf").to_string()
        }
        _ => format!("Note {}", today.format("%Y-%m-%d")),
    }
}

//=========================================================================================
// Persisted Output Snapshot
//=========================================================================================

/// The output type stored on a note that holds all four kinds at once.
pub const OUTPUT_TYPE_ALL: &str = "all";

/// The kind -> text mapping written to a note's `output_text` once generation finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteOutputs(pub BTreeMap<ContentKind, String>);

impl NoteOutputs {
    pub fn insert(&mut self, kind: ContentKind, text: String) {
        self.0.insert(kind, text);
    }

    pub fn get(&self, kind: ContentKind) -> Option<&str> {
        self.0.get(&kind).map(String::as_str)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes a stored note's output.
    ///
    /// Notes finished by the orchestrator hold the JSON mapping. Anything else is
    /// treated as raw Markdown belonging to the note's single `output_type`.
    pub fn from_note(output_type: Option<&str>, output_text: Option<&str>) -> Self {
        let Some(text) = output_text.filter(|t| !t.trim().is_empty()) else {
            return Self::default();
        };
        let trimmed = text.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            if let Ok(outputs) = serde_json::from_str::<NoteOutputs>(trimmed) {
                return outputs;
            }
        }
        let kind = output_type
            .and_then(|t| t.parse::<ContentKind>().ok())
            .unwrap_or(ContentKind::Summary);
        let mut outputs = Self::default();
        outputs.insert(kind, text.to_string());
        outputs
    }
}
