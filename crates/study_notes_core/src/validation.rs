//! crates/study_notes_core/src/validation.rs
//!
//! Input checks applied at every entry point that accepts raw study material,
//! plus the cleanup applied to text extracted from uploaded PDFs.

use regex::Regex;
use std::sync::LazyLock;

pub const MAX_INPUT_CHARS: usize = 50_000;
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const PDF_MIME: &str = "application/pdf";

static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n").expect("blank line pattern is valid"));
static INLINE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("inline whitespace pattern is valid"));

/// Rejections reported to the caller before any network call is made. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "Text is too long. Maximum {} characters allowed. Your text contains {} characters.",
        thousands(.limit),
        thousands(.actual)
    )]
    InputTooLong { limit: usize, actual: usize },
    #[error("File must be a PDF")]
    UnsupportedFileType,
    #[error("PDF must be smaller than {}MB", .limit / (1024 * 1024))]
    FileTooLarge { limit: usize },
    #[error("No text could be extracted from PDF")]
    EmptyExtraction,
    #[error(transparent)]
    MissingField(#[from] RequiredInput),
}

/// Request inputs that must be present before anything else is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RequiredInput {
    #[error("Missing required fields: inputText and inputType are required")]
    NoteFields,
    #[error("Missing text or type parameter")]
    GenerateParams,
    #[error("No PDF file provided")]
    PdfFile,
}

/// Formats a count with comma thousands separators, e.g. `50000` -> `50,000`.
fn thousands(n: &usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Rejects text longer than `limit` characters.
pub fn validate_input_length(text: &str, limit: usize) -> Result<(), ValidationError> {
    let actual = text.chars().count();
    if actual > limit {
        return Err(ValidationError::InputTooLong { limit, actual });
    }
    Ok(())
}

/// Checks the declared MIME type and size of an uploaded file.
pub fn validate_pdf_upload(
    content_type: Option<&str>,
    size: usize,
    limit: usize,
) -> Result<(), ValidationError> {
    if content_type != Some(PDF_MIME) {
        return Err(ValidationError::UnsupportedFileType);
    }
    if size > limit {
        return Err(ValidationError::FileTooLarge { limit });
    }
    Ok(())
}

/// Normalizes extracted PDF text: runs of three or more line breaks become one blank
/// line, other whitespace runs become a single space, and the ends are trimmed.
pub fn clean_extracted_text(raw: &str) -> String {
    let paragraphs = BLANK_LINE_RUNS.replace_all(raw, "\n\n");
    INLINE_WHITESPACE
        .replace_all(&paragraphs, " ")
        .trim()
        .to_string()
}

pub fn ensure_extracted(cleaned: &str) -> Result<(), ValidationError> {
    if cleaned.is_empty() {
        return Err(ValidationError::EmptyExtraction);
    }
    Ok(())
}
