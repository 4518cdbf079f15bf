//! services/api/src/adapters/pdf.rs
//!
//! Implements the `TextExtractionService` port with `pdf-extract`.

use async_trait::async_trait;
use study_notes_core::ports::{PortError, PortResult, TextExtractionService};
use tracing::{debug, error};

/// Extracts the text layer of an in-memory PDF. Parsing is CPU-bound and runs on the
/// blocking pool.
#[derive(Clone, Copy, Default)]
pub struct PdfExtractAdapter;

#[async_trait]
impl TextExtractionService for PdfExtractAdapter {
    async fn extract_pdf_text(&self, pdf_data: &[u8]) -> PortResult<String> {
        let bytes = pdf_data.to_vec();
        let size = bytes.len();

        // The parser can panic on malformed files; the join error catches that.
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| {
                error!("PDF extraction task aborted: {}", e);
                PortError::Unexpected(format!("Failed to parse PDF file: {}", e))
            })?
            .map_err(|e| PortError::Unexpected(format!("Failed to parse PDF file: {}", e)))?;

        debug!(size, chars = text.chars().count(), "Extracted PDF text.");
        Ok(text)
    }
}
