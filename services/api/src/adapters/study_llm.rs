//! services/api/src/adapters/study_llm.rs
//!
//! This module contains the adapter that turns study text into Markdown study material.
//! It implements the `ContentGenerationService` port from the `core` crate on top of the
//! fallback-aware completion client.

use async_trait::async_trait;
use reqwest::StatusCode;
use study_notes_core::domain::ContentKind;
use study_notes_core::ports::{
    ContentGenerationService, PortError, PortResult, RATE_LIMITED_MESSAGE,
};
use tracing::{error, info};

use super::completion::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole, CompletionTransport,
    FallbackClient, ProviderErrorBody,
};

const SYSTEM_INSTRUCTIONS: &str = "You are a helpful AI assistant that creates clear, well-formatted study materials for students. Always provide complete, coherent responses in proper Markdown format.";

const SUMMARY_PROMPT: &str = r#"Write a clear, well-organized summary of the following text for a student.

Requirements:
- Use ### headings for the main topics
- Use short paragraphs and bullet points where they help
- **Bold** the key terms
- Cover every important idea, and nothing that is not in the text

Text:
{text}"#;

const BULLETS_PROMPT: &str = r#"Turn the following text into structured study notes.

Requirements:
- Group related points under ### headings
- Use bullet points, with nested bullets for supporting details
- **Bold** the key terms
- Keep each bullet short and specific

Text:
{text}"#;

const FLASHCARDS_PROMPT: &str = r#"Create 8-10 flashcards from the following text to help a student memorize its key concepts.

Use EXACTLY this format for every card:

### Flashcard [Number]
**Q:** [Question]
**A:** [Answer]

---

Rules:
- One concept per card
- Answers are short: one or two sentences
- Separate cards with a line containing only ---

Text:
{text}"#;

const QUIZ_PROMPT: &str = r#"Create a multiple-choice quiz with 5 questions based on the following text.

Use EXACTLY this format for every question:

### Question [Number]
[Question text]

A) [Option]
B) [Option]
C) [Option]
D) [Option]

**Correct Answer:** [Letter]
**Explanation:** [One or two sentences explaining why]

---

Rules:
- Exactly four options per question, one of them correct
- Test understanding, not just recall of single words
- Separate questions with a line containing only ---

Text:
{text}"#;

const NO_RESPONSE: &str = "No response generated";

const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 1.0;

fn prompt_for(kind: ContentKind, text: &str) -> String {
    let template = match kind {
        ContentKind::Summary => SUMMARY_PROMPT,
        ContentKind::Bullets => BULLETS_PROMPT,
        ContentKind::Flashcards => FLASHCARDS_PROMPT,
        ContentKind::Quiz => QUIZ_PROMPT,
    };
    template.replace("{text}", text)
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentGenerationService` using OpenRouter chat completions.
pub struct OpenRouterStudyAdapter<T> {
    client: FallbackClient<T>,
    model: String,
}

impl<T: CompletionTransport> OpenRouterStudyAdapter<T> {
    /// `model` is the model named in every first attempt.
    pub fn new(client: FallbackClient<T>, model: String) -> Self {
        Self { client, model }
    }

    fn build_request(&self, kind: ContentKind, text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: ChatRole::System,
                    content: SYSTEM_INSTRUCTIONS.to_string(),
                },
                ChatMessage {
                    role: ChatRole::User,
                    content: prompt_for(kind, text),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
        }
    }
}

/// Maps a non-success provider answer to a port error.
fn failure_to_error(status: StatusCode, body: &[u8]) -> PortError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return PortError::RateLimited(RATE_LIMITED_MESSAGE.to_string());
    }
    let message = serde_json::from_slice::<ProviderErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
    PortError::Unexpected(format!("AI generation failed: {}", message))
}

/// Pulls `choices[0].message.content` out of a success body.
fn extract_content(body: &[u8]) -> PortResult<String> {
    let parsed: ChatCompletionResponse = serde_json::from_slice(body).map_err(|e| {
        PortError::Unexpected(format!("AI provider returned malformed JSON: {}", e))
    })?;
    Ok(parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| NO_RESPONSE.to_string()))
}

//=========================================================================================
// `ContentGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl<T: CompletionTransport> ContentGenerationService for OpenRouterStudyAdapter<T> {
    async fn generate(&self, kind: ContentKind, text: &str) -> PortResult<String> {
        let request = self.build_request(kind, text);
        let delivery = self.client.send(request).await?;

        let status = delivery.response.status;
        if !status.is_success() {
            error!(%kind, %status, model = %delivery.model, "AI generation failed.");
            return Err(failure_to_error(status, &delivery.response.body));
        }

        info!(%kind, model = %delivery.model, "AI generation succeeded.");
        extract_content(&delivery.response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::completion::{RetryPolicy, TransportResponse};
    use bytes::Bytes;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers every request with the same response and keeps the last request.
    struct FixedTransport {
        status: u16,
        body: &'static str,
        last_request: Mutex<Option<ChatCompletionRequest>>,
    }

    impl FixedTransport {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CompletionTransport for FixedTransport {
        async fn post(&self, request: &ChatCompletionRequest) -> PortResult<TransportResponse> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(TransportResponse {
                status: StatusCode::from_u16(self.status).unwrap(),
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    fn adapter(transport: FixedTransport) -> OpenRouterStudyAdapter<FixedTransport> {
        let policy = RetryPolicy {
            models: vec!["free/a".to_string(), "free/b".to_string()],
            max_retries: 2,
            backoff_base: Duration::from_millis(10),
        };
        OpenRouterStudyAdapter::new(FallbackClient::new(transport, policy), "free/a".to_string())
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let adapter = adapter(FixedTransport::new(
            200,
            r####"{"choices":[{"message":{"role":"assistant","content":"### Summary\nCells."}}]}"####,
        ));

        let text = adapter.generate(ContentKind::Summary, "cells").await.unwrap();
        assert_eq!(text, "### Summary\nCells.");

        let request = adapter.client.transport_request();
        assert_eq!(request.model, "free/a");
        assert_eq!(request.max_tokens, 4000);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(request.messages[0].content, SYSTEM_INSTRUCTIONS);
        assert!(request.messages[1].content.ends_with("Text:\ncells"));
    }

    #[tokio::test]
    async fn missing_content_yields_placeholder() {
        let adapter = adapter(FixedTransport::new(200, r#"{"choices":[]}"#));
        let text = adapter.generate(ContentKind::Quiz, "x").await.unwrap();
        assert_eq!(text, NO_RESPONSE);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_maps_to_rate_limited_error() {
        let adapter = adapter(FixedTransport::new(429, "{}"));
        let err = adapter.generate(ContentKind::Bullets, "x").await.unwrap_err();
        match err {
            PortError::RateLimited(message) => assert_eq!(message, RATE_LIMITED_MESSAGE),
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn provider_message_is_surfaced() {
        let adapter = adapter(FixedTransport::new(
            400,
            r#"{"error":{"message":"context length exceeded"}}"#,
        ));
        let err = adapter.generate(ContentKind::Flashcards, "x").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "An unexpected error occurred: AI generation failed: context length exceeded"
        );
    }

    #[test]
    fn status_text_is_used_without_provider_message() {
        let err = failure_to_error(StatusCode::BAD_GATEWAY, b"<html>");
        assert!(matches!(err, PortError::Unexpected(m) if m == "AI generation failed: Bad Gateway"));
    }

    #[test]
    fn every_kind_has_its_own_prompt() {
        assert!(prompt_for(ContentKind::Flashcards, "t").contains("### Flashcard [Number]"));
        assert!(prompt_for(ContentKind::Quiz, "t").contains("**Correct Answer:** [Letter]"));
        assert!(prompt_for(ContentKind::Bullets, "t").contains("nested bullets"));
        assert!(prompt_for(ContentKind::Summary, "t").contains("summary"));
    }

    impl FallbackClient<FixedTransport> {
        fn transport_request(&self) -> ChatCompletionRequest {
            self.transport()
                .last_request
                .lock()
                .unwrap()
                .clone()
                .expect("a request was sent")
        }
    }
}
