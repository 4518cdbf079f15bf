//! services/api/src/adapters/completion.rs
//!
//! Delivery of chat-completion requests to an OpenAI-compatible endpoint (OpenRouter)
//! with model fallback and exponential backoff.
//!
//! A 429 (rate-limited) or 404 (model unavailable) answer switches the request to the
//! next untried model straight away. Once every model has been tried, the client waits
//! `2^attempt * backoff_base`, goes back to the first model and spends part of its
//! retry budget. Other non-success answers are retried until the budget runs out and
//! the last response is handed back as-is. Transport failures are never retried.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use study_notes_core::ports::{PortError, PortResult};
use tracing::{debug, warn};

use crate::config::Config;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The JSON body POSTed to the completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// The parts of a completion response the service reads. Everything is optional so a
/// surprising shape degrades to "no content" instead of a decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// `{"error": {"message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    pub error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

/// A raw HTTP answer from the provider.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

//=========================================================================================
// Transport
//=========================================================================================

/// One HTTP round-trip to the completions endpoint, with no retry logic of its own.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn post(&self, request: &ChatCompletionRequest) -> PortResult<TransportResponse>;
}

/// The production transport, backed by `reqwest`.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: String,
    referer: String,
    title: String,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, config: &Config, api_key: String) -> Self {
        Self {
            client,
            url: config.completions_url.clone(),
            api_key,
            referer: config.app_referer.clone(),
            title: config.app_title.clone(),
        }
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn post(&self, request: &ChatCompletionRequest) -> PortResult<TransportResponse> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("AI provider request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                PortError::Unexpected(format!("Failed to read AI provider response: {}", e))
            })?;
        Ok(TransportResponse { status, body })
    }
}

//=========================================================================================
// Fallback Client
//=========================================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Candidate models, in order of preference.
    pub models: Vec<String>,
    /// Total attempt budget. Switching models does not spend it.
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            models: config.fallback_models.clone(),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
        }
    }

    /// `2^attempt * backoff_base`, attempts counted from 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// The final answer together with the model that produced it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub response: TransportResponse,
    pub model: String,
}

fn triggers_fallback(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::NOT_FOUND
}

pub struct FallbackClient<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: CompletionTransport> FallbackClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Delivers `request`, rewriting its model as fallbacks are used.
    ///
    /// Returns the first successful response, or the last failing one once the retry
    /// budget is spent. Only transport errors surface as `Err`.
    pub async fn send(&self, mut request: ChatCompletionRequest) -> PortResult<Delivery> {
        let models = &self.policy.models;
        // Index of the next untried model in this cycle.
        let mut next = models
            .iter()
            .position(|m| *m == request.model)
            .map_or(0, |i| i + 1);
        let mut budget = self.policy.max_retries.max(1);
        let mut attempt = 1;

        loop {
            let response = self.transport.post(&request).await?;
            if response.status.is_success() {
                debug!(model = %request.model, attempt, "Completion request succeeded.");
                return Ok(Delivery {
                    response,
                    model: request.model,
                });
            }

            if triggers_fallback(response.status) {
                if let Some(candidate) = models.get(next) {
                    warn!(
                        status = %response.status,
                        from = %request.model,
                        to = %candidate,
                        "Model unavailable or rate-limited, switching to fallback."
                    );
                    request.model = candidate.clone();
                    next += 1;
                    attempt = 1;
                    continue;
                }

                if attempt < budget {
                    let wait = self.policy.backoff(attempt);
                    warn!(
                        status = %response.status,
                        wait_ms = wait.as_millis() as u64,
                        remaining = budget - attempt,
                        "All models exhausted, backing off before retrying."
                    );
                    tokio::time::sleep(wait).await;
                    budget -= attempt;
                    attempt = 1;
                    if let Some(first) = models.first() {
                        request.model = first.clone();
                        next = 1;
                    }
                    continue;
                }
            }

            if attempt >= budget {
                warn!(status = %response.status, model = %request.model, "Retry budget exhausted.");
                return Ok(Delivery {
                    response,
                    model: request.model,
                });
            }
            attempt += 1;
        }
    }
}
