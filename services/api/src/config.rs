//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use study_notes_core::validation::{MAX_INPUT_CHARS, MAX_UPLOAD_BYTES};
use tracing::Level;

pub const DEFAULT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Free models tried in order when the preferred one is rate-limited or unavailable.
pub const DEFAULT_FALLBACK_MODELS: [&str; 4] = [
    "google/gemini-2.0-flash-exp:free",
    "meta-llama/llama-3.2-3b-instruct:free",
    "microsoft/phi-3-mini-128k-instruct:free",
    "qwen/qwen-2-7b-instruct:free",
];

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// When absent the service keeps notes in memory.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub cors_origin: String,
    pub openrouter_api_key: Option<String>,
    pub completions_url: String,
    /// `OPENROUTER_PREFERRED_MODEL`; the first fallback model is used when unset.
    pub preferred_model: Option<String>,
    pub fallback_models: Vec<String>,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub pacing_delay: Duration,
    pub max_input_chars: usize,
    pub max_upload_bytes: usize,
    pub app_referer: String,
    pub app_title: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address: SocketAddr = parse_var("BIND_ADDRESS", "0.0.0.0:3000".parse().ok())?;
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;
        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Provider Settings ---
        let openrouter_api_key = std::env::var("OPENROUTER_API_KEY").ok();
        let completions_url =
            std::env::var("OPENROUTER_URL").unwrap_or_else(|_| DEFAULT_COMPLETIONS_URL.to_string());
        let preferred_model = std::env::var("OPENROUTER_PREFERRED_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty());

        let fallback_models = match std::env::var("FALLBACK_MODELS") {
            Ok(list) => parse_model_list(&list)?,
            Err(_) => DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
        };

        let max_retries = parse_var("MAX_RETRIES", Some(5u32))?;
        if max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_RETRIES".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let backoff_base = Duration::from_millis(parse_var("BACKOFF_BASE_MS", Some(5_000u64))?);
        let pacing_delay = Duration::from_millis(parse_var("PACING_DELAY_MS", Some(6_000u64))?);

        // --- Load Input Limits ---
        let max_input_chars = parse_var("MAX_INPUT_CHARS", Some(MAX_INPUT_CHARS))?;
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", Some(MAX_UPLOAD_BYTES))?;

        let app_referer =
            std::env::var("APP_REFERER").unwrap_or_else(|_| "https://yourapp.com".to_string());
        let app_title =
            std::env::var("APP_TITLE").unwrap_or_else(|_| "AI Notes Generator".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            openrouter_api_key,
            completions_url,
            preferred_model,
            fallback_models,
            max_retries,
            backoff_base,
            pacing_delay,
            max_input_chars,
            max_upload_bytes,
            app_referer,
            app_title,
        })
    }

    /// The model named in the first request of every generation.
    pub fn initial_model(&self) -> String {
        self.preferred_model
            .clone()
            .or_else(|| self.fallback_models.first().cloned())
            .unwrap_or_else(|| DEFAULT_FALLBACK_MODELS[0].to_string())
    }
}

impl Default for Config {
    /// The values `from_env` uses for unset variables, without a database or API key.
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            log_level: Level::INFO,
            cors_origin: "http://localhost:3000".to_string(),
            openrouter_api_key: None,
            completions_url: DEFAULT_COMPLETIONS_URL.to_string(),
            preferred_model: None,
            fallback_models: DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
            max_retries: 5,
            backoff_base: Duration::from_millis(5_000),
            pacing_delay: Duration::from_millis(6_000),
            max_input_chars: MAX_INPUT_CHARS,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            app_referer: "https://yourapp.com".to_string(),
            app_title: "AI Notes Generator".to_string(),
        }
    }
}

/// Reads and parses a variable, falling back to `default` when it is unset.
fn parse_var<T>(name: &str, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => default.ok_or_else(|| ConfigError::MissingVar(name.to_string())),
    }
}

fn parse_model_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if models.is_empty() {
        return Err(ConfigError::InvalidValue(
            "FALLBACK_MODELS".to_string(),
            "at least one model is required".to_string(),
        ));
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_list_is_split_and_trimmed() {
        let models = parse_model_list(" a/one , b/two,, ").unwrap();
        assert_eq!(models, vec!["a/one", "b/two"]);
        assert!(parse_model_list(" , ").is_err());
    }

    #[test]
    fn initial_model_prefers_configured_model() {
        let mut config = Config::default();
        assert_eq!(config.initial_model(), DEFAULT_FALLBACK_MODELS[0]);
        config.preferred_model = Some("paid/model".to_string());
        assert_eq!(config.initial_model(), "paid/model");
    }

    #[test]
    fn unset_variable_uses_default() {
        let value: u32 = parse_var("STUDY_NOTES_TEST_UNSET_VARIABLE", Some(7)).unwrap();
        assert_eq!(value, 7);
        assert!(matches!(
            parse_var::<u32>("STUDY_NOTES_TEST_UNSET_VARIABLE", None),
            Err(ConfigError::MissingVar(_))
        ));
    }
}
