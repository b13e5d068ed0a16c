//! Streaming completion providers for Banter
//!
//! [`LlmService`] turns a message history into a lazy stream of text
//! fragments. Implementations:
//! - [`OpenAiService`]: OpenAI-compatible `/v1/chat/completions` with SSE streaming
//! - [`MockLlmService`]: scripted fragments and failures for tests

mod mock;
mod openai;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use serde::Serialize;

pub use mock::{MockLlmService, MockReply};
pub use openai::OpenAiService;

/// Lazy, non-restartable sequence of generated text fragments
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

/// Role of a message sent to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

/// One message of provider input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    pub fn new(role: LlmRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Input for one streamed completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier, forwarded unchanged
    pub model: String,
    /// Constant instruction placed before the history
    pub system_prompt: Option<String>,
    /// Conversation history, oldest first, ending with the new user turn
    pub messages: Vec<LlmMessage>,
    /// Overrides the configured temperature
    pub temperature: Option<f32>,
    /// Overrides the configured token limit
    pub max_tokens: Option<u32>,
}

/// Provider failures, distinguishable from normal end-of-stream
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Provider timed out: {0}")]
    Timeout(String),

    #[error("Provider rejected the request: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Completion provider
#[async_trait::async_trait]
pub trait LlmService: Send + Sync {
    /// Issue the request and return its fragment stream.
    ///
    /// Errors detected before any output is produced are returned directly;
    /// later ones are yielded by the stream. Every call re-issues the full
    /// request.
    async fn stream(&self, request: CompletionRequest) -> Result<LlmStream, LlmError>;
}

/// Which provider implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Mock,
}

impl std::str::FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "mock" => Ok(LlmProvider::Mock),
            other => Err(LlmError::Configuration(format!(
                "Unknown LLM provider: {other}"
            ))),
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub connect_timeout: Duration,
    /// Upper bound for one complete streamed turn
    pub request_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Mock,
            api_key: String::new(),
            base_url: None,
            temperature: 0.7,
            max_tokens: 256,
            connect_timeout: Duration::from_secs(90),
            request_timeout: Duration::from_secs(90),
        }
    }
}

impl LlmConfig {
    /// Load configuration from `LLM_*` environment variables
    pub fn from_env() -> Result<Self, LlmError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let provider = match std::env::var("LLM_PROVIDER") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => defaults.provider,
        };

        let api_key = std::env::var("LLM_API_KEY").unwrap_or_default();
        if provider == LlmProvider::OpenAi && api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "LLM_API_KEY is required for the openai provider".to_string(),
            ));
        }

        Ok(Self {
            provider,
            api_key,
            base_url: std::env::var("LLM_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            temperature: parse_var("LLM_TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_var("LLM_MAX_TOKENS", defaults.max_tokens)?,
            connect_timeout: Duration::from_secs(parse_var(
                "LLM_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),
            request_timeout: Duration::from_secs(parse_var(
                "LLM_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, LlmError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| LlmError::Configuration(format!("{name} has an invalid value: {value}"))),
        _ => Ok(default),
    }
}

/// Factory for creating LLM service instances
pub struct LlmServiceFactory;

impl LlmServiceFactory {
    pub fn create(config: LlmConfig) -> Result<Arc<dyn LlmService>, LlmError> {
        match config.provider {
            LlmProvider::OpenAi => {
                tracing::info!(base_url = ?config.base_url, "Using OpenAI-compatible provider");
                Ok(Arc::new(OpenAiService::new(config)?))
            }
            LlmProvider::Mock => {
                tracing::info!("Using mock LLM provider");
                Ok(Arc::new(MockLlmService::new()))
            }
        }
    }
}
