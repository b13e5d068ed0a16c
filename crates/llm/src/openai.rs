//! OpenAI-compatible streaming implementation
//!
//! Calls `{base}/v1/chat/completions` with `stream: true` and turns the SSE
//! response body into text fragments.

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{CompletionRequest, LlmConfig, LlmError, LlmRole, LlmService, LlmStream};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Chat completions request body
#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<MessageBody<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    role: LlmRole,
    content: &'a str,
}

/// One streamed chunk
#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkContent>,
    /// Servers that ignore `stream` send whole messages
    #[serde(default)]
    message: Option<ChunkContent>,
}

#[derive(Debug, Deserialize)]
struct ChunkContent {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of one SSE line
#[derive(Debug, PartialEq)]
enum SseLine {
    Fragment(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseLine, LlmError> {
    let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
        return Ok(SseLine::Skip);
    };

    if payload.is_empty() {
        return Ok(SseLine::Skip);
    }
    if payload == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let chunk: ChunkPayload = serde_json::from_str(payload).map_err(|e| {
        tracing::debug!(error = %e, payload = %payload, "Malformed stream payload");
        LlmError::Rejected(format!("Malformed stream payload: {e}"))
    })?;

    if let Some(error) = chunk.error {
        return Err(LlmError::Rejected(error_summary(&error)));
    }

    let content = chunk.choices.into_iter().next().and_then(|choice| {
        choice
            .delta
            .and_then(|d| d.content)
            .or_else(|| choice.message.and_then(|m| m.content))
    });

    match content {
        Some(text) if !text.is_empty() => Ok(SseLine::Fragment(text)),
        _ => Ok(SseLine::Skip),
    }
}

/// Best human-readable message from an error payload
fn error_summary(value: &serde_json::Value) -> String {
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str())
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_else(|| value.to_string())
}

/// Map a non-success HTTP status to the provider failure it represents
fn classify_status(status: StatusCode, body: &str) -> LlmError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .map(|v| error_summary(&v))
        .unwrap_or_else(|_| body.trim().to_string());
    let message = format!("{status}: {detail}");

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => LlmError::Timeout(message),
        StatusCode::TOO_MANY_REQUESTS => LlmError::Unavailable(message),
        s if s.is_server_error() => LlmError::Unavailable(message),
        s if s.is_client_error() => LlmError::Rejected(message),
        _ => LlmError::Unavailable(message),
    }
}

fn transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(e.to_string())
    } else {
        LlmError::Unavailable(e.to_string())
    }
}

/// OpenAI-compatible LLM service implementation
pub struct OpenAiService {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

impl OpenAiService {
    /// Create a new service; fails only if the HTTP client cannot be built
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }
}

#[async_trait::async_trait]
impl LlmService for OpenAiService {
    async fn stream(&self, request: CompletionRequest) -> Result<LlmStream, LlmError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system_prompt.as_deref() {
            messages.push(MessageBody {
                role: LlmRole::System,
                content: system,
            });
        }
        messages.extend(request.messages.iter().map(|m| MessageBody {
            role: m.role,
            content: &m.content,
        }));

        let body = ChatCompletionsRequest {
            model: &request.model,
            messages,
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            stream: true,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);

        tracing::debug!(
            model = %request.model,
            messages = body.messages.len(),
            "Sending chat completions request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(classify_status(status, &error_body));
        }

        let mut bytes = Box::pin(response.bytes_stream());

        Ok(Box::pin(async_stream::try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut done = false;

            while !done {
                let Some(chunk) = bytes.next().await else {
                    break;
                };
                buffer.extend_from_slice(&chunk.map_err(transport_error)?);

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line).trim().to_string();
                    match parse_sse_line(&line)? {
                        SseLine::Fragment(text) => yield text,
                        SseLine::Done => {
                            done = true;
                            break;
                        }
                        SseLine::Skip => {}
                    }
                }
            }

            if !done && !buffer.is_empty() {
                let line = String::from_utf8_lossy(&buffer).trim().to_string();
                match parse_sse_line(&line)? {
                    SseLine::Fragment(text) => yield text,
                    SseLine::Done => done = true,
                    SseLine::Skip => {}
                }
            }

            // A body that closes without `[DONE]` was cut off
            if !done {
                tracing::warn!("Provider stream ended before completion");
                Err::<(), _>(LlmError::Unavailable(
                    "stream ended before completion".to_string(),
                ))?;
            }
        }))
    }
}
