//! Chat pipeline
//!
//! Answers one prompt within a session: load the session, send its history
//! plus the new user turn to the completion provider, stream fragments back
//! as they arrive and, once the provider finishes, append the user and
//! assistant messages in one store call.
//!
//! The returned stream is pull-driven. Nothing is persisted unless the
//! consumer drains it to the end, so a caller that disconnects (drops the
//! stream) leaves the session untouched.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use banter_auth::AuthContext;
use banter_llm::{CompletionRequest, LlmError, LlmMessage, LlmRole, LlmService};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tokio::time::{timeout_at, Instant};

use crate::domain::entities::{Message, MessageRole, SessionId};
use crate::domain::error::SessionError;
use crate::service::SessionService;

/// Fragments of one chat turn; a trailing `Err` reports provider or
/// persistence failure.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, SessionError>> + Send + 'static>>;

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Constant instruction sent ahead of every history; never persisted
    pub system_prompt: Option<String>,
    /// Upper bound for the provider part of one turn
    pub provider_timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            provider_timeout: Duration::from_secs(90),
        }
    }
}

#[derive(Clone)]
pub struct ChatPipeline {
    sessions: SessionService,
    llm: Arc<dyn LlmService>,
    settings: Arc<ChatSettings>,
}

impl ChatPipeline {
    pub fn new(sessions: SessionService, llm: Arc<dyn LlmService>, settings: ChatSettings) -> Self {
        Self {
            sessions,
            llm,
            settings: Arc::new(settings),
        }
    }

    /// Start a chat turn.
    ///
    /// Session lookup, ownership and the initial provider call happen before
    /// this returns, so those failures never produce a stream.
    pub async fn handle(
        &self,
        session_id: SessionId,
        identity: &AuthContext,
        prompt: Option<String>,
    ) -> Result<FragmentStream, SessionError> {
        let session = self.sessions.get_owned(session_id, identity).await?;

        let user_message = Message::user(prompt.unwrap_or_default(), Utc::now());

        let mut messages: Vec<LlmMessage> = session
            .messages
            .iter()
            .map(|m| LlmMessage::new(llm_role(m.role), m.content.clone()))
            .collect();
        messages.push(LlmMessage::new(LlmRole::User, user_message.content.clone()));

        let request = CompletionRequest {
            model: session.model.clone(),
            system_prompt: self.settings.system_prompt.clone(),
            messages,
            temperature: None,
            max_tokens: None,
        };

        tracing::debug!(
            session_id = %session_id,
            model = %session.model,
            history = session.messages.len(),
            "Starting chat turn"
        );

        let limit = self.settings.provider_timeout;
        let deadline = Instant::now() + limit;
        let mut upstream = timeout_at(deadline, self.llm.stream(request))
            .await
            .map_err(|_| provider_timeout(limit))?
            .map_err(|e| {
                tracing::warn!(session_id = %session_id, error = %e, "Provider call failed");
                SessionError::from(e)
            })?;

        let sessions = self.sessions.clone();

        Ok(Box::pin(async_stream::try_stream! {
            let mut turn = TurnGuard::new(session_id);

            loop {
                let next = timeout_at(deadline, upstream.next())
                    .await
                    .map_err(|_| provider_timeout(limit))?;
                match next {
                    Some(Ok(fragment)) => {
                        turn.accumulated.push_str(&fragment);
                        turn.fragments += 1;
                        yield fragment;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(
                            session_id = %session_id,
                            error = %e,
                            fragments = turn.fragments,
                            "Provider failed mid-stream"
                        );
                        Err::<(), _>(SessionError::from(e))?;
                    }
                    None => break,
                }
            }

            let content = turn.finish();
            let completed_at = Utc::now().max(user_message.timestamp);
            let assistant_message = Message::assistant(content, completed_at);

            let updated = sessions
                .append_messages(session_id, vec![user_message, assistant_message])
                .await
                .map_err(|e| {
                    tracing::error!(session_id = %session_id, error = %e, "Failed to persist chat turn");
                    match e {
                        SessionError::Persistence(_) => e,
                        other => SessionError::Persistence(other.to_string()),
                    }
                })?;

            tracing::info!(
                session_id = %session_id,
                messages = updated.messages.len(),
                "Chat turn persisted"
            );
        }))
    }
}

fn llm_role(role: MessageRole) -> LlmRole {
    match role {
        MessageRole::User => LlmRole::User,
        MessageRole::Assistant => LlmRole::Assistant,
        MessageRole::System => LlmRole::System,
    }
}

fn provider_timeout(limit: Duration) -> SessionError {
    SessionError::Provider(LlmError::Timeout(format!(
        "no completion within {}s",
        limit.as_secs_f64()
    )))
}

/// Partial assistant text of an in-flight turn; logs when a turn is dropped
/// before completion.
struct TurnGuard {
    session_id: SessionId,
    accumulated: String,
    fragments: usize,
    finished: bool,
}

impl TurnGuard {
    fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            accumulated: String::new(),
            fragments: 0,
            finished: false,
        }
    }

    fn finish(&mut self) -> String {
        self.finished = true;
        std::mem::take(&mut self.accumulated)
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                session_id = %self.session_id,
                fragments = self.fragments,
                discarded_chars = self.accumulated.chars().count(),
                "Discarding unfinished chat turn"
            );
        }
    }
}
