//! Mock LLM Service Implementation
//!
//! Used by `LlmServiceFactory` when provider is `"mock"` and by tests.
//! Replies are scripted per call; with nothing scripted it echoes the last
//! user message.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::{CompletionRequest, LlmError, LlmRole, LlmService, LlmStream};

/// Scripted outcome of one `stream` call
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Yield these fragments, then end normally
    Fragments(Vec<String>),
    /// Fail before producing a stream
    Fail(LlmError),
    /// Yield these fragments, then fail
    FailAfter(Vec<String>, LlmError),
    /// Yield these fragments, then never yield again
    Stall(Vec<String>),
}

impl MockReply {
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockReply::Fragments(fragments.into_iter().map(Into::into).collect())
    }
}

/// Mock LLM service for testing
#[derive(Debug, Default)]
pub struct MockLlmService {
    script: Mutex<VecDeque<MockReply>>,
    fallback: Mutex<Option<MockReply>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockLlmService {
    /// Create a new mock LLM service
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply used whenever the script is empty
    pub fn with_reply(self, reply: MockReply) -> Self {
        *self.fallback.lock().unwrap_or_else(|e| e.into_inner()) = Some(reply);
        self
    }

    /// Queue a reply for the next unscripted call
    pub fn push_reply(&self, reply: MockReply) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Number of `stream` invocations so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_reply(&self, request: &CompletionRequest) -> MockReply {
        if let Some(reply) = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            return reply;
        }
        if let Some(reply) = self
            .fallback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return reply;
        }

        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == LlmRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let text = format!("Mock response to: {last_user}");
        MockReply::Fragments(split_words(&text))
    }
}

/// Split text into word fragments that concatenate back to the input
fn split_words(text: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if c == ' ' {
            fragments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        fragments.push(current);
    }
    fragments
}

#[async_trait::async_trait]
impl LlmService for MockLlmService {
    async fn stream(&self, request: CompletionRequest) -> Result<LlmStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(model = %request.model, "Mock LLM service processing completion request");

        let reply = self.next_reply(&request);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request);

        let (fragments, tail) = match reply {
            MockReply::Fail(e) => return Err(e),
            MockReply::Fragments(f) => (f, None),
            MockReply::FailAfter(f, e) => (f, Some(Err(e))),
            MockReply::Stall(f) => (f, Some(Ok(()))),
        };

        Ok(Box::pin(async_stream::try_stream! {
            for fragment in fragments {
                tokio::task::yield_now().await;
                yield fragment;
            }
            match tail {
                None => {}
                Some(Err(e)) => Err::<(), _>(e)?,
                Some(Ok(())) => futures_util::future::pending::<()>().await,
            }
        }))
    }
}
