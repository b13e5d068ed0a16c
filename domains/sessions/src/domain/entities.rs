//! Domain entities for the Sessions domain
//!
//! A session owns an append-only log of messages. Messages are immutable
//! once appended and the log offers no way to edit or remove them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::SessionError;

/// Maximum session name length in characters
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum model identifier length in characters
pub const MAX_MODEL_LENGTH: usize = 100;

/// Opaque, globally unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an externally supplied id; anything unparseable names no session
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageRole::User, content, timestamp)
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(MessageRole::Assistant, content, timestamp)
    }
}

/// Append-only, insertion-ordered message sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLog(Vec<Message>);

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.0.extend(messages);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.0
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }
}

impl FromIterator<Message> for MessageLog {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Session entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Username of the owning user
    pub owner: String,
    pub name: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub messages: MessageLog,
}

impl Session {
    /// Create a new, empty session
    pub fn new(owner: &str, name: &str, model: &str) -> Result<Self, SessionError> {
        let name = validate_name(name)?;

        let model = model.trim();
        if model.is_empty() {
            return Err(SessionError::Validation("Model is required".to_string()));
        }
        if model.chars().count() > MAX_MODEL_LENGTH {
            return Err(SessionError::Validation(format!(
                "Model must be at most {} characters",
                MAX_MODEL_LENGTH
            )));
        }

        Ok(Session {
            id: SessionId::new(),
            owner: owner.to_string(),
            name,
            model: model.to_string(),
            created_at: Utc::now(),
            messages: MessageLog::new(),
        })
    }
}

/// Trim and check a display name
pub fn validate_name(name: &str) -> Result<String, SessionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::Validation("Session name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(SessionError::Validation(format!(
            "Session name must be between 1 and {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}
