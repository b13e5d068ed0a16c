//! In-memory session store

use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use super::SessionStore;
use crate::domain::entities::{Message, Session, SessionId};
use crate::domain::error::SessionError;

/// Session store held in a concurrent map.
///
/// An append holds only the shard entry of its own session, and only for
/// the in-memory push.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut sessions: Vec<Session>) -> Vec<Session> {
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        sessions
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Session) -> Result<Session, SessionError> {
        match self.sessions.entry(session.id) {
            Entry::Occupied(_) => Err(SessionError::Persistence(format!(
                "Session {} already exists",
                session.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    async fn find(&self, id: SessionId) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.get(&id).map(|entry| entry.value().clone()))
    }

    async fn append_messages(
        &self,
        id: SessionId,
        messages: Vec<Message>,
    ) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.get_mut(&id).map(|mut entry| {
            entry.messages.append(messages);
            entry.value().clone()
        }))
    }

    async fn rename(&self, id: SessionId, name: String) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.get_mut(&id).map(|mut entry| {
            entry.name = name;
            entry.value().clone()
        }))
    }

    async fn delete(&self, id: SessionId) -> Result<bool, SessionError> {
        Ok(self.sessions.remove(&id).is_some())
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Session>, SessionError> {
        let sessions = self
            .sessions
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(Self::sorted(sessions))
    }

    async fn list_all(&self) -> Result<Vec<Session>, SessionError> {
        let sessions = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        Ok(Self::sorted(sessions))
    }
}
