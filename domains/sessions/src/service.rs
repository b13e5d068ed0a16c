//! Session service
//!
//! CRUD over sessions plus the ownership check. The chat pipeline's only
//! persistence dependency.

use std::sync::Arc;

use banter_auth::AuthContext;

use crate::domain::entities::{validate_name, Message, Session, SessionId};
use crate::domain::error::SessionError;
use crate::repository::SessionStore;

/// Parse a session id from a path segment; unparseable ids name no session
pub fn parse_session_id(raw: &str) -> Result<SessionId, SessionError> {
    SessionId::parse(raw).ok_or_else(|| {
        tracing::debug!(session_id = %raw, "Unparseable session id");
        SessionError::NotFound(raw.to_string())
    })
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner: &str, name: &str, model: &str) -> Result<Session, SessionError> {
        let session = self.store.insert(Session::new(owner, name, model)?).await?;
        tracing::info!(session_id = %session.id, owner = %owner, "Session created");
        Ok(session)
    }

    pub async fn get_by_id(&self, id: SessionId) -> Result<Session, SessionError> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Load a session the identity owns
    pub async fn get_owned(
        &self,
        id: SessionId,
        identity: &AuthContext,
    ) -> Result<Session, SessionError> {
        let session = self.get_by_id(id).await?;
        if !identity.owns(&session.owner) {
            tracing::warn!(
                session_id = %id,
                subject = %identity.subject,
                "Session access denied"
            );
            return Err(SessionError::AccessDenied(id.to_string()));
        }
        Ok(session)
    }

    /// Atomically append messages to a session
    pub async fn append_messages(
        &self,
        id: SessionId,
        messages: Vec<Message>,
    ) -> Result<Session, SessionError> {
        self.store
            .append_messages(id, messages)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub async fn rename(
        &self,
        id: SessionId,
        identity: &AuthContext,
        name: &str,
    ) -> Result<Session, SessionError> {
        let name = validate_name(name)?;
        self.get_owned(id, identity).await?;
        let session = self
            .store
            .rename(id, name)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        tracing::info!(session_id = %id, "Session renamed");
        Ok(session)
    }

    pub async fn delete(&self, id: SessionId, identity: &AuthContext) -> Result<(), SessionError> {
        self.get_owned(id, identity).await?;
        if !self.store.delete(id).await? {
            return Err(SessionError::NotFound(id.to_string()));
        }
        tracing::info!(session_id = %id, "Session deleted");
        Ok(())
    }

    pub async fn list_for_owner(&self, owner: &str) -> Result<Vec<Session>, SessionError> {
        self.store.list_by_owner(owner).await
    }

    pub async fn list_all(&self) -> Result<Vec<Session>, SessionError> {
        self.store.list_all().await
    }
}
