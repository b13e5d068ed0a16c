//! Session persistence
//!
//! [`SessionStore`] is the only way sessions are read or written. Appends
//! are atomic per session: concurrent appends to one session never
//! interleave or lose messages.

mod memory;
mod postgres;

use async_trait::async_trait;

use crate::domain::entities::{Message, Session, SessionId};
use crate::domain::error::SessionError;

pub use memory::InMemorySessionStore;
pub use postgres::PgSessionStore;

/// Storage for sessions keyed by id
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> Result<Session, SessionError>;

    async fn find(&self, id: SessionId) -> Result<Option<Session>, SessionError>;

    /// Append `messages` in order; `None` if the session does not exist
    async fn append_messages(
        &self,
        id: SessionId,
        messages: Vec<Message>,
    ) -> Result<Option<Session>, SessionError>;

    async fn rename(&self, id: SessionId, name: String) -> Result<Option<Session>, SessionError>;

    /// Returns whether a session was removed
    async fn delete(&self, id: SessionId) -> Result<bool, SessionError>;

    /// Sessions of one owner, newest first
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Session>, SessionError>;

    /// Every session, newest first
    async fn list_all(&self) -> Result<Vec<Session>, SessionError>;
}
