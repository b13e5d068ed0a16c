//! Sessions domain for Banter
//!
//! This crate contains:
//! - Session, Message and MessageLog entities
//! - Session stores (in-memory and PostgreSQL)
//! - The session service with its ownership checks
//! - The streaming chat pipeline
//! - HTTP handlers for sessions, chat and admin endpoints

pub mod api;
pub mod domain;
pub mod pipeline;
pub mod repository;
pub mod service;

pub use api::routes::routes;
pub use api::SessionsState;
pub use domain::entities::{Message, MessageLog, MessageRole, Session, SessionId};
pub use domain::error::{SessionError, SessionErrorKind};
pub use pipeline::{ChatPipeline, ChatSettings, FragmentStream};
pub use repository::{InMemorySessionStore, PgSessionStore, SessionStore};
pub use service::{parse_session_id, SessionService};
