//! Session API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use banter_auth::AuthUser;
use banter_common::ValidatedJson;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::middleware::SessionsState;
use crate::domain::entities::{Message, MessageRole, Session, SessionId};
use crate::domain::error::SessionError;
use crate::service::parse_session_id;

/// Request for creating a session
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "is required and at most 100 characters"))]
    pub model: String,
}

/// Request for renaming a session
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSessionRequest {
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
}

/// Session summary DTO
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: SessionId,
    pub owner: String,
    pub name: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            id: s.id,
            owner: s.owner,
            name: s.name,
            model: s.model,
            created_at: s.created_at,
            message_count: s.messages.len(),
        }
    }
}

/// Message DTO
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for MessageResponse {
    fn from(m: &Message) -> Self {
        Self {
            role: m.role,
            content: m.content.clone(),
            timestamp: m.timestamp,
        }
    }
}

/// Session with its full message log
#[derive(Debug, Serialize)]
pub struct SessionDetailResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub messages: Vec<MessageResponse>,
}

impl From<Session> for SessionDetailResponse {
    fn from(s: Session) -> Self {
        let messages = s.messages.iter().map(MessageResponse::from).collect();
        Self {
            session: s.into(),
            messages,
        }
    }
}

/// Create a session owned by the caller
pub async fn create_session(
    AuthUser(ctx): AuthUser,
    State(state): State<SessionsState>,
    ValidatedJson(req): ValidatedJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), SessionError> {
    let session = state
        .sessions
        .create(&ctx.subject, &req.name, &req.model)
        .await?;

    Ok((StatusCode::CREATED, Json(session.into())))
}

/// List the caller's sessions, newest first
pub async fn list_sessions(
    AuthUser(ctx): AuthUser,
    State(state): State<SessionsState>,
) -> Result<Json<Vec<SessionResponse>>, SessionError> {
    let sessions = state.sessions.list_for_owner(&ctx.subject).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// Get one session with its messages
pub async fn get_session(
    AuthUser(ctx): AuthUser,
    State(state): State<SessionsState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetailResponse>, SessionError> {
    let id = parse_session_id(&id)?;
    let session = state.sessions.get_owned(id, &ctx).await?;
    Ok(Json(session.into()))
}

/// Rename a session
pub async fn update_session(
    AuthUser(ctx): AuthUser,
    State(state): State<SessionsState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateSessionRequest>,
) -> Result<Json<SessionResponse>, SessionError> {
    let id = parse_session_id(&id)?;
    let session = state.sessions.rename(id, &ctx, &req.name).await?;
    Ok(Json(session.into()))
}

/// Delete a session
pub async fn delete_session(
    AuthUser(ctx): AuthUser,
    State(state): State<SessionsState>,
    Path(id): Path<String>,
) -> Result<StatusCode, SessionError> {
    let id = parse_session_id(&id)?;
    state.sessions.delete(id, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a session's messages in conversation order
pub async fn list_messages(
    AuthUser(ctx): AuthUser,
    State(state): State<SessionsState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, SessionError> {
    let id = parse_session_id(&id)?;
    let session = state.sessions.get_owned(id, &ctx).await?;
    Ok(Json(session.messages.iter().map(MessageResponse::from).collect()))
}
