//! Admin handlers

use axum::{extract::State, Json};
use banter_auth::AdminUser;

use super::sessions::SessionResponse;
use crate::api::middleware::SessionsState;
use crate::domain::error::SessionError;

/// List every session across all owners, newest first
pub async fn list_all_sessions(
    AdminUser(ctx): AdminUser,
    State(state): State<SessionsState>,
) -> Result<Json<Vec<SessionResponse>>, SessionError> {
    tracing::debug!(subject = %ctx.subject, "Admin listing all sessions");
    let sessions = state.sessions.list_all().await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}
