//! Route definitions for Sessions domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{admin, chat, sessions};
use super::middleware::SessionsState;

/// Create session CRUD routes
fn session_routes() -> Router<SessionsState> {
    Router::new()
        .route(
            "/api/v1/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/api/v1/sessions/{id}",
            get(sessions::get_session)
                .put(sessions::update_session)
                .delete(sessions::delete_session),
        )
        .route("/api/v1/sessions/{id}/messages", get(sessions::list_messages))
}

/// Create chat routes
fn chat_routes() -> Router<SessionsState> {
    Router::new().route("/api/v1/chat/{session_id}", post(chat::chat))
}

/// Create admin routes
fn admin_routes() -> Router<SessionsState> {
    Router::new().route("/api/v1/admins/sessions", get(admin::list_all_sessions))
}

/// Create all Sessions domain API routes
pub fn routes() -> Router<SessionsState> {
    Router::new()
        .merge(session_routes())
        .merge(chat_routes())
        .merge(admin_routes())
}
