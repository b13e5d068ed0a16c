//! Authentication errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use banter_common::error_response;

/// Authentication error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuthorization,
    #[error("Invalid authorization header format")]
    InvalidAuthorizationFormat,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Failed to load user")]
    UserLoadError,
    #[error("Token subject does not match user")]
    SubjectMismatch,
    #[error("Failed to issue token")]
    TokenIssueFailed,
    #[error("Insufficient role for this operation")]
    InsufficientRole,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthorization
            | AuthError::InvalidAuthorizationFormat
            | AuthError::InvalidToken
            | AuthError::UserNotFound
            | AuthError::SubjectMismatch => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::UserLoadError | AuthError::TokenIssueFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthorization => "MISSING_AUTHORIZATION",
            AuthError::InvalidAuthorizationFormat => "INVALID_AUTHORIZATION",
            AuthError::InvalidToken | AuthError::SubjectMismatch => "INVALID_TOKEN",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::UserLoadError => "USER_LOAD_ERROR",
            AuthError::TokenIssueFailed => "TOKEN_ISSUE_FAILED",
            AuthError::InsufficientRole => "INSUFFICIENT_ROLE",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.error_code(), self.to_string())
    }
}
