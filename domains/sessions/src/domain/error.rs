//! Sessions domain errors
//!
//! Every failure carries a [`SessionErrorKind`]; the boundary translator
//! maps kinds to status codes and envelope codes exhaustively.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use banter_common::{error_body, error_response, INTERNAL_ERROR_MESSAGE};
use banter_llm::LlmError;

/// Machine-readable failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionErrorKind {
    NotFound,
    AccessDenied,
    Validation,
    ProviderUnavailable,
    ProviderRejected,
    ProviderTimeout,
    PersistenceFailed,
    Internal,
}

impl SessionErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            SessionErrorKind::NotFound => StatusCode::NOT_FOUND,
            SessionErrorKind::AccessDenied => StatusCode::FORBIDDEN,
            SessionErrorKind::Validation => StatusCode::BAD_REQUEST,
            SessionErrorKind::ProviderUnavailable | SessionErrorKind::ProviderRejected => {
                StatusCode::BAD_GATEWAY
            }
            SessionErrorKind::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
            SessionErrorKind::PersistenceFailed | SessionErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            SessionErrorKind::NotFound => "SESSION_NOT_FOUND",
            SessionErrorKind::AccessDenied => "SESSION_ACCESS_DENIED",
            SessionErrorKind::Validation => "VALIDATION_ERROR",
            SessionErrorKind::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            SessionErrorKind::ProviderRejected => "PROVIDER_REJECTED",
            SessionErrorKind::ProviderTimeout => "PROVIDER_TIMEOUT",
            SessionErrorKind::PersistenceFailed => "PERSISTENCE_FAILED",
            SessionErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn is_provider(self) -> bool {
        matches!(
            self,
            SessionErrorKind::ProviderUnavailable
                | SessionErrorKind::ProviderRejected
                | SessionErrorKind::ProviderTimeout
        )
    }
}

/// Sessions domain error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Access denied to session: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error("Failed to persist session: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            SessionError::NotFound(_) => SessionErrorKind::NotFound,
            SessionError::AccessDenied(_) => SessionErrorKind::AccessDenied,
            SessionError::Validation(_) => SessionErrorKind::Validation,
            SessionError::Provider(LlmError::Unavailable(_))
            | SessionError::Provider(LlmError::Configuration(_)) => {
                SessionErrorKind::ProviderUnavailable
            }
            SessionError::Provider(LlmError::Rejected(_)) => SessionErrorKind::ProviderRejected,
            SessionError::Provider(LlmError::Timeout(_)) => SessionErrorKind::ProviderTimeout,
            SessionError::Persistence(_) => SessionErrorKind::PersistenceFailed,
            SessionError::Internal(_) => SessionErrorKind::Internal,
        }
    }

    /// Message safe to show the caller; server-side details stay in the log
    pub fn public_message(&self) -> String {
        match self.kind() {
            SessionErrorKind::NotFound
            | SessionErrorKind::AccessDenied
            | SessionErrorKind::Validation => self.to_string(),
            SessionErrorKind::ProviderUnavailable => {
                "The completion provider is unavailable".to_string()
            }
            SessionErrorKind::ProviderRejected => {
                "The completion provider rejected the request".to_string()
            }
            SessionErrorKind::ProviderTimeout => {
                "The completion provider did not respond in time".to_string()
            }
            SessionErrorKind::PersistenceFailed => {
                "The response was generated but could not be saved".to_string()
            }
            SessionErrorKind::Internal => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    /// Envelope for this error at `path`, as sent inside a stream
    pub fn envelope(&self, path: &str) -> serde_json::Value {
        error_body(self.kind().code(), &self.public_message(), Some(path))
    }

    pub(crate) fn log(&self) {
        let kind = self.kind();
        if kind.is_provider() {
            tracing::warn!(error = %self, code = kind.code(), "Completion provider failure");
        } else if kind.status_code().is_server_error() {
            tracing::error!(error = %self, code = kind.code(), "Session operation failed");
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        self.log();
        let kind = self.kind();
        error_response(kind.status_code(), kind.code(), self.public_message())
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(e: sqlx::Error) -> Self {
        SessionError::Persistence(e.to_string())
    }
}
