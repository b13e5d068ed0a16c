//! Common error types and the uniform error envelope for Banter
//!
//! Every error that crosses the HTTP boundary is rendered as
//! `{"error": {"code", "message", "path"}}`. Error types build the envelope
//! through [`error_response`]; the outermost [`attach_request_path`]
//! middleware fills in the request path.

use std::any::Any;

use axum::{
    body::Body,
    extract::Request,
    http::{header::CONTENT_LENGTH, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message returned to callers for any 5xx error; details go to the log only.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

/// Boundary errors not owned by any domain
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Internal server error");
            return error_response(status, self.error_code(), INTERNAL_ERROR_MESSAGE);
        }

        error_response(status, self.error_code(), self.to_string())
    }
}

/// Error details stashed in response extensions for [`attach_request_path`]
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
}

/// Build the JSON error envelope
pub fn error_body(code: &str, message: &str, path: Option<&str>) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message,
    });
    if let Some(path) = path {
        error["path"] = json!(path);
    }
    json!({ "error": error })
}

/// Build an error response carrying the envelope (without path) and its [`ErrorInfo`]
pub fn error_response(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    let message = message.into();
    let mut response = (status, Json(error_body(code, &message, None))).into_response();
    response
        .extensions_mut()
        .insert(ErrorInfo { code, message });
    response
}

/// Middleware completing error envelopes with the request path.
///
/// Must be the outermost layer so that rejections from auth layers and
/// extractors are covered as well.
pub async fn attach_request_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let Some(info) = response.extensions().get::<ErrorInfo>().cloned() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    let body = error_body(info.code, &info.message, Some(&path));
    Response::from_parts(parts, Body::from(body.to_string()))
}

/// Router fallback for paths no route matches
pub async fn not_found_fallback(uri: Uri) -> Error {
    Error::NotFound(format!("No route for {}", uri.path()))
}

/// Fallback for a known path called with an unsupported method
pub async fn method_not_allowed_fallback(method: Method, uri: Uri) -> Error {
    Error::MethodNotAllowed(format!("{} {}", method, uri.path()))
}

/// Turn a caught handler panic into the generic 500 envelope
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    Error::Internal(format!("Handler panicked: {detail}")).into_response()
}
