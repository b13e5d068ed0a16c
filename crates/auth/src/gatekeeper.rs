//! Auth gatekeeper middleware
//!
//! Runs before routing on every request. A valid bearer credential attaches
//! an [`AuthContext`] to the request extensions; anything else leaves the
//! request unauthenticated. Which routes need an identity is decided later
//! by [`crate::policy`].

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::backend::AuthBackend;
use crate::context::AuthContext;
use crate::error::AuthError;

/// Resolve the identity for a request, degrading every failure to `None`
pub async fn resolve_identity(
    backend: &AuthBackend,
    header: Option<&HeaderValue>,
    path: &str,
) -> Option<AuthContext> {
    let header = header?;

    match backend.authenticate_header(header).await {
        Ok(ctx) => {
            tracing::trace!(subject = %ctx.subject, "Credential accepted");
            Some(ctx)
        }
        Err(e @ (AuthError::InvalidAuthorizationFormat | AuthError::InvalidToken)) => {
            tracing::debug!(error = %e, path = %path, "Ignoring unusable credential");
            None
        }
        Err(e @ AuthError::UserLoadError) => {
            tracing::error!(error = %e, "User lookup failed; continuing unauthenticated");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path, "Credential rejected");
            None
        }
    }
}

/// Gatekeeper middleware; install with `middleware::from_fn_with_state(backend, gatekeeper)`.
///
/// An identity already present on the request is kept as is.
pub async fn gatekeeper(
    State(backend): State<AuthBackend>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<AuthContext>().is_some() {
        tracing::trace!("Identity already attached");
        return next.run(request).await;
    }

    let header = request.headers().get(AUTHORIZATION).cloned();
    let path = request.uri().path().to_string();
    if let Some(ctx) = resolve_identity(&backend, header.as_ref(), &path).await {
        request.extensions_mut().insert(ctx);
    }

    next.run(request).await
}
