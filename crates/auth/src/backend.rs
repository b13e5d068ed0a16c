//! Concrete authentication backend
//!
//! Combines the token verifier with the user lookup collaborator to turn a
//! bearer credential into an [`AuthContext`].

use std::sync::Arc;

use axum::http::HeaderValue;
use chrono::{DateTime, Utc};

use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::jwt::{extract_bearer_token, validate_token};

/// Concrete authentication backend.
///
/// Cheap to clone; shared by the gatekeeper middleware across requests.
#[derive(Clone)]
pub struct AuthBackend {
    directory: Arc<dyn UserDirectory>,
    config: AuthConfig,
}

impl AuthBackend {
    pub fn new(directory: Arc<dyn UserDirectory>, config: AuthConfig) -> Self {
        Self { directory, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticate the value of an `Authorization` header
    pub async fn authenticate_header(&self, header: &HeaderValue) -> Result<AuthContext, AuthError> {
        let token = extract_bearer_token(header)?;
        self.authenticate(&token).await
    }

    /// Verify a raw token and resolve its subject to current roles
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = validate_token(token, &self.config)?;

        let expires_at = i64::try_from(claims.exp)
            .ok()
            .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0))
            .ok_or(AuthError::InvalidToken)?;
        if expires_at <= Utc::now() {
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .directory
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.username != claims.sub {
            return Err(AuthError::SubjectMismatch);
        }

        Ok(AuthContext::new(user.username, user.roles, expires_at))
    }
}
