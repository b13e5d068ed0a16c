//! Authentication configuration

use chrono::Duration;

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// Validity of credentials minted by [`crate::issue_token`] when no TTL is chosen
pub fn default_token_ttl() -> Duration {
    Duration::hours(10)
}

/// Rejected authentication configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthConfigError {
    #[error("JWT secret must be at least {MIN_SECRET_LENGTH} bytes (got {0})")]
    SecretTooShort(usize),
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    issuer: Option<String>,
}

impl AuthConfig {
    /// Build a configuration, refusing secrets shorter than [`MIN_SECRET_LENGTH`]
    pub fn new(
        jwt_secret: impl Into<String>,
        issuer: Option<String>,
    ) -> Result<Self, AuthConfigError> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthConfigError::SecretTooShort(jwt_secret.len()));
        }
        Ok(Self { jwt_secret, issuer })
    }

    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }
}
