//! Declarative route access policy
//!
//! Maps request paths to the access they require. Patterns are exact paths
//! or prefixes ending in `/**`; the first matching rule wins and unmatched
//! paths fall back to the policy default.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::context::AuthContext;
use crate::error::AuthError;
use crate::types::AuthRole;

/// Access required by a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(AuthRole),
}

#[derive(Debug, Clone)]
struct AccessRule {
    pattern: String,
    access: Access,
}

impl AccessRule {
    fn matches(&self, path: &str) -> bool {
        match self.pattern.strip_suffix("/**") {
            Some(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            None => self.pattern == path,
        }
    }
}

/// Ordered list of `(pattern, access)` rules
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: Arc<Vec<AccessRule>>,
    default: Access,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(Access::Authenticated)
    }
}

impl AccessPolicy {
    pub fn new(default: Access) -> Self {
        Self {
            rules: Arc::new(Vec::new()),
            default,
        }
    }

    /// Append a rule; earlier rules take precedence
    pub fn rule(mut self, pattern: impl Into<String>, access: Access) -> Self {
        Arc::make_mut(&mut self.rules).push(AccessRule {
            pattern: pattern.into(),
            access,
        });
        self
    }

    pub fn access_for(&self, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(|rule| rule.access)
            .unwrap_or(self.default)
    }

    /// Decide whether `identity` may reach `path`
    pub fn check(&self, path: &str, identity: Option<&AuthContext>) -> Result<(), AuthError> {
        match (self.access_for(path), identity) {
            (Access::Public, _) => Ok(()),
            (_, None) => Err(AuthError::MissingAuthorization),
            (Access::Authenticated, Some(_)) => Ok(()),
            (Access::Role(role), Some(ctx)) if ctx.has_role(role) => Ok(()),
            (Access::Role(_), Some(_)) => Err(AuthError::InsufficientRole),
        }
    }
}

/// Policy enforcement middleware; must run inside the gatekeeper.
pub async fn enforce_access(
    State(policy): State<AccessPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if let Err(e) = policy.check(path, request.extensions().get::<AuthContext>()) {
        let subject = request
            .extensions()
            .get::<AuthContext>()
            .map(|ctx| ctx.subject.as_str())
            .unwrap_or("-");
        tracing::warn!(path = %path, subject = %subject, code = e.error_code(), "Access denied");
        return e.into_response();
    }

    next.run(request).await
}
