//! Authorization context for authenticated users

use chrono::{DateTime, Utc};

use crate::types::AuthRole;

/// Verified identity attached to a request by the gatekeeper.
///
/// Never persisted; downstream handlers read it through the
/// [`AuthUser`](crate::AuthUser) extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub subject: String,
    pub roles: Vec<AuthRole>,
    pub expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn new(subject: impl Into<String>, roles: Vec<AuthRole>, expires_at: DateTime<Utc>) -> Self {
        Self {
            subject: subject.into(),
            roles,
            expires_at,
        }
    }

    pub fn has_role(&self, role: AuthRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(AuthRole::Admin)
    }

    /// Whether this identity is the owner named by `owner`
    pub fn owns(&self, owner: &str) -> bool {
        self.subject == owner
    }
}
