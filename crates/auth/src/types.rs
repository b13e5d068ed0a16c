//! Auth read-model types
//!
//! Lightweight views of user rows carrying only what authentication and
//! authorization need.

use serde::Serialize;

/// Role granted to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthRole {
    User,
    Admin,
}

impl AuthRole {
    /// Parse a stored role name; unknown names yield `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(AuthRole::User),
            "ADMIN" => Some(AuthRole::Admin),
            _ => None,
        }
    }

    /// Parse a list of stored role names, dropping unknown entries
    pub fn parse_all<I, S>(names: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roles = Vec::new();
        for name in names {
            match Self::parse(name.as_ref()) {
                Some(role) if !roles.contains(&role) => roles.push(role),
                Some(_) => {}
                None => tracing::debug!(role = %name.as_ref(), "Ignoring unknown role"),
            }
        }
        roles
    }
}

impl std::fmt::Display for AuthRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthRole::User => write!(f, "USER"),
            AuthRole::Admin => write!(f, "ADMIN"),
        }
    }
}

/// User as seen by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub roles: Vec<AuthRole>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, roles: Vec<AuthRole>) -> Self {
        Self {
            username: username.into(),
            roles,
        }
    }
}
