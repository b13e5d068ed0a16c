//! User lookup collaborator
//!
//! The gatekeeper resolves a token subject to the user's current roles
//! through [`UserDirectory`]. Uses runtime `sqlx::query_as` (not macros).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::AuthError;
use crate::types::{AuthRole, UserRecord};

/// Lookup of users and their roles by username
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    roles: Vec<String>,
}

/// PostgreSQL-backed directory reading the `users` table
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT username, roles FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, username = %username, "Failed to load user");
                    AuthError::UserLoadError
                })?;

        Ok(row.map(|r| UserRecord::new(r.username, AuthRole::parse_all(&r.roles))))
    }
}

/// Directory held in memory, for tests and embedded use
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with_user(self, username: &str, roles: Vec<AuthRole>) -> Self {
        self.insert(UserRecord::new(username, roles));
        self
    }

    pub fn insert(&self, user: UserRecord) {
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users.insert(user.username.clone(), user);
    }

    pub fn remove(&self, username: &str) {
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users.remove(username);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, AuthError> {
        let users = self.users.read().map_err(|_| AuthError::UserLoadError)?;
        Ok(users.get(username).cloned())
    }
}
