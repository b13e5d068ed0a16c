//! PostgreSQL session store
//!
//! Each session is one row whose `messages` column holds the message log as
//! a JSONB array. Appends are a single `UPDATE ... messages || $2`
//! statement, so concurrent appends to one row serialize on its row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::SessionStore;
use crate::domain::entities::{Message, MessageLog, Session, SessionId};
use crate::domain::error::SessionError;

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    owner: String,
    name: String,
    model: String,
    created_at: DateTime<Utc>,
    messages: Json<MessageLog>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id.into(),
            owner: row.owner,
            name: row.name,
            model: row.model,
            created_at: row.created_at,
            messages: row.messages.0,
        }
    }
}

fn db_error(operation: &'static str, id: Option<SessionId>) -> impl Fn(sqlx::Error) -> SessionError {
    move |e| {
        tracing::error!(error = %e, session_id = ?id.map(|i| i.to_string()), operation, "Session query failed");
        SessionError::from(e)
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: Session) -> Result<Session, SessionError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, owner, name, model, created_at, messages)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner, name, model, created_at, messages
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(&session.owner)
        .bind(&session.name)
        .bind(&session.model)
        .bind(session.created_at)
        .bind(Json(&session.messages))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("insert", Some(session.id)))?;

        Ok(row.into())
    }

    async fn find(&self, id: SessionId) -> Result<Option<Session>, SessionError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, owner, name, model, created_at, messages
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find", Some(id)))?;

        Ok(row.map(Into::into))
    }

    async fn append_messages(
        &self,
        id: SessionId,
        messages: Vec<Message>,
    ) -> Result<Option<Session>, SessionError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE sessions
            SET messages = messages || $2::jsonb
            WHERE id = $1
            RETURNING id, owner, name, model, created_at, messages
            "#,
        )
        .bind(id.as_uuid())
        .bind(Json(&messages))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("append_messages", Some(id)))?;

        Ok(row.map(Into::into))
    }

    async fn rename(&self, id: SessionId, name: String) -> Result<Option<Session>, SessionError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE sessions
            SET name = $2
            WHERE id = $1
            RETURNING id, owner, name, model, created_at, messages
            "#,
        )
        .bind(id.as_uuid())
        .bind(&name)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("rename", Some(id)))?;

        Ok(row.map(Into::into))
    }

    async fn delete(&self, id: SessionId) -> Result<bool, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete", Some(id)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Session>, SessionError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, owner, name, model, created_at, messages
            FROM sessions
            WHERE owner = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_by_owner", None))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_all(&self) -> Result<Vec<Session>, SessionError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, owner, name, model, created_at, messages
            FROM sessions
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list_all", None))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
