//! PostgreSQL store tests
//!
//! Require a running database (`TEST_DATABASE_URL`); run with
//! `cargo test -- --ignored`.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;

use banter_auth::{AuthRole, PgUserDirectory, UserDirectory};
use banter_sessions::{Message, PgSessionStore, Session, SessionId, SessionStore};

use crate::common::test_database_url;

async fn pool() -> anyhow::Result<PgPool> {
    let pool = PgPool::connect(&test_database_url()).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    Ok(pool)
}

fn unique_owner(prefix: &str) -> String {
    format!("{prefix}-{}", SessionId::new())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_session_round_trip_and_append() {
    let pool = pool().await.unwrap();
    let store = PgSessionStore::new(pool);
    let owner = unique_owner("alice");

    let session = store
        .insert(Session::new(&owner, "Chat", "gpt-test").unwrap())
        .await
        .unwrap();
    assert_eq!(store.find(session.id).await.unwrap().unwrap().owner, owner);

    let now = Utc::now();
    let updated = store
        .append_messages(
            session.id,
            vec![Message::user("Hello", now), Message::assistant("Hello!", now)],
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.messages.len(), 2);
    assert_eq!(updated.messages.as_slice()[1].content, "Hello!");

    assert!(store
        .append_messages(SessionId::new(), vec![Message::user("x", now)])
        .await
        .unwrap()
        .is_none());

    assert!(store.delete(session.id).await.unwrap());
    assert!(store.find(session.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_concurrent_appends_do_not_lose_messages() {
    const TURNS: usize = 16;

    let pool = pool().await.unwrap();
    let store = Arc::new(PgSessionStore::new(pool));
    let session = store
        .insert(Session::new(&unique_owner("busy"), "Busy", "gpt-test").unwrap())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..TURNS {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let now = Utc::now();
            store
                .append_messages(
                    session.id,
                    vec![
                        Message::user(format!("q{i}"), now),
                        Message::assistant(format!("a{i}"), now),
                    ],
                )
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = store.find(session.id).await.unwrap().unwrap();
    assert_eq!(stored.messages.len(), 2 * TURNS);
    for pair in stored.messages.as_slice().chunks(2) {
        assert_eq!(pair[0].content[1..], pair[1].content[1..]);
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_user_directory_reads_roles() {
    let pool = pool().await.unwrap();
    let username = unique_owner("root");
    sqlx::query("INSERT INTO users (username, roles) VALUES ($1, $2)")
        .bind(&username)
        .bind(vec!["USER".to_string(), "ADMIN".to_string()])
        .execute(&pool)
        .await
        .unwrap();

    let directory = PgUserDirectory::new(pool);
    let user = directory.find_by_username(&username).await.unwrap().unwrap();
    assert!(user.roles.contains(&AuthRole::Admin));
    assert!(directory.find_by_username("nobody-here").await.unwrap().is_none());
}
