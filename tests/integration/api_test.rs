//! API endpoint integration tests
//!
//! Router-level scenarios: authentication, session CRUD, streaming chat and
//! (ignored by default) the PostgreSQL stores.

#![allow(dead_code)]

mod auth;
mod chat;
mod common;
mod postgres;
mod sessions;
