//! HTTP API for the Sessions domain

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::SessionsState;
