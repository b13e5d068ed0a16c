//! Authentication for Banter
//!
//! Provides bearer-token verification, the gatekeeper middleware that
//! attaches a verified identity to each request, a declarative route
//! access policy and axum extractors reading the attached identity.

mod backend;
mod claims;
mod config;
mod context;
mod directory;
mod error;
mod extractors;
mod gatekeeper;
mod jwt;
mod policy;
mod types;

pub use backend::AuthBackend;
pub use claims::TokenClaims;
pub use config::{default_token_ttl, AuthConfig, AuthConfigError, MIN_SECRET_LENGTH};
pub use context::AuthContext;
pub use directory::{InMemoryUserDirectory, PgUserDirectory, UserDirectory};
pub use error::AuthError;
pub use extractors::{AdminUser, AuthUser};
pub use gatekeeper::{gatekeeper, resolve_identity};
pub use jwt::{extract_bearer_token, issue_token, validate_token};
pub use policy::{enforce_access, Access, AccessPolicy};
pub use types::{AuthRole, UserRecord};
