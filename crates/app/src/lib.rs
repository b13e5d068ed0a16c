//! Banter application composition root
//!
//! Composes the domain routers with the request-path envelope, the
//! gatekeeper and the access policy into a single application.

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use banter_auth::{
    enforce_access, gatekeeper, Access, AccessPolicy, AuthBackend, AuthConfig, AuthConfigError,
    AuthRole, PgUserDirectory, UserDirectory,
};
use banter_common::{
    attach_request_path, config::Config, method_not_allowed_fallback, not_found_fallback,
    panic_response,
};
use banter_llm::{LlmConfig, LlmService, LlmServiceFactory};
use banter_sessions::{
    ChatPipeline, ChatSettings, PgSessionStore, SessionService, SessionStore, SessionsState,
};
use sqlx::PgPool;
use tower_http::catch_panic::CatchPanicLayer;

/// Everything the router needs, already wired
#[derive(Clone)]
pub struct AppDeps {
    pub auth: AuthBackend,
    pub policy: AccessPolicy,
    pub sessions: SessionsState,
}

impl AppDeps {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn SessionStore>,
        llm: Arc<dyn LlmService>,
        auth_config: AuthConfig,
        chat_settings: ChatSettings,
    ) -> Self {
        let sessions = SessionService::new(store);
        let pipeline = ChatPipeline::new(sessions.clone(), llm, chat_settings);

        Self {
            auth: AuthBackend::new(directory, auth_config),
            policy: app_policy(),
            sessions: SessionsState::new(sessions, pipeline),
        }
    }

    /// Wire PostgreSQL-backed stores and the configured completion provider
    pub fn from_config(
        config: &Config,
        auth_config: AuthConfig,
        llm_config: LlmConfig,
        pool: PgPool,
    ) -> anyhow::Result<Self> {
        let chat_settings = ChatSettings {
            system_prompt: config.chat_system_prompt.clone(),
            provider_timeout: llm_config.request_timeout,
        };
        let llm = LlmServiceFactory::create(llm_config)?;

        Ok(Self::new(
            Arc::new(PgUserDirectory::new(pool.clone())),
            Arc::new(PgSessionStore::new(pool)),
            llm,
            auth_config,
            chat_settings,
        ))
    }
}

/// Signing configuration from the environment; checked before any I/O at startup
pub fn auth_config_from(config: &Config) -> Result<AuthConfig, AuthConfigError> {
    AuthConfig::new(config.jwt_secret.clone(), config.jwt_issuer.clone())
}

/// Route access rules for the application
pub fn app_policy() -> AccessPolicy {
    AccessPolicy::new(Access::Authenticated)
        .rule("/", Access::Public)
        .rule("/health", Access::Public)
        .rule("/api/v1/admins/**", Access::Role(AuthRole::Admin))
}

/// Create the main application router with all routes and middleware
pub fn create_app(deps: AppDeps) -> Router {
    let routes = Router::new()
        .route("/health", get(health_check))
        .route("/", get(|| async { "Banter API v0.0.1-SNAPSHOT" }))
        .merge(banter_sessions::routes().with_state(deps.sessions));

    with_boundary(routes, deps.auth, deps.policy)
}

/// Wrap routes with fallbacks, panic recovery and the auth layers.
///
/// Layer order, outermost first: request-path envelope, panic recovery,
/// gatekeeper, access policy.
fn with_boundary(routes: Router, auth: AuthBackend, policy: AccessPolicy) -> Router {
    routes
        .fallback(not_found_fallback)
        .method_not_allowed_fallback(method_not_allowed_fallback)
        .layer(middleware::from_fn_with_state(policy, enforce_access))
        .layer(middleware::from_fn_with_state(auth, gatekeeper))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(attach_request_path))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
