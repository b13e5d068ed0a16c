//! Authentication and authorization integration tests
//!
//! The gatekeeper never rejects a request itself; the access policy decides
//! whether an unauthenticated request may reach its route.

use axum::http::{Method, StatusCode};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Duration;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use tower::ServiceExt;

use banter_auth::{issue_token, AuthConfig};

use crate::common::{anonymous_request, authed_request, body_text, parse_body, TestApp, TEST_SECRET};

mod test_public_routes {
    use super::*;

    #[tokio::test]
    async fn test_health_without_token() {
        let app = TestApp::new();

        let resp = app
            .router()
            .oneshot(anonymous_request(Method::GET, "/health", None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "OK");
    }

    #[tokio::test]
    async fn test_banner_with_invalid_token_still_served() {
        let app = TestApp::new();

        let resp = app
            .router()
            .oneshot(authed_request(Method::GET, "/", "not-a-jwt", None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.starts_with("Banter API"));
    }
}

mod test_jwt_validation {
    use super::*;

    async fn assert_unauthorized(app: &TestApp, token: &str) {
        let resp = app
            .router()
            .oneshot(authed_request(Method::GET, "/api/v1/sessions", token, None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = parse_body(resp).await;
        assert_eq!(body["error"]["code"], "MISSING_AUTHORIZATION");
        assert_eq!(body["error"]["path"], "/api/v1/sessions");
    }

    #[tokio::test]
    async fn test_valid_token_authenticates() {
        let app = TestApp::new();
        let token = app.token("alice");

        let resp = app
            .router()
            .oneshot(authed_request(Method::GET, "/api/v1/sessions", &token, None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(parse_body(resp).await, json!([]));
    }

    #[tokio::test]
    async fn test_missing_authorization_header() {
        let app = TestApp::new();

        let resp = app
            .router()
            .oneshot(anonymous_request(Method::GET, "/api/v1/sessions", None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = parse_body(resp).await;
        assert_eq!(body["error"]["code"], "MISSING_AUTHORIZATION");
        assert_eq!(body["error"]["path"], "/api/v1/sessions");
    }

    #[tokio::test]
    async fn test_garbage_token() {
        assert_unauthorized(&TestApp::new(), "garbage").await;
    }

    #[tokio::test]
    async fn test_expired_token() {
        let app = TestApp::new();
        let token = issue_token("alice", &app.auth_config, Duration::seconds(-60)).unwrap();
        assert_unauthorized(&app, &token).await;
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret() {
        let app = TestApp::new();
        let other = AuthConfig::new("another-secret-that-is-also-32-bytes-long", None).unwrap();
        let token = issue_token("alice", &other, Duration::hours(1)).unwrap();
        assert_unauthorized(&app, &token).await;
    }

    #[tokio::test]
    async fn test_tampered_subject() {
        let app = TestApp::new();
        let token = app.token("alice");

        let parts: Vec<&str> = token.split('.').collect();
        let mut claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims["sub"] = json!("root");
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], payload, parts[2]);

        assert_unauthorized(&app, &forged).await;
    }

    #[tokio::test]
    async fn test_token_without_subject() {
        let app = TestApp::new();
        let exp = (chrono::Utc::now() + Duration::hours(1)).timestamp();
        let token = encode(
            &Header::default(),
            &json!({ "exp": exp }),
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert_unauthorized(&app, &token).await;
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let app = TestApp::new();
        let token = app.token("mallory");
        assert_unauthorized(&app, &token).await;
    }

    #[tokio::test]
    async fn test_removed_user_loses_access() {
        let app = TestApp::new();
        let token = app.token("bob");
        app.directory.remove("bob");
        assert_unauthorized(&app, &token).await;
    }
}

mod test_admin_routes {
    use super::*;

    #[tokio::test]
    async fn test_user_is_forbidden() {
        let app = TestApp::new();
        let token = app.token("alice");

        let resp = app
            .router()
            .oneshot(authed_request(Method::GET, "/api/v1/admins/sessions", &token, None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = parse_body(resp).await;
        assert_eq!(body["error"]["code"], "INSUFFICIENT_ROLE");
        assert_eq!(body["error"]["path"], "/api/v1/admins/sessions");
    }

    #[tokio::test]
    async fn test_admin_lists_every_session() {
        let app = TestApp::new();
        app.create_session("alice", "Alice chat").await;
        app.create_session("bob", "Bob chat").await;
        let token = app.token("root");

        let resp = app
            .router()
            .oneshot(authed_request(Method::GET, "/api/v1/admins/sessions", &token, None))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = parse_body(resp).await;
        let owners: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["owner"].as_str().unwrap())
            .collect();
        assert_eq!(owners.len(), 2);
        assert!(owners.contains(&"alice"));
        assert!(owners.contains(&"bob"));
    }
}
