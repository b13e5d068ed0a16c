//! Chat pipeline integration tests
//!
//! Drive `POST /api/v1/chat/{session_id}` end to end with the mock provider
//! and check both the streamed events and what was persisted.

use std::time::Duration;

use axum::http::{header::CONTENT_TYPE, Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use banter_llm::{LlmError, LlmRole, MockReply};
use banter_sessions::{ChatSettings, MessageRole};

use crate::common::{
    anonymous_request, authed_request, parse_body, parse_sse, streamed_text, TestApp,
};

fn chat_uri(id: impl std::fmt::Display) -> String {
    format!("/api/v1/chat/{}", id)
}

mod test_successful_turns {
    use super::*;

    #[tokio::test]
    async fn test_fragments_stream_and_turn_is_persisted() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Chat").await;
        app.llm.push_reply(MockReply::fragments(["Hel", "lo!"]));
        let token = app.token("alice");

        let resp = app
            .router()
            .oneshot(authed_request(
                Method::POST,
                &chat_uri(session.id),
                &token,
                Some(json!({"prompt": "Hello"})),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let events = parse_sse(resp).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].data["content"], "Hel");
        assert_eq!(events[1].data["content"], "lo!");
        assert_eq!(events[2].event, "done");

        let stored = app.reload(&session).await;
        let messages = stored.messages.as_slice();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "Hello!");
        assert!(messages[1].timestamp >= messages[0].timestamp);
    }

    #[tokio::test]
    async fn test_history_is_sent_on_the_next_turn() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Chat").await;
        let token = app.token("alice");

        for prompt in ["first", "second"] {
            let resp = app
                .router()
                .oneshot(authed_request(
                    Method::POST,
                    &chat_uri(session.id),
                    &token,
                    Some(json!({ "prompt": prompt })),
                ))
                .await
                .unwrap();
            let events = parse_sse(resp).await;
            assert_eq!(streamed_text(&events), format!("Mock response to: {prompt}"));
        }

        let request = app.llm.last_request().unwrap();
        let sent: Vec<(LlmRole, &str)> = request
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            sent,
            vec![
                (LlmRole::User, "first"),
                (LlmRole::Assistant, "Mock response to: first"),
                (LlmRole::User, "second"),
            ]
        );
        assert_eq!(request.model, "gpt-test");
        assert_eq!(app.reload(&session).await.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_prompt_is_an_empty_turn() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Chat").await;
        app.llm.push_reply(MockReply::fragments(["ok"]));
        let token = app.token("alice");

        let resp = app
            .router()
            .oneshot(authed_request(
                Method::POST,
                &chat_uri(session.id),
                &token,
                Some(json!({})),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        parse_sse(resp).await;

        let stored = app.reload(&session).await;
        assert_eq!(stored.messages.as_slice()[0].content, "");
        assert_eq!(stored.messages.as_slice()[1].content, "ok");
    }

    #[tokio::test]
    async fn test_system_prompt_reaches_provider_but_is_not_stored() {
        let app = TestApp::with_settings(ChatSettings {
            system_prompt: Some("Be brief.".to_string()),
            ..ChatSettings::default()
        });
        let session = app.create_session("alice", "Chat").await;
        app.llm.push_reply(MockReply::fragments(["Sure."]));
        let token = app.token("alice");

        let resp = app
            .router()
            .oneshot(authed_request(
                Method::POST,
                &chat_uri(session.id),
                &token,
                Some(json!({"prompt": "Help"})),
            ))
            .await
            .unwrap();
        parse_sse(resp).await;

        let request = app.llm.last_request().unwrap();
        assert_eq!(request.system_prompt.as_deref(), Some("Be brief."));

        let stored = app.reload(&session).await;
        assert_eq!(stored.messages.len(), 2);
        assert!(stored
            .messages
            .iter()
            .all(|m| m.role != MessageRole::System));
    }

    #[tokio::test]
    async fn test_fragment_with_line_breaks_survives_framing() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Chat").await;
        app.llm
            .push_reply(MockReply::fragments(["line one\n", "\nline two"]));
        let token = app.token("alice");

        let resp = app
            .router()
            .oneshot(authed_request(
                Method::POST,
                &chat_uri(session.id),
                &token,
                Some(json!({"prompt": "poem"})),
            ))
            .await
            .unwrap();

        let events = parse_sse(resp).await;
        assert_eq!(streamed_text(&events), "line one\n\nline two");
        assert_eq!(
            app.reload(&session).await.messages.as_slice()[1].content,
            "line one\n\nline two"
        );
    }
}

mod test_rejected_requests {
    use super::*;

    #[tokio::test]
    async fn test_unparseable_session_id_is_not_found() {
        let app = TestApp::new();
        let token = app.token("alice");

        let resp = app
            .router()
            .oneshot(authed_request(
                Method::POST,
                "/api/v1/chat/deadbeef",
                &token,
                Some(json!({"prompt": "Hello"})),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = parse_body(resp).await;
        assert_eq!(body["error"]["code"], "SESSION_NOT_FOUND");
        assert_eq!(body["error"]["path"], "/api/v1/chat/deadbeef");
        assert_eq!(app.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_foreign_session_is_forbidden_without_provider_call() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Private").await;
        let token = app.token("bob");

        let resp = app
            .router()
            .oneshot(authed_request(
                Method::POST,
                &chat_uri(session.id),
                &token,
                Some(json!({"prompt": "Hello"})),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(parse_body(resp).await["error"]["code"], "SESSION_ACCESS_DENIED");
        assert_eq!(app.llm.calls(), 0);
        assert!(app.reload(&session).await.messages.is_empty());
    }

    #[tokio::test]
    async fn test_unauthenticated_chat() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Chat").await;

        let resp = app
            .router()
            .oneshot(anonymous_request(
                Method::POST,
                &chat_uri(session.id),
                Some(json!({"prompt": "Hello"})),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_prompt_too_long() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Chat").await;
        let token = app.token("alice");

        let resp = app
            .router()
            .oneshot(authed_request(
                Method::POST,
                &chat_uri(session.id),
                &token,
                Some(json!({ "prompt": "x".repeat(5001) })),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_body(resp).await["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(app.llm.calls(), 0);
    }
}

mod test_provider_failures {
    use super::*;

    async fn post_chat(app: &TestApp, id: impl std::fmt::Display) -> axum::http::Response<axum::body::Body> {
        let token = app.token("alice");
        app.router()
            .oneshot(authed_request(
                Method::POST,
                &chat_uri(id),
                &token,
                Some(json!({"prompt": "Hello"})),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unavailable_before_first_fragment_is_502() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Chat").await;
        app.llm
            .push_reply(MockReply::Fail(LlmError::Unavailable("connection refused".to_string())));

        let resp = post_chat(&app, session.id).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body = parse_body(resp).await;
        assert_eq!(body["error"]["code"], "PROVIDER_UNAVAILABLE");
        assert_eq!(body["error"]["path"], chat_uri(session.id));
        assert!(!body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("connection refused"));
        assert!(app.reload(&session).await.messages.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_is_502() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Chat").await;
        app.llm
            .push_reply(MockReply::Fail(LlmError::Rejected("unknown model".to_string())));

        let resp = post_chat(&app, session.id).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(parse_body(resp).await["error"]["code"], "PROVIDER_REJECTED");
        assert!(app.reload(&session).await.messages.is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_ends_with_error_event() {
        let app = TestApp::new();
        let session = app.create_session("alice", "Chat").await;
        app.llm.push_reply(MockReply::FailAfter(
            vec!["Hel".to_string()],
            LlmError::Unavailable("reset".to_string()),
        ));

        let resp = post_chat(&app, session.id).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let events = parse_sse(resp).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data["content"], "Hel");
        assert_eq!(events[1].event, "error");
        assert_eq!(events[1].data["error"]["code"], "PROVIDER_UNAVAILABLE");
        assert_eq!(events[1].data["error"]["path"], chat_uri(session.id));

        assert!(app.reload(&session).await.messages.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_provider_times_out_with_504() {
        let app = TestApp::with_settings(ChatSettings {
            provider_timeout: Duration::from_millis(50),
            ..ChatSettings::default()
        });
        let session = app.create_session("alice", "Chat").await;
        app.llm.push_reply(MockReply::Stall(Vec::new()));

        let resp = post_chat(&app, session.id).await;

        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(parse_body(resp).await["error"]["code"], "PROVIDER_TIMEOUT");
        assert!(app.reload(&session).await.messages.is_empty());
    }

    #[tokio::test]
    async fn test_stall_after_fragment_times_out_in_stream() {
        let app = TestApp::with_settings(ChatSettings {
            provider_timeout: Duration::from_millis(50),
            ..ChatSettings::default()
        });
        let session = app.create_session("alice", "Chat").await;
        app.llm.push_reply(MockReply::Stall(vec!["par".to_string()]));

        let resp = post_chat(&app, session.id).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let events = parse_sse(resp).await;
        assert_eq!(streamed_text(&events), "par");
        let last = events.last().unwrap();
        assert_eq!(last.event, "error");
        assert_eq!(last.data["error"]["code"], "PROVIDER_TIMEOUT");

        assert!(app.reload(&session).await.messages.is_empty());
    }
}

mod test_concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_turns_keep_pairs_together() {
        const TURNS: usize = 12;

        let app = TestApp::new();
        let session = app.create_session("alice", "Busy").await;
        let token = app.token("alice");
        let router = app.router();

        let mut handles = Vec::new();
        for i in 0..TURNS {
            let router = router.clone();
            let req = authed_request(
                Method::POST,
                &chat_uri(session.id),
                &token,
                Some(json!({ "prompt": format!("prompt-{i}") })),
            );
            handles.push(tokio::spawn(async move {
                let resp = router.oneshot(req).await.unwrap();
                assert_eq!(resp.status(), StatusCode::OK);
                parse_sse(resp).await
            }));
        }
        for handle in handles {
            let events = handle.await.unwrap();
            assert_eq!(events.last().unwrap().event, "done");
        }

        let stored = app.reload(&session).await;
        let messages = stored.messages.as_slice();
        assert_eq!(messages.len(), 2 * TURNS);
        for pair in messages.chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1].role, MessageRole::Assistant);
            assert_eq!(pair[1].content, format!("Mock response to: {}", pair[0].content));
        }
    }
}
