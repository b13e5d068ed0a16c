//! Chat handler
//!
//! Streams the assistant reply as server-sent events. Each fragment is a
//! `message` event with `{"content": ...}` data; the stream ends with a
//! `done` event, or an `error` event carrying the error envelope.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{OriginalUri, Path, State},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
};
use banter_auth::AuthUser;
use banter_common::ValidatedJson;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::api::middleware::SessionsState;
use crate::domain::error::SessionError;
use crate::service::parse_session_id;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Request for one chat turn
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ChatRequest {
    #[serde(default)]
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub prompt: Option<String>,
}

fn fragment_event(fragment: &str) -> Event {
    Event::default().data(json!({ "content": fragment }).to_string())
}

fn error_event(error: &SessionError, path: &str) -> Event {
    Event::default()
        .event("error")
        .data(error.envelope(path).to_string())
}

/// Run a chat turn against a session the caller owns
pub async fn chat(
    AuthUser(ctx): AuthUser,
    State(state): State<SessionsState>,
    OriginalUri(uri): OriginalUri,
    Path(session_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ChatRequest>,
) -> Result<Response, SessionError> {
    let id = parse_session_id(&session_id)?;
    let mut fragments = state.pipeline.handle(id, &ctx, req.prompt).await?;

    // A provider failure before any fragment still gets a plain status code
    let first = fragments.next().await;
    if let Some(Err(e)) = &first {
        if e.kind().is_provider() {
            return Err(e.clone());
        }
    }

    let path = uri.path().to_string();
    let events = async_stream::stream! {
        let mut next = first;
        loop {
            match next {
                Some(Ok(fragment)) => yield Ok::<_, Infallible>(fragment_event(&fragment)),
                Some(Err(e)) => {
                    e.log();
                    yield Ok(error_event(&e, &path));
                    break;
                }
                None => {
                    yield Ok(Event::default().event("done").data("{}"));
                    break;
                }
            }
            next = fragments.next().await;
        }
    };

    Ok(Sse::new(events)
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
        .into_response())
}
