//! SSE transport
//!
//! A client opens `GET /sse`, learns its message endpoint from the first
//! `endpoint` event, then posts JSON-RPC messages to
//! `/messages/?session_id=<id>`. Responses come back as `message` events.

use super::sessions::SessionManager;
use crate::mcp::dispatch::Dispatcher;
use crate::mcp::protocol::JsonRpcRequest;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive},
        IntoResponse, Response, Sse,
    },
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream, StreamExt as _};
use tracing::{debug, info, warn};

/// Removes the session when the event stream is dropped
struct SessionGuard {
    sessions: SessionManager,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let sessions = self.sessions.clone();
        let session_id = std::mem::take(&mut self.session_id);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if sessions.remove(&session_id).await {
                    info!("SSE client disconnected, session {} closed", session_id);
                }
            });
        }
    }
}

/// `GET /sse`
pub async fn sse_handler(
    State(dispatcher): State<Dispatcher>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let sessions = dispatcher.context().sessions.clone();
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let session_id = sessions.register(tx).await;
    info!("SSE client connected, session {}", session_id);

    let endpoint = SseEvent::default()
        .event("endpoint")
        .data(format!("/messages/?session_id={}", session_id));

    let guard = SessionGuard {
        sessions,
        session_id,
    };

    let messages = UnboundedReceiverStream::new(rx).map(move |message| {
        let _session = &guard;
        Ok::<_, Infallible>(SseEvent::default().event("message").data(message))
    });

    let stream = tokio_stream::iter([Ok(endpoint)]).chain(messages);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default)]
    session_id: Option<String>,
}

fn rejection(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `POST /messages/?session_id=<id>`
pub async fn messages_handler(
    State(dispatcher): State<Dispatcher>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| !id.is_empty()) else {
        return rejection(StatusCode::BAD_REQUEST, "session_id is required");
    };

    let sessions = &dispatcher.context().sessions;
    let Some(sender) = sessions.get(&session_id).await else {
        return rejection(StatusCode::NOT_FOUND, "Could not find session");
    };

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejected malformed message for session {}: {}", session_id, e);
            return rejection(StatusCode::BAD_REQUEST, "Could not parse message");
        }
    };

    sessions.touch(&session_id).await;

    let dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        let Some(response) = dispatcher.dispatch(request).await else {
            return;
        };
        match serde_json::to_string(&response) {
            Ok(message) => {
                if sender.send(message).is_err() {
                    warn!("Session {} closed before its response was sent", session_id);
                }
            }
            Err(e) => warn!("Failed to serialize response: {}", e),
        }
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
