//! Legacy MCP SSE transport.
//!
//! Older MCP clients connect with `GET /sse`, receive an `endpoint` event
//! naming `/messages?sessionId=<id>`, and then `POST` JSON-RPC messages
//! there. Server-to-client messages flow back over the event stream as
//! `message` events.
//!
//! Each session runs its own [`McpBridge`] service over a pair of channels.
//! The registry maps session ids to the client-to-server sender; it is
//! updated when a stream opens, when the stream is dropped, and on
//! shutdown.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::stream::{self, Stream, StreamExt};
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::ServiceExt;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::mcp::McpBridge;

/// Path clients post messages to.
pub const MESSAGES_PATH: &str = "/messages";

/// Live SSE sessions keyed by session id.
#[derive(Clone, Default)]
pub struct SseSessions {
    inner: Arc<RwLock<HashMap<String, UnboundedSender<ClientJsonRpcMessage>>>>,
}

impl SseSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: String, tx: UnboundedSender<ClientJsonRpcMessage>) {
        self.inner.write().await.insert(id, tx);
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    pub async fn sender(&self, id: &str) -> Option<UnboundedSender<ClientJsonRpcMessage>> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Drop every session. Each session's service sees its input end and
    /// exits, which in turn ends its event stream.
    pub async fn close_all(&self) {
        let mut sessions = self.inner.write().await;
        let count = sessions.len();
        sessions.clear();
        if count > 0 {
            tracing::info!(sessions = count, "closed SSE sessions");
        }
    }
}

/// Removes its session from the registry when the event stream is dropped.
struct SessionGuard {
    id: String,
    sessions: SseSessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let id = std::mem::take(&mut self.id);
        let sessions = self.sessions.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if sessions.remove(&id).await {
                    tracing::info!(session = %id, "SSE connection closed");
                }
            });
        }
    }
}

/// State shared by the SSE handlers.
#[derive(Clone)]
pub struct SseState {
    pub bridge: McpBridge,
    pub sessions: SseSessions,
}

fn endpoint_event(session_id: &str) -> Event {
    Event::default()
        .event("endpoint")
        .data(format!("{}?sessionId={}", MESSAGES_PATH, session_id))
}

fn message_event(message: &ServerJsonRpcMessage) -> Event {
    match serde_json::to_string(message) {
        Ok(json) => Event::default().event("message").data(json),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode server message");
            Event::default().comment("encode error")
        }
    }
}

/// `GET /sse`: open a session and stream server messages.
pub async fn handle_sse(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().to_string();

    let (client_tx, client_rx) = mpsc::unbounded::<ClientJsonRpcMessage>();
    let (server_tx, server_rx) = mpsc::unbounded::<ServerJsonRpcMessage>();

    state.sessions.insert(session_id.clone(), client_tx).await;
    tracing::info!(session = %session_id, "SSE session established");

    let bridge = state.bridge.clone();
    let service_sessions = state.sessions.clone();
    let service_id = session_id.clone();
    tokio::spawn(async move {
        match bridge.serve((server_tx, client_rx)).await {
            Ok(running) => {
                if let Err(e) = running.waiting().await {
                    tracing::warn!(session = %service_id, error = %e, "SSE session task failed");
                }
            }
            Err(e) => {
                tracing::warn!(session = %service_id, error = %e, "SSE session failed to initialize");
            }
        }
        service_sessions.remove(&service_id).await;
        tracing::info!(session = %service_id, "SSE session closed");
    });

    let guard = SessionGuard {
        id: session_id.clone(),
        sessions: state.sessions.clone(),
    };
    let messages = stream::unfold((server_rx, guard), |(mut rx, guard)| async move {
        rx.next()
            .await
            .map(|message| (Ok(message_event(&message)), (rx, guard)))
    });
    let events = stream::once(async move { Ok(endpoint_event(&session_id)) }).chain(messages);

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// `POST /messages?sessionId=`: forward one JSON-RPC message to a session.
pub async fn handle_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| !id.is_empty()) else {
        tracing::warn!("SSE message without sessionId");
        return error_json(StatusCode::BAD_REQUEST, "Missing sessionId query parameter");
    };

    let Some(tx) = state.sessions.sender(&session_id).await else {
        tracing::warn!(session = %session_id, "no SSE session found");
        return error_json(StatusCode::NOT_FOUND, "Session not found");
    };

    let message: ClientJsonRpcMessage = match serde_json::from_value(body) {
        Ok(message) => message,
        Err(e) => {
            return error_json(
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON-RPC message: {}", e),
            )
        }
    };

    if tx.unbounded_send(message).is_err() {
        state.sessions.remove(&session_id).await;
        return error_json(StatusCode::NOT_FOUND, "Session not found");
    }

    StatusCode::ACCEPTED.into_response()
}
