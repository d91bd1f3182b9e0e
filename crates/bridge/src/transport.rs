//! Legacy MCP SSE transport: one event stream per session, requests posted
//! separately and answered on the stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use futures::{stream, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, warn, Level};
use uuid::Uuid;

use crate::protocol::{JsonRpcResponse, McpHandler, PARSE_ERROR};

type Sessions = Arc<DashMap<String, mpsc::Sender<Event>>>;

#[derive(Clone)]
pub struct BridgeState {
    handler: Arc<McpHandler>,
    sessions: Sessions,
    message_path: String,
}

pub fn build_router(handler: Arc<McpHandler>, sse_path: &str, message_path: &str) -> Router {
    let state = BridgeState { handler, sessions: Arc::new(DashMap::new()), message_path: message_path.to_string() };
    Router::new()
        .route(sse_path, get(open_session))
        .route(message_path, post(post_message))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Removes the session once its stream is dropped.
struct SessionGuard {
    id: String,
    sessions: Sessions,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        info!(session_id = %self.id, "session closed");
    }
}

async fn open_session(State(state): State<BridgeState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel::<Event>(32);
    state.sessions.insert(id.clone(), tx);
    info!(session_id = %id, "session opened");

    let endpoint = Event::default().event("endpoint").data(format!("{}?session_id={}", state.message_path, id));
    let guard = SessionGuard { id, sessions: state.sessions.clone() };
    let events = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv().await.map(|ev| (Ok(ev), (rx, guard)))
    });

    Sse::new(stream::once(async move { Ok(endpoint) }).chain(events)).keep_alive(KeepAlive::default())
}

async fn post_message(
    State(state): State<BridgeState>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let Some(session_id) = query.get("session_id") else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };
    let Some(tx) = state.sessions.get(session_id).map(|s| s.value().clone()) else {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };

    let msg: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(%session_id, error = %e, "unparseable message");
            let resp = JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("parse error: {e}"));
            send(&tx, &resp).await;
            return (StatusCode::BAD_REQUEST, "Could not parse message").into_response();
        }
    };

    let handler = state.handler.clone();
    let session_id = session_id.clone();
    tokio::spawn(async move {
        if let Some(resp) = handler.handle_value(msg).await {
            debug!(%session_id, "sending response");
            send(&tx, &resp).await;
        }
    });
    (StatusCode::ACCEPTED, "Accepted").into_response()
}

async fn send(tx: &mpsc::Sender<Event>, resp: &JsonRpcResponse) {
    let data = match serde_json::to_string(resp) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "failed to encode response");
            return;
        }
    };
    if tx.send(Event::default().event("message").data(data)).await.is_err() {
        debug!("session stream already closed");
    }
}
