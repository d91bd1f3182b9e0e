//! Client for the SSE transport, used by the chat agent and the tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::StreamExt;
use reqwest::Url;
use serde_json::{json, Map, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::BridgeError;
use crate::protocol::{CallToolResult, JsonRpcRequest, JsonRpcResponse, ToolInfo, PROTOCOL_VERSION};
use crate::sse::SseDecoder;

type Pending = Arc<DashMap<u64, oneshot::Sender<JsonRpcResponse>>>;

pub struct McpClient {
    http: reqwest::Client,
    endpoint: Url,
    pending: Pending,
    next_id: AtomicU64,
    timeout: Duration,
    reader: JoinHandle<()>,
}

impl McpClient {
    /// Open the event stream and wait for the server to announce where
    /// requests should be posted.
    pub async fn connect(sse_url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let base = Url::parse(sse_url).map_err(|e| BridgeError::Url(format!("{sse_url}: {e}")))?;
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;
        let resp = http
            .get(base.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        let pending: Pending = Arc::new(DashMap::new());
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader = tokio::spawn(read_events(resp, endpoint_tx, pending.clone()));

        let endpoint = match tokio::time::timeout(timeout, endpoint_rx).await {
            Ok(Ok(path)) => base.join(&path).map_err(|e| BridgeError::Url(format!("{path}: {e}"))),
            Ok(Err(_)) => Err(BridgeError::Closed),
            Err(_) => Err(BridgeError::Timeout("waiting for the endpoint event".into())),
        };
        let endpoint = match endpoint {
            Ok(url) => url,
            Err(e) => {
                reader.abort();
                return Err(e);
            }
        };
        info!(%endpoint, "connected to tool bridge");

        Ok(Self { http, endpoint, pending, next_id: AtomicU64::new(1), timeout, reader })
    }

    /// Send a request and wait for its response on the event stream.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        if let Err(e) = self.post(&JsonRpcRequest::new(Some(json!(id)), method, params)).await {
            self.pending.remove(&id);
            return Err(e);
        }

        let resp = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => return Err(BridgeError::Closed),
            Err(_) => {
                self.pending.remove(&id);
                return Err(BridgeError::Timeout(format!("waiting for {method} response")));
            }
        };
        if let Some(err) = resp.error {
            return Err(BridgeError::Rpc { code: err.code, message: err.message });
        }
        Ok(resp.result.unwrap_or(Value::Null))
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), BridgeError> {
        self.post(&JsonRpcRequest::new(None, method, params)).await
    }

    /// Handshake. Returns the server's `initialize` result.
    pub async fn initialize(&self) -> Result<Value, BridgeError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "userbridge-chat", "version": env!("CARGO_PKG_VERSION")}
        });
        let result = self.request("initialize", Some(params)).await?;
        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>, BridgeError> {
        let result = self.request("tools/list", None).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        serde_json::from_value(tools).map_err(|e| BridgeError::Rpc { code: 0, message: format!("bad tools/list result: {e}") })
    }

    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult, BridgeError> {
        let result = self.request("tools/call", Some(json!({"name": name, "arguments": arguments}))).await?;
        serde_json::from_value(result).map_err(|e| BridgeError::Rpc { code: 0, message: format!("bad tools/call result: {e}") })
    }

    async fn post(&self, req: &JsonRpcRequest) -> Result<(), BridgeError> {
        self.http
            .post(self.endpoint.clone())
            .json(req)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_events(resp: reqwest::Response, endpoint_tx: oneshot::Sender<String>, pending: Pending) {
    let mut stream = Box::pin(resp.bytes_stream());
    let mut decoder = SseDecoder::new();
    let mut endpoint_tx = Some(endpoint_tx);

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "event stream failed");
                break;
            }
        };
        for ev in decoder.feed(&chunk) {
            match ev.event.as_str() {
                "endpoint" => {
                    if let Some(tx) = endpoint_tx.take() {
                        let _ = tx.send(ev.data);
                    }
                }
                "message" => match serde_json::from_str::<JsonRpcResponse>(&ev.data) {
                    Ok(resp) => {
                        let waiter = resp.id.as_u64().and_then(|id| pending.remove(&id)).map(|(_, tx)| tx);
                        match waiter {
                            Some(tx) => {
                                let _ = tx.send(resp);
                            }
                            None => debug!(id = %resp.id, "response with no waiter"),
                        }
                    }
                    Err(e) => debug!(error = %e, "ignoring non-response message"),
                },
                other => debug!(event = %other, "ignoring event"),
            }
        }
    }
    // wake every waiter with a closed channel
    pending.clear();
}
