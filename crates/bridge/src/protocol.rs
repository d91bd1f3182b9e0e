//! JSON-RPC 2.0 message types and the MCP method dispatcher.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::catalog::{Tool, ToolCatalog};
use crate::errors::BridgeError;
use crate::invoker::ToolInvoker;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: Option<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self { jsonrpc: "2.0".into(), id, method: method.into(), params }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0".into(), id, result: Some(result), error: None }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message: message.into(), data: None }),
        }
    }
}

/// Tool as advertised by `tools/list`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl From<&Tool> for ToolInfo {
    fn from(tool: &Tool) -> Self {
        Self { name: tool.name.clone(), description: tool.description.clone(), input_schema: tool.input_schema.clone() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>, is_error: bool) -> Self {
        Self { content: vec![Content::Text { text: text.into() }], is_error }
    }

    /// All text content joined with newlines.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                Content::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// Answers MCP requests from the tool catalog.
pub struct McpHandler {
    catalog: Arc<ToolCatalog>,
    invoker: Arc<dyn ToolInvoker>,
    server_name: String,
}

impl McpHandler {
    pub fn new(catalog: Arc<ToolCatalog>, invoker: Arc<dyn ToolInvoker>) -> Self {
        Self { catalog, invoker, server_name: "userbridge".into() }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Handle one raw message. Notifications produce no response.
    pub async fn handle_value(&self, msg: Value) -> Option<JsonRpcResponse> {
        let id = msg.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(msg) {
            Ok(req) if req.jsonrpc == "2.0" => self.handle(req).await,
            Ok(_) => Some(JsonRpcResponse::error(id, INVALID_REQUEST, "jsonrpc must be \"2.0\"")),
            Err(e) => Some(JsonRpcResponse::error(id, INVALID_REQUEST, format!("invalid request: {e}"))),
        }
    }

    pub async fn handle(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = req.id else {
            debug!(method = %req.method, "notification");
            return None;
        };
        let outcome = match req.method.as_str() {
            "initialize" => Ok(self.initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools_result()),
            "tools/call" => self.call_tool(req.params).await,
            other => {
                warn!(method = %other, "unknown method");
                Err((METHOD_NOT_FOUND, format!("method not found: {other}")))
            }
        };
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        })
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": self.server_name, "version": env!("CARGO_PKG_VERSION")},
            "instructions": "Tools mirror the user API: save, fetch, list and delete user records by email, and multiply two numbers."
        })
    }

    fn list_tools_result(&self) -> Value {
        let tools: Vec<ToolInfo> = self.catalog.tools().iter().map(ToolInfo::from).collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, (i64, String)> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| (INVALID_PARAMS, format!("invalid tools/call params: {e}")))?;
        let result = match self.catalog.get(&params.name) {
            None => CallToolResult::text(format!("Unknown tool: {}", params.name), true),
            Some(tool) => {
                info!(tool = %tool.name, "tool call");
                match self.invoker.invoke(tool, params.arguments.unwrap_or_default()).await {
                    Ok(out) => {
                        let ok = out.is_success();
                        CallToolResult::text(out.body, !ok)
                    }
                    Err(BridgeError::InvalidArguments(msg)) => CallToolResult::text(msg, true),
                    Err(e) => {
                        warn!(tool = %tool.name, error = %e, "tool call failed");
                        CallToolResult::text(format!("Error calling tool {}: {e}", tool.name), true)
                    }
                }
            }
        };
        serde_json::to_value(result).map_err(|e| (INVALID_PARAMS, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RouteBinding;
    use crate::invoker::ToolOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records calls and answers with a fixed output.
    struct FakeInvoker {
        calls: Mutex<Vec<(String, Map<String, Value>)>>,
        reply: Result<ToolOutput, String>,
    }

    #[async_trait]
    impl ToolInvoker for FakeInvoker {
        async fn invoke(&self, tool: &Tool, args: Map<String, Value>) -> Result<ToolOutput, BridgeError> {
            self.calls.lock().unwrap().push((tool.name.clone(), args));
            self.reply.clone().map_err(BridgeError::InvalidArguments)
        }
    }

    fn handler(reply: Result<ToolOutput, String>) -> (McpHandler, Arc<FakeInvoker>) {
        let tool = Tool {
            name: "multiply".into(),
            description: "Multiply two numbers.".into(),
            input_schema: json!({"type": "object", "properties": {"a": {"type": "number"}, "b": {"type": "number"}}}),
            route: RouteBinding { method: "GET".into(), path: "/multiply".into(), ..Default::default() },
        };
        let invoker = Arc::new(FakeInvoker { calls: Mutex::new(Vec::new()), reply });
        (McpHandler::new(Arc::new(ToolCatalog::new(vec![tool])), invoker.clone()), invoker)
    }

    fn ok(body: &str) -> Result<ToolOutput, String> {
        Ok(ToolOutput { status: 200, body: body.into() })
    }

    #[tokio::test]
    async fn initialize_advertises_tools_capability() {
        let (h, _) = handler(ok(""));
        let resp = h.handle(JsonRpcRequest::new(Some(json!(1)), "initialize", Some(json!({})))).await.unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(resp.id, json!(1));
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let (h, _) = handler(ok(""));
        assert!(h.handle(JsonRpcRequest::new(None, "notifications/initialized", None)).await.is_none());
    }

    #[tokio::test]
    async fn tools_list_uses_camel_case_schema_key() {
        let (h, _) = handler(ok(""));
        let resp = h.handle(JsonRpcRequest::new(Some(json!("a")), "tools/list", None)).await.unwrap();
        let tools = &resp.result.unwrap()["tools"];
        assert_eq!(tools[0]["name"], "multiply");
        assert_eq!(tools[0]["inputSchema"]["properties"]["a"]["type"], "number");
    }

    #[tokio::test]
    async fn tools_call_forwards_arguments() {
        let (h, invoker) = handler(ok(r#"{"result":15.0}"#));
        let params = json!({"name": "multiply", "arguments": {"a": 3, "b": 5}});
        let resp = h.handle(JsonRpcRequest::new(Some(json!(7)), "tools/call", Some(params))).await.unwrap();
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.joined_text(), r#"{"result":15.0}"#);

        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "multiply");
        assert_eq!(calls[0].1.get("a"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn http_errors_become_error_results() {
        let (h, _) = handler(Ok(ToolOutput { status: 404, body: r#"{"error":"Not Found"}"#.into() }));
        let params = json!({"name": "multiply", "arguments": {}});
        let resp = h.handle(JsonRpcRequest::new(Some(json!(1)), "tools/call", Some(params))).await.unwrap();
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn bad_arguments_become_error_results() {
        let (h, _) = handler(Err("missing required argument 'email'".into()));
        let params = json!({"name": "multiply"});
        let resp = h.handle(JsonRpcRequest::new(Some(json!(1)), "tools/call", Some(params))).await.unwrap();
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error);
        assert_eq!(result.joined_text(), "missing required argument 'email'");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result_not_a_protocol_error() {
        let (h, invoker) = handler(ok(""));
        let params = json!({"name": "divide", "arguments": {}});
        let resp = h.handle(JsonRpcRequest::new(Some(json!(1)), "tools/call", Some(params))).await.unwrap();
        assert!(resp.error.is_none());
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error);
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn protocol_errors_carry_codes() {
        let (h, _) = handler(ok(""));
        let resp = h.handle(JsonRpcRequest::new(Some(json!(1)), "resources/list", None)).await.unwrap();
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);

        let resp = h.handle(JsonRpcRequest::new(Some(json!(2)), "tools/call", Some(json!({"arguments": {}})))).await.unwrap();
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);

        let resp = h.handle_value(json!({"jsonrpc": "2.0", "id": 3})).await.unwrap();
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
        assert_eq!(resp.id, json!(3));

        let resp = h.handle_value(json!({"jsonrpc": "1.0", "id": 4, "method": "ping"})).await.unwrap();
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let (h, _) = handler(ok(""));
        let resp = h.handle_value(json!({"jsonrpc": "2.0", "id": 9, "method": "ping"})).await.unwrap();
        assert_eq!(resp.result, Some(json!({})));
    }
}
