use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::catalog::{RouteBinding, Tool};
use crate::errors::BridgeError;

/// Raw HTTP outcome of a tool call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutput {
    pub status: u16,
    pub body: String,
}

impl ToolOutput {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes a tool against whatever backs it.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, tool: &Tool, args: Map<String, Value>) -> Result<ToolOutput, BridgeError>;
}

/// Forwards tool calls to the HTTP API the catalog was built from.
pub struct HttpToolInvoker {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpToolInvoker {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let base_url = Url::parse(base_url).map_err(|e| BridgeError::Url(format!("{base_url}: {e}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ToolInvoker for HttpToolInvoker {
    async fn invoke(&self, tool: &Tool, args: Map<String, Value>) -> Result<ToolOutput, BridgeError> {
        let (url, body) = build_request(&self.base_url, &tool.route, args)?;
        let method = Method::from_bytes(tool.route.method.as_bytes())
            .map_err(|_| BridgeError::Catalog(format!("unsupported method {}", tool.route.method)))?;
        info!(tool = %tool.name, %method, %url, "forwarding tool call");

        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!(tool = %tool.name, status, "tool call finished");
        Ok(ToolOutput { status, body })
    }
}

/// Resolve the request URL and JSON body for one call.
///
/// Path parameters are required and percent-encoded into their segment;
/// query parameters are added when present and non-null; everything left is
/// the body when the route takes one.
pub fn build_request(
    base: &Url,
    route: &RouteBinding,
    mut args: Map<String, Value>,
) -> Result<(Url, Option<Value>), BridgeError> {
    let mut segments = Vec::new();
    for seg in route.path.trim_start_matches('/').split('/') {
        match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => {
                let value = args
                    .remove(name)
                    .and_then(|v| scalar_to_string(&v))
                    .ok_or_else(|| BridgeError::InvalidArguments(format!("missing required argument '{name}'")))?;
                if value.is_empty() {
                    return Err(BridgeError::InvalidArguments(format!("argument '{name}' must not be empty")));
                }
                segments.push(value);
            }
            None => segments.push(seg.to_string()),
        }
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| BridgeError::Url(format!("{base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments.iter().filter(|s| !s.is_empty()));

    let query: Vec<(String, String)> = route
        .query_params
        .iter()
        .filter_map(|name| args.remove(name).and_then(|v| scalar_to_string(&v)).map(|v| (name.clone(), v)))
        .collect();
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    let body = route.has_body.then(|| Value::Object(args));
    Ok((url, body))
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
