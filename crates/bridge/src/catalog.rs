//! Turn an OpenAPI document into a list of callable tools.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::errors::BridgeError;

const METHODS: [&str; 5] = ["get", "post", "put", "patch", "delete"];
const MAX_REF_DEPTH: usize = 8;

/// Where each tool argument goes when the tool is called.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteBinding {
    /// Upper-case HTTP method
    pub method: String,
    /// OpenAPI path template, e.g. `/user/{email}`
    pub path: String,
    pub path_params: Vec<String>,
    pub query_params: Vec<String>,
    /// Remaining arguments are sent as the JSON body
    pub has_body: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub route: RouteBinding,
}

#[derive(Clone, Debug, Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Fetch the document from a running API and build the catalog from it.
    pub async fn fetch(http: &reqwest::Client, url: &str) -> Result<Self, BridgeError> {
        let doc: Value = http.get(url).send().await?.error_for_status()?.json().await?;
        Self::from_openapi(&doc)
    }

    /// One tool per operation. The tool name is the operation id; path and
    /// query parameters plus the request body's properties become the tool's
    /// input schema.
    pub fn from_openapi(doc: &Value) -> Result<Self, BridgeError> {
        let paths = doc
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| BridgeError::Catalog("document has no paths object".into()))?;

        let mut tools = Vec::new();
        let mut seen = HashSet::new();
        for (path, item) in paths {
            let Some(item) = item.as_object() else { continue };
            let shared: Vec<Value> = item.get("parameters").and_then(Value::as_array).cloned().unwrap_or_default();
            for method in METHODS {
                let Some(op) = item.get(method) else { continue };
                let tool = build_tool(doc, path, method, op, &shared);
                if !seen.insert(tool.name.clone()) {
                    warn!(tool = %tool.name, %path, "duplicate operation name; keeping the first");
                    continue;
                }
                debug!(tool = %tool.name, method = %tool.route.method, %path, "tool registered");
                tools.push(tool);
            }
        }
        Ok(Self { tools })
    }
}

fn build_tool(doc: &Value, path: &str, method: &str, op: &Value, shared: &[Value]) -> Tool {
    let name = op
        .get("operationId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback_name(method, path));

    let mut properties = Map::new();
    let mut required: Vec<String> = Vec::new();
    let mut route = RouteBinding { method: method.to_ascii_uppercase(), path: path.to_string(), ..Default::default() };

    let own = op.get("parameters").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);
    for param in shared.iter().chain(own) {
        let param = inline_refs(doc, param, 0);
        let Some(pname) = param.get("name").and_then(Value::as_str) else { continue };
        let location = param.get("in").and_then(Value::as_str).unwrap_or("query");
        match location {
            "path" => route.path_params.push(pname.to_string()),
            "query" => route.query_params.push(pname.to_string()),
            // headers and cookies are not tool arguments
            _ => continue,
        }
        let mut schema = param.get("schema").cloned().unwrap_or_else(|| json!({"type": "string"}));
        if let (Some(obj), Some(desc)) = (schema.as_object_mut(), param.get("description")) {
            obj.entry("description").or_insert_with(|| desc.clone());
        }
        properties.insert(pname.to_string(), schema);
        // path parameters are always required
        if location == "path" || param.get("required").and_then(Value::as_bool).unwrap_or(false) {
            required.push(pname.to_string());
        }
    }

    if let Some(body) = op.get("requestBody") {
        let body = inline_refs(doc, body, 0);
        if let Some(schema) = body.pointer("/content/application~1json/schema") {
            route.has_body = true;
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (k, v) in props {
                    properties.insert(k.clone(), v.clone());
                }
            }
            if let Some(req) = schema.get("required").and_then(Value::as_array) {
                required.extend(req.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }
    }

    let mut input_schema = json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        let mut seen = HashSet::new();
        required.retain(|name| seen.insert(name.clone()));
        input_schema["required"] = json!(required);
    }

    Tool { name, description: describe(op, method, path), input_schema, route }
}

fn describe(op: &Value, method: &str, path: &str) -> String {
    let parts: Vec<&str> = ["summary", "description"]
        .iter()
        .filter_map(|k| op.get(*k).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .collect();
    if parts.is_empty() {
        format!("{} {}", method.to_ascii_uppercase(), path)
    } else {
        parts.join("\n\n")
    }
}

fn fallback_name(method: &str, path: &str) -> String {
    let cleaned: String = path.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
    let parts: Vec<&str> = cleaned.split('_').filter(|s| !s.is_empty()).collect();
    format!("{}_{}", method, parts.join("_"))
}

/// Replace local `{"$ref": "#/..."}` objects with their targets, recursively.
fn inline_refs(doc: &Value, value: &Value, depth: usize) -> Value {
    if depth > MAX_REF_DEPTH {
        return value.clone();
    }
    match value {
        Value::Object(obj) => {
            if let Some(target) = obj
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix('#'))
                .and_then(|ptr| doc.pointer(ptr))
            {
                return inline_refs(doc, target, depth + 1);
            }
            Value::Object(obj.iter().map(|(k, v)| (k.clone(), inline_refs(doc, v, depth + 1))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| inline_refs(doc, v, depth + 1)).collect()),
        other => other.clone(),
    }
}
