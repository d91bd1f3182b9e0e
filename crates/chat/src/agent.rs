//! Gemini function calling over the tool bridge.

use async_trait::async_trait;
use bridge::protocol::{CallToolResult, ToolInfo};
use bridge::McpClient;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::errors::ChatError;
use crate::gemini::{
    Content, FunctionCall, FunctionDeclaration, GeminiClient, GeminiTool, GenerateContentRequest, GenerationConfig,
    Part,
};
use crate::schema::sanitize_for_gemini;

/// Source of tools the model may call.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, ChatError>;
    async fn call_tool(&self, name: &str, args: Map<String, Value>) -> Result<CallToolResult, ChatError>;
}

#[async_trait]
impl ToolBackend for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, ChatError> {
        Ok(McpClient::list_tools(self).await?)
    }

    async fn call_tool(&self, name: &str, args: Map<String, Value>) -> Result<CallToolResult, ChatError> {
        Ok(McpClient::call_tool(self, name, args).await?)
    }
}

pub struct ToolAgent<'a> {
    gemini: &'a GeminiClient,
    tools: &'a dyn ToolBackend,
    temperature: f32,
    max_rounds: usize,
}

impl<'a> ToolAgent<'a> {
    pub fn new(gemini: &'a GeminiClient, tools: &'a dyn ToolBackend, temperature: f32, max_rounds: usize) -> Self {
        Self { gemini, tools, temperature, max_rounds: max_rounds.max(1) }
    }

    /// Ask the model, running every function call it makes until it answers
    /// in text.
    pub async fn run(&self, prompt: &str) -> Result<String, ChatError> {
        let declarations = declarations(&self.tools.list_tools().await?);
        info!(tools = declarations.len(), model = %self.gemini.model(), "agent started");

        let mut contents = vec![Content::user_text(prompt)];
        for round in 1..=self.max_rounds {
            let req = GenerateContentRequest {
                contents: contents.clone(),
                tools: (!declarations.is_empty())
                    .then(|| vec![GeminiTool { function_declarations: declarations.clone() }]),
                generation_config: Some(GenerationConfig { temperature: self.temperature }),
            };
            let resp = self.gemini.generate(&req).await?;
            let calls = resp.function_calls();
            if calls.is_empty() {
                return resp.text().ok_or(ChatError::EmptyResponse);
            }

            debug!(round, calls = calls.len(), "model requested tools");
            if let Some(content) = resp.first_content() {
                contents.push(Content { role: Some("model".into()), parts: content.parts.clone() });
            }
            let mut parts = Vec::with_capacity(calls.len());
            for call in calls {
                let response = self.execute(&call).await;
                parts.push(Part::function_response(call.name, response));
            }
            contents.push(Content { role: Some("user".into()), parts });
        }
        Err(ChatError::ToolRounds(self.max_rounds))
    }

    /// Run one call; failures are reported back to the model.
    async fn execute(&self, call: &FunctionCall) -> Value {
        let args = call.args.as_object().cloned().unwrap_or_default();
        match self.tools.call_tool(&call.name, args).await {
            Ok(result) => {
                let text = result.joined_text();
                if result.is_error {
                    json!({ "error": text })
                } else {
                    as_response_object(&text)
                }
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }
}

fn declarations(tools: &[ToolInfo]) -> Vec<FunctionDeclaration> {
    tools
        .iter()
        .map(|t| {
            let has_properties =
                t.input_schema.get("properties").and_then(Value::as_object).is_some_and(|p| !p.is_empty());
            FunctionDeclaration {
                name: t.name.clone(),
                description: (!t.description.is_empty()).then(|| t.description.clone()),
                parameters: has_properties.then(|| sanitize_for_gemini(&t.input_schema)),
            }
        })
        .collect()
}

/// Gemini wants an object in `functionResponse.response`.
fn as_response_object(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(v) if v.is_object() => v,
        Ok(v) => json!({ "result": v }),
        Err(_) => json!({ "result": text }),
    }
}
