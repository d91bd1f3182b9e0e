//! Minimal Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use configs::ChatConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::ChatError;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self { role: Some("user".into()), parts: vec![Part::text(text)] }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Default::default() }
    }

    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self { function_response: Some(FunctionResponse { name: name.into(), response }), ..Default::default() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    pub name: String,
    /// Must be a JSON object
    pub response: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GeminiTool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    pub fn first_content(&self) -> Option<&Content> {
        self.candidates.first().and_then(|c| c.content.as_ref())
    }

    /// Text parts of the first candidate, concatenated.
    pub fn text(&self) -> Option<String> {
        let text: String = self.first_content()?.parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }

    pub fn function_calls(&self) -> Vec<FunctionCall> {
        self.first_content()
            .map(|c| c.parts.iter().filter_map(|p| p.function_call.clone()).collect())
            .unwrap_or_default()
    }
}

/// Anything that can answer a free-form prompt.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn reply(&self, prompt: &str) -> Result<String, ChatError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            temperature,
        })
    }

    pub fn from_config(cfg: &ChatConfig) -> Result<Self, ChatError> {
        let key = cfg.gemini_api_key.as_deref().filter(|k| !k.is_empty()).ok_or(ChatError::MissingApiKey)?;
        Self::new(
            &cfg.gemini_base_url,
            &cfg.model,
            key,
            cfg.chat_temperature,
            Duration::from_secs(cfg.request_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn generate(&self, req: &GenerateContentRequest) -> Result<GenerateContentResponse, ChatError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, contents = req.contents.len(), "generateContent");
        let resp = self.http.post(url).header("x-goog-api-key", &self.api_key).json(req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Gemini { status: status.as_u16(), message: error_message(&body) });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn reply(&self, prompt: &str) -> Result<String, ChatError> {
        let req = GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
            tools: None,
            generation_config: Some(GenerationConfig { temperature: self.temperature }),
        };
        self.generate(&req).await?.text().ok_or(ChatError::EmptyResponse)
    }
}

/// Stand-in when no API key is configured; user commands keep working.
pub struct Unconfigured;

#[async_trait]
impl ChatModel for Unconfigured {
    async fn reply(&self, _prompt: &str) -> Result<String, ChatError> {
        Err(ChatError::MissingApiKey)
    }
}

/// `error.message` from a Google error envelope, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
