use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use bridge::protocol::{CallToolResult, ToolInfo};
use chat::{ChatError, ChatModel, GeminiClient, ToolAgent, ToolBackend};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct MockGemini {
    requests: Arc<Mutex<Vec<Value>>>,
    /// Keep asking for tools forever
    always_call: bool,
}

async fn generate(State(mock): State<MockGemini>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()), Some("test-key"));
    mock.requests.lock().unwrap().push(body.clone());

    let answered = body["contents"]
        .as_array()
        .map(|cs| cs.iter().any(|c| c["parts"][0].get("functionResponse").is_some()))
        .unwrap_or(false);
    if body.get("tools").is_none() {
        return Json(json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Hello there"}]}}]}));
    }
    if answered && !mock.always_call {
        let last = body["contents"].as_array().and_then(|cs| cs.last()).cloned().unwrap_or_default();
        let result = &last["parts"][0]["functionResponse"]["response"]["result"];
        return Json(json!({"candidates": [{"content": {"role": "model", "parts": [{"text": format!("The result is {result}")}]}}]}));
    }
    Json(json!({"candidates": [{"content": {"role": "model", "parts": [
        {"functionCall": {"name": "multiply", "args": {"a": 3, "b": 5}}}
    ]}}]}))
}

async fn start_mock(mock: MockGemini) -> anyhow::Result<String> {
    let app = Router::new().route("/v1beta/models/:action", post(generate)).with_state(mock);
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", addr))
}

#[derive(Default)]
struct FakeTools {
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

#[async_trait]
impl ToolBackend for FakeTools {
    async fn list_tools(&self) -> Result<Vec<ToolInfo>, ChatError> {
        Ok(vec![ToolInfo {
            name: "multiply".into(),
            description: "Multiply two numbers.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"a": {"type": "number", "format": "double"}, "b": {"type": "number"}},
                "required": ["a", "b"]
            }),
        }])
    }

    async fn call_tool(&self, name: &str, args: Map<String, Value>) -> Result<CallToolResult, ChatError> {
        self.calls.lock().unwrap().push((name.to_string(), args));
        Ok(CallToolResult::text(r#"{"result":15.0,"operation":"multiplication","inputs":[3.0,5.0]}"#, false))
    }
}

fn client(base: &str) -> GeminiClient {
    GeminiClient::new(base, "gemini-2.0-flash", "test-key", 0.7, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn agent_runs_function_calls_until_text() -> anyhow::Result<()> {
    let mock = MockGemini::default();
    let base = start_mock(mock.clone()).await?;
    let gemini = client(&base);
    let tools = FakeTools::default();

    let answer = ToolAgent::new(&gemini, &tools, 0.0, 5).run("multiply two numbers 3 and 5").await?;
    assert_eq!(answer, "The result is 15.0");

    let calls = tools.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "multiply");
    assert_eq!(calls[0].1.get("b"), Some(&json!(5)));

    let requests = mock.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["generationConfig"]["temperature"], 0.0);
    assert_eq!(requests[0]["tools"][0]["functionDeclarations"][0]["name"], "multiply");
    // second turn replays the model's call before the tool result
    assert_eq!(requests[1]["contents"][1]["role"], "model");
    assert_eq!(requests[1]["contents"][2]["parts"][0]["functionResponse"]["name"], "multiply");
    Ok(())
}

#[tokio::test]
async fn agent_gives_up_after_max_rounds() -> anyhow::Result<()> {
    let mock = MockGemini { always_call: true, ..Default::default() };
    let base = start_mock(mock.clone()).await?;
    let gemini = client(&base);
    let tools = FakeTools::default();

    let err = ToolAgent::new(&gemini, &tools, 0.0, 2).run("loop").await.unwrap_err();
    assert!(matches!(err, ChatError::ToolRounds(2)));
    assert_eq!(tools.calls.lock().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn plain_reply_uses_no_tools() -> anyhow::Result<()> {
    let mock = MockGemini::default();
    let base = start_mock(mock.clone()).await?;
    let gemini = client(&base);

    assert_eq!(gemini.reply("hi").await?, "Hello there");
    let requests = mock.requests.lock().unwrap();
    assert_eq!(requests[0]["generationConfig"]["temperature"].as_f64().map(|t| (t * 10.0).round()), Some(7.0));
    Ok(())
}

#[tokio::test]
async fn api_errors_surface_the_message() -> anyhow::Result<()> {
    let app = Router::new().route(
        "/v1beta/models/:action",
        post(|| async {
            (axum::http::StatusCode::BAD_REQUEST, Json(json!({"error": {"code": 400, "message": "API key not valid"}})))
        }),
    );
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let err = client(&format!("http://{addr}")).reply("hi").await.unwrap_err();
    match err {
        ChatError::Gemini { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}
