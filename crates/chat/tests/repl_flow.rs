use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chat::{repl, ChatError, ChatModel, UserApiClient};
use configs::StorageConfig;
use tokio::net::TcpListener;
use uuid::Uuid;

struct Api {
    client: UserApiClient,
    data_file: PathBuf,
}

impl Drop for Api {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.data_file);
    }
}

async fn start_api() -> anyhow::Result<Api> {
    let data_file = std::env::temp_dir().join(format!("chat-e2e-{}/users_data.json", Uuid::new_v4()));
    let app = server::startup::build_app(&StorageConfig { users_file: data_file.clone() }).await?;
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let client = UserApiClient::new(&format!("http://{}", addr), Duration::from_secs(5))?;
    Ok(Api { client, data_file })
}

/// Echoes prompts back, or fails when asked to.
struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    async fn reply(&self, prompt: &str) -> Result<String, ChatError> {
        if prompt == "fail" {
            return Err(ChatError::EmptyResponse);
        }
        Ok(format!("echo: {prompt}"))
    }
}

async fn session(api: &Api, script: &str) -> anyhow::Result<String> {
    let mut out = Vec::new();
    repl::run(script.as_bytes(), &mut out, &api.client, &EchoModel).await?;
    Ok(String::from_utf8(out)?)
}

#[tokio::test]
async fn user_commands_render_api_replies() -> anyhow::Result<()> {
    let api = start_api().await?;

    assert_eq!(api.client.list_users().await, "No users found in the database");
    assert_eq!(
        api.client.save_user("a@x.com", "Alice", Some("+1"), None).await,
        "User saved successfully: Alice (a@x.com)"
    );
    assert_eq!(
        api.client.get_user("a@x.com").await,
        "User Found:\n   Name: Alice\n   Email: a@x.com\n   Phone: +1\n   Address: N/A"
    );
    api.client.save_user("b@x.com", "Bob", None, None).await;
    assert_eq!(api.client.list_users().await, "Found 2 users:\n   Alice (a@x.com)\n   Bob (b@x.com)");
    assert_eq!(api.client.delete_user("a@x.com").await, "User a@x.com deleted successfully");
    assert_eq!(api.client.delete_user("a@x.com").await, "User with email 'a@x.com' not found");
    assert_eq!(api.client.get_user("nobody@x.com").await, "User with email 'nobody@x.com' not found");
    Ok(())
}

#[tokio::test]
async fn api_validation_errors_are_shown() -> anyhow::Result<()> {
    let api = start_api().await?;
    let reply = api.client.save_user("a@x.com", " ", None, None).await;
    assert!(reply.starts_with("Error saving user: "), "{reply}");
    assert!(reply.contains("name required"), "{reply}");
    Ok(())
}

#[tokio::test]
async fn unreachable_api_is_reported_as_error_text() -> anyhow::Result<()> {
    // bind then drop to get a closed port
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = UserApiClient::new(&format!("http://{}", addr), Duration::from_secs(2))?;
    assert!(client.list_users().await.starts_with("Error: "));
    Ok(())
}

#[tokio::test]
async fn repl_session_transcript() -> anyhow::Result<()> {
    let api = start_api().await?;
    let script = "save user a@x.com, Alice\nget user\n\nshow users\nhow are you?\nfail\nquit\nshow users\n";
    let out = session(&api, script).await?;

    assert!(out.starts_with("Welcome to the Smart Chat Assistant!"));
    assert!(out.contains("Assistant: User saved successfully: Alice (a@x.com)\n"));
    assert!(out.contains("Assistant: Please provide an email. Use: get user email@example.com\n"));
    assert!(out.contains("Assistant: Found 1 users:\n   Alice (a@x.com)\n"));
    assert!(out.contains("Assistant: Thinking...\nAssistant: echo: how are you?\n"));
    assert!(out.contains("Assistant: Error communicating with Gemini: model returned no text\n"));
    assert!(out.ends_with("Goodbye!\n"));
    // nothing after quit is processed
    assert_eq!(out.matches("Found 1 users").count(), 1);
    Ok(())
}

#[tokio::test]
async fn repl_stops_at_end_of_input() -> anyhow::Result<()> {
    let api = start_api().await?;
    let out = session(&api, "show users").await?;
    assert!(out.contains("Assistant: No users found in the database\n"));
    assert!(out.ends_with("You: \nGoodbye!\n"));
    Ok(())
}
