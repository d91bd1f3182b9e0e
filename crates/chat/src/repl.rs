use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::api_client::UserApiClient;
use crate::command::ChatCommand;
use crate::gemini::ChatModel;

pub const BANNER: &str = "\
Welcome to the Smart Chat Assistant!
Commands:
   save user email@example.com, John Doe, +123456789, 123 Main St
   get user email@example.com
   show users
   delete user email@example.com
   Type 'quit' to exit
============================================================
";

/// Read commands until `quit` or end of input.
pub async fn run<R, W>(input: R, mut output: W, users: &UserApiClient, model: &dyn ChatModel) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(BANNER.as_bytes()).await?;
    let mut lines = input.lines();
    loop {
        output.write_all(b"\nYou: ").await?;
        output.flush().await?;
        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\nGoodbye!\n").await?;
            break;
        };

        let reply = match ChatCommand::parse(&line) {
            ChatCommand::Quit => {
                output.write_all(b"Goodbye!\n").await?;
                break;
            }
            ChatCommand::Empty => continue,
            ChatCommand::SaveUser { email, name, phone, address } => {
                users.save_user(&email, &name, phone.as_deref(), address.as_deref()).await
            }
            ChatCommand::GetUser(email) => users.get_user(&email).await,
            ChatCommand::ListUsers => users.list_users().await,
            ChatCommand::DeleteUser(email) => users.delete_user(&email).await,
            ChatCommand::Usage(text) => text.to_string(),
            ChatCommand::Chat(prompt) => {
                output.write_all(b"Assistant: Thinking...\n").await?;
                output.flush().await?;
                debug!(chars = prompt.len(), "free chat");
                match model.reply(&prompt).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "model call failed");
                        format!("Error communicating with Gemini: {e}")
                    }
                }
            }
        };
        output.write_all(format!("Assistant: {reply}\n").as_bytes()).await?;
    }
    output.flush().await
}
