//! `chat` starts the interactive assistant; `chat ask [prompt]` runs one
//! prompt through Gemini with the bridge's tools.

use std::process::ExitCode;
use std::time::Duration;

use bridge::McpClient;
use chat::{ChatModel, GeminiClient, ToolAgent, Unconfigured, UserApiClient};
use configs::ChatConfig;
use dotenvy::dotenv;
use tokio::io::BufReader;
use tracing::{error, info, warn};

const DEFAULT_PROMPT: &str = "multiply two numbers 3 and 5";

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    common::utils::logging::init_logging_stderr();

    std::panic::set_hook(Box::new(|info| {
        error!(service = "chat", event = "panic", pid = std::process::id(), message = %info, "unhandled panic occurred");
    }));

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg.chat,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        None | Some("chat") => interactive(&cfg).await,
        Some("ask") => {
            let prompt = if args.len() > 1 { args[1..].join(" ") } else { DEFAULT_PROMPT.to_string() };
            ask(&cfg, &prompt).await
        }
        Some(other) => {
            eprintln!("unknown mode '{other}'; usage: chat [ask [prompt]]");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn interactive(cfg: &ChatConfig) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let users = UserApiClient::new(&cfg.api_base_url, timeout)?;
    let model: Box<dyn ChatModel> = match GeminiClient::from_config(cfg) {
        Ok(client) => Box::new(client),
        Err(e) => {
            warn!(error = %e, "free chat disabled");
            Box::new(Unconfigured)
        }
    };
    info!(api = %cfg.api_base_url, "interactive chat starting");
    let input = BufReader::new(tokio::io::stdin());
    chat::repl::run(input, tokio::io::stdout(), &users, model.as_ref()).await?;
    Ok(())
}

async fn ask(cfg: &ChatConfig, prompt: &str) -> anyhow::Result<()> {
    let gemini = GeminiClient::from_config(cfg)?;
    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let client = match McpClient::connect(&cfg.bridge_url, timeout).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Make sure the tool bridge is running at {}", cfg.bridge_url);
            return Err(e.into());
        }
    };
    client.initialize().await?;

    let agent = ToolAgent::new(&gemini, &client, cfg.tool_temperature, cfg.max_tool_rounds);
    let answer = agent.run(prompt).await?;
    println!("{answer}");
    Ok(())
}
