//! Menu-driven launcher for the API server, tool bridge and agent demo.

pub mod errors;
pub mod menu;
pub mod supervisor;

use std::time::Duration;

use configs::AppConfig;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{error, info};

pub use errors::LauncherError;
pub use menu::MenuChoice;
pub use supervisor::Supervisor;

/// Loop over the menu until the user picks exit.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Tool bridge + user API demo\n===========================\n").await?;

    loop {
        let choice = menu::prompt_until(&mut stdin, &mut stdout, interrupted()).await?;
        if choice == MenuChoice::Exit {
            println!("Goodbye!");
            return Ok(());
        }

        let mut sup = Supervisor::beside_current_exe(Duration::from_secs(cfg.launcher.shutdown_timeout_secs))?;
        info!(?choice, "launching");
        if let Err(e) = launch(choice, &cfg, &mut sup).await {
            error!(error = %e, "launch failed");
            println!("Error: {e}");
        }
        println!("\nStopping services...");
        sup.shutdown().await;
        println!("Services stopped.");
    }
}

async fn launch(choice: MenuChoice, cfg: &AppConfig, sup: &mut Supervisor) -> anyhow::Result<()> {
    let with_api = matches!(choice, MenuChoice::ApiAndBridge | MenuChoice::All);
    let with_agent = matches!(choice, MenuChoice::BridgeAndAgent | MenuChoice::All);

    println!("\nStarting tool bridge...");
    sup.spawn("bridge", &[])?;
    if with_api {
        println!("Starting API server...");
        sup.spawn("server", &[])?;
    }
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(cfg.launcher.startup_delay_ms)) => {}
        _ = interrupted() => return Ok(()),
    }

    let api_url = format!("http://{}:{}", cfg.server.host, cfg.server.port);
    let sse_url = format!("http://{}:{}{}", cfg.bridge.host, cfg.bridge.port, cfg.bridge.sse_path);
    println!("\nServices running:");
    println!("   Tool bridge (MCP/SSE): {sse_url}");
    if with_api {
        println!("   API server: {api_url}");
        println!("   OpenAPI document: {api_url}/openapi.json");
        println!("\nTry the multiply endpoint:");
        println!("   curl '{api_url}/multiply?a=3&b=5'");
    }

    if with_agent {
        println!("\nRunning agent demo...");
        tokio::select! {
            status = sup.run("chat", &["ask"]) => {
                let status = status?;
                if !status.success() {
                    println!("Agent demo exited with {status}");
                }
            }
            _ = interrupted() => return Ok(()),
        }
        if choice == MenuChoice::BridgeAndAgent {
            return Ok(());
        }
    }

    println!("\nPress Ctrl+C to stop...");
    let running = sup.running();
    if running.is_empty() {
        anyhow::bail!("no service is running");
    }
    interrupted().await;
    Ok(())
}

/// Resolves on the next Ctrl+C. The handler stays installed for the life of
/// the process, so every blocking wait in the launcher selects on this.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
