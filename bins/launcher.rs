use dotenvy::dotenv;
use std::process::ExitCode;
use tracing::{error, info};
use uuid::Uuid;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    // menu output shares stdout, keep logs on stderr
    common::utils::logging::init_logging_stderr();

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    std::panic::set_hook(Box::new(move |info| {
        error!(service = "launcher", event = "panic", %service_id, pid, message = %info, "unhandled panic occurred");
    }));

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(service = "launcher", event = "start", %service_id, pid, "launcher starting");
    match launcher::run(cfg).await {
        Ok(()) => {
            info!(service = "launcher", event = "stop", %service_id, pid, "launcher exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "launcher", event = "run_failed", error = %e, "launcher failed");
            ExitCode::FAILURE
        }
    }
}
