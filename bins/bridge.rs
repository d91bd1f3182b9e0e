use dotenvy::dotenv;
use std::process::ExitCode;
use tracing::{error, info};
use uuid::Uuid;

fn main() -> ExitCode {
    dotenv().ok();
    common::utils::logging::init_logging_json();

    let service_id = Uuid::new_v4();
    let pid = std::process::id();

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "bridge", event = "panic", %service_id, pid, message = %info, "unhandled panic occurred");
    }));

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "bridge", event = "config_invalid", error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "bridge", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(
        service = "bridge",
        event = "start",
        %service_id,
        pid,
        version = env!("CARGO_PKG_VERSION"),
        api = %cfg.bridge.api_base_url,
        "tool bridge starting"
    );

    rt.block_on(async move {
        tokio::select! {
            res = bridge::bootstrap::run(cfg.bridge) => match res {
                Ok(()) => {
                    info!(service = "bridge", event = "stop", %service_id, pid, "tool bridge stopped normally");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(service = "bridge", event = "run_failed", error = %e, "tool bridge failed");
                    ExitCode::FAILURE
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!(service = "bridge", event = "shutdown_signal", %service_id, pid, "received Ctrl+C, shutting down");
                ExitCode::SUCCESS
            }
        }
    })
}
