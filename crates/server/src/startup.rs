use std::net::SocketAddr;

use axum::Router;
use configs::{AppConfig, StorageConfig};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes::{self, ServerState};
use service::user::{FileUserRepository, UserService};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Wire the file-backed user store into a ready-to-serve router.
pub async fn build_app(storage: &StorageConfig) -> anyhow::Result<Router> {
    common::env::ensure_data_dir(&storage.users_file).await?;
    let repo = FileUserRepository::new(storage.users_file.clone()).await?;
    info!(file = %repo.path().display(), "user store ready");
    let state = ServerState { users: UserService::new(repo) };
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg.storage).await?;

    // Bind and serve
    let listener = tokio::net::TcpListener::bind((cfg.server.host.as_str(), cfg.server.port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!(%addr, "starting api server");
    axum::serve(listener, app).await?;
    Ok(())
}
