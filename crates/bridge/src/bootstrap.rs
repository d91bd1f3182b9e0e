use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use configs::BridgeConfig;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};
use utoipa::OpenApi;

use crate::catalog::ToolCatalog;
use crate::invoker::HttpToolInvoker;
use crate::protocol::McpHandler;
use crate::transport;

/// Handle to a bridge serving in the background.
pub struct ServerHandle {
    shutdown_tx: oneshot::Sender<()>,
    addr: SocketAddr,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn sse_url(&self, sse_path: &str) -> String {
        format!("http://{}{}", self.addr, sse_path)
    }

    pub fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Catalog from the live API document, or from the compiled-in one when the
/// API cannot be reached.
pub async fn load_catalog(cfg: &BridgeConfig) -> anyhow::Result<ToolCatalog> {
    let url = format!("{}{}", cfg.api_base_url.trim_end_matches('/'), cfg.openapi_path);
    let http = reqwest::Client::builder().timeout(Duration::from_secs(cfg.request_timeout_secs)).build()?;
    match ToolCatalog::fetch(&http, &url).await {
        Ok(catalog) => {
            info!(%url, tools = catalog.len(), "tool catalog loaded from api");
            Ok(catalog)
        }
        Err(e) => {
            warn!(%url, error = %e, "api document unavailable; using built-in document");
            let doc = serde_json::to_value(server::openapi::ApiDoc::openapi())?;
            Ok(ToolCatalog::from_openapi(&doc)?)
        }
    }
}

pub async fn build_app(cfg: &BridgeConfig) -> anyhow::Result<Router> {
    let catalog = load_catalog(cfg).await?;
    let invoker = HttpToolInvoker::new(&cfg.api_base_url, Duration::from_secs(cfg.request_timeout_secs))?;
    let handler = Arc::new(McpHandler::new(Arc::new(catalog), Arc::new(invoker)));
    Ok(transport::build_router(handler, &cfg.sse_path, &cfg.message_path))
}

/// Bind and serve in the background until the handle is stopped.
pub async fn start(cfg: &BridgeConfig) -> anyhow::Result<ServerHandle> {
    let app = build_app(cfg).await?;
    let listener = TcpListener::bind((cfg.host.as_str(), cfg.port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, sse_path = %cfg.sse_path, "starting tool bridge");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
            info!("shutting down tool bridge");
        };
        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
            tracing::error!(error = %e, "tool bridge stopped with error");
        }
    });
    Ok(ServerHandle { shutdown_tx, addr })
}

/// Public entry: serve in the foreground.
pub async fn run(cfg: BridgeConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;
    let listener = TcpListener::bind((cfg.host.as_str(), cfg.port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, sse_path = %cfg.sse_path, message_path = %cfg.message_path, "starting tool bridge");
    axum::serve(listener, app).await?;
    Ok(())
}
