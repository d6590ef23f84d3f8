mod handlers;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use codexec_common::config::ExecutorConfig;
use codexec_core::Engine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Codexec API booting...");

    let config = ExecutorConfig::load_default().context("Failed to load executor config")?;
    info!(
        enabled = config.enabled,
        scratch_root = %config.scratch_root.display(),
        timeout_seconds = config.timeout_seconds,
        "Executor configured"
    );
    if !config.enabled {
        info!("Code execution disabled - /code routes not mounted");
    }

    let state = Arc::new(AppState {
        engine: Arc::new(Engine::new(config)),
    });

    let app = routes::routes(state);

    let addr = std::env::var("CODEXEC_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
