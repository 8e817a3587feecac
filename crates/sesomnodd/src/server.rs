//! HTTP server bootstrap and graceful shutdown.

use crate::routes;
use crate::state::AppState;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub async fn run(state: Arc<AppState>) -> Result<()> {
    let addr = format!(
        "{}:{}",
        state.config.server.bind, state.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("[Server] Listening on {}", addr);

    let router = routes::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("[Server] Shutdown signal received");
}
