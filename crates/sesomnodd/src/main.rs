use anyhow::Result;
use sesomnodd::config::Config;
use sesomnodd::state::AppState;
use sesomnodd::{db, scheduler, server};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("SesomNod Engine v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load();
    let state = Arc::new(AppState::new(config));

    // Schema setup is best-effort; the API runs without a database
    if let Err(e) = state.db.ensure_schema().await {
        db::log_schema_error(&e);
    }

    if state.config.scheduler.enabled {
        tokio::spawn(scheduler::run(state.clone()));
    } else {
        info!("[Scheduler] Disabled by config");
    }

    server::run(state).await
}
