// Page metadata HTTP server
//
// Serves `GET /scrape?url=...` backed by one isolated headless Chrome
// session per request.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = kodegen_tools_pagemeta::load_yaml_config().context("Failed to load config")?;
    info!(
        bind = %config.server.bind,
        budget_ms = config.scrape.request_budget_ms,
        attempts = config.scrape.max_navigation_attempts,
        "Starting pagemeta server"
    );

    let server = kodegen_tools_pagemeta::start_server(&config).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received, draining in-flight requests");
    server.shutdown().await
}
