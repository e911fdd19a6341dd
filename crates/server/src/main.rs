//! mcp-swcache server entry point.
//!
//! Boots the cache controller and serves it over the MCP stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{CacheController, ControllerSettings, FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb, Error};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        generation = %config.generation(),
        db = %config.db_path.display(),
        "Starting mcp-swcache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path)
        .await
        .map_err(|e| anyhow!("failed to open cache at {}: {e}", config.db_path.display()))?;
    let fetch_config = FetchConfig::from_app_config(&config).map_err(|e| anyhow!(e.to_string()))?;
    let fetcher = FetchClient::new(fetch_config).map_err(|e| anyhow!(e.to_string()))?;
    let settings = ControllerSettings::from_app_config(&config).map_err(|e| anyhow!(e.to_string()))?;
    let controller = Arc::new(CacheController::new(settings, Arc::new(db), Arc::new(fetcher)));

    if config.install_on_start {
        boot(&controller).await;
    }

    let handler = handler::SwCacheServer::new(Arc::clone(&controller));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    let drained = controller.drain_background().await;
    tracing::info!(drained, "shut down");

    Ok(())
}

/// Install at boot, and activate right away when skip-waiting is in effect.
///
/// Failures are logged; the tools can retry either step.
async fn boot(controller: &CacheController) {
    match controller.install_and_activate().await {
        Ok(outcome) => match outcome.activated {
            Some(report) => tracing::info!(deleted = report.deleted_stores.len(), "activated at boot"),
            None => tracing::info!(generation = %outcome.report.generation, "installed, waiting for activation"),
        },
        Err(Error::Waiting(msg)) => tracing::info!(%msg, "activation waiting"),
        Err(e) => tracing::error!(error = %e, "boot install failed"),
    }
}
