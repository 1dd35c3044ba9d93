use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};

mod config;
mod handlers;
mod llm;
mod service;
mod state;
mod storage;
mod utils;

use config::{Config, LogConfig};
use llm::GeminiAnalyzer;
use service::ReadingService;
use state::AppState;
use storage::{ObjectWriter, RegionResolver, S3Connector};
use utils::logging::init_logging;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let log_config = LogConfig::from_env();
    let _guards = init_logging(&log_config.level, &log_config.dir);
    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        "Starting physiognomy API (bucket={}, prefix={:?}, fixed_region={:?}, model={}, log_dir={})",
        config.storage.bucket,
        config.storage.folder_prefix,
        config.storage.fixed_region,
        config.gemini.model,
        config.log.dir
    );

    let connector = Arc::new(S3Connector::from_config(&config.storage).await);
    let resolver = Arc::new(RegionResolver::new(
        config.storage.bucket.clone(),
        config.storage.fixed_region.as_deref(),
        connector,
    ));
    let writer = ObjectWriter::new(resolver, config.storage.folder_prefix.clone());
    let analyzer = Arc::new(GeminiAnalyzer::new(config.gemini.clone()));
    let service = ReadingService::new(analyzer, writer, config.storage.endpoint_url.clone());

    let app = handlers::router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    Ok(())
}
