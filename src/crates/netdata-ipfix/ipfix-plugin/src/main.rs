//! ipfix-plugin standalone binary

mod ingest;
mod netdata_env;
mod plugin_config;
mod tracing_setup;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    tracing_setup::init_tracing("info");

    let config = match plugin_config::PluginConfig::new() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!("failed to load configuration: {err:#}");
            std::process::exit(1);
        }
    };

    let metrics = Arc::new(ingest::IngestMetrics::default());
    let ingest_service = match ingest::IngestService::new(config, metrics) {
        Ok(service) => service,
        Err(err) => {
            tracing::error!("failed to initialize ingestion service: {err:#}");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for shutdown signal: {err}");
            return;
        }
        tracing::info!("shutdown requested");
        signal_shutdown.cancel();
    });

    if let Err(err) = ingest_service.run(shutdown).await {
        tracing::error!("ingestion task error: {err:#}");
        std::process::exit(1);
    }
}
