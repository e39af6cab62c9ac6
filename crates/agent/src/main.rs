//! memwatch agent - system memory telemetry and diagnostics
//!
//! Samples procfs at a fixed cadence, keeps a bounded history of derived
//! memory health metrics and logs recommendations as they are raised or
//! cleared.

use anyhow::Result;
use memwatch_lib::{
    collector::{CollectionLoopBuilder, ProcfsSource},
    health::{components, HealthRegistry},
    AggregationService, EngineMetrics, StructuredLogger,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, filtered by RUST_LOG (default info)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting memwatch-agent");

    let config = config::AgentConfig::load()?;
    info!(
        host_name = %config.host_name,
        proc_root = %config.proc_root,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::COLLECTOR).await;
    health_registry.register(components::AGGREGATOR).await;

    let metrics = EngineMetrics::new();

    let logger = StructuredLogger::new(&config.host_name);
    logger.log_startup(
        AGENT_VERSION,
        config.engine.window_capacity,
        config.collection_interval_secs,
    );

    let service = Arc::new(AggregationService::new(&config.engine)?);

    let collection_loop = CollectionLoopBuilder::new()
        .source(Arc::new(ProcfsSource::new(&config.proc_root)))
        .service(service.clone())
        .health(health_registry.clone())
        .logger(logger.clone())
        .interval(Duration::from_secs(config.collection_interval_secs))
        .max_consecutive_failures(config.max_consecutive_failures)
        .build()?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let loop_handle = tokio::spawn(collection_loop.run(shutdown_tx.subscribe()));

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let mut api_shutdown = shutdown_tx.subscribe();
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state, async move {
        let _ = api_shutdown.recv().await;
    }));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    // Receivers may already be gone if a task exited early
    let _ = shutdown_tx.send(());

    if let Err(e) = loop_handle.await {
        warn!(error = %e, "Collection loop task failed");
    }
    match api_handle.await {
        Ok(Err(e)) => warn!(error = %e, "API server exited with error"),
        Err(e) => warn!(error = %e, "API server task failed"),
        Ok(Ok(())) => {}
    }

    if let Ok(stats) = service.stats() {
        info!(
            ingested = stats.ingested,
            peak_used_bytes = stats.peak_used_bytes,
            "Shutting down"
        );
    }

    Ok(())
}
