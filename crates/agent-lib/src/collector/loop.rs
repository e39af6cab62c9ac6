//! Sample polling loop
//!
//! Periodically reads a sample from the source and ingests it into the
//! aggregation service. The loop owns the cadence and cancellation; the
//! service has no notion of time beyond the timestamps it is handed.

use super::SampleSource;
use crate::health::{components, HealthRegistry};
use crate::models::{Assessment, RecommendationKind};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::service::AggregationService;
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the polling loop
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Time between samples (default: 5 seconds)
    pub interval: Duration,
    /// Consecutive failures before the collector is reported unhealthy
    pub max_consecutive_failures: u32,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_consecutive_failures: 3,
        }
    }
}

/// Polls a [`SampleSource`] and feeds the [`AggregationService`]
pub struct CollectionLoop {
    source: Arc<dyn SampleSource>,
    service: Arc<AggregationService>,
    health: HealthRegistry,
    metrics: EngineMetrics,
    logger: StructuredLogger,
    config: CollectionConfig,
    /// Kinds raised by the previous successful cycle
    active: BTreeSet<RecommendationKind>,
}

impl CollectionLoop {
    pub fn new(
        source: Arc<dyn SampleSource>,
        service: Arc<AggregationService>,
        health: HealthRegistry,
        logger: StructuredLogger,
        config: CollectionConfig,
    ) -> Self {
        Self {
            source,
            service,
            health,
            metrics: EngineMetrics::new(),
            logger,
            config,
            active: BTreeSet::new(),
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            "Starting memory collection loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are logged and reflected in health inside collect_once
                    let _ = self.collect_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down memory collection loop");
                    break;
                }
            }
        }
    }

    /// Read one sample and ingest it.
    ///
    /// On a collection failure the previously published state is left as is.
    pub async fn collect_once(&mut self) -> Result<Assessment> {
        let start = Instant::now();

        let sample = match self.source.sample().await {
            Ok(sample) => sample,
            Err(e) => {
                self.metrics.inc_collection_errors();
                let streak = self
                    .health
                    .record_failure(
                        components::COLLECTOR,
                        e.to_string(),
                        self.config.max_consecutive_failures,
                    )
                    .await;
                self.logger.log_collection_failed(&e, streak);
                return Err(e);
            }
        };
        self.health.record_success(components::COLLECTOR).await;

        let used_bytes = sample.used_bytes();
        let ingested = self
            .service
            .ingest(sample, Utc::now())
            .and_then(|assessment| Ok((assessment, self.service.stats()?)));

        let (assessment, stats) = match ingested {
            Ok(result) => result,
            Err(e) => {
                self.health
                    .set_unhealthy(components::AGGREGATOR, e.to_string())
                    .await;
                return Err(e).context("Failed to ingest memory sample");
            }
        };
        self.health.set_healthy(components::AGGREGATOR).await;

        self.metrics.record_assessment(&assessment, used_bytes, &stats);
        self.metrics
            .observe_collection_latency(start.elapsed().as_secs_f64());

        if stats.ingested == 1 {
            self.health.set_ready(true).await;
        }

        self.log_transitions(&assessment);

        debug!(
            ingested = stats.ingested,
            window_len = stats.window_len,
            recommendations = assessment.recommendations.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Collection cycle complete"
        );

        Ok(assessment)
    }

    /// Log recommendations that appeared or disappeared since the last cycle
    fn log_transitions(&mut self, assessment: &Assessment) {
        let current: BTreeSet<RecommendationKind> =
            assessment.recommendations.iter().map(|r| r.kind).collect();

        for rec in &assessment.recommendations {
            if !self.active.contains(&rec.kind) {
                self.logger
                    .log_recommendation_raised(rec, assessment.metrics.value_for(rec.kind));
            }
        }

        for kind in self.active.difference(&current) {
            self.logger.log_recommendation_cleared(*kind);
        }

        self.active = current;
    }

    /// Kinds raised by the most recent successful cycle
    pub fn active_kinds(&self) -> &BTreeSet<RecommendationKind> {
        &self.active
    }
}

/// Builder for the polling loop
pub struct CollectionLoopBuilder {
    source: Option<Arc<dyn SampleSource>>,
    service: Option<Arc<AggregationService>>,
    health: HealthRegistry,
    logger: StructuredLogger,
    config: CollectionConfig,
}

impl CollectionLoopBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            service: None,
            health: HealthRegistry::new(),
            logger: StructuredLogger::new("unknown"),
            config: CollectionConfig::default(),
        }
    }

    pub fn source(mut self, source: Arc<dyn SampleSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn service(mut self, service: Arc<AggregationService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn max_consecutive_failures(mut self, failures: u32) -> Self {
        self.config.max_consecutive_failures = failures;
        self
    }

    pub fn build(self) -> Result<CollectionLoop> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Sample source is required"))?;
        let service = self
            .service
            .ok_or_else(|| anyhow::anyhow!("Aggregation service is required"))?;

        if self.config.interval.is_zero() {
            anyhow::bail!("Collection interval must be greater than zero");
        }

        Ok(CollectionLoop::new(
            source,
            service,
            self.health,
            self.logger,
            self.config,
        ))
    }
}

impl Default for CollectionLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
