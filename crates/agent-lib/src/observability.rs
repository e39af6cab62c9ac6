//! Observability for the memwatch agent
//!
//! Provides:
//! - Prometheus gauges mirroring the latest derived metrics
//! - Structured logging of collection and recommendation events

use crate::models::{Assessment, Recommendation, RecommendationKind, Severity};
use crate::service::ServiceStats;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_gauge,
    register_int_gauge_vec, Gauge, Histogram, IntCounter, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for collection latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    fragmentation_ratio: Gauge,
    pressure_score: Gauge,
    page_fault_rate: Gauge,
    swap_usage_percent: Gauge,
    used_bytes: IntGauge,
    peak_used_bytes: IntGauge,
    history_entries: IntGauge,
    active_recommendations: IntGaugeVec,
    samples_ingested: IntCounter,
    collection_errors: IntCounter,
    collection_latency_seconds: Histogram,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            fragmentation_ratio: register_gauge!(
                "memwatch_fragmentation_ratio",
                "Share of total memory that is unavailable"
            )
            .expect("Failed to register fragmentation_ratio"),

            pressure_score: register_gauge!(
                "memwatch_pressure_score",
                "Weighted memory and swap scarcity score"
            )
            .expect("Failed to register pressure_score"),

            page_fault_rate: register_gauge!(
                "memwatch_page_fault_rate",
                "Page faults per second since the previous sample"
            )
            .expect("Failed to register page_fault_rate"),

            swap_usage_percent: register_gauge!(
                "memwatch_swap_usage_percent",
                "Swap occupancy in percent"
            )
            .expect("Failed to register swap_usage_percent"),

            used_bytes: register_int_gauge!(
                "memwatch_used_bytes",
                "Memory unavailable to new allocations"
            )
            .expect("Failed to register used_bytes"),

            peak_used_bytes: register_int_gauge!(
                "memwatch_peak_used_bytes",
                "Highest used memory observed since startup"
            )
            .expect("Failed to register peak_used_bytes"),

            history_entries: register_int_gauge!(
                "memwatch_history_entries",
                "Entries currently retained in the sliding window"
            )
            .expect("Failed to register history_entries"),

            active_recommendations: register_int_gauge_vec!(
                "memwatch_active_recommendations",
                "Recommendations raised by the latest evaluation",
                &["kind", "severity"]
            )
            .expect("Failed to register active_recommendations"),

            samples_ingested: register_int_counter!(
                "memwatch_samples_ingested_total",
                "Total number of samples ingested"
            )
            .expect("Failed to register samples_ingested"),

            collection_errors: register_int_counter!(
                "memwatch_collection_errors_total",
                "Total number of failed sample collections"
            )
            .expect("Failed to register collection_errors"),

            collection_latency_seconds: register_histogram!(
                "memwatch_collection_latency_seconds",
                "Time spent reading counters and ingesting a sample",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collection_latency_seconds"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics.
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    /// Mirror an assessment and the service counters into the gauges
    pub fn record_assessment(&self, assessment: &Assessment, used_bytes: u64, stats: &ServiceStats) {
        let inner = self.inner();
        let metrics = &assessment.metrics;

        inner.fragmentation_ratio.set(metrics.fragmentation);
        inner.pressure_score.set(metrics.pressure_score);
        inner.page_fault_rate.set(metrics.page_fault_rate);
        inner.swap_usage_percent.set(metrics.swap_usage_percent);
        inner.used_bytes.set(clamp_i64(used_bytes));
        inner.peak_used_bytes.set(clamp_i64(stats.peak_used_bytes));
        inner.history_entries.set(stats.window_len as i64);
        inner.samples_ingested.inc();

        inner.active_recommendations.reset();
        for rec in &assessment.recommendations {
            inner
                .active_recommendations
                .with_label_values(&[rec.kind.as_str(), rec.severity.as_str()])
                .set(1);
        }
    }

    /// Every registered metric family, for text exposition
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.inner();
        prometheus::gather()
    }

    pub fn inc_collection_errors(&self) {
        self.inner().collection_errors.inc();
    }

    pub fn observe_collection_latency(&self, duration_secs: f64) {
        self.inner().collection_latency_seconds.observe(duration_secs);
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Structured logger for agent events
#[derive(Clone)]
pub struct StructuredLogger {
    host_name: String,
}

impl StructuredLogger {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, window_capacity: usize, interval_secs: u64) {
        info!(
            event = "agent_started",
            host = %self.host_name,
            agent_version = %version,
            window_capacity = window_capacity,
            interval_secs = interval_secs,
            "Memory telemetry agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            host = %self.host_name,
            reason = %reason,
            "Memory telemetry agent shutting down"
        );
    }

    /// A rule started firing
    pub fn log_recommendation_raised(&self, rec: &Recommendation, observed: f64) {
        match rec.severity {
            Severity::High => warn!(
                event = "recommendation_raised",
                host = %self.host_name,
                kind = %rec.kind,
                severity = %rec.severity,
                observed = observed,
                advice = %rec.message,
                "Memory recommendation raised"
            ),
            Severity::Medium | Severity::Low => info!(
                event = "recommendation_raised",
                host = %self.host_name,
                kind = %rec.kind,
                severity = %rec.severity,
                observed = observed,
                advice = %rec.message,
                "Memory recommendation raised"
            ),
        }
    }

    /// A rule stopped firing
    pub fn log_recommendation_cleared(&self, kind: RecommendationKind) {
        info!(
            event = "recommendation_cleared",
            host = %self.host_name,
            kind = %kind,
            "Memory recommendation cleared"
        );
    }

    pub fn log_collection_failed(&self, error: &anyhow::Error, consecutive_failures: u32) {
        warn!(
            event = "collection_failed",
            host = %self.host_name,
            error = %error,
            consecutive_failures = consecutive_failures,
            "Failed to collect memory sample, keeping previous state"
        );
    }
}
