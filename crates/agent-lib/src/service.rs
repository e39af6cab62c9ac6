//! Aggregation service
//!
//! Owns the sliding window and the rate baseline. A single writer ingests
//! samples; readers get independent snapshots and never observe a
//! half-applied ingestion.

use crate::config::EngineConfig;
use crate::diagnostics::{DiagnosticRuleEngine, MetricDeriver};
use crate::error::{EngineError, EngineResult};
use crate::models::{Assessment, DerivedMetrics, MemorySample, WindowEntry};
use crate::window::SlidingWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Counters describing the service since construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub ingested: u64,
    pub peak_used_bytes: u64,
    pub window_len: usize,
    pub window_capacity: usize,
}

/// Sample and timestamp used as the baseline for rate metrics
#[derive(Debug, Clone)]
struct Baseline {
    sample: MemorySample,
    observed_at: DateTime<Utc>,
}

#[derive(Debug)]
struct ServiceState {
    window: SlidingWindow<WindowEntry>,
    baseline: Option<Baseline>,
    latest: Option<DerivedMetrics>,
    ingested: u64,
    peak_used_bytes: u64,
}

/// Ingests samples, derives metrics and evaluates diagnostics
#[derive(Debug)]
pub struct AggregationService {
    deriver: MetricDeriver,
    rules: DiagnosticRuleEngine,
    state: RwLock<ServiceState>,
}

impl AggregationService {
    /// Build a service from validated configuration
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;

        Ok(Self {
            deriver: MetricDeriver::new(config.pressure_weights),
            rules: DiagnosticRuleEngine::new(config.rules),
            state: RwLock::new(ServiceState {
                window: SlidingWindow::new(config.window_capacity),
                baseline: None,
                latest: None,
                ingested: 0,
                peak_used_bytes: 0,
            }),
        })
    }

    /// Ingest one sample observed at `observed_at`.
    ///
    /// The previously ingested sample is the baseline for the page-fault
    /// rate; the first call in a session reports a rate of zero.
    pub fn ingest(
        &self,
        sample: MemorySample,
        observed_at: DateTime<Utc>,
    ) -> EngineResult<Assessment> {
        let metrics = {
            let mut state = self.write_state()?;

            let elapsed_secs = state
                .baseline
                .as_ref()
                .map(|b| elapsed_secs(b.observed_at, observed_at))
                .unwrap_or(0.0);

            let metrics = self.deriver.derive(
                &sample,
                state.baseline.as_ref().map(|b| &b.sample),
                elapsed_secs,
            );

            state.peak_used_bytes = state.peak_used_bytes.max(sample.used_bytes());
            state.ingested += 1;
            state.window.push(WindowEntry {
                sample: sample.clone(),
                metrics,
                observed_at,
            });
            state.latest = Some(metrics);
            state.baseline = Some(Baseline {
                sample,
                observed_at,
            });

            debug!(
                ingested = state.ingested,
                elapsed_secs = elapsed_secs,
                fragmentation = metrics.fragmentation,
                pressure_score = metrics.pressure_score,
                page_fault_rate = metrics.page_fault_rate,
                swap_usage_percent = metrics.swap_usage_percent,
                "Sample ingested"
            );

            metrics
        };

        Ok(Assessment {
            recommendations: self.rules.evaluate(&metrics),
            metrics,
        })
    }

    /// Metrics derived from the most recent ingestion
    pub fn latest(&self) -> EngineResult<DerivedMetrics> {
        self.read_state()?.latest.ok_or(EngineError::NoDataYet)
    }

    /// Re-evaluate the latest metrics against the rule table
    pub fn latest_assessment(&self) -> EngineResult<Assessment> {
        let metrics = self.latest()?;
        Ok(Assessment {
            recommendations: self.rules.evaluate(&metrics),
            metrics,
        })
    }

    /// Retained window entries, oldest first
    pub fn history(&self) -> EngineResult<Vec<WindowEntry>> {
        Ok(self.read_state()?.window.snapshot())
    }

    /// Whether at least one sample has been ingested
    pub fn has_data(&self) -> EngineResult<bool> {
        Ok(self.read_state()?.latest.is_some())
    }

    pub fn stats(&self) -> EngineResult<ServiceStats> {
        let state = self.read_state()?;
        Ok(ServiceStats {
            ingested: state.ingested,
            peak_used_bytes: state.peak_used_bytes,
            window_len: state.window.len(),
            window_capacity: state.window.capacity(),
        })
    }

    fn read_state(&self) -> EngineResult<RwLockReadGuard<'_, ServiceState>> {
        self.state.read().map_err(|_| EngineError::LockPoisoned)
    }

    fn write_state(&self) -> EngineResult<RwLockWriteGuard<'_, ServiceState>> {
        self.state.write().map_err(|_| EngineError::LockPoisoned)
    }
}

/// Seconds from `from` to `to`; negative if the clock went backwards
fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}
