//! Core data models for the memory telemetry engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw system memory counters observed at one instant.
///
/// Memory fields are in bytes. Fault counters are cumulative since boot and
/// never decrease unless the source restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySample {
    // Core memory
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub available_bytes: u64,
    pub buffers_bytes: u64,
    pub cached_bytes: u64,

    // Swap
    pub swap_total_bytes: u64,
    pub swap_free_bytes: u64,
    pub swap_cached_bytes: u64,

    // Page states
    pub active_bytes: u64,
    pub inactive_bytes: u64,
    pub dirty_bytes: u64,
    pub mapped_bytes: u64,

    // Anonymous / file-backed breakdown
    pub anon_pages_bytes: u64,
    pub active_anon_bytes: u64,
    pub inactive_anon_bytes: u64,
    pub active_file_bytes: u64,
    pub inactive_file_bytes: u64,

    // Kernel memory
    pub slab_bytes: u64,
    pub kernel_stack_bytes: u64,
    pub page_tables_bytes: u64,
    pub vmalloc_used_bytes: u64,
    pub committed_bytes: u64,

    // Cumulative page-fault counters
    pub major_faults: u64,
    pub minor_faults: u64,
}

impl MemorySample {
    /// Memory not available to new allocations
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    /// Swap currently occupied
    pub fn swap_used_bytes(&self) -> u64 {
        self.swap_total_bytes.saturating_sub(self.swap_free_bytes)
    }

    /// Major plus minor faults
    pub fn total_faults(&self) -> u64 {
        self.major_faults.saturating_add(self.minor_faults)
    }
}

/// Health indicators derived from a single sample.
///
/// Every field is finite and clamped to its documented range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Share of total memory that is unavailable, in `[0, 1]`
    pub fragmentation: f64,
    /// Weighted memory + swap scarcity, in `[0, 1]`
    pub pressure_score: f64,
    /// Page faults per second since the previous sample, `>= 0`
    pub page_fault_rate: f64,
    /// Swap occupancy, in `[0, 100]`
    pub swap_usage_percent: f64,
}

impl DerivedMetrics {
    /// Value inspected by the rule of the given kind
    pub fn value_for(&self, kind: RecommendationKind) -> f64 {
        match kind {
            RecommendationKind::Fragmentation => self.fragmentation,
            RecommendationKind::Pressure => self.pressure_score,
            RecommendationKind::Swap => self.swap_usage_percent,
        }
    }
}

/// A sample retained in the sliding window together with the metrics
/// computed when it was ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowEntry {
    pub sample: MemorySample,
    pub metrics: DerivedMetrics,
    pub observed_at: DateTime<Utc>,
}

/// Which diagnostic rule produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Fragmentation,
    Pressure,
    Swap,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationKind::Fragmentation => "fragmentation",
            RecommendationKind::Pressure => "pressure",
            RecommendationKind::Swap => "swap",
        }
    }
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation severity. Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagnostic finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub severity: Severity,
    pub message: String,
}

/// Result of ingesting or re-evaluating a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub metrics: DerivedMetrics,
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_used_bytes_saturates() {
        let sample = MemorySample {
            total_bytes: 100,
            available_bytes: 150,
            ..Default::default()
        };
        assert_eq!(sample.used_bytes(), 0);

        let sample = MemorySample {
            total_bytes: 100,
            available_bytes: 40,
            ..Default::default()
        };
        assert_eq!(sample.used_bytes(), 60);
    }

    #[test]
    fn test_total_faults_saturates() {
        let sample = MemorySample {
            major_faults: u64::MAX,
            minor_faults: 10,
            ..Default::default()
        };
        assert_eq!(sample.total_faults(), u64::MAX);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_recommendation_serializes_lowercase() {
        let rec = Recommendation {
            kind: RecommendationKind::Swap,
            severity: Severity::Medium,
            message: "High swap usage detected.".to_string(),
        };

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["kind"], "swap");
        assert_eq!(json["severity"], "medium");
    }
}
