//! Derivation of health metrics from raw memory counters
//!
//! Degenerate input (zero totals, counter resets, clocks that did not
//! advance) is clamped or zeroed; derivation never fails.

use crate::config::PressureWeights;
use crate::models::{DerivedMetrics, MemorySample};

/// Maps raw samples to [`DerivedMetrics`]
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricDeriver {
    weights: PressureWeights,
}

impl MetricDeriver {
    pub fn new(weights: PressureWeights) -> Self {
        Self { weights }
    }

    /// Derive metrics for `current`.
    ///
    /// # Arguments
    /// * `current` - Sample being ingested
    /// * `previous` - Baseline sample for rate metrics, if any
    /// * `elapsed_secs` - Seconds between `previous` and `current`
    pub fn derive(
        &self,
        current: &MemorySample,
        previous: Option<&MemorySample>,
        elapsed_secs: f64,
    ) -> DerivedMetrics {
        let memory_scarcity = memory_scarcity(current);
        let swap_saturation = swap_saturation(current);

        let pressure_score =
            self.weights.memory * memory_scarcity + self.weights.swap * swap_saturation;

        DerivedMetrics {
            fragmentation: clamp01(memory_scarcity),
            pressure_score: clamp01(pressure_score),
            page_fault_rate: page_fault_rate(current, previous, elapsed_secs),
            swap_usage_percent: (swap_saturation * 100.0).clamp(0.0, 100.0),
        }
    }
}

/// `1 - available/total`, or 0 when total is zero
fn memory_scarcity(sample: &MemorySample) -> f64 {
    if sample.total_bytes == 0 {
        return 0.0;
    }
    clamp01(1.0 - sample.available_bytes as f64 / sample.total_bytes as f64)
}

/// `(swap_total - swap_free) / swap_total`, or 0 without swap
fn swap_saturation(sample: &MemorySample) -> f64 {
    if sample.swap_total_bytes == 0 {
        return 0.0;
    }
    clamp01(sample.swap_used_bytes() as f64 / sample.swap_total_bytes as f64)
}

/// Faults per second since `previous`.
///
/// Zero without a baseline, without elapsed time, or when the cumulative
/// counters went backwards (source restart).
fn page_fault_rate(
    current: &MemorySample,
    previous: Option<&MemorySample>,
    elapsed_secs: f64,
) -> f64 {
    let Some(previous) = previous else {
        return 0.0;
    };

    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        return 0.0;
    }

    let Some(delta) = current.total_faults().checked_sub(previous.total_faults()) else {
        tracing::debug!(
            event = "counter_reset",
            current_faults = current.total_faults(),
            previous_faults = previous.total_faults(),
            "Page fault counters went backwards, reporting zero rate"
        );
        return 0.0;
    };

    finite_or_zero(delta as f64 / elapsed_secs).max(0.0)
}

fn clamp01(value: f64) -> f64 {
    finite_or_zero(value).clamp(0.0, 1.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KB: u64 = 1024;

    fn sample(total: u64, available: u64, swap_total: u64, swap_free: u64) -> MemorySample {
        MemorySample {
            total_bytes: total,
            free_bytes: available,
            available_bytes: available,
            swap_total_bytes: swap_total,
            swap_free_bytes: swap_free,
            ..Default::default()
        }
    }

    fn with_faults(mut sample: MemorySample, major: u64, minor: u64) -> MemorySample {
        sample.major_faults = major;
        sample.minor_faults = minor;
        sample
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_scenario() {
        let deriver = MetricDeriver::default();
        let current = sample(16_000_000 * KB, 2_000_000 * KB, 4_000_000 * KB, 200_000 * KB);

        let metrics = deriver.derive(&current, None, 0.0);

        assert_close(metrics.fragmentation, 0.875);
        assert_close(metrics.swap_usage_percent, 95.0);
        assert_close(metrics.pressure_score, 0.7 * 0.875 + 0.3 * 0.95);
        assert_eq!(metrics.page_fault_rate, 0.0);
    }

    #[test]
    fn test_zero_total_memory() {
        let deriver = MetricDeriver::default();
        let current = sample(0, 0, 0, 0);

        let metrics = deriver.derive(&current, None, 0.0);

        assert_eq!(metrics.fragmentation, 0.0);
        assert_eq!(metrics.pressure_score, 0.0);
        assert_eq!(metrics.swap_usage_percent, 0.0);
    }

    #[test]
    fn test_zero_total_memory_keeps_swap_term() {
        let deriver = MetricDeriver::default();
        let current = sample(0, 0, 1000, 0);

        let metrics = deriver.derive(&current, None, 0.0);

        assert_eq!(metrics.fragmentation, 0.0);
        assert_close(metrics.pressure_score, 0.3);
        assert_close(metrics.swap_usage_percent, 100.0);
    }

    #[test]
    fn test_no_swap() {
        let deriver = MetricDeriver::default();
        let current = sample(1000, 500, 0, 0);

        let metrics = deriver.derive(&current, None, 0.0);

        assert_eq!(metrics.swap_usage_percent, 0.0);
        assert_close(metrics.pressure_score, 0.35);
    }

    #[test]
    fn test_available_above_total_is_clamped() {
        let deriver = MetricDeriver::default();
        let current = sample(1000, 1500, 100, 150);

        let metrics = deriver.derive(&current, None, 0.0);

        assert_eq!(metrics.fragmentation, 0.0);
        assert_eq!(metrics.pressure_score, 0.0);
        assert_eq!(metrics.swap_usage_percent, 0.0);
    }

    #[test]
    fn test_heavy_weights_are_clamped() {
        let deriver = MetricDeriver::new(PressureWeights {
            memory: 2.0,
            swap: 2.0,
        });
        let current = sample(1000, 0, 1000, 0);

        let metrics = deriver.derive(&current, None, 0.0);

        assert_eq!(metrics.pressure_score, 1.0);
        assert_eq!(metrics.fragmentation, 1.0);
    }

    #[test]
    fn test_page_fault_rate() {
        let deriver = MetricDeriver::default();
        let previous = with_faults(sample(1000, 500, 0, 0), 10, 1_000);
        let current = with_faults(sample(1000, 500, 0, 0), 20, 1_490);

        let metrics = deriver.derive(&current, Some(&previous), 5.0);

        assert_close(metrics.page_fault_rate, 100.0);
    }

    #[test]
    fn test_first_sample_has_zero_fault_rate() {
        let deriver = MetricDeriver::default();
        let current = with_faults(sample(1000, 500, 0, 0), 5_000, 900_000);

        let metrics = deriver.derive(&current, None, 5.0);

        assert_eq!(metrics.page_fault_rate, 0.0);
    }

    #[test]
    fn test_counter_reset_yields_zero_rate() {
        let deriver = MetricDeriver::default();
        let previous = with_faults(sample(1000, 500, 0, 0), 500, 50_000);
        let current = with_faults(sample(1000, 500, 0, 0), 1, 20);

        let metrics = deriver.derive(&current, Some(&previous), 5.0);

        assert_eq!(metrics.page_fault_rate, 0.0);
    }

    #[test]
    fn test_non_positive_elapsed_yields_zero_rate() {
        let deriver = MetricDeriver::default();
        let previous = with_faults(sample(1000, 500, 0, 0), 0, 0);
        let current = with_faults(sample(1000, 500, 0, 0), 0, 100);

        for elapsed in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let metrics = deriver.derive(&current, Some(&previous), elapsed);
            assert_eq!(metrics.page_fault_rate, 0.0, "elapsed = {elapsed}");
        }
    }

    #[test]
    fn test_outputs_always_finite() {
        let deriver = MetricDeriver::default();
        let extremes = [0, 1, u64::MAX / 2, u64::MAX];

        for &total in &extremes {
            for &available in &extremes {
                let current = with_faults(sample(total, available, total, available), u64::MAX, 1);
                let previous = sample(total, available, total, available);
                let metrics = deriver.derive(&current, Some(&previous), 1e-300);

                assert!(metrics.fragmentation.is_finite());
                assert!(metrics.pressure_score.is_finite());
                assert!(metrics.page_fault_rate.is_finite());
                assert!(metrics.swap_usage_percent.is_finite());
                assert!(metrics.page_fault_rate >= 0.0);
                assert!((0.0..=1.0).contains(&metrics.fragmentation));
                assert!((0.0..=1.0).contains(&metrics.pressure_score));
                assert!((0.0..=100.0).contains(&metrics.swap_usage_percent));
            }
        }
    }
}
