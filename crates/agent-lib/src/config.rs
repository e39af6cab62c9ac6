//! Engine configuration
//!
//! All values default to the reference behavior and can be overridden at
//! construction time (the agent binary layers them from a file and the
//! environment).

use crate::error::{EngineError, EngineResult};
use crate::models::Severity;
use crate::window::DEFAULT_WINDOW_CAPACITY;
use serde::{Deserialize, Serialize};

/// Default fragmentation threshold (ratio)
pub const DEFAULT_FRAGMENTATION_THRESHOLD: f64 = 0.70;

/// Default pressure score threshold (ratio)
pub const DEFAULT_PRESSURE_THRESHOLD: f64 = 0.80;

/// Default swap usage threshold (percent)
pub const DEFAULT_SWAP_THRESHOLD_PERCENT: f64 = 80.0;

/// Default weight of available-memory scarcity in the pressure score
pub const DEFAULT_MEMORY_WEIGHT: f64 = 0.7;

/// Default weight of swap saturation in the pressure score
pub const DEFAULT_SWAP_WEIGHT: f64 = 0.3;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of window entries retained for history
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    #[serde(default)]
    pub pressure_weights: PressureWeights,

    #[serde(default)]
    pub rules: RuleSettings,
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            pressure_weights: PressureWeights::default(),
            rules: RuleSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot honor
    pub fn validate(&self) -> EngineResult<()> {
        if self.window_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "window_capacity must be at least 1".to_string(),
            ));
        }

        for (name, weight) in [
            ("pressure_weights.memory", self.pressure_weights.memory),
            ("pressure_weights.swap", self.pressure_weights.swap),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {weight}"
                )));
            }
        }

        for (name, rule) in [
            ("rules.fragmentation", &self.rules.fragmentation),
            ("rules.pressure", &self.rules.pressure),
            ("rules.swap", &self.rules.swap),
        ] {
            if !rule.threshold.is_finite() {
                return Err(EngineError::InvalidConfig(format!(
                    "{name}.threshold must be finite, got {}",
                    rule.threshold
                )));
            }
        }

        Ok(())
    }
}

/// Weights of the two terms of the pressure score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureWeights {
    #[serde(default = "default_memory_weight")]
    pub memory: f64,
    #[serde(default = "default_swap_weight")]
    pub swap: f64,
}

fn default_memory_weight() -> f64 {
    DEFAULT_MEMORY_WEIGHT
}

fn default_swap_weight() -> f64 {
    DEFAULT_SWAP_WEIGHT
}

impl Default for PressureWeights {
    fn default() -> Self {
        Self {
            memory: DEFAULT_MEMORY_WEIGHT,
            swap: DEFAULT_SWAP_WEIGHT,
        }
    }
}

/// Threshold and severity of a single diagnostic rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// The rule fires when the metric is strictly greater than this
    pub threshold: f64,
    pub severity: Severity,
}

/// Per-rule settings, one entry per row of the rule table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleSettings {
    #[serde(default = "default_fragmentation_rule")]
    pub fragmentation: RuleConfig,
    #[serde(default = "default_pressure_rule")]
    pub pressure: RuleConfig,
    #[serde(default = "default_swap_rule")]
    pub swap: RuleConfig,
}

fn default_fragmentation_rule() -> RuleConfig {
    RuleConfig {
        threshold: DEFAULT_FRAGMENTATION_THRESHOLD,
        severity: Severity::High,
    }
}

fn default_pressure_rule() -> RuleConfig {
    RuleConfig {
        threshold: DEFAULT_PRESSURE_THRESHOLD,
        severity: Severity::High,
    }
}

fn default_swap_rule() -> RuleConfig {
    RuleConfig {
        threshold: DEFAULT_SWAP_THRESHOLD_PERCENT,
        severity: Severity::Medium,
    }
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            fragmentation: default_fragmentation_rule(),
            pressure: default_pressure_rule(),
            swap: default_swap_rule(),
        }
    }
}
