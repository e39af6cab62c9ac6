//! Memory health diagnostics
//!
//! This module provides:
//! - Derivation of health metrics (fragmentation, pressure, fault rate, swap usage)
//! - Threshold rules turning those metrics into ranked recommendations

mod derive;
mod rules;

pub use derive::MetricDeriver;
pub use rules::{DiagnosticRuleEngine, Rule};
