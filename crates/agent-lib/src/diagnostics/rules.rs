//! Threshold-based diagnostic rules
//!
//! The rule table is evaluated in a fixed order (fragmentation, pressure,
//! swap). Output is sorted by descending severity; the sort is stable so
//! equal severities keep table order.

use crate::config::{RuleConfig, RuleSettings};
use crate::models::{DerivedMetrics, Recommendation, RecommendationKind, Severity};

const FRAGMENTATION_MESSAGE: &str =
    "High memory fragmentation detected. Consider compacting memory or restarting the application.";
const PRESSURE_MESSAGE: &str =
    "System is under memory pressure. Consider freeing up memory or adding more RAM.";
const SWAP_MESSAGE: &str = "High swap usage detected. This may impact system performance.";

/// One row of the rule table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub kind: RecommendationKind,
    pub threshold: f64,
    pub severity: Severity,
}

impl Rule {
    fn from_config(kind: RecommendationKind, config: RuleConfig) -> Self {
        Self {
            kind,
            threshold: config.threshold,
            severity: config.severity,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            RecommendationKind::Fragmentation => FRAGMENTATION_MESSAGE,
            RecommendationKind::Pressure => PRESSURE_MESSAGE,
            RecommendationKind::Swap => SWAP_MESSAGE,
        }
    }

    fn evaluate(&self, metrics: &DerivedMetrics) -> Option<Recommendation> {
        if metrics.value_for(self.kind) > self.threshold {
            Some(Recommendation {
                kind: self.kind,
                severity: self.severity,
                message: self.message().to_string(),
            })
        } else {
            None
        }
    }
}

/// Evaluates [`DerivedMetrics`] against the rule table
#[derive(Debug, Clone)]
pub struct DiagnosticRuleEngine {
    rules: [Rule; 3],
}

impl DiagnosticRuleEngine {
    pub fn new(settings: RuleSettings) -> Self {
        Self {
            rules: [
                Rule::from_config(RecommendationKind::Fragmentation, settings.fragmentation),
                Rule::from_config(RecommendationKind::Pressure, settings.pressure),
                Rule::from_config(RecommendationKind::Swap, settings.swap),
            ],
        }
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Produce recommendations for `metrics`, most severe first.
    ///
    /// Pure and deterministic: equal inputs give equal outputs.
    pub fn evaluate(&self, metrics: &DerivedMetrics) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = self
            .rules
            .iter()
            .filter_map(|rule| rule.evaluate(metrics))
            .collect();

        recommendations.sort_by(|a, b| b.severity.cmp(&a.severity));
        recommendations
    }
}

impl Default for DiagnosticRuleEngine {
    fn default() -> Self {
        Self::new(RuleSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(fragmentation: f64, pressure_score: f64, swap_usage_percent: f64) -> DerivedMetrics {
        DerivedMetrics {
            fragmentation,
            pressure_score,
            page_fault_rate: 0.0,
            swap_usage_percent,
        }
    }

    fn kinds(recommendations: &[Recommendation]) -> Vec<RecommendationKind> {
        recommendations.iter().map(|r| r.kind).collect()
    }

    #[test]
    fn test_healthy_metrics_yield_nothing() {
        let engine = DiagnosticRuleEngine::default();
        assert!(engine.evaluate(&metrics(0.2, 0.3, 10.0)).is_empty());
    }

    #[test]
    fn test_fragmentation_and_swap() {
        let engine = DiagnosticRuleEngine::default();

        let result = engine.evaluate(&metrics(0.875, 0.5, 95.0));

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].kind, RecommendationKind::Fragmentation);
        assert_eq!(result[0].severity, Severity::High);
        assert_eq!(result[1].kind, RecommendationKind::Swap);
        assert_eq!(result[1].severity, Severity::Medium);
    }

    #[test]
    fn test_all_rules_fire_in_severity_then_table_order() {
        let engine = DiagnosticRuleEngine::default();

        let result = engine.evaluate(&metrics(0.9, 0.9, 90.0));

        assert_eq!(
            kinds(&result),
            vec![
                RecommendationKind::Fragmentation,
                RecommendationKind::Pressure,
                RecommendationKind::Swap,
            ]
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        let engine = DiagnosticRuleEngine::default();
        assert!(engine.evaluate(&metrics(0.70, 0.80, 80.0)).is_empty());
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let engine = DiagnosticRuleEngine::default();
        let m = metrics(0.95, 0.85, 99.0);

        assert_eq!(engine.evaluate(&m), engine.evaluate(&m));
    }

    #[test]
    fn test_severity_outranks_table_order() {
        let settings = RuleSettings {
            fragmentation: RuleConfig {
                threshold: 0.5,
                severity: Severity::Low,
            },
            pressure: RuleConfig {
                threshold: 0.5,
                severity: Severity::Medium,
            },
            swap: RuleConfig {
                threshold: 50.0,
                severity: Severity::High,
            },
        };
        let engine = DiagnosticRuleEngine::new(settings);

        let result = engine.evaluate(&metrics(0.6, 0.6, 60.0));

        assert_eq!(
            kinds(&result),
            vec![
                RecommendationKind::Swap,
                RecommendationKind::Pressure,
                RecommendationKind::Fragmentation,
            ]
        );
    }

    #[test]
    fn test_messages_name_the_remedy() {
        let engine = DiagnosticRuleEngine::default();
        let result = engine.evaluate(&metrics(0.9, 0.9, 90.0));

        assert!(result[0].message.contains("compacting memory"));
        assert!(result[1].message.contains("adding more RAM"));
        assert!(result[2].message.contains("swap usage"));
    }

    #[test]
    fn test_rule_table_order() {
        let engine = DiagnosticRuleEngine::default();
        let table: Vec<_> = engine.rules().iter().map(|r| r.kind).collect();

        assert_eq!(
            table,
            vec![
                RecommendationKind::Fragmentation,
                RecommendationKind::Pressure,
                RecommendationKind::Swap,
            ]
        );
    }
}
