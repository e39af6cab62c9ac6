//! Memory telemetry aggregation and diagnostics
//!
//! This crate provides the core functionality for:
//! - Collecting raw memory counters from procfs
//! - Retaining a bounded, time-ordered history of samples
//! - Deriving health metrics (fragmentation, pressure, fault rate, swap usage)
//! - Evaluating those metrics into ranked recommendations
//! - Health checks and observability

pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod service;
pub mod window;

pub use config::EngineConfig;
pub use error::{CollectorError, EngineError, EngineResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use service::{AggregationService, ServiceStats};
pub use window::SlidingWindow;
