//! Memory telemetry collection
//!
//! This module provides sample sources for raw memory counters and the
//! polling loop that feeds them into the aggregation service. Reading
//! counters happens here, before the engine is invoked; a failed read
//! never reaches the engine.

mod procfs;
mod r#loop;


pub use procfs::{parse_kv_stats, sample_from_procfs, ProcfsSource};
pub use r#loop::{CollectionConfig, CollectionLoop, CollectionLoopBuilder};

use crate::models::MemorySample;
use anyhow::Result;

pub use async_trait::async_trait;

/// Trait for anything that can produce a raw memory sample
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Read the current counters
    async fn sample(&self) -> Result<MemorySample>;
}
