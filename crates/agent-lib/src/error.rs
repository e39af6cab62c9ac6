//! Error types for the engine and its sample sources

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the aggregation engine.
///
/// Degenerate numeric input (zero totals, counter resets) is never an error;
/// the deriver clamps or zeroes it instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Derived state was queried before the first ingestion
    #[error("no telemetry has been ingested yet")]
    NoDataYet,

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("engine state lock poisoned")]
    LockPoisoned,
}

/// A sample source could not produce a sample.
///
/// These are retryable upstream conditions owned by the caller; the engine
/// is never invoked when one occurs.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file} is missing required field {field}")]
    MissingField {
        file: &'static str,
        field: &'static str,
    },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
