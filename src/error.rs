use std::collections::TryReserveError;
use thiserror::Error;

/// Failures reported by table construction and mutation.
///
/// A missing key is not an error; `lookup`, `contains` and `remove` report
/// absence through their return values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("table capacity must be greater than zero")]
    ZeroCapacity,
    #[error("invalid load factors: max {max}, min {min} (need 0 <= min < max, max finite)")]
    InvalidLoadFactor { max: f64, min: f64 },
    #[error("growth factor must be at least 2, got {0}")]
    InvalidGrowthFactor(usize),
    #[error("shrink factor must be at least 2, got {0}")]
    InvalidShrinkFactor(usize),
    #[error("shrink would overshoot max load: min {min} * shrink factor {factor} >= max {max}")]
    InvalidShrinkPolicy { min: f64, factor: usize, max: f64 },
    #[error("failed to allocate table storage: {0}")]
    Allocation(#[from] TryReserveError),
}
