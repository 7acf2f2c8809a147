//! Per-table tunables.

use crate::error::TableError;

pub const DEFAULT_INITIAL_CAPACITY: usize = 16;
pub const DEFAULT_GROWTH_FACTOR: usize = 2;
pub const DEFAULT_SHRINK_FACTOR: usize = 2;
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

/// Sizing policy for one `ChainHashMap`.
///
/// - Before an insert, the table grows to `capacity * growth_factor` when
///   `capacity * max_load_factor <= len`.
/// - Before a remove, the table shrinks to `capacity / shrink_factor`
///   (never below one bucket) when `len <= capacity * min_load_factor`.
///
/// `min_load_factor * shrink_factor` must stay below `max_load_factor`,
/// otherwise a shrink could land the table above its growth threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct TableConfig {
    pub initial_capacity: usize,
    pub growth_factor: usize,
    pub shrink_factor: usize,
    pub max_load_factor: f64,
    pub min_load_factor: f64,
    pub track_stats: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            shrink_factor: DEFAULT_SHRINK_FACTOR,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            min_load_factor: 1.0 - DEFAULT_MAX_LOAD_FACTOR,
            track_stats: false,
        }
    }
}

impl TableConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            initial_capacity: capacity,
            ..Self::default()
        }
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn growth_factor(mut self, factor: usize) -> Self {
        self.growth_factor = factor;
        self
    }

    pub fn shrink_factor(mut self, factor: usize) -> Self {
        self.shrink_factor = factor;
        self
    }

    /// Sets the growth threshold and resets the shrink threshold to its
    /// complement, `1 - max`, clamped at zero. When the complement times the
    /// current shrink factor would reach `max`, the shrink threshold becomes
    /// `max / (2 * shrink_factor)` instead.
    pub fn max_load_factor(mut self, max: f64) -> Self {
        let factor = self.shrink_factor.max(1) as f64;
        let mut min = (1.0 - max).max(0.0);
        if min * factor >= max {
            min = max / (2.0 * factor);
        }
        self.max_load_factor = max;
        self.min_load_factor = min;
        self
    }

    pub fn min_load_factor(mut self, min: f64) -> Self {
        self.min_load_factor = min;
        self
    }

    pub fn track_stats(mut self, enabled: bool) -> Self {
        self.track_stats = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), TableError> {
        if self.initial_capacity == 0 {
            return Err(TableError::ZeroCapacity);
        }
        let (max, min) = (self.max_load_factor, self.min_load_factor);
        if !(max.is_finite() && max > 0.0 && min >= 0.0 && min < max) {
            return Err(TableError::InvalidLoadFactor { max, min });
        }
        if self.growth_factor < 2 {
            return Err(TableError::InvalidGrowthFactor(self.growth_factor));
        }
        if self.shrink_factor < 2 {
            return Err(TableError::InvalidShrinkFactor(self.shrink_factor));
        }
        if min * self.shrink_factor as f64 >= max {
            return Err(TableError::InvalidShrinkPolicy {
                min,
                factor: self.shrink_factor,
                max,
            });
        }
        Ok(())
    }
}
