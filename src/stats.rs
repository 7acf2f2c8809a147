//! Optional per-bucket occupancy counters for diagnosing hash skew.

use crate::error::TableError;
use core::fmt;

/// Live chain length of every bucket.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct BucketStats {
    counts: Vec<usize>,
}

impl BucketStats {
    pub(crate) fn zeroed(buckets: usize) -> Result<Self, TableError> {
        let mut counts = Vec::new();
        counts.try_reserve_exact(buckets)?;
        counts.resize(buckets, 0);
        Ok(Self { counts })
    }

    #[inline]
    pub(crate) fn record_insert(&mut self, slot: usize) {
        self.counts[slot] += 1;
    }

    #[inline]
    pub(crate) fn record_remove(&mut self, slot: usize) {
        debug_assert!(self.counts[slot] > 0, "bucket {slot} count underflow");
        self.counts[slot] -= 1;
    }

    pub(crate) fn reset(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    pub(crate) fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub(crate) fn summary(&self) -> StatsSummary {
        let entries: usize = self.counts.iter().sum();
        let buckets = self.counts.len();
        StatsSummary {
            buckets,
            entries,
            empty_buckets: self.counts.iter().filter(|&&c| c == 0).count(),
            longest_chain: self.counts.iter().copied().max().unwrap_or(0),
            load_factor: if buckets == 0 {
                0.0
            } else {
                entries as f64 / buckets as f64
            },
        }
    }
}

/// Aggregate view of the bucket counters.
///
/// `Display` prints a one-line report suitable for logs.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsSummary {
    pub buckets: usize,
    pub entries: usize,
    pub empty_buckets: usize,
    pub longest_chain: usize,
    pub load_factor: f64,
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries in {} buckets ({} empty), longest chain {}, load {:.3}",
            self.entries, self.buckets, self.empty_buckets, self.longest_chain, self.load_factor
        )
    }
}
