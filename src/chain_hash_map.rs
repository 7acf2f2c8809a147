//! ChainHashMap: separately chained table of owned byte keys and values.

use crate::chain::{try_copy, try_heads, ChainIter, Chains, Entry};
use crate::config::{TableConfig, DEFAULT_INITIAL_CAPACITY};
use crate::error::TableError;
use crate::hasher::{ByteHasher, PolynomialHasher};
use crate::stats::{BucketStats, StatsSummary};
use core::fmt;
use log::{debug, trace, warn};

/// Result of a successful `insert`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InsertOutcome {
    /// The key was new; `len()` grew by one.
    Inserted,
    /// The key was present; only its value changed.
    Updated,
}

/// Result of `remove`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RemoveOutcome {
    Deleted,
    NotFound,
}

/// Hash map from byte strings to byte strings using separate chaining.
///
/// Keys and values are copied in on insert and owned by the table. Keys
/// match only when their lengths and bytes are identical. The table grows
/// before an insert and shrinks before a remove according to its
/// [`TableConfig`]; every resize relinks all entries in one pass.
#[derive(Clone)]
pub struct ChainHashMap<H = PolynomialHasher> {
    hasher: H,
    chains: Chains,
    stats: Option<BucketStats>,
    config: TableConfig,
}

impl ChainHashMap {
    /// Table with `capacity` buckets and the default hasher.
    pub fn new(capacity: usize) -> Result<Self, TableError> {
        Self::with_config(TableConfig::with_capacity(capacity), PolynomialHasher)
    }

    /// Like [`ChainHashMap::new`] with per-bucket occupancy tracking on.
    pub fn with_stats(capacity: usize) -> Result<Self, TableError> {
        Self::with_config(
            TableConfig::with_capacity(capacity).track_stats(true),
            PolynomialHasher,
        )
    }
}

impl Default for ChainHashMap {
    fn default() -> Self {
        Self {
            hasher: PolynomialHasher,
            chains: Chains::from_heads(vec![None; DEFAULT_INITIAL_CAPACITY]),
            stats: None,
            config: TableConfig::default(),
        }
    }
}

impl<H> ChainHashMap<H>
where
    H: ByteHasher,
{
    pub fn with_hasher(capacity: usize, hasher: H) -> Result<Self, TableError> {
        Self::with_config(TableConfig::with_capacity(capacity), hasher)
    }

    pub fn with_config(config: TableConfig, hasher: H) -> Result<Self, TableError> {
        config.validate()?;
        let capacity = config.initial_capacity;
        let stats = if config.track_stats {
            Some(BucketStats::zeroed(capacity)?)
        } else {
            None
        };
        let chains = Chains::with_buckets(capacity)?;
        debug!(
            "created table with {} buckets (stats {})",
            capacity,
            if stats.is_some() { "on" } else { "off" }
        );
        Ok(Self {
            hasher,
            chains,
            stats,
            config,
        })
    }

    #[inline]
    fn locate(&self, key: &[u8]) -> (usize, u64) {
        let digest = self.hasher.digest(key);
        (self.chains.slot_of(digest), digest)
    }

    /// Insert `key -> value`, replacing the value if `key` is present.
    ///
    /// The key and value are copied before growth is checked, and growth is
    /// checked before the slot that receives a new entry is computed. On
    /// `Err` the table is exactly as before the call.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<InsertOutcome, TableError> {
        let (slot, digest) = self.locate(key);

        // Arena keys survive a resize, so a hit found here stays valid.
        if let Some(k) = self.chains.find(slot, digest, key) {
            let value = try_copy(value)?;
            self.grow_if_needed()?;
            if let Some(e) = self.chains.get_mut(k) {
                e.value = value;
            }
            return Ok(InsertOutcome::Updated);
        }

        let entry = Entry::try_new(key, value, digest)?;
        self.grow_if_needed()?;
        let slot = self.chains.slot_of(digest);
        self.chains.push_front(slot, entry);
        if let Some(stats) = self.stats.as_mut() {
            stats.record_insert(slot);
        }
        Ok(InsertOutcome::Inserted)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        let (slot, digest) = self.locate(key);
        self.chains.find(slot, digest, key).is_some()
    }

    /// Borrow the value stored under `key`.
    pub fn lookup(&self, key: &[u8]) -> Option<&[u8]> {
        let (slot, digest) = self.locate(key);
        let k = self.chains.find(slot, digest, key)?;
        self.chains.get(k).map(|e| &*e.value)
    }

    /// Remove `key`, shrinking the table first if it is underloaded.
    pub fn remove(&mut self, key: &[u8]) -> RemoveOutcome {
        self.shrink_if_needed();
        let (slot, digest) = self.locate(key);
        let Some(k) = self.chains.find(slot, digest, key) else {
            return RemoveOutcome::NotFound;
        };
        self.chains.unlink(slot, k);
        if let Some(stats) = self.stats.as_mut() {
            stats.record_remove(slot);
        }
        RemoveOutcome::Deleted
    }
}

impl<H> ChainHashMap<H> {
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.len() == 0
    }

    /// Current number of buckets. Always at least one.
    pub fn capacity(&self) -> usize {
        self.chains.bucket_count()
    }

    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Chain length of every bucket, or `None` when stats are off.
    pub fn dump_stats(&self) -> Option<&[usize]> {
        self.stats.as_ref().map(BucketStats::counts)
    }

    pub fn stats_summary(&self) -> Option<StatsSummary> {
        self.stats.as_ref().map(BucketStats::summary)
    }

    /// Drop every entry and zero the counters; capacity is kept.
    pub fn clear(&mut self) {
        trace!("clearing {} entries", self.len());
        self.chains.clear();
        if let Some(stats) = self.stats.as_mut() {
            stats.reset();
        }
    }

    /// Release the table and everything it owns. Equivalent to dropping it.
    pub fn destroy(self) {
        trace!(
            "destroying table: {} entries in {} buckets",
            self.len(),
            self.capacity()
        );
    }

    /// Iterate entries in bucket order, then chain order. The order changes
    /// across resizes and must not be relied on.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            chains: &self.chains,
            next_slot: 0,
            chain: None,
            remaining: self.chains.len(),
        }
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&[u8], &[u8]),
    {
        for (k, v) in self.iter() {
            f(k, v);
        }
    }

    fn needs_growth(&self) -> bool {
        self.capacity() as f64 * self.config.max_load_factor <= self.len() as f64
    }

    fn needs_shrink(&self) -> bool {
        self.len() as f64 <= self.capacity() as f64 * self.config.min_load_factor
    }

    /// Multiply capacity by `growth_factor` until the table is back under
    /// its growth threshold, then resize once.
    fn grow_if_needed(&mut self) -> Result<(), TableError> {
        if !self.needs_growth() {
            return Ok(());
        }
        let len = self.len() as f64;
        let mut target = self.capacity();
        loop {
            let next = target.saturating_mul(self.config.growth_factor);
            if next == target {
                break;
            }
            target = next;
            if target as f64 * self.config.max_load_factor > len {
                break;
            }
        }
        if target > self.capacity() {
            self.resize(target)?;
        }
        Ok(())
    }

    /// Shrink by `shrink_factor`, unless the smaller table would already
    /// be at its growth threshold. Integer division of the capacity can
    /// make the new load exceed `min_load_factor * shrink_factor`.
    fn shrink_if_needed(&mut self) {
        if !self.needs_shrink() {
            return;
        }
        let target = (self.capacity() / self.config.shrink_factor).max(1);
        if target == self.capacity() {
            return;
        }
        if target as f64 * self.config.max_load_factor <= self.len() as f64 {
            trace!(
                "keeping {} buckets: {} entries would overload {} buckets",
                self.capacity(),
                self.len(),
                target
            );
            return;
        }
        if let Err(e) = self.resize(target) {
            warn!(
                "skipping shrink from {} to {} buckets: {}",
                self.capacity(),
                target,
                e
            );
        }
    }

    /// Rehash every entry into `new_capacity` buckets.
    ///
    /// All allocation happens before any entry moves, so a failure leaves
    /// the table untouched. The hasher is not called: each entry's cached
    /// digest is folded against the new capacity.
    fn resize(&mut self, new_capacity: usize) -> Result<(), TableError> {
        debug_assert!(new_capacity > 0);
        let heads = try_heads(new_capacity)?;
        let mut stats = self
            .stats
            .as_ref()
            .map(|_| BucketStats::zeroed(new_capacity))
            .transpose()?;

        let old_capacity = self.capacity();
        self.chains.relink(heads, |slot| {
            if let Some(s) = stats.as_mut() {
                s.record_insert(slot);
            }
        });
        self.stats = stats;
        debug!(
            "resized table from {} to {} buckets ({} entries)",
            old_capacity,
            new_capacity,
            self.len()
        );
        Ok(())
    }

    /// Structural self-check used by tests: chain links, bucket placement,
    /// and agreement between the counters and the chains.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        self.chains.check_links()?;
        if self.capacity() == 0 {
            return Err("zero buckets".to_string());
        }
        if let Some(stats) = &self.stats {
            let counts = stats.counts();
            if counts.len() != self.capacity() {
                return Err(format!(
                    "{} counters for {} buckets",
                    counts.len(),
                    self.capacity()
                ));
            }
            for (slot, &c) in counts.iter().enumerate() {
                let live = self.chains.chain(slot).count();
                if c != live {
                    return Err(format!("bucket {slot}: counter {c}, chain {live}"));
                }
            }
        }
        Ok(())
    }
}

impl<H> fmt::Debug for ChainHashMap<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over `(key, value)` byte slices of a `ChainHashMap`.
pub struct Iter<'a> {
    chains: &'a Chains,
    next_slot: usize,
    chain: Option<ChainIter<'a>>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.chain.as_mut().and_then(Iterator::next) {
                self.remaining -= 1;
                return Some((&*e.key, &*e.value));
            }
            if self.next_slot >= self.chains.bucket_count() {
                return None;
            }
            self.chain = Some(self.chains.chain(self.next_slot));
            self.next_slot += 1;
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a, H> IntoIterator for &'a ChainHashMap<H> {
    type Item = (&'a [u8], &'a [u8]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn constant_digest(_: &[u8]) -> u64 {
        1
    }

    fn key(i: u32) -> Vec<u8> {
        format!("key-{i}").into_bytes()
    }

    /// Invariant: insert reports new vs existing keys; len counts only new ones.
    #[test]
    fn insert_then_update() {
        let mut m = ChainHashMap::new(5).unwrap();
        assert_eq!(m.insert(b"HE", b"abc").unwrap(), InsertOutcome::Inserted);
        assert_eq!(m.lookup(b"HE"), Some(&b"abc"[..]));
        assert_eq!(m.insert(b"HE", b"abcd").unwrap(), InsertOutcome::Updated);
        assert_eq!(m.lookup(b"HE"), Some(&b"abcd"[..]));
        assert_eq!(m.len(), 1);
        m.check_invariants().unwrap();
    }

    #[test]
    fn contains_and_missing_lookup() {
        let mut m = ChainHashMap::new(5).unwrap();
        m.insert(b"HE", b"abc").unwrap();
        assert!(m.contains(b"HE"));
        assert!(!m.contains(b"HA"));
        assert_eq!(m.lookup(b"HA"), None);
    }

    /// Invariant: a second delete of the same key reports NotFound.
    #[test]
    fn delete_twice() {
        let mut m = ChainHashMap::new(5).unwrap();
        m.insert(b"HE", b"abc").unwrap();
        assert_eq!(m.remove(b"HE"), RemoveOutcome::Deleted);
        assert_eq!(m.remove(b"HE"), RemoveOutcome::NotFound);
        assert!(m.is_empty());
        m.check_invariants().unwrap();
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(ChainHashMap::new(0).err(), Some(TableError::ZeroCapacity));
        assert_eq!(
            ChainHashMap::with_hasher(0, constant_digest).err(),
            Some(TableError::ZeroCapacity)
        );
    }

    /// Invariant: growth happens before the slot of the triggering insert is
    /// computed, and exactly when `capacity * max_load <= len`.
    #[test]
    fn growth_is_checked_before_insert() {
        let mut m = ChainHashMap::new(8).unwrap();
        for i in 0..6u8 {
            m.insert(&[b'A' + i], b"ABCDEF").unwrap();
        }
        assert_eq!(m.capacity(), 8, "6 <= 8 * 0.75 holds only after the 6th insert");
        m.insert(b"G", b"ABCDEF").unwrap();
        assert_eq!(m.capacity(), 16);
        m.check_invariants().unwrap();
    }

    /// Invariant: shrink is clamped at one bucket.
    #[test]
    fn shrink_floors_at_one_bucket() {
        let mut m = ChainHashMap::new(8).unwrap();
        for _ in 0..10 {
            assert_eq!(m.remove(b"absent"), RemoveOutcome::NotFound);
        }
        assert_eq!(m.capacity(), 1);
        m.insert(b"k", b"v").unwrap();
        assert_eq!(m.lookup(b"k"), Some(&b"v"[..]));
    }

    /// Invariant: resizing a table without stats never creates counters.
    #[test]
    fn resize_without_stats_keeps_stats_off() {
        let mut m = ChainHashMap::new(1).unwrap();
        for i in 0..50 {
            m.insert(&key(i), b"v").unwrap();
        }
        for i in 0..50 {
            m.remove(&key(i));
        }
        assert!(m.dump_stats().is_none());
        assert!(m.stats_summary().is_none());
        m.check_invariants().unwrap();
    }

    /// Invariant: counters equal live chain lengths across inserts, updates,
    /// removes and every resize in between.
    #[test]
    fn stats_track_chains_through_resizes() {
        let mut m = ChainHashMap::with_stats(2).unwrap();
        for i in 0..40 {
            m.insert(&key(i), b"v").unwrap();
            m.check_invariants().unwrap();
        }
        m.insert(&key(3), b"updated").unwrap();
        for i in (0..40).step_by(3) {
            m.remove(&key(i));
            m.check_invariants().unwrap();
        }
        let counts = m.dump_stats().unwrap();
        assert_eq!(counts.len(), m.capacity());
        assert_eq!(counts.iter().sum::<usize>(), m.len());

        let summary = m.stats_summary().unwrap();
        assert_eq!(summary.entries, m.len());
        assert_eq!(summary.buckets, m.capacity());
    }

    /// Invariant: with every key in one chain, each key is still found and
    /// removing from the middle of the chain keeps its neighbours reachable.
    #[test]
    fn single_chain_under_constant_hash() {
        let mut m = ChainHashMap::with_hasher(4, constant_digest).unwrap();
        for i in 0..20 {
            m.insert(&key(i), &i.to_le_bytes()).unwrap();
        }
        for i in (1..20).step_by(2) {
            assert_eq!(m.remove(&key(i)), RemoveOutcome::Deleted);
            m.check_invariants().unwrap();
        }
        for i in 0u32..20 {
            let expect = (i % 2 == 0).then(|| i.to_le_bytes());
            assert_eq!(m.lookup(&key(i)), expect.as_ref().map(|b| &b[..]));
        }
    }

    #[test]
    fn clear_keeps_capacity_and_zeroes_stats() {
        let mut m = ChainHashMap::with_stats(4).unwrap();
        for i in 0..3 {
            m.insert(&key(i), b"v").unwrap();
        }
        let cap = m.capacity();
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.capacity(), cap);
        assert!(m.dump_stats().unwrap().iter().all(|&c| c == 0));
        m.check_invariants().unwrap();
    }

    #[test]
    fn iteration_visits_every_entry_once() {
        let mut m = ChainHashMap::new(3).unwrap();
        let mut expected = BTreeMap::new();
        for i in 0..25 {
            let v = format!("value-{i}").into_bytes();
            m.insert(&key(i), &v).unwrap();
            expected.insert(key(i), v);
        }

        let it = m.iter();
        assert_eq!(it.len(), 25);
        let seen: BTreeMap<Vec<u8>, Vec<u8>> =
            it.map(|(k, v)| (k.to_vec(), v.to_vec())).collect();
        assert_eq!(seen, expected);

        let mut visited = 0;
        m.for_each(|k, v| {
            assert_eq!(expected.get(k).map(Vec::as_slice), Some(v));
            visited += 1;
        });
        assert_eq!(visited, 25);
    }

    #[test]
    fn iteration_follows_bucket_then_chain_order() {
        fn by_first_byte(bytes: &[u8]) -> u64 {
            bytes[0] as u64
        }
        let mut m = ChainHashMap::with_hasher(4, by_first_byte).unwrap();
        m.insert(&[2], b"a").unwrap();
        m.insert(&[0], b"b").unwrap();
        m.insert(&[4], b"c").unwrap();
        let keys: Vec<u8> = m.iter().map(|(k, _)| k[0]).collect();
        assert_eq!(keys, vec![4, 0, 2]);
    }

    #[test]
    fn default_table_is_usable() {
        let mut m: ChainHashMap = ChainHashMap::default();
        assert_eq!(m.capacity(), DEFAULT_INITIAL_CAPACITY);
        m.insert(b"k", b"v").unwrap();
        assert_eq!(format!("{m:?}"), "{[107]: [118]}");
        m.check_invariants().unwrap();
    }

    #[test]
    fn destroy_empty_table() {
        let m = ChainHashMap::new(8).unwrap();
        m.destroy();
    }

    /// Invariant: an update that trips the growth check still grows, keeps
    /// len, and leaves every entry in the bucket its digest maps to.
    #[test]
    fn update_at_threshold_grows_and_keeps_entry() {
        let mut m = ChainHashMap::with_stats(4).unwrap();
        for i in 0..3 {
            m.insert(&key(i), b"v").unwrap();
        }
        assert_eq!(m.capacity(), 4);
        assert_eq!(m.insert(&key(1), b"new").unwrap(), InsertOutcome::Updated);
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.len(), 3);
        assert_eq!(m.lookup(&key(1)), Some(&b"new"[..]));
        m.check_invariants().unwrap();

        // A new key at the threshold lands in its post-growth bucket.
        for i in 3..6 {
            m.insert(&key(i), b"v").unwrap();
        }
        assert_eq!(m.capacity(), 8);
        assert_eq!(m.insert(&key(6), b"v").unwrap(), InsertOutcome::Inserted);
        assert_eq!(m.capacity(), 16);
        m.check_invariants().unwrap();
    }

    /// Invariant: one insert restores the load bound even when a single
    /// growth step would not be enough.
    #[test]
    fn growth_repeats_factor_until_under_threshold() {
        let config = TableConfig::with_capacity(1)
            .max_load_factor(0.3)
            .min_load_factor(0.0);
        let mut m = ChainHashMap::with_config(config, PolynomialHasher).unwrap();
        m.insert(b"a", b"1").unwrap();
        m.insert(b"b", b"2").unwrap();
        assert_eq!(m.capacity(), 4, "1 entry needs more than 2 buckets at 0.3");
        assert!((m.len() - 1) as f64 <= m.capacity() as f64 * 0.3);
        m.check_invariants().unwrap();
    }

    /// Invariant: a shrink is skipped when the smaller table would already
    /// sit at its growth threshold.
    #[test]
    fn shrink_never_lands_above_max_load() {
        // 15 / 8 rounds down to one bucket, which one entry would overload.
        let config = TableConfig::with_capacity(15)
            .shrink_factor(8)
            .max_load_factor(0.6)
            .min_load_factor(0.07);
        let mut m = ChainHashMap::with_config(config, PolynomialHasher).unwrap();
        m.insert(b"a", b"1").unwrap();
        assert_eq!(m.remove(b"missing"), RemoveOutcome::NotFound);
        assert_eq!(m.capacity(), 15);
        assert!(m.len() as f64 <= m.capacity() as f64 * 0.6);

        assert_eq!(m.remove(b"a"), RemoveOutcome::Deleted);
        assert_eq!(m.remove(b"missing"), RemoveOutcome::NotFound);
        assert_eq!(m.capacity(), 1);
        m.check_invariants().unwrap();
    }
}
