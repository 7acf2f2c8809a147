#![cfg(test)]

// Property tests for ChainHashMap kept inside the crate so they can call
// the structural self-check on private chain state.

use crate::chain_hash_map::{ChainHashMap, InsertOutcome, RemoveOutcome};
use crate::config::TableConfig;
use crate::hasher::{ByteHasher, PolynomialHasher};
use hashbrown::HashMap;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::BTreeMap;

// Pool-indexed operations so shrinking moves toward earlier keys and
// shorter op lists. Keys draw from a three-letter alphabet including 0,
// which produces many shared prefixes and trailing-zero collisions.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, Vec<u8>),
    Remove(usize),
    Lookup(usize),
    Contains(Vec<u8>),
    Iterate,
    Clear,
}

fn arb_key() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..3, 0..4)
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<Op>)> {
    proptest::collection::vec(arb_key(), 1..=12).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let value = proptest::collection::vec(any::<u8>(), 0..6);
        let op = prop_oneof![
            6 => (idx.clone(), value).prop_map(|(i, v)| Op::Insert(i, v)),
            4 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Lookup),
            1 => arb_key().prop_map(Op::Contains),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..100).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Non-default tuning: any growth/shrink factor pair with the shrink
// threshold kept below `max / shrink_factor`.
fn arb_config() -> impl Strategy<Value = TableConfig> {
    (1usize..20, 2usize..5, 2usize..6, 0.2f64..1.5, 0.0f64..0.99, any::<bool>()).prop_map(
        |(capacity, growth, shrink, max, frac, stats)| {
            TableConfig::with_capacity(capacity)
                .growth_factor(growth)
                .shrink_factor(shrink)
                .max_load_factor(max)
                .min_load_factor(max / shrink as f64 * frac)
                .track_stats(stats)
        },
    )
}

fn constant_digest(_: &[u8]) -> u64 {
    0
}

fn first_byte_digest(bytes: &[u8]) -> u64 {
    bytes.first().copied().unwrap_or(0) as u64
}

// State-machine equivalence against hashbrown::HashMap. After every op:
// - outcomes (Inserted/Updated, Deleted/NotFound) and lookups match the model;
// - len matches, capacity stays >= 1, and the table never holds more than
//   one entry past its growth threshold;
// - chain links, bucket placement and stats counters are consistent.
fn run_scenario<H: ByteHasher>(
    mut sut: ChainHashMap<H>,
    pool: &[Vec<u8>],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = &pool[i];
                let expected = match model.insert(k.clone(), v.clone()) {
                    Some(_) => InsertOutcome::Updated,
                    None => InsertOutcome::Inserted,
                };
                let got = sut.insert(k, &v).map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(got, expected);
            }
            Op::Remove(i) => {
                let k = &pool[i];
                let expected = match model.remove(k) {
                    Some(_) => RemoveOutcome::Deleted,
                    None => RemoveOutcome::NotFound,
                };
                prop_assert_eq!(sut.remove(k), expected);
            }
            Op::Lookup(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.lookup(k), model.get(k).map(Vec::as_slice));
            }
            Op::Contains(k) => {
                prop_assert_eq!(sut.contains(&k), model.contains_key(&k));
            }
            Op::Iterate => {
                prop_assert_eq!(sut.iter().count(), model.len());
                let seen: BTreeMap<Vec<u8>, Vec<u8>> =
                    sut.iter().map(|(k, v)| (k.to_vec(), v.to_vec())).collect();
                let expected: BTreeMap<Vec<u8>, Vec<u8>> =
                    model.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                prop_assert_eq!(seen, expected);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert!(sut.capacity() >= 1);
        let threshold = sut.capacity() as f64 * sut.config().max_load_factor;
        prop_assert!(
            (sut.len().saturating_sub(1) as f64) < threshold,
            "{} entries in {} buckets",
            sut.len(),
            sut.capacity()
        );
        sut.check_invariants().map_err(TestCaseError::fail)?;
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), capacity in 1usize..20) {
        let sut = ChainHashMap::new(capacity).unwrap();
        run_scenario(sut, &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_stats((pool, ops) in arb_scenario(), capacity in 1usize..20) {
        let sut = ChainHashMap::with_stats(capacity).unwrap();
        run_scenario(sut, &pool, ops)?;
    }

    // Worst-case collisions: every entry shares one chain, so removal from
    // the middle of a chain and exact-key comparison carry the whole load.
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let config = TableConfig::with_capacity(4).track_stats(true);
        let sut = ChainHashMap::with_config(config, constant_digest).unwrap();
        run_scenario(sut, &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_tuning((pool, ops) in arb_scenario(), config in arb_config()) {
        let sut = ChainHashMap::with_config(config, PolynomialHasher).unwrap();
        run_scenario(sut, &pool, ops)?;
    }

    // Keys sharing a first byte collide, including prefixes of each other.
    #[test]
    fn prop_state_machine_with_prefix_collisions((pool, ops) in arb_scenario()) {
        let sut = ChainHashMap::with_hasher(2, first_byte_digest).unwrap();
        run_scenario(sut, &pool, ops)?;
    }
}
