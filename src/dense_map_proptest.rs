#![cfg(test)]

// Property tests for DenseMap kept inside the crate so they can inspect
// storage-level counters directly.

use crate::dense_map::{DenseMap, MAX_LOAD};
use crate::probe::{LinearProbe, ProbeStrategy, QuadraticProbe};
use crate::sentinel::{SentinelKey, SlotState};
use core::hash::BuildHasher;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}
impl SentinelKey for Key {
    fn empty() -> Self {
        Key(String::empty())
    }
    fn tombstone() -> Self {
        Key(String::tombstone())
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    GetOrInsert(usize, i32),
    Erase(usize),
    Find(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    EraseFirst,
    Reserve(usize),
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{1,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::GetOrInsert(i, v)),
            3 => idx.clone().prop_map(OpI::Erase),
            2 => idx.clone().prop_map(OpI::Find),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::EraseFirst),
            1 => (0usize..8).prop_map(OpI::Reserve),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn check_counters<P, S>(sut: &DenseMap<Key, i32, P, S>) -> Result<(), TestCaseError>
where
    P: ProbeStrategy,
    S: BuildHasher,
{
    let storage = sut.storage();
    let count = |state| {
        (0..storage.capacity())
            .filter(|&i| storage.state(i) == state)
            .count()
    };
    prop_assert_eq!(count(SlotState::Live), sut.len());
    prop_assert_eq!(count(SlotState::Tombstone), sut.tombstones());
    prop_assert!(sut.len() + sut.tombstones() <= sut.capacity());
    prop_assert!(sut.load_factor() <= MAX_LOAD);
    prop_assert!(sut.capacity().is_power_of_two());
    Ok(())
}

fn run_state_machine<P, S>(
    mut sut: DenseMap<Key, i32, P, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    P: ProbeStrategy,
    S: BuildHasher,
{
    let mut model: HashMap<Key, i32> = HashMap::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let prev = sut.insert(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k, v));
            }
            OpI::GetOrInsert(i, v) => {
                let k = key_from(&pool, i);
                let was_present = model.contains_key(&k);
                let expected = *model.entry(k.clone()).or_insert(v);
                let mut ran = false;
                let got = *sut.get_or_insert_with(k, || {
                    ran = true;
                    v
                });
                prop_assert_eq!(got, expected);
                prop_assert_eq!(ran, !was_present);
            }
            OpI::Erase(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.erase(&k), model.remove(&k));
                prop_assert!(sut.get(&k).is_none());
            }
            OpI::Find(i) => {
                let k = key_from(&pool, i);
                match sut.find(&k) {
                    Some(c) => {
                        let expected = model.get(&k);
                        prop_assert!(expected.is_some(), "find hit on absent key");
                        prop_assert_eq!(sut.key_at(c).ok(), Some(&k));
                        prop_assert_eq!(sut.value_at(c).ok(), expected);
                    }
                    None => prop_assert!(!model.contains_key(&k)),
                }
            }
            OpI::Get(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.get(k.0.as_str()), model.get(&k));
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                }
                if let Some(mv) = model.get_mut(&k) {
                    *mv = mv.saturating_add(d);
                }
            }
            OpI::EraseFirst => {
                if let Some(c) = sut.first() {
                    let (k, v) = sut.erase_at(c).expect("fresh cursor is live");
                    prop_assert_eq!(model.remove(&k), Some(v));
                } else {
                    prop_assert!(model.is_empty());
                }
            }
            OpI::Reserve(n) => {
                let capacity = sut.capacity();
                sut.reserve(n);
                let after_reserve = sut.capacity();
                prop_assert!(after_reserve >= capacity);
            }
            OpI::Iterate => {
                let s_keys: Vec<_> = sut.iter().map(|(k, _)| k.clone()).collect();
                let s_set: BTreeSet<_> = s_keys.iter().cloned().collect();
                prop_assert_eq!(s_keys.len(), s_set.len(), "iteration repeated a key");
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_set, m_keys);
                for (k, v) in sut.iter() {
                    prop_assert_eq!(model.get(k), Some(v));
                }
            }
        }

        // Post-conditions after each op
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        check_counters(&sut)?;
    }

    // Every model entry is still reachable.
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Some(v));
    }
    Ok(())
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - insert returns the previous value exactly when the key was present.
// - erase returns the model's value and leaves the key unreachable.
// - find/get/contains_key parity; cursors from find read the right entry.
// - iteration yields each live key exactly once.
// - live/tombstone counters match the slot states; load factor <= 0.77.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(DenseMap::new(), pool, ops)?;
    }
}

// Property: Same invariants under worst-case collision behavior (constant
// hasher): every key shares one probe chain, so compaction, tombstone reuse
// and wraparound all get exercised.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut: DenseMap<Key, i32, LinearProbe, ConstBuildHasher> =
            DenseMap::with_hasher(ConstBuildHasher);
        run_state_machine(sut, pool, ops)?;
    }
}

// Property: Same invariants with triangular probing.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_quadratic((pool, ops) in arb_scenario()) {
        let sut: DenseMap<Key, i32, QuadraticProbe> = DenseMap::with_probe(QuadraticProbe);
        run_state_machine(sut, pool, ops)?;
    }
}

// Property: Growth preserves the set of live (key, value) pairs exactly.
proptest! {
    #[test]
    fn prop_growth_preserves_pairs(keys in proptest::collection::btree_set(0u32..10_000, 1..200)) {
        let mut m: DenseMap<u32, u32> = DenseMap::new();
        let mut before: BTreeSet<(u32, u32)> = BTreeSet::new();
        for k in keys {
            let capacity = m.capacity();
            m.insert(k, k ^ 0x5555);
            if m.capacity() != capacity {
                let after: BTreeSet<(u32, u32)> = m
                    .iter()
                    .map(|(k, v)| (*k, *v))
                    .filter(|&(key, _)| key != k)
                    .collect();
                prop_assert_eq!(&after, &before);
            }
            before.insert((k, k ^ 0x5555));
        }
        let all: BTreeSet<(u32, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(all, before);
    }
}
