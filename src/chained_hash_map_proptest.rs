// Property tests for ChainedHashMap kept inside the crate so they can check
// bucket placement directly.

use crate::chained_hash_map::{bucket_index, ChainedHashMap};
use crate::key_eq::KeyEq;
use crate::KeyNotFound;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

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

// Pool-indexed operations so shrinking moves toward earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertWith(usize, i32),
    IndexDefault(usize),
    Erase(usize),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Rehash(usize),
    SetMaxLoad(u8),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertWith(i, v)),
            1 => idx.clone().prop_map(OpI::IndexDefault),
            2 => idx.clone().prop_map(OpI::Erase),
            1 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => (1usize..40).prop_map(OpI::Rehash),
            1 => (1u8..=8).prop_map(OpI::SetMaxLoad),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn check_structure<S, E>(
    sut: &ChainedHashMap<Key, i32, S, E>,
    model: &HashMap<Key, i32>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
    E: KeyEq<Key>,
{
    // Placement: each entry sits in the bucket its hash selects.
    let mut total = 0;
    for (i, chain) in sut.buckets.iter().enumerate() {
        total += chain.len();
        for e in chain {
            prop_assert_eq!(bucket_index(e.hash, sut.bucket_count()), i);
            prop_assert_eq!(sut.bucket_index_for(&e.key), i);
        }
    }
    // Counting: chain lengths, len(), and the model agree.
    prop_assert_eq!(total, sut.len());
    prop_assert_eq!(sut.len(), model.len());
    prop_assert_eq!(sut.is_empty(), model.is_empty());
    // Uniqueness: iteration yields each model key exactly once.
    let seen: BTreeMap<Key, i32> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
    prop_assert_eq!(seen.len(), sut.len());
    let expected: BTreeMap<Key, i32> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
    prop_assert_eq!(seen, expected);
    Ok(())
}

fn run_scenario<S, E>(
    mut sut: ChainedHashMap<Key, i32, S, E>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
    E: KeyEq<Key> + KeyEq<str>,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let (c, inserted) = sut.insert(k.clone(), v);
                prop_assert_eq!(inserted, !already, "inserted iff the key was absent");
                prop_assert_eq!(c.key(), Some(&k));
                let stored = *c.value().expect("cursor at entry");
                model.entry(k).or_insert(v);
                prop_assert_eq!(Some(&stored), model.get(&key_from(&pool, i)));
                prop_assert!(sut.load_factor() <= sut.max_load_factor());
            }
            OpI::InsertWith(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let mut calls = 0;
                let (_, inserted) = sut.insert_with(k.clone(), || {
                    calls += 1;
                    v
                });
                prop_assert_eq!(inserted, !already);
                prop_assert_eq!(calls, usize::from(!already), "constructor runs only on insert");
                model.entry(k).or_insert(v);
            }
            OpI::IndexDefault(i) => {
                let k = key_from(&pool, i);
                let got = *sut.get_or_insert_default(k.clone());
                let want = *model.entry(k).or_default();
                prop_assert_eq!(got, want);
            }
            OpI::Erase(i) => {
                let k = key_from(&pool, i);
                let removed = sut.erase(k.0.as_str());
                prop_assert_eq!(removed, usize::from(model.remove(&k).is_some()));
                prop_assert!(!sut.contains_key(&k));
                prop_assert!(sut.find(&k).is_end());
                prop_assert_eq!(sut.at(&k), Err(KeyNotFound));
            }
            OpI::Find(i) => {
                let k = key_from(&pool, i);
                let c = sut.find(&k);
                match model.get(&k) {
                    Some(v) => {
                        prop_assert_eq!(c.get(), Some((&k, v)));
                    }
                    None => {
                        prop_assert_eq!(c, sut.end());
                    }
                }
                prop_assert_eq!(sut.count(&k), usize::from(model.contains_key(&k)));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                match sut.at_mut(&k) {
                    Ok(v) => {
                        *v = v.saturating_add(d);
                        let mv = model.get_mut(&k).expect("present in model");
                        *mv = mv.saturating_add(d);
                    }
                    Err(KeyNotFound) => {
                        prop_assert!(!model.contains_key(&k));
                    }
                }
            }
            OpI::Rehash(n) => {
                let before: BTreeSet<Key> = sut.keys().cloned().collect();
                sut.rehash(n);
                prop_assert_eq!(sut.bucket_count(), n);
                let after: BTreeSet<Key> = sut.keys().cloned().collect();
                prop_assert_eq!(before, after);
            }
            OpI::SetMaxLoad(quarters) => {
                let lf = f32::from(quarters) / 4.0;
                sut.set_max_load_factor(lf);
                prop_assert!(sut.load_factor() <= lf);
            }
            OpI::Clear => {
                let buckets = sut.bucket_count();
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.bucket_count(), buckets);
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }
        check_structure(&sut, &model)?;
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Duplicate inserts report `false` and keep the first value.
// - `find`/`contains_key`/`count`/`at` agree with the model.
// - Erase removes exactly the named key; erase/find agreement afterward.
// - Every entry is in bucket `hash % bucket_count`; chains sum to `len()`.
// - `rehash(n)` sets the bucket count to `n` and preserves membership.
// - After any insert the load factor is within the threshold.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(ChainedHashMap::with_buckets(4), pool, ops)?;
    }
}

// Collision variant using a constant hasher: every key lands in bucket 0, so
// all lookups resolve purely through chain scans with `KeyEq`.
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

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(ChainedHashMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Property: rehashing to any positive count keeps the exact (key, value) set.
proptest! {
    #[test]
    fn prop_rehash_preserves_pairs(
        pairs in proptest::collection::vec((any::<u16>(), any::<i32>()), 0..120),
        counts in proptest::collection::vec(1usize..300, 1..6),
    ) {
        let mut m: ChainedHashMap<u16, i32> = ChainedHashMap::new();
        m.extend(pairs.iter().copied());
        let before: BTreeMap<u16, i32> = m.iter().map(|(k, v)| (*k, *v)).collect();
        for n in counts {
            m.rehash(n);
            let after: BTreeMap<u16, i32> = m.iter().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(&after, &before);
            for (k, v) in &before {
                prop_assert_eq!(m.at(k), Ok(v));
            }
        }
    }
}
