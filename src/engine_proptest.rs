#![cfg(test)]

// Model-based property tests for all four engines, kept inside the crate so
// they can run the test-only structural checkers after every operation.

use crate::{AvlTree, ChainedHashTable, Container, Error, OpenHashTable, RbTree};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::BTreeMap;
use std::hash::{BuildHasher, Hasher};

// Structural self-check hook for the driver below.
trait Checked {
    fn check(&self);
}

impl Checked for AvlTree<String, i32> {
    fn check(&self) {
        self.check_invariants();
    }
}

impl Checked for RbTree<String, i32> {
    fn check(&self) {
        self.check_invariants();
    }
}

impl<S: BuildHasher> Checked for ChainedHashTable<String, i32, S> {
    fn check(&self) {
        self.check_invariants();
    }
}

impl<S: BuildHasher> Checked for OpenHashTable<String, i32, S> {
    fn check(&self) {
        self.check_invariants();
    }
}

// Pool-indexed operations shrink toward earlier keys and shorter runs.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Remove(usize),
    Search(usize),
    Set(usize, i32),
    Bump(usize, i32),
    Iterate,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=12).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            3 => idx.clone().prop_map(Op::Search),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Set(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Bump(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run<E>(mut sut: E, pool: &[String], ops: Vec<Op>) -> Result<(), TestCaseError>
where
    E: Container<String, i32> + Checked,
{
    let mut model: BTreeMap<String, i32> = BTreeMap::new();
    let mut last_comparisons = sut.comparisons();

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = pool[i].clone();
                let fresh = !model.contains_key(&k);
                prop_assert_eq!(sut.insert(k.clone(), v), fresh);
                // First writer wins.
                model.entry(k).or_insert(v);
            }
            Op::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove(k), model.remove(k).is_some());
                prop_assert!(!sut.contains(k));
            }
            Op::Search(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.search(k).ok(), model.get(k));
                prop_assert_eq!(sut.contains(k), model.contains_key(k));
            }
            Op::Set(i, v) => {
                let k = &pool[i];
                match model.get_mut(k) {
                    Some(mv) => {
                        prop_assert_eq!(sut.at(k, v), Ok(()));
                        *mv = v;
                    }
                    None => prop_assert_eq!(sut.at(k, v), Err(Error::NotFound)),
                }
            }
            Op::Bump(i, d) => {
                let k = &pool[i];
                match (sut.search_mut(k), model.get_mut(k)) {
                    (Ok(sv), Some(mv)) => {
                        *sv = sv.wrapping_add(d);
                        *mv = mv.wrapping_add(d);
                    }
                    (Err(Error::NotFound), None) => {}
                    (s, m) => prop_assert!(false, "presence mismatch: {:?} vs {:?}", s, m),
                }
            }
            Op::Iterate => {
                let got: Vec<(&String, &i32)> = sut.iter().collect();
                let want: Vec<(&String, &i32)> = model.iter().collect();
                prop_assert_eq!(got, want);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }

        sut.check();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        let now = sut.comparisons();
        prop_assert!(now >= last_comparisons, "comparison counter went backwards");
        last_comparisons = now;
    }
    Ok(())
}

// Every key hashes alike: chains degenerate to lists and probing to a
// linear scan, which stresses equality resolution and tombstone handling.
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

// Property: each engine is observably equivalent to BTreeMap under random
// insert/remove/lookup/overwrite/clear sequences, with its structural
// invariants intact after every step.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_avl_tree_matches_model((pool, ops) in arb_scenario()) {
        run(AvlTree::<String, i32>::new(), &pool, ops)?;
    }

    #[test]
    fn prop_rb_tree_matches_model((pool, ops) in arb_scenario()) {
        run(RbTree::<String, i32>::new(), &pool, ops)?;
    }

    #[test]
    fn prop_chained_hash_matches_model((pool, ops) in arb_scenario()) {
        run(ChainedHashTable::<String, i32>::with_capacity(3), &pool, ops)?;
    }

    #[test]
    fn prop_open_hash_matches_model((pool, ops) in arb_scenario()) {
        run(OpenHashTable::<String, i32>::with_capacity(3), &pool, ops)?;
    }

    #[test]
    fn prop_chained_hash_with_collisions((pool, ops) in arb_scenario()) {
        run(ChainedHashTable::<String, i32, _>::with_hasher(ConstBuildHasher), &pool, ops)?;
    }

    #[test]
    fn prop_open_hash_with_collisions((pool, ops) in arb_scenario()) {
        run(OpenHashTable::<String, i32, _>::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}
