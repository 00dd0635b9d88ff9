#![cfg(test)]

// Property tests for EntryStore kept inside the crate so they can use a
// colliding hasher without widening the public API.

use crate::entry_store::{EntryStore, Index};
use crate::error::StoreError;
use crate::value::{Value, ValueType};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Add(usize, ValueType),
    Remove(usize),
    RemoveRaw(usize),
    Query(usize),
    SetInt(usize, i32),
    SetStr(usize, String),
    GetWrongType(usize),
    Iterate,
    Duplicate,
}

fn arb_type() -> impl Strategy<Value = ValueType> {
    proptest::sample::select(ValueType::ALL.to_vec())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            (idx.clone(), arb_type()).prop_map(|(i, t)| OpI::Add(i, t)),
            idx.clone().prop_map(OpI::Remove),
            (0usize..40).prop_map(OpI::RemoveRaw),
            idx.clone().prop_map(OpI::Query),
            (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::SetInt(i, v)),
            (idx.clone(), "[ -~]{0,8}").prop_map(|(i, s)| OpI::SetStr(i, s)),
            idx.clone().prop_map(OpI::GetWrongType),
            Just(OpI::Iterate),
            Just(OpI::Duplicate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn other_type(t: ValueType) -> ValueType {
    match t {
        ValueType::Int32 => ValueType::String,
        _ => ValueType::Int32,
    }
}

fn check_store<S: std::hash::BuildHasher>(
    sut: &EntryStore<S>,
    model: &BTreeMap<String, (Index, Value)>,
) -> Result<(), TestCaseError> {
    prop_assert_eq!(sut.len(), model.len());
    prop_assert_eq!(sut.is_empty(), model.is_empty());
    prop_assert!(sut.len() <= sut.capacity());
    for (k, (i, v)) in model {
        prop_assert_eq!(sut.query(k), Ok(*i));
        prop_assert_eq!(sut.value(*i), Ok(v));
    }
    Ok(())
}

// Property: State-machine equivalence against a BTreeMap model of
// key -> (index, value).
// Invariants exercised across random operation sequences:
// - Duplicate keys are rejected; a successful add returns the lowest empty slot.
// - Indices of live entries never change across adds, removes and growth.
// - Typed access rejects every mismatched kind without mutating.
// - Removing an empty in-bounds slot is a warning; past capacity is OutOfBounds.
// - Iteration yields exactly the live indices, ascending.
// - A duplicate equals its source and does not alias it.
fn run_scenario<S>(mut sut: EntryStore<S>, pool: Vec<String>, ops: Vec<OpI>) -> Result<(), TestCaseError>
where
    S: std::hash::BuildHasher + Clone,
{
    let mut model: BTreeMap<String, (Index, Value)> = BTreeMap::new();

    for op in ops {
        match op {
            OpI::Add(i, t) => {
                let k = &pool[i];
                let expected_slot = sut.iter().map(|(ix, _, _)| ix.get()).try_fold(0, |next, used| {
                    if used == next { Ok(next + 1) } else { Err(next) }
                });
                let expected_slot = expected_slot.unwrap_or_else(|gap| gap);
                match sut.add(k, t) {
                    Ok(ix) => {
                        prop_assert!(!model.contains_key(k), "add must fail on duplicate");
                        prop_assert_eq!(ix.get(), expected_slot);
                        model.insert(k.clone(), (ix, match t {
                            ValueType::Int32 => Value::Int32(0),
                            ValueType::Int64 => Value::Int64(0),
                            ValueType::Float => Value::Float(0.0),
                            ValueType::Double => Value::Double(0.0),
                            ValueType::String => Value::String(None),
                        }));
                    }
                    Err(StoreError::KeyExists(_)) => {
                        prop_assert!(model.contains_key(k), "KeyExists only when key exists");
                    }
                    Err(e) => prop_assert!(false, "unexpected add error: {:?}", e),
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                if let Some((ix, v)) = model.remove(k) {
                    let (kk, vv) = sut.remove(ix).expect("live index removable");
                    prop_assert_eq!(&kk, k);
                    prop_assert_eq!(vv, v);
                    prop_assert_eq!(sut.remove(ix), Err(StoreError::KeyNotPresent));
                } else {
                    prop_assert_eq!(sut.query(k), Err(StoreError::KeyNotPresent));
                }
            }
            OpI::RemoveRaw(raw) => {
                let ix = Index::new(raw);
                let live = model.iter().find(|(_, (mi, _))| *mi == ix).map(|(k, _)| k.clone());
                match (sut.remove(ix), live) {
                    (Ok((kk, _)), Some(k)) => {
                        prop_assert_eq!(&kk, &k);
                        model.remove(&k);
                    }
                    (Err(StoreError::KeyNotPresent), None) => {
                        prop_assert!(raw < sut.capacity());
                    }
                    (Err(StoreError::OutOfBounds { capacity, .. }), None) => {
                        prop_assert!(raw >= capacity);
                    }
                    (res, live) => prop_assert!(false, "remove {} gave {:?} with live {:?}", raw, res, live),
                }
            }
            OpI::Query(i) => {
                let k = &pool[i];
                match model.get(k) {
                    Some((ix, _)) => prop_assert_eq!(sut.query(k), Ok(*ix)),
                    None => prop_assert_eq!(sut.query(k), Err(StoreError::KeyNotPresent)),
                }
            }
            OpI::SetInt(i, v) => {
                let k = &pool[i];
                if let Some((ix, mv)) = model.get_mut(k) {
                    let res = sut.set_i32(*ix, v);
                    if let Value::Int32(slot) = mv {
                        prop_assert_eq!(res, Ok(()));
                        *slot = v;
                    } else {
                        let is_invalid = matches!(res, Err(StoreError::InvalidType { .. }));
                        prop_assert!(is_invalid);
                    }
                }
            }
            OpI::SetStr(i, s) => {
                let k = &pool[i];
                if let Some((ix, mv)) = model.get_mut(k) {
                    let res = sut.set_string(*ix, &s);
                    if let Value::String(slot) = mv {
                        prop_assert_eq!(res, Ok(()));
                        *slot = Some(s);
                    } else {
                        let is_invalid = matches!(res, Err(StoreError::InvalidType { .. }));
                        prop_assert!(is_invalid);
                    }
                }
            }
            OpI::GetWrongType(i) => {
                let k = &pool[i];
                if let Some((ix, mv)) = model.get(k) {
                    let wrong = other_type(mv.value_type());
                    let res = match wrong {
                        ValueType::Int32 => sut.get_i32(*ix).map(|_| ()),
                        _ => sut.get_string(*ix).map(|_| ()),
                    };
                    prop_assert_eq!(res, Err(StoreError::InvalidType {
                        expected: wrong,
                        found: mv.value_type(),
                    }));
                    prop_assert_eq!(sut.get_type(*ix), Ok(mv.value_type()));
                }
            }
            OpI::Iterate => {
                let s_idx: Vec<Index> = sut.indices().collect();
                let mut sorted: Vec<Index> = model.values().map(|(ix, _)| *ix).collect();
                sorted.sort();
                prop_assert_eq!(s_idx, sorted);
                let keys: BTreeSet<&str> = sut.iter().map(|(_, k, _)| k).collect();
                let m_keys: BTreeSet<&str> = model.keys().map(|k| k.as_str()).collect();
                prop_assert_eq!(keys, m_keys);
            }
            OpI::Duplicate => {
                let mut dup = sut.try_duplicate().expect("duplicate");
                prop_assert_eq!(dup.capacity(), sut.capacity());
                check_store(&dup, &model)?;
                // Mutating the copy must leave the source untouched.
                for (_, (ix, v)) in model.iter() {
                    match v {
                        Value::Int32(x) => dup.set_i32(*ix, x.wrapping_add(1)).expect("set copy"),
                        Value::String(_) => dup.set_string(*ix, "changed").expect("set copy"),
                        _ => {}
                    }
                }
                dup.clear();
                check_store(&sut, &model)?;
            }
        }

        check_store(&sut, &model)?;
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(EntryStore::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl std::hash::BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl std::hash::Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hasher) and a tiny growth step so the
// slot array grows often.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let cfg = crate::config::StoreConfig::default()
            .with_initial_capacity(1)
            .with_growth_increment(core::num::NonZeroUsize::new(1).unwrap());
        run_scenario(EntryStore::with_config_and_hasher(cfg, ConstBuildHasher), pool, ops)?;
    }
}
