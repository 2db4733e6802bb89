//! Materialization kernels shared by both engines.

use std::hash::BuildHasherDefault;

use bagpipe_ir::{KeyFn, PairFn, ReduceFn, Seq, Value};
use indexmap::map::Entry;
use indexmap::IndexMap;
use rustc_hash::FxHasher;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Fold a materialized multiset into one element per key.
///
/// Collisions reduce in arrival order as `(accumulated, next)`; the output
/// preserves first-seen key order.
pub(crate) fn group_into(seq: &Seq, to_key: &KeyFn, reduce: &ReduceFn) -> Seq {
    let mut groups: FxIndexMap<String, Value> = FxIndexMap::default();
    for value in seq {
        match groups.entry(to_key(value)) {
            Entry::Occupied(mut entry) => {
                let merged = reduce(entry.get(), value);
                entry.insert(merged);
            }
            Entry::Vacant(entry) => {
                entry.insert(value.clone());
            }
        }
    }
    groups.into_values().collect()
}

/// Cartesian product, left-major, flat-expanded through `pair`.
pub(crate) fn cross(left: &Seq, right: &Seq, pair: &PairFn) -> Seq {
    let mut out = Seq::new();
    for a in left {
        for b in right {
            out.extend(pair(a, b));
        }
    }
    out
}

/// Flat-expand one fused link over a materialized origin, repeating each
/// element's output `count` times.
pub(crate) fn expand_over(
    origin: &Seq,
    func: &bagpipe_ir::ExpandFn,
    count: usize,
    out: &mut Seq,
) {
    for value in origin {
        let produced = func(value);
        for _ in 0..count {
            out.extend(produced.iter().cloned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagpipe_ir::{cast, erase_seq, KeyFn, ReduceFn};
    use std::sync::Arc;

    #[test]
    fn test_group_into_keeps_first_seen_order() {
        let seq = erase_seq(vec![3_i64, 1, 3, 2, 1]);
        let to_key: KeyFn = Arc::new(|v| cast::<i64>(v).to_string());
        let reduce: ReduceFn = Arc::new(|a, b| {
            bagpipe_ir::erase(cast::<i64>(a) + cast::<i64>(b))
        });
        let grouped = group_into(&seq, &to_key, &reduce);
        let out: Vec<i64> = grouped.iter().map(|v| *cast::<i64>(v)).collect();
        assert_eq!(out, vec![6, 2, 2]);
    }
}
