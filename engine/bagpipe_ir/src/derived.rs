//! Operators derived from the six primitives, and the record types they
//! produce.

use serde::Serialize;

use crate::bag::{constant, Bag};
use crate::value::Elem;

/// One output record of [`Bag::join`]: everything seen under one key.
///
/// A side that contributed no element under the key is `None`; a side that
/// contributed several holds their reduction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Joined<L, R> {
    pub key: String,
    pub left: Option<L>,
    pub right: Option<R>,
}

/// Multiplicity bookkeeping for [`Bag::diff`]: how many copies of `value`
/// each side holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diff<T> {
    pub value: T,
    pub count_left: usize,
    pub count_right: usize,
}

/// The bag holding each of `values` once.
pub fn from_values<T: Elem + Clone>(values: Vec<T>) -> Bag<T> {
    constant(values).expand(|v| v.clone())
}

/// The bag of integers `start..end`.
pub fn range(start: i64, end: i64) -> Bag<i64> {
    from_values((start..end).collect())
}

impl<T: Elem> Bag<T> {
    /// One-to-one transform.
    pub fn map<O, F>(&self, f: F) -> Bag<O>
    where
        O: Elem,
        F: Fn(&T) -> O + Send + Sync + 'static,
    {
        self.expand(move |v| vec![f(v)])
    }

    /// Keep the elements `pred` accepts.
    pub fn filter<F>(&self, pred: F) -> Bag<T>
    where
        T: Clone,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.expand(move |v| if pred(v) { vec![v.clone()] } else { Vec::new() })
    }

    /// Reduce the whole bag to a single element (empty in, empty out).
    pub fn reduce_all<F>(&self, reduce: F) -> Bag<T>
    where
        F: Fn(&T, &T) -> T + Send + Sync + 'static,
    {
        self.group_reduce(|_| "", reduce)
    }

    /// Relational-style join on string keys.
    ///
    /// Both bags are tagged with their keys, unioned, and grouped: the
    /// result holds exactly one [`Joined`] record per distinct key seen on
    /// either side. Elements sharing a key on the same side are combined
    /// with that side's reducer; a key present on one side only keeps the
    /// other side `None`.
    pub fn join<U, K1, K2, KL, KR, RL, RR>(
        &self,
        other: &Bag<U>,
        key_left: KL,
        key_right: KR,
        reduce_left: RL,
        reduce_right: RR,
    ) -> Bag<Joined<T, U>>
    where
        T: Clone,
        U: Elem + Clone,
        K1: ToString,
        K2: ToString,
        KL: Fn(&T) -> K1 + Send + Sync + 'static,
        KR: Fn(&U) -> K2 + Send + Sync + 'static,
        RL: Fn(&T, &T) -> T + Send + Sync + 'static,
        RR: Fn(&U, &U) -> U + Send + Sync + 'static,
    {
        let left = self.map(move |x| Joined {
            key: key_left(x).to_string(),
            left: Some(x.clone()),
            right: None,
        });
        let right = other.map(move |y| Joined {
            key: key_right(y).to_string(),
            left: None,
            right: Some(y.clone()),
        });
        left.union(&right).group_reduce(
            |j| j.key.clone(),
            move |a, b| Joined {
                key: a.key.clone(),
                left: combine(&a.left, &b.left, &reduce_left),
                right: combine(&a.right, &b.right, &reduce_right),
            },
        )
    }

    /// Per-value multiset difference against `other`.
    ///
    /// Yields one [`Diff`] per distinct value (distinct by canonical JSON
    /// serialization), counting the copies on each side.
    pub fn diff(&self, other: &Bag<T>) -> Bag<Diff<T>>
    where
        T: Clone + Serialize,
    {
        let left = self.map(|x| Diff {
            value: x.clone(),
            count_left: 1,
            count_right: 0,
        });
        let right = other.map(|x| Diff {
            value: x.clone(),
            count_left: 0,
            count_right: 1,
        });
        left.union(&right).group_reduce(
            |d| canonical_key(&d.value),
            |a, b| Diff {
                value: a.value.clone(),
                count_left: a.count_left + b.count_left,
                count_right: a.count_right + b.count_right,
            },
        )
    }
}

impl<T: Elem + Clone> Bag<Option<T>> {
    /// Drop the `None`s and unwrap the rest.
    pub fn compact(&self) -> Bag<T> {
        self.expand(|v| v.iter().cloned().collect())
    }
}

/// Merge two optional same-side contributions under one key: reduce when
/// both are present, pass the lone one through, otherwise `None`.
fn combine<T, F>(a: &Option<T>, b: &Option<T>, reduce: &F) -> Option<T>
where
    T: Clone,
    F: Fn(&T, &T) -> T,
{
    match (a, b) {
        (Some(x), Some(y)) => Some(reduce(x, y)),
        (Some(x), None) => Some(x.clone()),
        (None, Some(y)) => Some(y.clone()),
        (None, None) => None,
    }
}

fn canonical_key<T: Serialize>(value: &T) -> String {
    // The only values that cannot serialize are non-data things like
    // non-string-keyed maps; treat that as a caller bug, like a panicking
    // user callback.
    serde_json::to_string(value).expect("diff value must have a canonical JSON form")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprKind;

    #[test]
    fn test_map_is_an_expand() {
        let b = from_values(vec![1_i32, 2]).map(|x| x + 1);
        assert!(matches!(b.expr().kind(), ExprKind::Expand { .. }));
    }

    #[test]
    fn test_reduce_all_is_a_group_reduce() {
        let b = from_values(vec![1_i32, 2]).reduce_all(|a, b| a + b);
        assert!(matches!(b.expr().kind(), ExprKind::GroupReduce { .. }));
    }

    #[test]
    fn test_join_produces_group_reduce_over_union() {
        let left = from_values(vec!["a".to_string()]);
        let right = from_values(vec![1_i64]);
        let joined = left.join(
            &right,
            |x| x.clone(),
            |y| y.to_string(),
            |a, _| a.clone(),
            |a, b| a + b,
        );
        match joined.expr().kind() {
            ExprKind::GroupReduce { src, .. } => {
                assert!(matches!(src.kind(), ExprKind::Union { .. }));
            }
            _ => panic!("expected group_reduce"),
        }
    }
}
