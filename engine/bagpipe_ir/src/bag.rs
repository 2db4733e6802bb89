//! The typed `Bag<T>` facade and the six primitive operators.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::expr::{Expr, ExprKind, ExprRef};
use crate::expr_id::ExprId;
use crate::value::{cast, erase, erase_seq, Elem, ExpandFn, KeyFn, PairFn, ReduceFn, Value};

/// A lazily-defined multiset of `T` values.
///
/// Building an operator records a new immutable expression node and returns
/// a new `Bag`; nothing is computed until an engine's `get`. Cloning a
/// `Bag` clones a handle to the *same* node - pass one bag to two
/// operators and the compiler will evaluate the shared subtree once.
pub struct Bag<T> {
    expr: ExprRef,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Bag<T> {
    fn clone(&self) -> Self {
        Bag {
            expr: self.expr.clone(),
            marker: PhantomData,
        }
    }
}

/// A new unbound source. Engines bind a concrete collection to it with
/// `set` before any dependent `get`.
pub fn input<T: Elem>() -> Bag<T> {
    Bag::from_expr(Expr::new(ExprKind::Input))
}

/// The singleton bag `[value]`.
pub fn constant<T: Elem>(value: T) -> Bag<T> {
    Bag::from_expr(Expr::new(ExprKind::Constant(erase(value))))
}

impl<T: Elem> Bag<T> {
    pub(crate) fn from_expr(expr: ExprRef) -> Self {
        Bag {
            expr,
            marker: PhantomData,
        }
    }

    /// The underlying expression node.
    #[inline]
    pub fn expr(&self) -> &ExprRef {
        &self.expr
    }

    /// Id of the underlying expression node.
    #[inline]
    pub fn id(&self) -> ExprId {
        self.expr.id()
    }

    /// One-to-many per-element transform: each element contributes the
    /// whole (possibly empty) output of `f`.
    pub fn expand<O, F>(&self, f: F) -> Bag<O>
    where
        O: Elem,
        F: Fn(&T) -> Vec<O> + Send + Sync + 'static,
    {
        let f: ExpandFn = Arc::new(move |v: &Value| erase_seq(f(cast::<T>(v))));
        Bag::from_expr(Expr::new(ExprKind::Expand {
            src: self.expr.clone(),
            f,
        }))
    }

    /// Multiset union. Duplicates are kept; `a.union(&a)` holds every
    /// element of `a` twice.
    pub fn union(&self, other: &Bag<T>) -> Bag<T> {
        Bag::from_expr(Expr::new(ExprKind::Union {
            left: self.expr.clone(),
            right: other.expr.clone(),
        }))
    }

    /// Fold all elements sharing a key into one.
    ///
    /// Collisions are combined in arrival order as `reduce(accumulated,
    /// next)`; every element of a key's group is folded in exactly once.
    /// Output order is the first-seen order of keys.
    pub fn group_reduce<K, KF, RF>(&self, to_key: KF, reduce: RF) -> Bag<T>
    where
        K: ToString,
        KF: Fn(&T) -> K + Send + Sync + 'static,
        RF: Fn(&T, &T) -> T + Send + Sync + 'static,
    {
        let to_key: KeyFn = Arc::new(move |v: &Value| to_key(cast::<T>(v)).to_string());
        let reduce: ReduceFn = Arc::new(move |a: &Value, b: &Value| {
            erase(reduce(cast::<T>(a), cast::<T>(b)))
        });
        Bag::from_expr(Expr::new(ExprKind::GroupReduce {
            src: self.expr.clone(),
            to_key,
            reduce,
        }))
    }

    /// Cartesian product: `pair` runs for every `(left, right)` element
    /// pair in left-major order, and all outputs are concatenated.
    pub fn product<U, O, F>(&self, other: &Bag<U>, pair: F) -> Bag<O>
    where
        U: Elem,
        O: Elem,
        F: Fn(&T, &U) -> Vec<O> + Send + Sync + 'static,
    {
        let pair: PairFn =
            Arc::new(move |a: &Value, b: &Value| erase_seq(pair(cast::<T>(a), cast::<U>(b))));
        Bag::from_expr(Expr::new(ExprKind::Product {
            left: self.expr.clone(),
            right: other.expr.clone(),
            pair,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_allocate_fresh_nodes() {
        let a = constant(1_i32);
        let mapped = a.expand(|x| vec![x * 2]);
        let union = mapped.union(&mapped);
        assert_ne!(a.id(), mapped.id());
        assert_ne!(mapped.id(), union.id());
    }

    #[test]
    fn test_clone_shares_the_node() {
        let a = input::<String>();
        let b = a.clone();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_operator_kinds() {
        let a = input::<i32>();
        assert!(matches!(a.expr().kind(), ExprKind::Input));
        assert!(matches!(constant(5).expr().kind(), ExprKind::Constant(_)));
        assert!(matches!(
            a.expand(|x| vec![*x]).expr().kind(),
            ExprKind::Expand { .. }
        ));
        assert!(matches!(a.union(&a).expr().kind(), ExprKind::Union { .. }));
        assert!(matches!(
            a.group_reduce(|x| *x, |x, _| *x).expr().kind(),
            ExprKind::GroupReduce { .. }
        ));
        assert!(matches!(
            a.product(&a, |x, y| vec![x + y]).expr().kind(),
            ExprKind::Product { .. }
        ));
    }
}
