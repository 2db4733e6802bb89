//! The erased expression tree.

use std::fmt;
use std::sync::Arc;

use crate::expr_id::ExprId;
use crate::value::{ExpandFn, KeyFn, PairFn, ReduceFn, Value};

/// Shared handle to one expression node. Children are held through this
/// alias, so a node reused as the operand of several operators is the same
/// allocation - and the same id - everywhere it appears.
pub type ExprRef = Arc<Expr>;

/// One immutable node of a bag expression.
pub struct Expr {
    id: ExprId,
    kind: ExprKind,
}

/// The closed set of operators.
///
/// `GroupReduce` and `Product` are evaluation barriers: they need their
/// operand multisets fully materialized before producing a single output
/// element, so the compiler never fuses transforms across them.
pub enum ExprKind {
    /// Unbound source; an engine binds a collection to it via `set`.
    Input,
    /// The singleton multiset `[value]`.
    Constant(Value),
    /// One-to-many per-element transform of `src`.
    Expand { src: ExprRef, f: ExpandFn },
    /// Multiset union. Keeps duplicates from both sides.
    Union { left: ExprRef, right: ExprRef },
    /// Fold all elements sharing a key into one, in arrival order.
    GroupReduce {
        src: ExprRef,
        to_key: KeyFn,
        reduce: ReduceFn,
    },
    /// Cartesian product, left-major, flat-expanded through `pair`.
    Product {
        left: ExprRef,
        right: ExprRef,
        pair: PairFn,
    },
}

impl Expr {
    /// Wrap `kind` into a new node with a fresh id.
    pub fn new(kind: ExprKind) -> ExprRef {
        Arc::new(Expr {
            id: ExprId::fresh(),
            kind,
        })
    }

    #[inline]
    pub fn id(&self) -> ExprId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }
}

impl ExprKind {
    /// Operator name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Input => "input",
            ExprKind::Constant(_) => "constant",
            ExprKind::Expand { .. } => "expand",
            ExprKind::Union { .. } => "union",
            ExprKind::GroupReduce { .. } => "group_reduce",
            ExprKind::Product { .. } => "product",
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({}, {})", self.id, self.kind.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::erase;

    #[test]
    fn test_new_nodes_get_fresh_ids() {
        let a = Expr::new(ExprKind::Input);
        let b = Expr::new(ExprKind::Constant(erase(1_i32)));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_shared_child_keeps_its_id() {
        let child = Expr::new(ExprKind::Input);
        let parent = Expr::new(ExprKind::Union {
            left: child.clone(),
            right: child.clone(),
        });
        match parent.kind() {
            ExprKind::Union { left, right } => {
                assert_eq!(left.id(), child.id());
                assert_eq!(right.id(), child.id());
            }
            _ => panic!("expected union"),
        }
    }
}
