//! Bagpipe IR - lazy multiset (bag) expression trees.
//!
//! A `Bag<T>` describes a multiset of values without computing it: building
//! an operator records a new immutable node in an expression tree, and an
//! evaluation engine materializes the tree later. The algebra is small:
//!
//! - `input()` / `constant(v)` - leaves
//! - `expand(f)` - one-to-many per-element transform
//! - `union(b)` - multiset union (no deduplication)
//! - `group_reduce(to_key, reduce)` - grouped reduction
//! - `product(b, pair)` - cartesian product
//!
//! Everything else (`map`, `filter`, `compact`, `reduce_all`, `join`,
//! `diff`, `from_values`, `range`) derives from those six.
//!
//! # Erasure
//!
//! Element types exist only at the `Bag<T>` surface. Internally every node
//! stores erased `Arc<dyn Any>` values and erased closures, so downstream
//! compilation and evaluation never need to name the intermediate element
//! types an expression flows through. The typed facade is the only place a
//! downcast happens, and it cannot fail by construction.
//!
//! # Identity
//!
//! Every node carries a process-unique [`ExprId`]. Reusing one `Bag` value
//! as the operand of several operators is what later lets the compiler
//! detect structural sharing - sharing is by id, never by structural
//! equality of the trees.

mod bag;
mod derived;
mod expr;
mod expr_id;
mod value;

pub use bag::{constant, input, Bag};
pub use derived::{from_values, range, Diff, Joined};
pub use expr::{Expr, ExprKind, ExprRef};
pub use expr_id::ExprId;
pub use value::{cast, cast_seq, erase, erase_seq, Elem, ExpandFn, KeyFn, PairFn, ReduceFn, Seq, Value};
