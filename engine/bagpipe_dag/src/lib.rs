//! Bagpipe DAG - compiles expression trees into fused, shared graphs.
//!
//! The compiler rewrites a bag expression into a graph of [`Node`]s, each
//! holding fused access paths ([`Link`]s) from the few points that must
//! actually be materialized - unbound inputs, constants, and the barrier
//! operators (grouped reduction, cartesian product). A chain of expansions
//! collapses into a single composed closure per origin; a union of two
//! views over the same origin collapses into a single pass over it.
//!
//! Compilation is memoized by expression id inside a [`Dag`] instance:
//! asking twice for the same node returns the pointer-identical result, so
//! shared subtrees compile - and later evaluate - once.

mod compile;
mod graph;

pub use compile::Dag;
pub use graph::{Link, Node, Origin, OriginKind};
