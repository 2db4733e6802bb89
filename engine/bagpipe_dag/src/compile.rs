//! Expression-to-graph compilation, memoized by expression id.

use std::sync::Arc;

use bagpipe_ir::{ExprId, ExprKind, ExprRef};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::graph::{Node, Origin, OriginKind};

/// The compiler. Owns the id-keyed compilation cache; engines keep one
/// instance for their lifetime so every expression node is compiled at
/// most once, however many evaluations reach it.
#[derive(Default)]
pub struct Dag {
    cache: Mutex<FxHashMap<ExprId, Arc<Node>>>,
}

impl Dag {
    pub fn new() -> Self {
        Dag::default()
    }

    /// Compiled graph node for `expr`.
    ///
    /// Repeated calls for the same expression id return the identical
    /// `Arc` (pointer equality), which is what downstream memoization
    /// keys on.
    pub fn get(&self, expr: &ExprRef) -> Arc<Node> {
        let id = expr.id();
        if let Some(node) = self.cache.lock().get(&id) {
            tracing::trace!(id = %id, "compile cache hit");
            return node.clone();
        }
        tracing::trace!(id = %id, kind = expr.kind().name(), "compiling");
        let node = match expr.kind() {
            ExprKind::Input => Node::leaf(Origin::new(id, OriginKind::Input)),
            ExprKind::Constant(value) => {
                Node::leaf(Origin::new(id, OriginKind::Constant(value.clone())))
            }
            ExprKind::Expand { src, f } => self.get(src).expand(id, f),
            ExprKind::Union { left, right } => self.get(left).union(id, &self.get(right)),
            ExprKind::GroupReduce {
                src,
                to_key,
                reduce,
            } => Node::leaf(Origin::new(
                id,
                OriginKind::GroupReduce {
                    src: self.get(src),
                    to_key: to_key.clone(),
                    reduce: reduce.clone(),
                },
            )),
            ExprKind::Product { left, right, pair } => Node::leaf(Origin::new(
                id,
                OriginKind::Product {
                    left: self.get(left),
                    right: self.get(right),
                    pair: pair.clone(),
                },
            )),
        };
        self.cache.lock().entry(id).or_insert(node).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagpipe_ir::{constant, input};

    #[test]
    fn test_leaves_compile_to_single_identity_links() {
        let dag = Dag::new();
        let one = constant("Hello world!".to_string());
        let node = dag.get(one.expr());
        assert_eq!(node.id(), one.id());
        assert_eq!(node.links().len(), 1);
        assert!(node.links()[0].is_identity());
        assert_eq!(node.links()[0].origin_id(), one.id());
    }

    #[test]
    fn test_compilation_is_memoized_by_identity() {
        let dag = Dag::new();
        let one = constant(1_i32);
        let first = dag.get(one.expr());
        let second = dag.get(one.expr());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_expands_fuse_onto_the_leaf() {
        let dag = Dag::new();
        let src = input::<i32>();
        let chained = src.filter(|x| *x > 0).map(|x| x.to_string());
        let node = dag.get(chained.expr());
        assert_eq!(node.id(), chained.id());
        assert_eq!(node.links().len(), 1);
        assert_eq!(node.links()[0].origin_id(), src.id());
    }

    #[test]
    fn test_union_merges_links_sharing_an_origin() {
        let dag = Dag::new();
        let one = constant(1_i32);
        let mapped = one.map(|x| x + 1);
        let merged = dag.get(mapped.union(&one).expr());
        assert_eq!(merged.links().len(), 1);
        assert_eq!(merged.links()[0].origin_id(), one.id());
    }

    #[test]
    fn test_union_keeps_links_of_distinct_origins() {
        let dag = Dag::new();
        let one = constant(1_i32);
        let other = input::<i32>();
        let u = one.map(|x| x * 2).union(&other.map(|x| x * 3));
        let node = dag.get(u.expr());
        assert_eq!(node.links().len(), 2);
        assert_eq!(node.links()[0].origin_id(), one.id());
        assert_eq!(node.links()[1].origin_id(), other.id());
    }

    #[test]
    fn test_self_union_becomes_one_path_with_multiplicity() {
        let dag = Dag::new();
        let shared = input::<i32>();
        let mapped = shared.map(|x| x + 1);
        let node = dag.get(mapped.union(&mapped).expr());
        assert_eq!(node.links().len(), 1);
        assert_eq!(node.links()[0].origin_id(), shared.id());
        assert_eq!(node.links()[0].count(), 2);
    }

    #[test]
    fn test_barriers_start_fresh_nodes() {
        let dag = Dag::new();
        let one = constant(1_i32);
        let reduced = one.reduce_all(|a, _| *a);
        let node = dag.get(reduced.expr());
        assert_eq!(node.links().len(), 1);
        assert_eq!(node.links()[0].origin_id(), reduced.id());
        assert!(matches!(
            node.links()[0].origin().kind(),
            OriginKind::GroupReduce { .. }
        ));

        let other = input::<i32>();
        let prod = one.product(&other, |a, b| vec![a + b]);
        let pnode = dag.get(prod.expr());
        assert_eq!(pnode.links().len(), 1);
        assert_eq!(pnode.links()[0].origin_id(), prod.id());
        assert!(matches!(
            pnode.links()[0].origin().kind(),
            OriginKind::Product { .. }
        ));
    }
}
