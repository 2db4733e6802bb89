//! The synchronous engine.

use std::sync::Arc;

use bagpipe_dag::{Dag, Node, Origin, OriginKind};
use bagpipe_ir::{cast_seq, erase_seq, Bag, Elem, ExprId, ExprKind, Seq};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{EvalError, EvalResult};
use crate::fold;

/// Synchronous evaluation engine.
///
/// Owns its compiler and an id-keyed memo of evaluation outcomes; both
/// caches live as long as the engine. Locks are taken only for cache
/// lookups and insertions, never across the recursive walk, so the engine
/// is usable behind `&self` from multiple threads - though single-flight
/// deduplication of *in-flight* work is the async engine's business; here
/// at-most-once holds for anything already memoized.
#[derive(Default)]
pub struct SyncMem {
    dag: Dag,
    inputs: Mutex<FxHashMap<ExprId, Arc<Seq>>>,
    cache: Mutex<FxHashMap<ExprId, EvalResult<Arc<Seq>>>>,
}

impl SyncMem {
    pub fn new() -> Self {
        SyncMem::default()
    }

    /// Bind a concrete collection to an `Input` expression.
    ///
    /// Must happen before the first `get` that depends on the input;
    /// rebinding after that does not invalidate memoized outcomes.
    pub fn set<T: Elem>(&self, input: &Bag<T>, values: Vec<T>) {
        debug_assert!(
            matches!(input.expr().kind(), ExprKind::Input),
            "set() binds Input expressions"
        );
        self.inputs.lock().insert(input.id(), Arc::new(erase_seq(values)));
    }

    /// Materialize `bag`.
    ///
    /// Compiles the expression (memoized), evaluates the resulting graph
    /// bottom-up (memoized per node), and fails only if evaluation
    /// reaches an unbound input.
    pub fn get<T: Elem + Clone>(&self, bag: &Bag<T>) -> EvalResult<Vec<T>> {
        let node = self.dag.get(bag.expr());
        let seq = self.node_seq(&node)?;
        Ok(cast_seq::<T>(&seq))
    }

    fn node_seq(&self, node: &Arc<Node>) -> EvalResult<Arc<Seq>> {
        // A node whose single link is the untouched identity path *is* its
        // origin; share the origin's memo entry instead of copying it.
        if let [link] = node.links() {
            if link.is_identity() && link.count() == 1 {
                return self.origin_seq(link.origin());
            }
        }
        let id = node.id();
        if let Some(outcome) = self.cache.lock().get(&id) {
            tracing::trace!(id = %id, "eval cache hit");
            return outcome.clone();
        }
        let outcome = self.eval_links(node);
        self.cache.lock().entry(id).or_insert(outcome).clone()
    }

    fn eval_links(&self, node: &Node) -> EvalResult<Arc<Seq>> {
        tracing::trace!(id = %node.id(), links = node.links().len(), "evaluating node");
        let mut out = Seq::new();
        for link in node.links() {
            let origin = self.origin_seq(link.origin())?;
            fold::expand_over(&origin, link.func(), link.count(), &mut out);
        }
        Ok(Arc::new(out))
    }

    fn origin_seq(&self, origin: &Arc<Origin>) -> EvalResult<Arc<Seq>> {
        let id = origin.id();
        if let Some(outcome) = self.cache.lock().get(&id) {
            tracing::trace!(id = %id, "eval cache hit");
            return outcome.clone();
        }
        let outcome = self.eval_origin(origin);
        self.cache.lock().entry(id).or_insert(outcome).clone()
    }

    fn eval_origin(&self, origin: &Origin) -> EvalResult<Arc<Seq>> {
        match origin.kind() {
            OriginKind::Input => self
                .inputs
                .lock()
                .get(&origin.id())
                .cloned()
                .ok_or(EvalError::UnresolvedInput { id: origin.id() }),
            OriginKind::Constant(value) => Ok(Arc::new(vec![value.clone()])),
            OriginKind::GroupReduce {
                src,
                to_key,
                reduce,
            } => {
                let input = self.node_seq(src)?;
                Ok(Arc::new(fold::group_into(&input, to_key, reduce)))
            }
            OriginKind::Product { left, right, pair } => {
                let a = self.node_seq(left)?;
                let b = self.node_seq(right)?;
                Ok(Arc::new(fold::cross(&a, &b, pair)))
            }
        }
    }
}
