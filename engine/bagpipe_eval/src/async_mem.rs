//! The future-based engine.

use std::future::Future;
use std::sync::Arc;

use bagpipe_dag::{Dag, Node, Origin, OriginKind};
use bagpipe_ir::{cast_seq, erase_seq, Bag, Elem, ExpandFn, ExprId, ExprKind, Seq};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{EvalError, EvalResult};
use crate::fold;

type SeqFuture = Shared<BoxFuture<'static, EvalResult<Arc<Seq>>>>;

fn shared_ready(outcome: EvalResult<Arc<Seq>>) -> SeqFuture {
    future::ready(outcome).boxed().shared()
}

/// Future-based evaluation engine.
///
/// Semantics match [`SyncMem`](crate::SyncMem), with one addition: the
/// memo caches hold the in-flight shared future itself, not just the
/// settled outcome. A `get` issued while an earlier `get` of the same
/// node is still pending awaits the same computation - at-most-once
/// evaluation holds for overlapping concurrent requests, not only for
/// sequential repeats.
///
/// The handle is cheap to clone and clones share all state.
#[derive(Clone, Default)]
pub struct AsyncMem {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    dag: Dag,
    inputs: Mutex<FxHashMap<ExprId, SeqFuture>>,
    cache: Mutex<FxHashMap<ExprId, SeqFuture>>,
}

impl AsyncMem {
    pub fn new() -> Self {
        AsyncMem::default()
    }

    /// Bind a future of a collection to an `Input` expression.
    ///
    /// The future is not polled until some `get` depends on it. Must
    /// happen before the first dependent `get`; rebinding after that
    /// does not invalidate memoized outcomes.
    pub fn set<T, F>(&self, input: &Bag<T>, values: F)
    where
        T: Elem,
        F: Future<Output = Vec<T>> + Send + 'static,
    {
        debug_assert!(
            matches!(input.expr().kind(), ExprKind::Input),
            "set() binds Input expressions"
        );
        let fut: SeqFuture = async move { Ok(Arc::new(erase_seq(values.await))) }
            .boxed()
            .shared();
        self.inner.inputs.lock().insert(input.id(), fut);
    }

    /// Future of the materialized `bag`.
    ///
    /// Compilation and future construction happen synchronously in this
    /// call; the work itself runs when the returned future is polled.
    pub fn get<T: Elem + Clone>(
        &self,
        bag: &Bag<T>,
    ) -> impl Future<Output = EvalResult<Vec<T>>> + Send + 'static {
        let node = self.inner.dag.get(bag.expr());
        let fut = self.node_seq(&node);
        async move {
            let seq = fut.await?;
            Ok(cast_seq::<T>(&seq))
        }
    }

    fn node_seq(&self, node: &Arc<Node>) -> SeqFuture {
        // Single untouched identity path: the node is its origin.
        if let [link] = node.links() {
            if link.is_identity() && link.count() == 1 {
                return self.origin_seq(link.origin());
            }
        }
        let id = node.id();
        if let Some(fut) = self.inner.cache.lock().get(&id) {
            tracing::trace!(id = %id, "eval cache hit");
            return fut.clone();
        }
        // Resolve origin futures before taking the cache lock; the
        // recursion below may need it.
        let parts: Vec<(SeqFuture, ExpandFn, usize)> = node
            .links()
            .iter()
            .map(|link| (self.origin_seq(link.origin()), link.func().clone(), link.count()))
            .collect();
        let fut: SeqFuture = async move {
            let mut out = Seq::new();
            for (origin, func, count) in parts {
                let seq = origin.await?;
                fold::expand_over(&seq, &func, count, &mut out);
            }
            Ok(Arc::new(out))
        }
        .boxed()
        .shared();
        self.inner.cache.lock().entry(id).or_insert(fut).clone()
    }

    fn origin_seq(&self, origin: &Arc<Origin>) -> SeqFuture {
        let id = origin.id();
        if let Some(fut) = self.inner.cache.lock().get(&id) {
            tracing::trace!(id = %id, "eval cache hit");
            return fut.clone();
        }
        let fut = self.eval_origin(origin);
        self.inner.cache.lock().entry(id).or_insert(fut).clone()
    }

    fn eval_origin(&self, origin: &Arc<Origin>) -> SeqFuture {
        let id = origin.id();
        match origin.kind() {
            OriginKind::Input => match self.inner.inputs.lock().get(&id) {
                Some(fut) => fut.clone(),
                None => shared_ready(Err(EvalError::UnresolvedInput { id })),
            },
            OriginKind::Constant(value) => shared_ready(Ok(Arc::new(vec![value.clone()]))),
            OriginKind::GroupReduce {
                src,
                to_key,
                reduce,
            } => {
                let src = self.node_seq(src);
                let (to_key, reduce) = (to_key.clone(), reduce.clone());
                async move {
                    let input = src.await?;
                    Ok(Arc::new(fold::group_into(&input, &to_key, &reduce)))
                }
                .boxed()
                .shared()
            }
            OriginKind::Product { left, right, pair } => {
                let left = self.node_seq(left);
                let right = self.node_seq(right);
                let pair = pair.clone();
                async move {
                    let a = left.await?;
                    let b = right.await?;
                    Ok(Arc::new(fold::cross(&a, &b, &pair)))
                }
                .boxed()
                .shared()
            }
        }
    }
}
