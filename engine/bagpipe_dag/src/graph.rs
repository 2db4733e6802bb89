//! Optimized graph types: origins, links, and nodes.

use std::fmt;
use std::sync::Arc;

use bagpipe_ir::{ExpandFn, ExprId, KeyFn, PairFn, ReduceFn, Seq, Value};
use smallvec::{smallvec, SmallVec};

/// What a link ultimately reads from: a leaf of the expression tree, or a
/// barrier operator whose output must be materialized before anything
/// downstream of it can run.
pub enum OriginKind {
    /// Unbound source; the engine resolves it against its `set` bindings.
    Input,
    /// The singleton multiset `[value]`.
    Constant(Value),
    /// Grouped reduction over a fully materialized input node.
    GroupReduce {
        src: Arc<Node>,
        to_key: KeyFn,
        reduce: ReduceFn,
    },
    /// Cartesian product of two fully materialized nodes.
    Product {
        left: Arc<Node>,
        right: Arc<Node>,
        pair: PairFn,
    },
}

/// An evaluable origin, identified by the id of the expression node it was
/// compiled from. Engines memoize origin results by this id.
pub struct Origin {
    id: ExprId,
    kind: OriginKind,
}

impl Origin {
    pub fn new(id: ExprId, kind: OriginKind) -> Arc<Origin> {
        Arc::new(Origin { id, kind })
    }

    #[inline]
    pub fn id(&self) -> ExprId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &OriginKind {
        &self.kind
    }
}

/// One fused access path from an origin to the element type of the node
/// that holds the link.
///
/// `via` identifies the expression node whose composition the closure
/// represents; together with the origin id it is the handle by which union
/// merging recognizes computations, so detection never relies on closure
/// object identity. `count` is the path's multiplicity: a self-union
/// merges into one link with a higher count, evaluated once and its output
/// repeated - which is what keeps user-visible side effects at-most-once
/// per origin element.
#[derive(Clone)]
pub struct Link {
    origin: Arc<Origin>,
    via: ExprId,
    count: usize,
    func: ExpandFn,
    identity: bool,
}

impl Link {
    /// The untransformed path: origin elements pass through unchanged.
    pub fn identity(origin: Arc<Origin>) -> Link {
        let func: ExpandFn = Arc::new(|v: &Value| vec![v.clone()]);
        Link {
            via: origin.id(),
            origin,
            count: 1,
            func,
            identity: true,
        }
    }

    #[inline]
    pub fn origin(&self) -> &Arc<Origin> {
        &self.origin
    }

    #[inline]
    pub fn origin_id(&self) -> ExprId {
        self.origin.id()
    }

    #[inline]
    pub fn via(&self) -> ExprId {
        self.via
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn func(&self) -> &ExpandFn {
        &self.func
    }

    /// True for an untouched [`Link::identity`] path.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Compose `f` after this link's closure. Composing onto the identity
    /// path installs `f` directly instead of wrapping it.
    pub fn expand(&self, via: ExprId, f: ExpandFn) -> Link {
        let func: ExpandFn = if self.identity {
            f
        } else {
            let g = self.func.clone();
            Arc::new(move |v: &Value| g(v).iter().flat_map(|x| f(x)).collect::<Seq>())
        };
        Link {
            origin: self.origin.clone(),
            via,
            count: self.count,
            func,
            identity: false,
        }
    }

    /// The same computation reached through another union branch: keep one
    /// closure, bump the multiplicity.
    pub fn repeated(&self, extra: usize) -> Link {
        Link {
            count: self.count + extra,
            ..self.clone()
        }
    }

    /// Merge with a differently-composed link over the same origin into a
    /// single pass that produces both outputs per origin element.
    pub fn merge(&self, via: ExprId, other: &Link) -> Link {
        debug_assert_eq!(self.origin_id(), other.origin_id());
        let (f, fc) = (self.func.clone(), self.count);
        let (g, gc) = (other.func.clone(), other.count);
        let func: ExpandFn = Arc::new(move |v: &Value| {
            let mut out = Seq::new();
            let fs = f(v);
            for _ in 0..fc {
                out.extend(fs.iter().cloned());
            }
            let gs = g(v);
            for _ in 0..gc {
                out.extend(gs.iter().cloned());
            }
            out
        });
        Link {
            origin: self.origin.clone(),
            via,
            count: 1,
            func,
            identity: false,
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("origin", &self.origin.id())
            .field("via", &self.via)
            .field("count", &self.count)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Compiled counterpart of one expression node: the concatenation of its
/// links' outputs, in list order.
///
/// Invariant: all links of a node have distinct origin ids - union
/// compilation merges same-origin paths instead of appending them.
pub struct Node {
    id: ExprId,
    links: SmallVec<[Link; 2]>,
}

impl Node {
    /// A leaf-like node: its origin behind one identity link. Used for
    /// `Input`/`Constant` leaves and for barrier operators, which always
    /// start a fresh node.
    pub fn leaf(origin: Arc<Origin>) -> Arc<Node> {
        Arc::new(Node {
            id: origin.id(),
            links: smallvec![Link::identity(origin)],
        })
    }

    #[inline]
    pub fn id(&self) -> ExprId {
        self.id
    }

    #[inline]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Per-element expansion: compose `f` onto every access path.
    pub fn expand(&self, id: ExprId, f: &ExpandFn) -> Arc<Node> {
        let links = self
            .links
            .iter()
            .map(|link| link.expand(id, f.clone()))
            .collect();
        Arc::new(Node { id, links })
    }

    /// Multiset union; the common-subexpression elimination point.
    ///
    /// Each right-hand link lands in one of three ways: an identical
    /// computation (same origin, same `via`) raises the multiplicity of
    /// the existing link; a different computation over an origin already
    /// in the list is fused into that link's pass; anything else is
    /// appended.
    pub fn union(&self, id: ExprId, other: &Node) -> Arc<Node> {
        let mut links: SmallVec<[Link; 2]> = self.links.clone();
        for incoming in &other.links {
            match links
                .iter_mut()
                .find(|l| l.origin_id() == incoming.origin_id())
            {
                Some(existing) if existing.via() == incoming.via() => {
                    *existing = existing.repeated(incoming.count());
                }
                Some(existing) => {
                    *existing = existing.merge(id, incoming);
                }
                None => links.push(incoming.clone()),
            }
        }
        Arc::new(Node { id, links })
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("links", &self.links)
            .finish()
    }
}
