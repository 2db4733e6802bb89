//! Bagpipe Eval - engines that materialize bag expressions.
//!
//! Two engines over the same compiled graphs, with identical semantics:
//!
//! - [`SyncMem`]: `set` binds plain collections, `get` returns values.
//! - [`AsyncMem`]: `set` binds futures of collections, `get` returns a
//!   future; for the same node, overlapping `get`s await one computation.
//!
//! Both memoize every distinct graph node by id for the lifetime of the
//! engine instance - a sub-expression shared between call sites, or
//! reached twice within one expression, is evaluated exactly once. There
//! is no eviction, and outcomes are cached whether they succeeded or
//! failed: a node that failed keeps failing identically, and binding an
//! input after a dependent `get` already failed does not unblock it. Bind
//! inputs first.
//!
//! The only engine-defined failure is [`EvalError::UnresolvedInput`];
//! anything a user callback does wrong surfaces as an ordinary panic from
//! that callback.

mod async_mem;
mod error;
mod fold;
mod sync_mem;

#[cfg(test)]
mod tests;

pub use async_mem::AsyncMem;
pub use error::{EvalError, EvalResult};
pub use sync_mem::SyncMem;
