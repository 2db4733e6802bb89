//! Erased element values and erased transform closures.
//!
//! Expression nodes hide the element types of their operands: an `Expand`
//! node over a `Bag<String>` producing a `Bag<usize>` must be storable next
//! to nodes over any other types. Elements are therefore erased to
//! [`Value`] (`Arc<dyn Any>`) and user callbacks are wrapped into closures
//! over erased values at construction time. The wrapping closures are the
//! only downcast sites in the system; the typed `Bag<T>` facade guarantees
//! the downcasts cannot fail.

use std::any::Any;
use std::sync::Arc;

/// One erased element of a bag. Cheap to clone; the underlying value is
/// shared, never copied, while it flows through a graph.
pub type Value = Arc<dyn Any + Send + Sync>;

/// A materialized multiset of erased elements.
pub type Seq = Vec<Value>;

/// Marker for types usable as bag elements.
pub trait Elem: Any + Send + Sync {}

impl<T: Any + Send + Sync> Elem for T {}

/// Erased one-to-many transform: the payload of `Expand` nodes and of the
/// fused access paths the compiler builds from them.
pub type ExpandFn = Arc<dyn Fn(&Value) -> Seq + Send + Sync>;

/// Erased grouping key function. Keys are strings so that any accumulation
/// map can hold them; typed facades convert with `ToString`.
pub type KeyFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Erased two-into-one reducer for grouped reduction, applied in arrival
/// order as `(accumulated, next)`.
pub type ReduceFn = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// Erased pairing function for cartesian products.
pub type PairFn = Arc<dyn Fn(&Value, &Value) -> Seq + Send + Sync>;

/// Erase one typed element.
#[inline]
pub fn erase<T: Elem>(value: T) -> Value {
    Arc::new(value)
}

/// Erase a typed collection.
pub fn erase_seq<T: Elem>(values: Vec<T>) -> Seq {
    values.into_iter().map(erase).collect()
}

/// Recover a typed reference from an erased element.
///
/// # Panics
///
/// Panics if `value` does not hold a `T`. Unreachable through the `Bag<T>`
/// surface, which pairs every closure with operands of the matching type.
#[inline]
pub fn cast<T: Elem>(value: &Value) -> &T {
    value
        .downcast_ref::<T>()
        .expect("bag element does not have the expected type")
}

/// Recover a typed collection from an erased one.
pub fn cast_seq<T: Elem + Clone>(seq: &[Value]) -> Vec<T> {
    seq.iter().map(|v| cast::<T>(v).clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erase_round_trip() {
        let v = erase(42_i64);
        assert_eq!(*cast::<i64>(&v), 42);
    }

    #[test]
    fn test_erase_seq_round_trip() {
        let seq = erase_seq(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cast_seq::<String>(&seq), vec!["a", "b"]);
    }

    #[test]
    #[should_panic(expected = "expected type")]
    fn test_cast_wrong_type_panics() {
        let v = erase(1_u8);
        cast::<String>(&v);
    }
}
