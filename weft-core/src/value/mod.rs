//! Dynamic value model.
//!
//! The runtime tracks arbitrarily shaped data, so values flow through one
//! cheap-to-clone enum instead of a generic parameter. Primitives travel by
//! value; structured nodes and opaque leaves travel behind `Arc` and carry
//! identity.
//!
//! Change detection uses identity comparison with the usual numeric
//! refinement: NaN equals itself and positive zero is distinct from negative
//! zero. Structural equality is deliberately not consulted; replacing a
//! value with an equal-but-distinct node always counts as a change.

mod key;
mod opaque;
mod raw;

pub use key::Key;
pub use opaque::{Opaque, OpaqueId};
pub use raw::{NodeKind, RawId, RawNode};

pub(crate) use raw::{NodeData, Slot};

use std::sync::Arc;

use crate::wrap::Observable;

/// A dynamic value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// Pass-through leaf; never wrapped, compared by identity.
    Opaque(Opaque),
    /// Unwrapped structured node.
    Raw(Arc<RawNode>),
    /// Wrapped façade over a structured node.
    Obs(Observable),
}

impl Value {
    /// Build a string value.
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// The identity of the structured node behind this value, if any.
    ///
    /// A raw node and its façade share one identity.
    pub fn raw_id(&self) -> Option<RawId> {
        match self {
            Value::Raw(node) => Some(node.id()),
            Value::Obs(obs) => Some(obs.raw_id()),
            _ => None,
        }
    }

    /// Borrow the façade, if this value is wrapped.
    pub fn as_obs(&self) -> Option<&Observable> {
        match self {
            Value::Obs(obs) => Some(obs),
            _ => None,
        }
    }

    /// Take the façade out of this value.
    pub fn into_obs(self) -> Option<Observable> {
        match self {
            Value::Obs(obs) => Some(obs),
            _ => None,
        }
    }

    /// Borrow the raw node behind this value, resolving façades.
    pub fn as_raw(&self) -> Option<Arc<RawNode>> {
        match self {
            Value::Raw(node) => Some(Arc::clone(node)),
            Value::Obs(obs) => Some(obs.raw()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Conventional equality: like [`same_value`] except floats compare with
/// `==`, so NaN is unequal to itself and the two zeros are equal. Change
/// detection never uses this; it exists for ergonomic assertions and
/// container membership on the caller's side.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Float(x), Value::Float(y)) => x == y,
            _ => same_value(self, other),
        }
    }
}

impl From<Arc<RawNode>> for Value {
    fn from(node: Arc<RawNode>) -> Self {
        Value::Raw(node)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Opaque(o) => write!(f, "Opaque(#{})", o.id().raw()),
            Value::Raw(node) => write!(f, "Raw(#{})", node.id().raw()),
            Value::Obs(obs) => write!(f, "Obs(#{})", obs.raw_id().raw()),
        }
    }
}

/// Identity comparison used for "did this write actually change anything".
///
/// - NaN equals NaN; `+0.0` and `-0.0` are distinct.
/// - Strings compare by content (they are primitives in this model).
/// - Opaque leaves compare by leaf identity.
/// - Structured values compare by node identity; a raw node and its façade
///   are the same value.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => {
            (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits()
        }
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Opaque(x), Value::Opaque(y)) => x.id() == y.id(),
        _ => match (a.raw_id(), b.raw_id()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_same_as_nan() {
        assert!(same_value(&Value::Float(f64::NAN), &Value::Float(f64::NAN)));
    }

    #[test]
    fn signed_zeros_are_distinct() {
        assert!(!same_value(&Value::Float(0.0), &Value::Float(-0.0)));
        assert!(same_value(&Value::Float(0.0), &Value::Float(0.0)));
    }

    #[test]
    fn strings_compare_by_content() {
        assert!(same_value(&Value::from("a"), &Value::str(String::from("a"))));
        assert!(!same_value(&Value::from("a"), &Value::from("b")));
    }

    #[test]
    fn structured_values_compare_by_identity() {
        let a = RawNode::record();
        let b = RawNode::record();
        assert!(same_value(
            &Value::Raw(Arc::clone(&a)),
            &Value::Raw(Arc::clone(&a))
        ));
        assert!(!same_value(&Value::Raw(a), &Value::Raw(b)));
    }

    #[test]
    fn int_and_float_are_distinct_variants() {
        assert!(!same_value(&Value::Int(1), &Value::Float(1.0)));
    }
}
