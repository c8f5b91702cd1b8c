//! Property and element keys.
//!
//! A `Key` addresses one slot of a container: a record field, a list index,
//! or a map/set entry. Primitive keys compare by value; structured and opaque
//! keys compare by identity, so two distinct nodes with equal contents are
//! distinct keys.
//!
//! Float keys are canonicalized on construction: every NaN maps to one NaN
//! bit pattern and negative zero folds onto positive zero. This only affects
//! keying; change detection on stored values keeps the two zeros distinct.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::value::opaque::Opaque;
use crate::value::raw::RawNode;
use crate::value::Value;

/// A container key.
#[derive(Clone, Debug)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    /// Canonicalized float bits. Construct via [`Key::float`].
    Float(u64),
    Str(Arc<str>),
    /// Identity of a structured node.
    Ref(Arc<RawNode>),
    /// Identity of an opaque leaf.
    Opaque(Opaque),
}

impl Key {
    /// Build a float key with canonicalized bits.
    pub fn float(f: f64) -> Self {
        let canonical = if f.is_nan() {
            f64::NAN
        } else if f == 0.0 {
            0.0
        } else {
            f
        };
        Key::Float(canonical.to_bits())
    }

    /// Build a string key.
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Key::Str(s.into())
    }

    /// Build a list index key.
    pub fn index(i: usize) -> Self {
        Key::Int(i as i64)
    }

    /// Convert an arbitrary value into a key.
    ///
    /// Façades are unwrapped first so raw storage never holds a wrapped
    /// reference, not even in key position.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Key::Null,
            Value::Bool(b) => Key::Bool(*b),
            Value::Int(i) => Key::Int(*i),
            Value::Float(f) => Key::float(*f),
            Value::Str(s) => Key::Str(Arc::clone(s)),
            Value::Opaque(o) => Key::Opaque(o.clone()),
            Value::Raw(node) => Key::Ref(Arc::clone(node)),
            Value::Obs(obs) => Key::Ref(obs.raw()),
        }
    }

    /// Convert the key back into a value.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Null => Value::Null,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Int(*i),
            Key::Float(bits) => Value::Float(f64::from_bits(*bits)),
            Key::Str(s) => Value::Str(Arc::clone(s)),
            Key::Ref(node) => Value::Raw(Arc::clone(node)),
            Key::Opaque(o) => Value::Opaque(o.clone()),
        }
    }

    /// Whether the key carries identity rather than a primitive value.
    ///
    /// Weak collections accept only identity keys.
    pub fn is_identity(&self) -> bool {
        matches!(self, Key::Ref(_) | Key::Opaque(_))
    }

    /// Interpret the key as a list index.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Int(i) if *i >= 0 => Some(*i as usize),
            _ => None,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Null, Key::Null) => true,
            (Key::Bool(a), Key::Bool(b)) => a == b,
            (Key::Int(a), Key::Int(b)) => a == b,
            (Key::Float(a), Key::Float(b)) => a == b,
            (Key::Str(a), Key::Str(b)) => a == b,
            (Key::Ref(a), Key::Ref(b)) => a.id() == b.id(),
            (Key::Opaque(a), Key::Opaque(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Key::Null => {}
            Key::Bool(b) => b.hash(state),
            Key::Int(i) => i.hash(state),
            Key::Float(bits) => bits.hash(state),
            Key::Str(s) => s.hash(state),
            Key::Ref(node) => node.id().hash(state),
            Key::Opaque(o) => o.id().hash(state),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Arc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(Arc::from(s))
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::index(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_keys_fold_nan_and_zero() {
        let nan1 = Key::float(f64::NAN);
        let nan2 = Key::float(-f64::NAN);
        assert_eq!(nan1, nan2);

        let pos = Key::float(0.0);
        let neg = Key::float(-0.0);
        assert_eq!(pos, neg);
    }

    #[test]
    fn string_keys_compare_by_content() {
        assert_eq!(Key::from("x"), Key::str(String::from("x")));
    }

    #[test]
    fn ref_keys_compare_by_identity() {
        let a = RawNode::record();
        let b = RawNode::record();
        assert_ne!(Key::Ref(Arc::clone(&a)), Key::Ref(b));
        assert_eq!(Key::Ref(Arc::clone(&a)), Key::Ref(a));
    }
}
