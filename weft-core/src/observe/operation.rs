//! Intercepted operation records.
//!
//! An `Operation` is a transient description of one intercepted call. It is
//! built by a handler, consulted by the dependency store and the debug hooks,
//! and then discarded; nothing persists it.

use crate::value::{Key, RawId, Value};

/// What an intercepted call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// A value read.
    Get,
    /// An existence check.
    Has,
    /// Any shape read: key enumeration, size/length, entry iteration.
    Iterate,
    /// A new key or element appeared.
    Add,
    /// An existing key's value changed.
    Set,
    /// A key or element was removed.
    Delete,
    /// The whole collection was emptied.
    Clear,
}

impl OpKind {
    /// Whether this kind reads shape rather than one key.
    pub fn is_shape_read(&self) -> bool {
        matches!(self, OpKind::Iterate)
    }
}

/// One intercepted call, alive only for the duration of that call.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Identity of the raw value the call targeted.
    pub target: RawId,
    /// The addressed key, absent for shape reads and `clear`.
    pub key: Option<Key>,
    pub kind: OpKind,
    /// Previous value for `set`/`delete`.
    pub old_value: Option<Value>,
    /// Incoming value for `add`/`set`.
    pub new_value: Option<Value>,
}

impl Operation {
    /// A read operation (get/has/iterate).
    pub fn read(target: RawId, key: Option<Key>, kind: OpKind) -> Self {
        Self {
            target,
            key,
            kind,
            old_value: None,
            new_value: None,
        }
    }

    /// A write operation (add/set/delete/clear).
    pub fn write(
        target: RawId,
        key: Option<Key>,
        kind: OpKind,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        Self {
            target,
            key,
            kind,
            old_value,
            new_value,
        }
    }
}
