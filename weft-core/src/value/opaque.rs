//! Opaque leaf values.
//!
//! An `Opaque` carries a caller-owned platform value through the value model
//! without the engine ever looking inside it. Stateful-but-non-data types
//! (timestamps, compiled matchers, pending-computation handles, error
//! objects, UI-tree nodes) enter the model this way; the wrapper factory
//! passes them through unwrapped because intercepting them would break their
//! internal invariants.
//!
//! Opaque values compare by identity, never by content.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Unique identifier for an opaque leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpaqueId(u64);

impl OpaqueId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A pass-through leaf holding an arbitrary caller value.
#[derive(Clone)]
pub struct Opaque {
    id: OpaqueId,
    value: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    /// Wrap a caller value into an opaque leaf.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            id: OpaqueId::new(),
            value: Arc::new(value),
        }
    }

    /// Get the leaf's identity.
    pub fn id(&self) -> OpaqueId {
        self.id
    }

    /// Recover the concrete value.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| Error::OpaqueType {
                expected: std::any::type_name::<T>(),
            })
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Opaque {}

impl std::fmt::Debug for Opaque {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opaque").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_roundtrips_concrete_type() {
        let leaf = Opaque::new(String::from("pattern"));
        let back = leaf.downcast::<String>().unwrap();
        assert_eq!(back.as_str(), "pattern");
    }

    #[test]
    fn opaque_rejects_wrong_type() {
        let leaf = Opaque::new(42_i64);
        assert!(leaf.downcast::<String>().is_err());
    }

    #[test]
    fn opaque_compares_by_identity() {
        let a = Opaque::new(1_i64);
        let b = Opaque::new(1_i64);
        let a2 = a.clone();

        assert_ne!(a, b);
        assert_eq!(a, a2);
    }
}
