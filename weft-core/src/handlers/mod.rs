//! Interception handlers.
//!
//! Two families: structural (records and lists) and associative (maps and
//! sets, including the weak-keyed variants). Each family exists in a deep
//! flavor, which lazily wraps nested structured values on access, and a
//! shallow flavor, which tracks the root level only.
//!
//! Handlers read and write through to the underlying raw node while
//! registering dependencies for the currently running reaction and queueing
//! the reactions affected by a genuine change. They never hold a node lock
//! while dispatching, so a triggered reaction is free to read the same node.
//!
//! Both traits can be overridden per façade through [`WrapOptions`].
//!
//! [`WrapOptions`]: crate::WrapOptions

mod collection;
mod structural;

pub use collection::TrackingCollection;
pub use structural::TrackingStructural;

use crate::error::Result;
use crate::value::{Key, Value};
use crate::wrap::Observable;

/// Handlers for records and lists.
pub trait StructuralHandlers: Send + Sync {
    /// Read one property. Registers a get dependency on every delegation
    /// link consulted; fixed slots come back unwrapped.
    fn get(&self, obs: &Observable, key: &Key) -> Result<Option<Value>>;

    /// Existence check along the delegation chain.
    fn has(&self, obs: &Observable, key: &Key) -> Result<bool>;

    /// Own-key enumeration. Registers the shape dependency.
    fn keys(&self, obs: &Observable) -> Result<Vec<Key>>;

    /// Own-key/element count. Registers the shape dependency.
    fn len(&self, obs: &Observable) -> Result<usize>;

    /// Write one property to the receiver's own storage.
    fn set(&self, obs: &Observable, key: Key, value: Value) -> Result<()>;

    /// Remove one own property.
    fn delete(&self, obs: &Observable, key: &Key) -> Result<bool>;

    /// Post-process an instance produced through the façade.
    fn construct(&self, obs: &Observable, produced: Value) -> Value;
}

/// Handlers for maps and sets.
pub trait CollectionHandlers: Send + Sync {
    fn get(&self, obs: &Observable, key: &Key) -> Result<Option<Value>>;

    fn has(&self, obs: &Observable, key: &Key) -> Result<bool>;

    /// Map insert-or-update.
    fn set(&self, obs: &Observable, key: Key, value: Value) -> Result<()>;

    /// Set membership insert. `true` when the element was newly added.
    fn add(&self, obs: &Observable, value: Value) -> Result<bool>;

    fn delete(&self, obs: &Observable, key: &Key) -> Result<bool>;

    /// Empty the collection, notifying every per-key dependent plus the
    /// shape dependents exactly once each.
    fn clear(&self, obs: &Observable) -> Result<()>;

    /// Entry count. Registers the shape dependency.
    fn size(&self, obs: &Observable) -> Result<usize>;

    /// Snapshot of `(key, value)` pairs; the iteration basis for
    /// `for_each`, `keys` and `values`. Registers the shape dependency.
    fn entries(&self, obs: &Observable) -> Result<Vec<(Value, Value)>>;
}
