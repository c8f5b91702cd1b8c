//! Wrapper factory and the wrapped façade.
//!
//! `wrap` turns a raw structured value into its tracked façade; the façade
//! intercepts every read and write, registering dependencies and queueing
//! affected reactions through its handler family. Wrapping is idempotent:
//! a façade wraps to itself, and a raw value with a live cached façade gets
//! that façade back.
//!
//! Primitives and opaque leaves pass through the factory untouched.
//! Wrapping a stateful platform value would break its internal invariants,
//! so such values simply never become façades.
//!
//! A façade owns its raw node, so data stays alive as long as any façade
//! or raw reference to it does. The factory cache holds the façade weakly;
//! dropping the last façade clone frees both, and a later `wrap` of a
//! still-live raw node builds a fresh façade with the same tracked history
//! (dependencies key on raw identity, not façade identity).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::handlers::{
    CollectionHandlers, StructuralHandlers, TrackingCollection, TrackingStructural,
};
use crate::observe::Reaction;
use crate::store::{self, tables};
use crate::value::{Key, NodeKind, RawId, RawNode, Value};

/// Unique identifier for a façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ObsId(u64);

impl ObsId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Filter or reorder the affected-reaction list before dispatch.
pub type DependencyTransform = Arc<dyn Fn(Vec<Reaction>) -> Vec<Reaction> + Send + Sync>;

/// Recognized wrap overrides.
#[derive(Default)]
pub struct WrapOptions {
    /// Replace the record/list handler set.
    pub structural: Option<Arc<dyn StructuralHandlers>>,
    /// Replace the map/set handler set.
    pub collections: Option<Arc<dyn CollectionHandlers>>,
    /// Applied to the candidate reaction list of every write on this value.
    pub dependency_transform: Option<DependencyTransform>,
}

pub(crate) struct ObservableInner {
    obs_id: ObsId,
    raw: Arc<RawNode>,
    deep: bool,
    structural: Arc<dyn StructuralHandlers>,
    collections: Arc<dyn CollectionHandlers>,
    transform: Option<DependencyTransform>,
}

/// The wrapped façade over exactly one raw value.
///
/// Clones share the same façade; equality is façade identity.
#[derive(Clone)]
pub struct Observable {
    inner: Arc<ObservableInner>,
}

/// Deeply wrap a value: nested structured values are wrapped lazily as they
/// are read through the façade.
pub fn wrap(value: Value) -> Value {
    wrap_with(value, WrapOptions::default())
}

/// Deeply wrap a value with explicit overrides.
pub fn wrap_with(value: Value, options: WrapOptions) -> Value {
    wrap_impl(value, true, options)
}

/// Wrap a value with root-level tracking only.
pub fn wrap_shallow(value: Value) -> Value {
    wrap_impl(value, false, WrapOptions::default())
}

fn wrap_impl(value: Value, deep: bool, options: WrapOptions) -> Value {
    match value {
        // Idempotent: a façade wraps to itself.
        Value::Obs(_) => value,
        Value::Raw(node) => Value::Obs(wrap_node(node, deep, options)),
        // Primitives and opaque leaves pass through unwrapped.
        passthrough => passthrough,
    }
}

/// Lazy wrapping of values read through a deep façade.
pub(crate) fn wrap_nested(value: Value) -> Value {
    match value {
        Value::Raw(node) => Value::Obs(wrap_node(node, true, WrapOptions::default())),
        other => other,
    }
}

fn wrap_node(node: Arc<RawNode>, deep: bool, options: WrapOptions) -> Observable {
    if let Some(existing) = tables::cached_wrapper(node.id()) {
        return existing;
    }

    let raw_id = node.id();
    let inner = Arc::new(ObservableInner {
        obs_id: ObsId::new(),
        raw: node,
        deep,
        structural: options
            .structural
            .unwrap_or_else(|| Arc::new(TrackingStructural::new(deep))),
        collections: options
            .collections
            .unwrap_or_else(|| Arc::new(TrackingCollection::new(deep))),
        transform: options.dependency_transform,
    });
    tables::associate(raw_id, &inner);
    store::ensure_target(raw_id);
    debug!(raw = raw_id.raw(), deep, "façade created");

    Observable { inner }
}

/// Whether a value is a wrapped façade.
pub fn is_wrapped(value: &Value) -> bool {
    matches!(value, Value::Obs(_))
}

/// Resolve a façade back to its raw value; any other value comes back
/// unchanged.
pub fn unwrap(value: Value) -> Value {
    match value {
        Value::Obs(obs) => Value::Raw(obs.raw()),
        other => other,
    }
}

impl Observable {
    pub(crate) fn from_inner(inner: Arc<ObservableInner>) -> Self {
        Self { inner }
    }

    /// Identity of the raw value behind this façade.
    pub fn raw_id(&self) -> RawId {
        self.inner.raw.id()
    }

    /// The raw node behind this façade.
    pub fn raw(&self) -> Arc<RawNode> {
        Arc::clone(&self.inner.raw)
    }

    /// The raw node's kind.
    pub fn kind(&self) -> NodeKind {
        self.inner.raw.kind()
    }

    /// Whether nested structured values are wrapped on access.
    pub fn is_deep(&self) -> bool {
        self.inner.deep
    }

    pub(crate) fn dependency_transform(&self) -> Option<DependencyTransform> {
        self.inner.transform.clone()
    }

    fn is_structural(&self) -> bool {
        matches!(self.kind(), NodeKind::Record | NodeKind::List)
    }

    /// Tracked read.
    pub fn get(&self, key: &Key) -> Result<Option<Value>> {
        if self.is_structural() {
            self.inner.structural.get(self, key)
        } else {
            self.inner.collections.get(self, key)
        }
    }

    /// Tracked existence check.
    pub fn has(&self, key: &Key) -> Result<bool> {
        if self.is_structural() {
            self.inner.structural.has(self, key)
        } else {
            self.inner.collections.has(self, key)
        }
    }

    /// Tracked write (record field, list element, or map entry).
    pub fn set(&self, key: Key, value: Value) -> Result<()> {
        if self.is_structural() {
            self.inner.structural.set(self, key, value)
        } else {
            self.inner.collections.set(self, key, value)
        }
    }

    /// Tracked set-membership insert.
    pub fn add(&self, value: Value) -> Result<bool> {
        match self.kind() {
            NodeKind::Set | NodeKind::WeakSet => self.inner.collections.add(self, value),
            kind => Err(Error::KindMismatch { op: "add", kind }),
        }
    }

    /// Tracked removal.
    pub fn delete(&self, key: &Key) -> Result<bool> {
        if self.is_structural() {
            self.inner.structural.delete(self, key)
        } else {
            self.inner.collections.delete(self, key)
        }
    }

    /// Tracked collection clear.
    pub fn clear(&self) -> Result<()> {
        match self.kind() {
            NodeKind::Map | NodeKind::Set | NodeKind::WeakMap | NodeKind::WeakSet => {
                self.inner.collections.clear(self)
            }
            kind => Err(Error::KindMismatch { op: "clear", kind }),
        }
    }

    /// Tracked size/length read. Registers the shape dependency.
    pub fn len(&self) -> Result<usize> {
        if self.is_structural() {
            self.inner.structural.len(self)
        } else {
            self.inner.collections.size(self)
        }
    }

    /// Whether the container is empty. Registers the shape dependency.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Tracked key enumeration.
    pub fn keys(&self) -> Result<Vec<Key>> {
        if self.is_structural() {
            self.inner.structural.keys(self)
        } else {
            let entries = self.inner.collections.entries(self)?;
            Ok(entries.iter().map(|(k, _)| Key::from_value(k)).collect())
        }
    }

    /// Tracked entry iteration.
    ///
    /// Records and lists enumerate keys and read each one, so per-key get
    /// dependencies register alongside the shape dependency, matching what
    /// a caller-visible iteration actually touches.
    pub fn entries(&self) -> Result<Vec<(Value, Value)>> {
        if self.is_structural() {
            let mut out = Vec::new();
            for key in self.inner.structural.keys(self)? {
                if let Some(value) = self.inner.structural.get(self, &key)? {
                    out.push((key.to_value(), value));
                }
            }
            Ok(out)
        } else {
            self.inner.collections.entries(self)
        }
    }

    /// Tracked value iteration.
    pub fn values(&self) -> Result<Vec<Value>> {
        Ok(self.entries()?.into_iter().map(|(_, v)| v).collect())
    }

    /// Tracked iteration, invoking `f(value, key)` per entry.
    pub fn for_each(&self, mut f: impl FnMut(&Value, &Value)) -> Result<()> {
        for (key, value) in self.entries()? {
            f(&value, &key);
        }
        Ok(())
    }

    /// Append to a list.
    pub fn push(&self, value: Value) -> Result<()> {
        match self.kind() {
            NodeKind::List => {
                let index = self.inner.raw.len_untracked();
                self.inner.structural.set(self, Key::index(index), value)
            }
            kind => Err(Error::KindMismatch { op: "push", kind }),
        }
    }

    /// Remove and return the last list element.
    pub fn pop(&self) -> Result<Option<Value>> {
        match self.kind() {
            NodeKind::List => {
                let len = self.inner.raw.len_untracked();
                if len == 0 {
                    return Ok(None);
                }
                let key = Key::index(len - 1);
                let last = self.inner.raw.get_untracked(&key);
                self.inner.structural.delete(self, &key)?;
                Ok(last.map(|v| if self.inner.deep { wrap_nested(v) } else { v }))
            }
            kind => Err(Error::KindMismatch { op: "pop", kind }),
        }
    }

    /// Run a producer through the façade's construct handler: deep façades
    /// wrap the produced instance, shallow ones return it raw. The produced
    /// instance keeps its identity either way, so kind and identity checks
    /// against the unwrapped instance still succeed.
    pub fn construct(&self, producer: impl FnOnce() -> Value) -> Value {
        self.inner.structural.construct(self, producer())
    }
}

impl PartialEq for Observable {
    fn eq(&self, other: &Self) -> bool {
        self.inner.obs_id == other.inner.obs_id
    }
}

impl Eq for Observable {}

impl std::fmt::Debug for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("raw_id", &self.raw_id())
            .field("kind", &self.kind())
            .field("deep", &self.inner.deep)
            .finish()
    }
}
