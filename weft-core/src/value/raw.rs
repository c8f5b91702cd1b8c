//! Raw structured nodes.
//!
//! A `RawNode` is one caller-owned structured value: a record, a list, or an
//! associative collection. Nodes carry a process-unique identity so the
//! association tables and the dependency store can refer to them without
//! owning them.
//!
//! Everything on this type is untracked. Interception lives in the handler
//! families; reads and writes here never consult the execution stack and
//! never notify anyone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::value::key::Key;
use crate::value::Value;

/// Unique identifier for a raw node.
///
/// The association table and the dependency store key by this ID rather
/// than by pointer; a dropping node removes its own entries from both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawId(u64);

impl RawId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// The kind of a structured node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A keyed record with optional delegation parent (structural family).
    Record,
    /// An integer-indexed sequence (structural family).
    List,
    /// A key/value collection (associative family).
    Map,
    /// A membership collection (associative family).
    Set,
    /// A map restricted to identity keys, without the iteration protocol.
    WeakMap,
    /// A set restricted to identity keys, without the iteration protocol.
    WeakSet,
}

/// One record field.
pub(crate) struct Slot {
    pub value: Value,
    /// Fixed slots are returned as-is by the deep handlers: their value is
    /// part of the record's immutability contract and must not be replaced
    /// by a façade, and writes to them are silent no-ops.
    pub fixed: bool,
}

/// Storage behind one raw node.
pub(crate) enum NodeData {
    Record {
        slots: IndexMap<Key, Slot>,
        parent: Option<Arc<RawNode>>,
    },
    List(Vec<Value>),
    Map {
        entries: IndexMap<Key, Value>,
        weak: bool,
    },
    /// Set entries map the canonical key to the original element value so
    /// iteration can hand the element back out.
    Set {
        entries: IndexMap<Key, Value>,
        weak: bool,
    },
}

impl NodeData {
    pub(crate) fn kind_of(&self) -> NodeKind {
        match self {
            NodeData::Record { .. } => NodeKind::Record,
            NodeData::List(_) => NodeKind::List,
            NodeData::Map { weak: false, .. } => NodeKind::Map,
            NodeData::Map { weak: true, .. } => NodeKind::WeakMap,
            NodeData::Set { weak: false, .. } => NodeKind::Set,
            NodeData::Set { weak: true, .. } => NodeKind::WeakSet,
        }
    }
}

/// A structured raw value.
pub struct RawNode {
    id: RawId,
    data: RwLock<NodeData>,
}

impl RawNode {
    fn with_data(data: NodeData) -> Arc<Self> {
        Arc::new(Self {
            id: RawId::new(),
            data: RwLock::new(data),
        })
    }

    /// Create an empty record.
    pub fn record() -> Arc<Self> {
        Self::with_data(NodeData::Record {
            slots: IndexMap::new(),
            parent: None,
        })
    }

    /// Create a record from key/value pairs.
    pub fn record_from(pairs: impl IntoIterator<Item = (Key, Value)>) -> Arc<Self> {
        let slots = pairs
            .into_iter()
            .map(|(k, v)| {
                (
                    k,
                    Slot {
                        value: v,
                        fixed: false,
                    },
                )
            })
            .collect();
        Self::with_data(NodeData::Record {
            slots,
            parent: None,
        })
    }

    /// Create an empty record delegating missing lookups to `parent`.
    pub fn record_with_parent(parent: Arc<RawNode>) -> Result<Arc<Self>> {
        if parent.kind() != NodeKind::Record {
            return Err(Error::InvalidParent);
        }
        Ok(Self::with_data(NodeData::Record {
            slots: IndexMap::new(),
            parent: Some(parent),
        }))
    }

    /// Create an empty list.
    pub fn list() -> Arc<Self> {
        Self::with_data(NodeData::List(Vec::new()))
    }

    /// Create a list from elements.
    pub fn list_from(values: impl IntoIterator<Item = Value>) -> Arc<Self> {
        Self::with_data(NodeData::List(values.into_iter().collect()))
    }

    /// Create an empty map.
    pub fn map() -> Arc<Self> {
        Self::with_data(NodeData::Map {
            entries: IndexMap::new(),
            weak: false,
        })
    }

    /// Create a map from key/value pairs.
    pub fn map_from(pairs: impl IntoIterator<Item = (Key, Value)>) -> Arc<Self> {
        Self::with_data(NodeData::Map {
            entries: pairs.into_iter().collect(),
            weak: false,
        })
    }

    /// Create an empty set.
    pub fn set() -> Arc<Self> {
        Self::with_data(NodeData::Set {
            entries: IndexMap::new(),
            weak: false,
        })
    }

    /// Create a set from elements.
    pub fn set_from(values: impl IntoIterator<Item = Value>) -> Arc<Self> {
        let entries = values
            .into_iter()
            .map(|value| (Key::from_value(&value), value))
            .collect();
        Self::with_data(NodeData::Set {
            entries,
            weak: false,
        })
    }

    /// Create an identity-keyed map without the iteration protocol.
    pub fn weak_map() -> Arc<Self> {
        Self::with_data(NodeData::Map {
            entries: IndexMap::new(),
            weak: true,
        })
    }

    /// Create an identity-keyed set without the iteration protocol.
    pub fn weak_set() -> Arc<Self> {
        Self::with_data(NodeData::Set {
            entries: IndexMap::new(),
            weak: true,
        })
    }

    /// Get the node's identity.
    pub fn id(&self) -> RawId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.data.read().kind_of()
    }

    /// Mark an existing record slot as fixed.
    ///
    /// Fixed slots keep their raw value on deep reads and ignore writes.
    pub fn freeze(&self, key: &Key) -> Result<()> {
        match &mut *self.data.write() {
            NodeData::Record { slots, .. } => match slots.get_mut(key) {
                Some(slot) => {
                    slot.fixed = true;
                    Ok(())
                }
                None => Err(Error::NotFreezable),
            },
            _ => Err(Error::NotFreezable),
        }
    }

    /// Untracked read. Records consult the delegation chain.
    pub fn get_untracked(&self, key: &Key) -> Option<Value> {
        let parent = match &*self.data.read() {
            NodeData::Record { slots, parent } => match slots.get(key) {
                Some(slot) => return Some(slot.value.clone()),
                None => parent.clone(),
            },
            NodeData::List(items) => return key.as_index().and_then(|i| items.get(i).cloned()),
            NodeData::Map { entries, .. } => return entries.get(key).cloned(),
            NodeData::Set { entries, .. } => return entries.get(key).cloned(),
        };
        parent.and_then(|p| p.get_untracked(key))
    }

    /// Untracked write. Does not notify any reaction.
    pub fn set_untracked(&self, key: Key, value: Value) -> Result<()> {
        match &mut *self.data.write() {
            NodeData::Record { slots, .. } => {
                match slots.get_mut(&key) {
                    Some(slot) => slot.value = value,
                    None => {
                        slots.insert(
                            key,
                            Slot {
                                value,
                                fixed: false,
                            },
                        );
                    }
                }
                Ok(())
            }
            NodeData::List(items) => {
                let index = key.as_index().ok_or(Error::InvalidKey {
                    reason: "list keys must be non-negative integers",
                })?;
                if index < items.len() {
                    items[index] = value;
                    Ok(())
                } else if index == items.len() {
                    items.push(value);
                    Ok(())
                } else {
                    Err(Error::InvalidKey {
                        reason: "list index out of bounds",
                    })
                }
            }
            NodeData::Map { entries, .. } => {
                entries.insert(key, value);
                Ok(())
            }
            NodeData::Set { entries, .. } => {
                entries.insert(key, value);
                Ok(())
            }
        }
    }

    /// Untracked element/entry count (own keys only for records).
    pub fn len_untracked(&self) -> usize {
        match &*self.data.read() {
            NodeData::Record { slots, .. } => slots.len(),
            NodeData::List(items) => items.len(),
            NodeData::Map { entries, .. } => entries.len(),
            NodeData::Set { entries, .. } => entries.len(),
        }
    }

    pub(crate) fn data(&self) -> &RwLock<NodeData> {
        &self.data
    }
}

impl Drop for RawNode {
    fn drop(&mut self) {
        // Global bookkeeping keys on this node's identity; once the last
        // strong reference is gone the identity is unreachable, so the
        // store entry and the façade-cache entry go with it.
        crate::store::forget_target(self.id);
    }
}

impl std::fmt::Debug for RawNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawNode")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("len", &self.len_untracked())
            .finish()
    }
}
