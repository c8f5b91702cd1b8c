//! Associative handlers for maps and sets.
//!
//! Per-key reads register get/has dependencies; iteration and size register
//! the shape dependency. Mutations queue only on genuine change: a write of
//! the same value, a delete of an absent key, or a clear of an empty
//! collection notifies nobody.
//!
//! Weak-keyed variants accept identity keys only and do not expose the
//! iteration protocol.

use indexmap::map::Entry;

use super::CollectionHandlers;
use crate::error::{Error, Result};
use crate::observe::{
    queue_reactions_for_operation, register_running_reaction_for_operation, OpKind, Operation,
};
use crate::value::{same_value, Key, NodeData, Value};
use crate::wrap::{unwrap, wrap_nested, Observable};

/// Default tracking implementation for the associative family.
pub struct TrackingCollection {
    deep: bool,
}

impl TrackingCollection {
    pub fn new(deep: bool) -> Self {
        Self { deep }
    }

    fn wrap_result(&self, value: Value) -> Value {
        if self.deep {
            wrap_nested(value)
        } else {
            value
        }
    }
}

impl CollectionHandlers for TrackingCollection {
    fn get(&self, obs: &Observable, key: &Key) -> Result<Option<Value>> {
        let node = obs.raw();
        register_running_reaction_for_operation(&Operation::read(
            node.id(),
            Some(key.clone()),
            OpKind::Get,
        ));
        let stored = {
            let data = node.data().read();
            match &*data {
                NodeData::Map { entries, .. } => entries.get(key).cloned(),
                NodeData::Set { entries, .. } => entries.get(key).cloned(),
                other => {
                    return Err(Error::KindMismatch {
                        op: "get",
                        kind: other.kind_of(),
                    })
                }
            }
        };
        Ok(stored.map(|v| self.wrap_result(v)))
    }

    fn has(&self, obs: &Observable, key: &Key) -> Result<bool> {
        let node = obs.raw();
        register_running_reaction_for_operation(&Operation::read(
            node.id(),
            Some(key.clone()),
            OpKind::Has,
        ));
        let data = node.data().read();
        match &*data {
            NodeData::Map { entries, .. } => Ok(entries.contains_key(key)),
            NodeData::Set { entries, .. } => Ok(entries.contains_key(key)),
            other => Err(Error::KindMismatch {
                op: "has",
                kind: other.kind_of(),
            }),
        }
    }

    fn set(&self, obs: &Observable, key: Key, value: Value) -> Result<()> {
        let node = obs.raw();
        let value = unwrap(value);
        let node_id = node.id();

        let op = {
            let mut data = node.data().write();
            match &mut *data {
                NodeData::Map { entries, weak } => {
                    if *weak && !key.is_identity() {
                        return Err(Error::InvalidKey {
                            reason: "weak collections require identity keys",
                        });
                    }
                    match entries.entry(key.clone()) {
                        Entry::Occupied(mut occupied) => {
                            if same_value(occupied.get(), &value) {
                                None
                            } else {
                                let old = std::mem::replace(occupied.get_mut(), value.clone());
                                Some(Operation::write(
                                    node_id,
                                    Some(key),
                                    OpKind::Set,
                                    Some(old),
                                    Some(value),
                                ))
                            }
                        }
                        Entry::Vacant(vacant) => {
                            vacant.insert(value.clone());
                            Some(Operation::write(
                                node_id,
                                Some(key),
                                OpKind::Add,
                                None,
                                Some(value),
                            ))
                        }
                    }
                }
                other => {
                    return Err(Error::KindMismatch {
                        op: "set",
                        kind: other.kind_of(),
                    })
                }
            }
        };

        if let Some(op) = op {
            queue_reactions_for_operation(&op);
        }
        Ok(())
    }

    fn add(&self, obs: &Observable, value: Value) -> Result<bool> {
        let node = obs.raw();
        let value = unwrap(value);
        let key = Key::from_value(&value);
        let node_id = node.id();

        let op = {
            let mut data = node.data().write();
            match &mut *data {
                NodeData::Set { entries, weak } => {
                    if *weak && !key.is_identity() {
                        return Err(Error::InvalidKey {
                            reason: "weak collections require identity keys",
                        });
                    }
                    if entries.contains_key(&key) {
                        None
                    } else {
                        entries.insert(key.clone(), value.clone());
                        Some(Operation::write(
                            node_id,
                            Some(key),
                            OpKind::Add,
                            None,
                            Some(value),
                        ))
                    }
                }
                other => {
                    return Err(Error::KindMismatch {
                        op: "add",
                        kind: other.kind_of(),
                    })
                }
            }
        };

        match op {
            Some(op) => {
                queue_reactions_for_operation(&op);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, obs: &Observable, key: &Key) -> Result<bool> {
        let node = obs.raw();
        let node_id = node.id();

        let op = {
            let mut data = node.data().write();
            match &mut *data {
                NodeData::Map { entries, .. } => entries.shift_remove(key),
                NodeData::Set { entries, .. } => entries.shift_remove(key),
                other => {
                    return Err(Error::KindMismatch {
                        op: "delete",
                        kind: other.kind_of(),
                    })
                }
            }
        }
        .map(|old| {
            Operation::write(
                node_id,
                Some(key.clone()),
                OpKind::Delete,
                Some(old),
                None,
            )
        });

        match op {
            Some(op) => {
                queue_reactions_for_operation(&op);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&self, obs: &Observable) -> Result<()> {
        let node = obs.raw();
        let node_id = node.id();

        let emptied = {
            let mut data = node.data().write();
            match &mut *data {
                NodeData::Map { entries, weak } | NodeData::Set { entries, weak } => {
                    if *weak {
                        return Err(Error::UnsupportedWeakOp("clear"));
                    }
                    if entries.is_empty() {
                        false
                    } else {
                        entries.clear();
                        true
                    }
                }
                other => {
                    return Err(Error::KindMismatch {
                        op: "clear",
                        kind: other.kind_of(),
                    })
                }
            }
        };

        if emptied {
            queue_reactions_for_operation(&Operation::write(
                node_id,
                None,
                OpKind::Clear,
                None,
                None,
            ));
        }
        Ok(())
    }

    fn size(&self, obs: &Observable) -> Result<usize> {
        let node = obs.raw();
        register_running_reaction_for_operation(&Operation::read(node.id(), None, OpKind::Iterate));
        let data = node.data().read();
        match &*data {
            NodeData::Map { entries, weak } | NodeData::Set { entries, weak } => {
                if *weak {
                    return Err(Error::UnsupportedWeakOp("size"));
                }
                Ok(entries.len())
            }
            other => Err(Error::KindMismatch {
                op: "size",
                kind: other.kind_of(),
            }),
        }
    }

    fn entries(&self, obs: &Observable) -> Result<Vec<(Value, Value)>> {
        let node = obs.raw();
        register_running_reaction_for_operation(&Operation::read(node.id(), None, OpKind::Iterate));
        let snapshot = {
            let data = node.data().read();
            match &*data {
                NodeData::Map { entries, weak } | NodeData::Set { entries, weak } => {
                    if *weak {
                        return Err(Error::UnsupportedWeakOp("iterate"));
                    }
                    entries
                        .iter()
                        .map(|(k, v)| (k.to_value(), v.clone()))
                        .collect::<Vec<_>>()
                }
                other => {
                    return Err(Error::KindMismatch {
                        op: "iterate",
                        kind: other.kind_of(),
                    })
                }
            }
        };
        // Each value produced by an iteration step is wrapped lazily, so
        // iterating and then mutating a nested entry is still tracked.
        Ok(snapshot
            .into_iter()
            .map(|(k, v)| (self.wrap_result(k), self.wrap_result(v)))
            .collect())
    }
}
