//! Structural handlers for records and lists.
//!
//! Reads register get/has dependencies for the running reaction; own-key
//! enumeration and length register the shape dependency. Writes always land
//! in the receiver's own storage. A record whose lookup chain would resolve
//! a key on a delegation ancestor still takes the write itself, so one
//! mutation fires exactly once, attributed to the receiver.

use indexmap::map::Entry;

use super::StructuralHandlers;
use crate::error::{Error, Result};
use crate::observe::{
    queue_reactions_for_operation, register_running_reaction_for_operation, OpKind, Operation,
};
use crate::value::{same_value, Key, NodeData, Slot, Value};
use crate::wrap::{unwrap, wrap, wrap_nested, Observable};

/// Default tracking implementation for the structural family.
pub struct TrackingStructural {
    deep: bool,
}

impl TrackingStructural {
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

impl StructuralHandlers for TrackingStructural {
    fn get(&self, obs: &Observable, key: &Key) -> Result<Option<Value>> {
        let mut node = obs.raw();
        loop {
            register_running_reaction_for_operation(&Operation::read(
                node.id(),
                Some(key.clone()),
                OpKind::Get,
            ));
            let next = {
                let data = node.data().read();
                match &*data {
                    NodeData::Record { slots, parent } => match slots.get(key) {
                        Some(slot) => {
                            let value = slot.value.clone();
                            // A fixed slot is part of the record's
                            // immutability contract; hand it back untouched.
                            return Ok(Some(if slot.fixed {
                                value
                            } else {
                                self.wrap_result(value)
                            }));
                        }
                        None => parent.clone(),
                    },
                    NodeData::List(items) => {
                        return Ok(key
                            .as_index()
                            .and_then(|i| items.get(i).cloned())
                            .map(|v| self.wrap_result(v)));
                    }
                    other => {
                        return Err(Error::KindMismatch {
                            op: "get",
                            kind: other.kind_of(),
                        })
                    }
                }
            };
            match next {
                Some(parent) => node = parent,
                None => return Ok(None),
            }
        }
    }

    fn has(&self, obs: &Observable, key: &Key) -> Result<bool> {
        let mut node = obs.raw();
        loop {
            register_running_reaction_for_operation(&Operation::read(
                node.id(),
                Some(key.clone()),
                OpKind::Has,
            ));
            let next = {
                let data = node.data().read();
                match &*data {
                    NodeData::Record { slots, parent } => {
                        if slots.contains_key(key) {
                            return Ok(true);
                        }
                        parent.clone()
                    }
                    NodeData::List(items) => {
                        return Ok(key.as_index().map(|i| i < items.len()).unwrap_or(false));
                    }
                    other => {
                        return Err(Error::KindMismatch {
                            op: "has",
                            kind: other.kind_of(),
                        })
                    }
                }
            };
            match next {
                Some(parent) => node = parent,
                None => return Ok(false),
            }
        }
    }

    fn keys(&self, obs: &Observable) -> Result<Vec<Key>> {
        let node = obs.raw();
        register_running_reaction_for_operation(&Operation::read(node.id(), None, OpKind::Iterate));
        let data = node.data().read();
        match &*data {
            NodeData::Record { slots, .. } => Ok(slots.keys().cloned().collect()),
            NodeData::List(items) => Ok((0..items.len()).map(Key::index).collect()),
            other => Err(Error::KindMismatch {
                op: "keys",
                kind: other.kind_of(),
            }),
        }
    }

    fn len(&self, obs: &Observable) -> Result<usize> {
        let node = obs.raw();
        register_running_reaction_for_operation(&Operation::read(node.id(), None, OpKind::Iterate));
        let data = node.data().read();
        match &*data {
            NodeData::Record { slots, .. } => Ok(slots.len()),
            NodeData::List(items) => Ok(items.len()),
            other => Err(Error::KindMismatch {
                op: "len",
                kind: other.kind_of(),
            }),
        }
    }

    fn set(&self, obs: &Observable, key: Key, value: Value) -> Result<()> {
        let node = obs.raw();
        // Raw storage must never hold a façade.
        let value = unwrap(value);
        let node_id = node.id();

        let op = {
            let mut data = node.data().write();
            match &mut *data {
                NodeData::Record { slots, .. } => match slots.entry(key.clone()) {
                    Entry::Occupied(mut occupied) => {
                        let slot = occupied.get_mut();
                        if slot.fixed || same_value(&slot.value, &value) {
                            None
                        } else {
                            let old = std::mem::replace(&mut slot.value, value.clone());
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
                        vacant.insert(Slot {
                            value: value.clone(),
                            fixed: false,
                        });
                        Some(Operation::write(
                            node_id,
                            Some(key),
                            OpKind::Add,
                            None,
                            Some(value),
                        ))
                    }
                },
                NodeData::List(items) => {
                    let index = key.as_index().ok_or(Error::InvalidKey {
                        reason: "list keys must be non-negative integers",
                    })?;
                    if index < items.len() {
                        if same_value(&items[index], &value) {
                            None
                        } else {
                            let old = std::mem::replace(&mut items[index], value.clone());
                            Some(Operation::write(
                                node_id,
                                Some(key),
                                OpKind::Set,
                                Some(old),
                                Some(value),
                            ))
                        }
                    } else if index == items.len() {
                        items.push(value.clone());
                        Some(Operation::write(
                            node_id,
                            Some(key),
                            OpKind::Add,
                            None,
                            Some(value),
                        ))
                    } else {
                        return Err(Error::InvalidKey {
                            reason: "list index out of bounds",
                        });
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

    fn delete(&self, obs: &Observable, key: &Key) -> Result<bool> {
        let node = obs.raw();
        let node_id = node.id();

        let op = {
            let mut data = node.data().write();
            match &mut *data {
                NodeData::Record { slots, .. } => slots.shift_remove(key).map(|slot| {
                    Operation::write(
                        node_id,
                        Some(key.clone()),
                        OpKind::Delete,
                        Some(slot.value),
                        None,
                    )
                }),
                NodeData::List(items) => match key.as_index() {
                    Some(index) if index < items.len() => {
                        let old = items.remove(index);
                        Some(Operation::write(
                            node_id,
                            Some(key.clone()),
                            OpKind::Delete,
                            Some(old),
                            None,
                        ))
                    }
                    _ => None,
                },
                other => {
                    return Err(Error::KindMismatch {
                        op: "delete",
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

    fn construct(&self, _obs: &Observable, produced: Value) -> Value {
        if self.deep {
            wrap(produced)
        } else {
            unwrap(produced)
        }
    }
}
