//! Dependency store.
//!
//! Maps `(raw value, key-or-shape-marker)` to the set of reactions that read
//! it during their most recent run. Shape-tracking reads coalesce onto one
//! reserved marker per raw value, distinct from every real key, so shape
//! tracking never collides with per-key tracking.
//!
//! Sets are insertion-ordered; one mutation notifies its subscribers in the
//! order they registered, which is the only delivery-order guarantee the
//! runtime makes. Entries are pruned eagerly: a reaction's release removes
//! its memberships and any sets left empty, and a raw value's death removes
//! its whole entry. The store never accumulates orphans.

pub(crate) mod tables;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

use crate::observe::{OpKind, Operation, Reaction, ReactionId, ReactionInner};
use crate::value::{Key, RawId};

/// A dependency-store key: one real property/element key, or the reserved
/// shape marker for "the set of keys changed".
///
/// For lists the shape marker doubles as the length dependency; reading
/// `len()` and changing the element count meet on the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DepKey {
    Prop(Key),
    Shape,
}

type KeyedSets = IndexMap<DepKey, IndexSet<ReactionId>>;

static STORE: OnceLock<RwLock<HashMap<RawId, KeyedSets>>> = OnceLock::new();
static REACTIONS: OnceLock<DashMap<ReactionId, Arc<ReactionInner>>> = OnceLock::new();

fn store() -> &'static RwLock<HashMap<RawId, KeyedSets>> {
    STORE.get_or_init(|| RwLock::new(HashMap::new()))
}

fn registry() -> &'static DashMap<ReactionId, Arc<ReactionInner>> {
    REACTIONS.get_or_init(DashMap::new)
}

/// Register a raw value with the store. Called once per wrap.
pub(crate) fn ensure_target(target: RawId) {
    store().write().entry(target).or_default();
}

/// Drop every store entry for a raw value. Called when the value itself
/// dies, so transient wrapped values leave nothing behind.
pub(crate) fn forget_target(target: RawId) {
    tables::dissociate(target);
    let removed = store().write().remove(&target);
    // Removed sets can hold identity keys whose last reference lives in
    // this entry; dropping those re-enters the store lock, so it must not
    // happen while the lock is held.
    drop(removed);
}

/// Add a reaction to the set for `(target, dep)` and remember the membership
/// on the reaction for later release.
pub(crate) fn register_dependency(reaction: &ReactionInner, target: RawId, dep: DepKey) {
    {
        let mut store = store().write();
        let sets = store.entry(target).or_default();
        let set = sets.entry(dep.clone()).or_default();
        if !set.insert(reaction.id) {
            // Already a member from an earlier read in this run.
            return;
        }
    }
    reaction.deps.lock().push((target, dep));
}

/// Every reaction affected by a write operation, in registration order.
pub(crate) fn collect_reactions_for(op: &Operation) -> Vec<ReactionId> {
    let store = store().read();
    let Some(sets) = store.get(&op.target) else {
        return Vec::new();
    };

    let mut out: IndexSet<ReactionId> = IndexSet::new();
    let mut take = |dep: &DepKey| {
        if let Some(set) = sets.get(dep) {
            out.extend(set.iter().copied());
        }
    };

    match op.kind {
        OpKind::Get | OpKind::Has | OpKind::Set => {
            if let Some(key) = &op.key {
                take(&DepKey::Prop(key.clone()));
            }
        }
        OpKind::Iterate => take(&DepKey::Shape),
        OpKind::Add | OpKind::Delete => {
            if let Some(key) = &op.key {
                take(&DepKey::Prop(key.clone()));
            }
            take(&DepKey::Shape);
        }
        OpKind::Clear => {
            // Every per-key set plus the shape marker, each reaction once.
            for set in sets.values() {
                out.extend(set.iter().copied());
            }
        }
    }

    out.into_iter().collect()
}

/// Remove the reaction from every set it joined since its last release.
///
/// Runs immediately before a reaction's body re-executes and when it is
/// permanently cancelled.
pub(crate) fn release_reaction(reaction: &ReactionInner) {
    let memberships = std::mem::take(&mut *reaction.deps.lock());
    if memberships.is_empty() {
        return;
    }

    let mut pruned: Vec<DepKey> = Vec::new();
    {
        let mut store = store().write();
        for (target, dep) in &memberships {
            if let Some(sets) = store.get_mut(target) {
                if let Some(set) = sets.get_mut(dep) {
                    set.shift_remove(&reaction.id);
                    if set.is_empty() {
                        if let Some((key, _)) = sets.shift_remove_entry(dep) {
                            pruned.push(key);
                        }
                    }
                }
                if sets.is_empty() {
                    store.remove(target);
                }
            }
        }
    }
    // Pruned identity keys and the membership list itself can carry the
    // last reference to a raw value; that value's death re-enters the
    // store lock.
    drop(pruned);
    drop(memberships);
}

/// Keep a reaction alive while it is subscribed.
pub(crate) fn adopt_reaction(reaction: Arc<ReactionInner>) {
    registry().insert(reaction.id, reaction);
}

/// Drop a cancelled reaction from the registry.
pub(crate) fn forget_reaction(id: ReactionId) {
    registry().remove(&id);
}

/// Resolve a live reaction handle by ID.
pub(crate) fn lookup_reaction(id: ReactionId) -> Option<Reaction> {
    registry()
        .get(&id)
        .map(|entry| Reaction::from_inner(Arc::clone(entry.value())))
}

#[cfg(test)]
pub(crate) fn has_target(target: RawId) -> bool {
    store().read().contains_key(&target)
}
