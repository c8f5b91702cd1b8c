//! Association table.
//!
//! One weak, non-owning lookup table from raw identity to the live façade
//! wrapping it. Holding the façade weakly means the table never extends a
//! façade's lifetime; dead entries are pruned on lookup and removed
//! outright when the raw value itself dies.
//!
//! This table is what makes the wrapper factory idempotent: at most one
//! façade exists per raw value at any time.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;

use crate::value::RawId;
use crate::wrap::{DependencyTransform, Observable, ObservableInner};

static RAW_TO_OBS: OnceLock<DashMap<RawId, Weak<ObservableInner>>> = OnceLock::new();

fn raw_to_obs() -> &'static DashMap<RawId, Weak<ObservableInner>> {
    RAW_TO_OBS.get_or_init(DashMap::new)
}

/// The live façade for a raw value, if one exists.
pub(crate) fn cached_wrapper(raw: RawId) -> Option<Observable> {
    let weak = raw_to_obs().get(&raw).map(|entry| entry.value().clone())?;
    match weak.upgrade() {
        Some(inner) => Some(Observable::from_inner(inner)),
        None => {
            raw_to_obs().remove(&raw);
            None
        }
    }
}

/// Record a freshly built façade for its raw value.
pub(crate) fn associate(raw: RawId, inner: &Arc<ObservableInner>) {
    raw_to_obs().insert(raw, Arc::downgrade(inner));
}

/// Drop the cache entry for a dead raw value.
pub(crate) fn dissociate(raw: RawId) {
    raw_to_obs().remove(&raw);
}

#[cfg(test)]
pub(crate) fn has_entry(raw: RawId) -> bool {
    raw_to_obs().contains_key(&raw)
}

/// The dependency transform configured on a raw value's façade, if any.
pub(crate) fn transform_for(raw: RawId) -> Option<DependencyTransform> {
    cached_wrapper(raw).and_then(|obs| obs.dependency_transform())
}
