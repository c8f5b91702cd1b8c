//! Weft Core
//!
//! Transparent dependency tracking for dynamic structured data. Wrap a
//! value, read it inside a reaction, and the runtime remembers what was
//! read; write through any wrapper of that value and the reactions that
//! depend on the touched slot run again.
//!
//! # How It Works
//!
//! - [`wrap`] turns a raw structured value ([`RawNode`]) into a tracked
//!   façade ([`Observable`]). Wrapping is idempotent: one façade per raw
//!   value, cached for the raw value's lifetime.
//! - [`observe`] turns a closure into a [`Reaction`] and runs it once.
//!   Every tracked read performed during the run registers a dependency
//!   `(value, key)` → reaction in a process-wide store.
//! - A tracked write looks up the reactions registered for its `(value,
//!   key)`, plus the shape dependents when the key set changed, and hands
//!   each one to its scheduler. The default scheduler runs synchronously;
//!   [`configure`] installs a process-wide alternative, and
//!   [`ObserveOptions`] overrides it per reaction.
//! - Each re-run resets the reaction's dependencies from scratch, so
//!   conditional reads track exactly what the latest run touched.
//!
//! # Example
//!
//! ```rust
//! use weft_core::{observe, wrap, Key, RawNode, Value};
//!
//! let state = wrap(Value::Raw(RawNode::record_from([
//!     (Key::from("count"), Value::Int(0)),
//! ])));
//! let obs = state.as_obs().unwrap().clone();
//!
//! let watched = obs.clone();
//! let reaction = observe(move || {
//!     let _ = watched.get(&Key::from("count"));
//! });
//!
//! obs.set(Key::from("count"), Value::Int(1)).unwrap();
//! assert_eq!(reaction.run_count(), 2);
//! reaction.unobserve();
//! ```

pub mod error;
pub mod handlers;
pub mod observe;
pub mod store;
pub mod value;
pub mod wrap;

pub use error::{Error, Result};
pub use observe::{
    configure, observe, observe_with, reset_configuration, unobserve, Config, DebugHook,
    ObserveOptions, OpKind, Operation, Reaction, ReactionId, ReactionQueue, Scheduler,
};
pub use store::DepKey;
pub use value::{same_value, Key, NodeKind, Opaque, OpaqueId, RawId, RawNode, Value};
pub use wrap::{
    is_wrapped, unwrap, wrap, wrap_shallow, wrap_with, DependencyTransform, Observable,
    WrapOptions,
};
