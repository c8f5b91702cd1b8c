//! Reaction execution and scheduling.
//!
//! This module owns the runtime side of tracking: the execution stack of
//! currently running reactions, the reaction state machine, operation
//! records, and scheduler integration. The interception handlers feed it
//! operations; it feeds the dependency store.

mod operation;
mod reaction;
mod scheduler;
pub(crate) mod stack;

pub use operation::{OpKind, Operation};
pub use reaction::{
    observe, observe_with, unobserve, DebugHook, ObserveOptions, Reaction, ReactionId,
};
pub use scheduler::{configure, reset_configuration, Config, ReactionQueue, Scheduler};

pub(crate) use reaction::{
    queue_reactions_for_operation, register_running_reaction_for_operation, ReactionInner,
};
