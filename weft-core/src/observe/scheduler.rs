//! Scheduler integration.
//!
//! A scheduler decides when a triggered reaction actually executes. The
//! built-in default runs it synchronously on the spot; callers can supply a
//! function that receives the reaction for arbitrary deferred invocation, or
//! a queue-like object (add/remove) for batched dispatch.
//!
//! The process-wide default binds at reaction-creation time. Reconfiguring it
//! afterwards never retargets reactions created under the previous default.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use super::reaction::Reaction;

/// A batching dispatch target.
///
/// `add` hands a triggered reaction to the queue; `remove` is the
/// cancellation hook, invoked when a queued reaction is unobserved so the
/// queue can drop the pending dispatch. Queue consumers deliver by calling
/// [`Reaction::trigger`].
pub trait ReactionQueue: Send + Sync {
    fn add(&self, reaction: Reaction);
    fn remove(&self, reaction: &Reaction);
}

/// When and how a triggered reaction runs.
#[derive(Clone)]
pub enum Scheduler {
    /// Run synchronously at the trigger site.
    Sync,
    /// Hand the reaction to a caller function for deferred invocation.
    /// There is no cancellation hook; a deferred call on a reaction that was
    /// unobserved in the meantime arrives as an inert no-op.
    Func(Arc<dyn Fn(Reaction) + Send + Sync>),
    /// Hand the reaction to a batching queue.
    Queue(Arc<dyn ReactionQueue>),
}

impl Scheduler {
    /// Build a function scheduler.
    pub fn func(f: impl Fn(Reaction) + Send + Sync + 'static) -> Self {
        Scheduler::Func(Arc::new(f))
    }

    /// Build a queue scheduler.
    pub fn queue(q: Arc<dyn ReactionQueue>) -> Self {
        Scheduler::Queue(q)
    }

    /// Deliver a triggered reaction according to this scheduler.
    pub(crate) fn dispatch(&self, reaction: Reaction) {
        match self {
            Scheduler::Sync => {
                reaction.trigger();
            }
            Scheduler::Func(f) => f(reaction),
            Scheduler::Queue(q) => q.add(reaction),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheduler::Sync => write!(f, "Scheduler::Sync"),
            Scheduler::Func(_) => write!(f, "Scheduler::Func"),
            Scheduler::Queue(_) => write!(f, "Scheduler::Queue"),
        }
    }
}

/// Process-wide configuration.
#[derive(Debug, Default)]
pub struct Config {
    /// Default scheduler for reactions created without an explicit one.
    pub scheduler: Option<Scheduler>,
}

static DEFAULT: OnceLock<RwLock<Option<Scheduler>>> = OnceLock::new();

fn default_slot() -> &'static RwLock<Option<Scheduler>> {
    DEFAULT.get_or_init(|| RwLock::new(None))
}

/// Set the process-wide default scheduler.
///
/// Only reactions created after this call are affected.
pub fn configure(config: Config) {
    debug!(scheduler = ?config.scheduler, "reconfiguring default scheduler");
    *default_slot().write() = config.scheduler;
}

/// Drop any configured default; the next reaction created without an
/// explicit scheduler re-initializes it to synchronous dispatch.
pub fn reset_configuration() {
    *default_slot().write() = None;
}

/// The default scheduler, initialized lazily on first use.
pub(crate) fn default_scheduler() -> Scheduler {
    if let Some(scheduler) = default_slot().read().clone() {
        return scheduler;
    }
    let mut slot = default_slot().write();
    slot.get_or_insert(Scheduler::Sync).clone()
}
