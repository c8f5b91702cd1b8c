//! Reaction runtime.
//!
//! A reaction wraps a plain computation into a trackable unit. Each run
//! releases the dependencies remembered from the previous run, pushes the
//! reaction onto the execution stack, executes the body, and pops in a
//! guaranteed-cleanup path. Reads performed by the body land in the
//! dependency store attributed to whatever reaction is on top of the stack.
//!
//! Re-entrancy is guarded twice: a reaction that is anywhere on the stack is
//! neither re-run manually nor re-delivered by a trigger, so a
//! read-then-write pattern inside a body cannot cascade into itself.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::operation::{OpKind, Operation};
use super::scheduler::{default_scheduler, Scheduler};
use super::stack;
use crate::store::{self, tables, DepKey};
use crate::value::RawId;

/// Unique identifier for a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReactionId(u64);

impl ReactionId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Per-operation callback for inspecting what a reaction touches.
pub type DebugHook = Arc<dyn Fn(&Operation) + Send + Sync>;

/// Options for [`observe_with`].
#[derive(Default)]
pub struct ObserveOptions {
    /// Overrides the process-wide default scheduler for this reaction.
    pub scheduler: Option<Scheduler>,
    /// Invoked once per tracked operation the reaction participates in.
    pub debugger: Option<DebugHook>,
    /// Skip the initial run; the reaction starts tracking on its first
    /// manual invocation instead.
    pub lazy: bool,
}

pub(crate) struct ReactionInner {
    pub(crate) id: ReactionId,
    body: Box<dyn Fn() + Send + Sync>,
    pub(crate) scheduler: Scheduler,
    pub(crate) debug_hook: Option<DebugHook>,
    lazy: bool,
    pub(crate) cancelled: AtomicBool,
    run_count: AtomicUsize,
    /// Dependency-set memberships remembered since the last run, released
    /// in bulk before the next run and on cancellation.
    pub(crate) deps: Mutex<SmallVec<[(RawId, DepKey); 4]>>,
}

/// Handle to a tracked computation.
///
/// Clones share the same underlying reaction.
#[derive(Clone)]
pub struct Reaction {
    inner: Arc<ReactionInner>,
}

/// Wrap a computation into a reaction and run it once to establish its
/// initial dependencies.
pub fn observe(body: impl Fn() + Send + Sync + 'static) -> Reaction {
    observe_with(body, ObserveOptions::default())
}

/// Wrap a computation into a reaction with explicit options.
///
/// The effective scheduler binds here, at creation time; reconfiguring the
/// process-wide default later does not affect this reaction.
pub fn observe_with(body: impl Fn() + Send + Sync + 'static, options: ObserveOptions) -> Reaction {
    let scheduler = options.scheduler.unwrap_or_else(default_scheduler);
    let inner = Arc::new(ReactionInner {
        id: ReactionId::new(),
        body: Box::new(body),
        scheduler,
        debug_hook: options.debugger,
        lazy: options.lazy,
        cancelled: AtomicBool::new(false),
        run_count: AtomicUsize::new(0),
        deps: Mutex::new(SmallVec::new()),
    });
    store::adopt_reaction(Arc::clone(&inner));

    let reaction = Reaction { inner };
    debug!(id = reaction.id().raw(), lazy = options.lazy, "reaction created");
    if !options.lazy {
        reaction.run();
    }
    reaction
}

/// Permanently cancel a reaction. Equivalent to [`Reaction::unobserve`].
pub fn unobserve(reaction: &Reaction) {
    reaction.unobserve();
}

impl Reaction {
    pub(crate) fn from_inner(inner: Arc<ReactionInner>) -> Self {
        Self { inner }
    }

    #[cfg(test)]
    pub(crate) fn inner_for_test(&self) -> Arc<ReactionInner> {
        Arc::clone(&self.inner)
    }

    /// Get the reaction's unique ID.
    pub fn id(&self) -> ReactionId {
        self.inner.id
    }

    /// Whether the reaction was created lazy.
    pub fn is_lazy(&self) -> bool {
        self.inner.lazy
    }

    /// Whether the reaction has been permanently cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// How many times the body has executed.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Manually invoke the reaction.
    ///
    /// A cancelled reaction still runs its body but performs zero tracking.
    /// A reaction that is already anywhere on the execution stack is skipped
    /// entirely; `false` signals that the body did not execute.
    pub fn run(&self) -> bool {
        if self.is_cancelled() {
            self.inner.run_count.fetch_add(1, Ordering::SeqCst);
            (self.inner.body)();
            return true;
        }
        if stack::contains(self.inner.id) {
            trace!(id = self.inner.id.raw(), "re-entrant run skipped");
            return false;
        }

        // This run's reads may differ from the last run's; drop the stale
        // memberships before the body re-registers.
        store::release_reaction(&self.inner);

        let _guard = stack::enter(self.inner.id);
        self.inner.run_count.fetch_add(1, Ordering::SeqCst);
        (self.inner.body)();
        true
    }

    /// Scheduled invocation, used by schedulers and queue consumers.
    ///
    /// Unlike [`Reaction::run`], delivery to a cancelled reaction is an
    /// inert no-op; this is what makes an already-dispatched deferred call
    /// harmless after `unobserve`.
    pub fn trigger(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.run()
    }

    /// Permanently cancel the reaction.
    ///
    /// Removes it from every dependency set, drops it from the runtime
    /// registry, and asks a queue scheduler to discard any pending dispatch.
    pub fn unobserve(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(id = self.inner.id.raw(), "reaction unobserved");
        store::release_reaction(&self.inner);
        store::forget_reaction(self.inner.id);
        if let Scheduler::Queue(queue) = &self.inner.scheduler {
            queue.remove(self);
        }
    }
}

impl PartialEq for Reaction {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Reaction {}

impl std::fmt::Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

thread_local! {
    /// Re-entrancy guard for debug hooks: a hook that itself reads tracked
    /// data (or installs reactions) must not recurse into more hook calls.
    static DEBUGGING: Cell<bool> = const { Cell::new(false) };
}

fn debug_operation(reaction: &Reaction, op: &Operation) {
    let Some(hook) = &reaction.inner.debug_hook else {
        return;
    };
    if DEBUGGING.with(Cell::get) {
        return;
    }
    DEBUGGING.with(|flag| flag.set(true));
    struct Reset;
    impl Drop for Reset {
        fn drop(&mut self) {
            DEBUGGING.with(|flag| flag.set(false));
        }
    }
    let _reset = Reset;
    hook(op);
}

/// Record a read operation against the currently running reaction, if any.
pub(crate) fn register_running_reaction_for_operation(op: &Operation) {
    let Some(id) = stack::current() else {
        return;
    };
    let Some(reaction) = store::lookup_reaction(id) else {
        return;
    };
    debug_operation(&reaction, op);

    let dep = match op.kind {
        OpKind::Iterate => DepKey::Shape,
        _ => match &op.key {
            Some(key) => DepKey::Prop(key.clone()),
            None => return,
        },
    };
    trace!(target_id = op.target.raw(), kind = ?op.kind, "dependency registered");
    store::register_dependency(&reaction.inner, op.target, dep);
}

/// Collect and dispatch every reaction affected by a write operation.
pub(crate) fn queue_reactions_for_operation(op: &Operation) {
    let ids = store::collect_reactions_for(op);
    if ids.is_empty() {
        return;
    }

    let mut reactions: Vec<Reaction> = ids
        .into_iter()
        .filter_map(store::lookup_reaction)
        .collect();
    if let Some(transform) = tables::transform_for(op.target) {
        reactions = transform(reactions);
    }

    for reaction in reactions {
        debug_operation(&reaction, op);
        // A reaction still on the execution stack triggered this write
        // itself (directly or through nesting); delivering it now would
        // cascade, so it is skipped.
        if stack::contains(reaction.id()) {
            trace!(id = reaction.id().raw(), "trigger for running reaction skipped");
            continue;
        }
        trace!(id = reaction.id().raw(), kind = ?op.kind, "reaction queued");
        let scheduler = reaction.inner.scheduler.clone();
        scheduler.dispatch(reaction);
    }
}
