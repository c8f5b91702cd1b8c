//! Execution stack.
//!
//! A thread-local LIFO of the reactions currently running, with an auxiliary
//! occurrence-count index so "is this reaction anywhere on the stack" is O(1).
//! The same reaction can legitimately appear more than once under deep
//! nesting, which is why the index counts occurrences instead of holding a
//! plain set.
//!
//! Popping happens through a drop guard so a panicking reaction body still
//! unwinds the stack correctly.

use std::cell::RefCell;
use std::collections::HashMap;

use smallvec::SmallVec;

use super::reaction::ReactionId;

thread_local! {
    static STACK: RefCell<RunStack> = RefCell::new(RunStack::new());
}

struct RunStack {
    items: SmallVec<[ReactionId; 8]>,
    counts: HashMap<ReactionId, usize>,
}

impl RunStack {
    fn new() -> Self {
        Self {
            items: SmallVec::new(),
            counts: HashMap::new(),
        }
    }

    fn push(&mut self, id: ReactionId) {
        self.items.push(id);
        *self.counts.entry(id).or_insert(0) += 1;
    }

    fn pop(&mut self) -> Option<ReactionId> {
        let id = self.items.pop()?;
        if let Some(count) = self.counts.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&id);
            }
        }
        Some(id)
    }
}

/// Guard that pops the stack when dropped.
pub(crate) struct RunGuard {
    id: ReactionId,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            debug_assert_eq!(
                popped,
                Some(self.id),
                "execution stack mismatch on pop"
            );
        });
    }
}

/// Push a reaction and return the guard that pops it.
pub(crate) fn enter(id: ReactionId) -> RunGuard {
    STACK.with(|stack| stack.borrow_mut().push(id));
    RunGuard { id }
}

/// The reaction currently on top of the stack, if any.
pub(crate) fn current() -> Option<ReactionId> {
    STACK.with(|stack| stack.borrow().items.last().copied())
}

/// Whether the reaction appears anywhere on the stack.
pub(crate) fn contains(id: ReactionId) -> bool {
    occurrences(id) > 0
}

/// How many times the reaction appears on the stack.
pub(crate) fn occurrences(id: ReactionId) -> usize {
    STACK.with(|stack| stack.borrow().counts.get(&id).copied().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_pushes_and_pops() {
        let id = ReactionId::new();

        assert!(!contains(id));
        {
            let _guard = enter(id);
            assert!(contains(id));
            assert_eq!(current(), Some(id));
        }
        assert!(!contains(id));
        assert_eq!(current(), None);
    }

    #[test]
    fn duplicates_are_counted() {
        let id = ReactionId::new();

        let _outer = enter(id);
        assert_eq!(occurrences(id), 1);
        {
            let _inner = enter(id);
            assert_eq!(occurrences(id), 2);
        }
        assert_eq!(occurrences(id), 1);
        assert!(contains(id));
    }

    #[test]
    fn nested_distinct_reactions() {
        let outer = ReactionId::new();
        let inner = ReactionId::new();

        let _outer_guard = enter(outer);
        {
            let _inner_guard = enter(inner);
            assert_eq!(current(), Some(inner));
            assert!(contains(outer));
        }
        assert_eq!(current(), Some(outer));
        assert!(!contains(inner));
    }

    #[test]
    fn guard_pops_during_unwind() {
        let id = ReactionId::new();
        let result = std::panic::catch_unwind(|| {
            let _guard = enter(id);
            panic!("body failed");
        });
        assert!(result.is_err());
        assert!(!contains(id));
        assert_eq!(current(), None);
    }
}
