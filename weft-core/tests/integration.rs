//! End-to-end tests for the tracking runtime.
//!
//! Each test builds its own raw values, so tests stay independent even
//! though the dependency store and association tables are process-global.
//! Process-global scheduler configuration is covered separately in the
//! `configuration` binary.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use weft_core::handlers::{
    CollectionHandlers, StructuralHandlers, TrackingCollection, TrackingStructural,
};
use weft_core::{
    is_wrapped, observe, observe_with, wrap, wrap_shallow, wrap_with, Key, Observable,
    ObserveOptions, OpKind, RawNode, Reaction, ReactionQueue, Result, Scheduler, Value,
    WrapOptions,
};

fn record_obs(pairs: impl IntoIterator<Item = (Key, Value)>) -> Observable {
    wrap(Value::Raw(RawNode::record_from(pairs)))
        .into_obs()
        .unwrap()
}

#[test]
fn write_reruns_reader() {
    let obs = record_obs([(Key::from("count"), Value::Int(0))]);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let watched = obs.clone();
    let seen_clone = Arc::clone(&seen);
    let reaction = observe(move || {
        let value = watched.get(&Key::from("count")).unwrap();
        seen_clone.lock().push(value.and_then(|v| v.as_int()).unwrap());
    });

    obs.set(Key::from("count"), Value::Int(1)).unwrap();
    // Writing the value already stored must notify nobody.
    obs.set(Key::from("count"), Value::Int(1)).unwrap();
    obs.set(Key::from("count"), Value::Int(2)).unwrap();

    assert_eq!(*seen.lock(), vec![0, 1, 2]);
    reaction.unobserve();
}

#[test]
fn unrelated_key_does_not_rerun_reader() {
    let obs = record_obs([
        (Key::from("watched"), Value::Int(0)),
        (Key::from("other"), Value::Int(0)),
    ]);

    let watched = obs.clone();
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("watched"));
    });

    obs.set(Key::from("other"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 1);

    obs.set(Key::from("watched"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 2);
    reaction.unobserve();
}

#[test]
fn key_enumeration_tracks_shape() {
    let obs = record_obs([(Key::from("a"), Value::Int(0))]);

    let watched = obs.clone();
    let reaction = observe(move || {
        let _ = watched.keys();
    });
    assert_eq!(reaction.run_count(), 1);

    // Updating an existing key leaves the key set untouched.
    obs.set(Key::from("a"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 1);

    // Adding and deleting keys changes shape.
    obs.set(Key::from("b"), Value::Int(2)).unwrap();
    assert_eq!(reaction.run_count(), 2);
    assert!(obs.delete(&Key::from("b")).unwrap());
    assert_eq!(reaction.run_count(), 3);

    reaction.unobserve();
}

#[test]
fn list_length_is_a_shape_dependency() {
    let obs = wrap(Value::Raw(RawNode::list_from([Value::Int(10)])))
        .into_obs()
        .unwrap();

    let watched = obs.clone();
    let reaction = observe(move || {
        let _ = watched.len();
    });
    assert_eq!(reaction.run_count(), 1);

    // In-place element replacement leaves the length alone.
    obs.set(Key::index(0), Value::Int(11)).unwrap();
    assert_eq!(reaction.run_count(), 1);

    obs.push(Value::Int(20)).unwrap();
    assert_eq!(reaction.run_count(), 2);

    let popped = obs.pop().unwrap();
    assert_eq!(popped.and_then(|v| v.as_int()), Some(20));
    assert_eq!(reaction.run_count(), 3);

    reaction.unobserve();
}

#[test]
fn clear_notifies_each_dependent_once() {
    let map = wrap(Value::Raw(RawNode::map_from([
        (Key::from("a"), Value::Int(1)),
        (Key::from("b"), Value::Int(2)),
    ])))
    .into_obs()
    .unwrap();

    let watched = map.clone();
    let reaction = observe(move || {
        // Several dependencies on the same collection: two keys plus shape.
        let _ = watched.get(&Key::from("a"));
        let _ = watched.get(&Key::from("b"));
        let _ = watched.len();
    });
    assert_eq!(reaction.run_count(), 1);

    map.clear().unwrap();
    assert_eq!(reaction.run_count(), 2);

    // Clearing an already-empty collection notifies nobody.
    map.clear().unwrap();
    assert_eq!(reaction.run_count(), 2);

    reaction.unobserve();
}

#[test]
fn set_membership_tracking() {
    let set = wrap(Value::Raw(RawNode::set_from([Value::Int(1)])))
        .into_obs()
        .unwrap();

    let watched = set.clone();
    let reaction = observe(move || {
        let _ = watched.entries();
    });
    assert_eq!(reaction.run_count(), 1);

    assert!(set.add(Value::Int(2)).unwrap());
    assert_eq!(reaction.run_count(), 2);

    // Re-adding a member is not a change.
    assert!(!set.add(Value::Int(2)).unwrap());
    assert_eq!(reaction.run_count(), 2);

    assert!(set.delete(&Key::from(2i64)).unwrap());
    assert_eq!(reaction.run_count(), 3);

    reaction.unobserve();
}

#[test]
fn self_write_does_not_cascade() {
    let obs = record_obs([(Key::from("n"), Value::Int(0))]);

    let watched = obs.clone();
    let reaction = observe(move || {
        let n = watched
            .get(&Key::from("n"))
            .unwrap()
            .and_then(|v| v.as_int())
            .unwrap();
        let _ = watched.set(Key::from("n"), Value::Int(n + 1));
    });
    // The initial run wrote n = 1 without re-delivering to itself.
    assert_eq!(reaction.run_count(), 1);
    assert_eq!(
        obs.raw().get_untracked(&Key::from("n")),
        Some(Value::Int(1))
    );

    obs.set(Key::from("n"), Value::Int(10)).unwrap();
    assert_eq!(reaction.run_count(), 2);
    assert_eq!(
        obs.raw().get_untracked(&Key::from("n")),
        Some(Value::Int(11))
    );

    reaction.unobserve();
}

#[test]
fn unobserve_stops_delivery() {
    let obs = record_obs([(Key::from("x"), Value::Int(0))]);
    let count = Arc::new(AtomicI32::new(0));

    let watched = obs.clone();
    let count_clone = Arc::clone(&count);
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("x"));
        count_clone.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(count.load(Ordering::SeqCst), 1);

    reaction.unobserve();
    obs.set(Key::from("x"), Value::Int(1)).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Manual invocation still works, untracked.
    assert!(reaction.run());
    assert_eq!(count.load(Ordering::SeqCst), 2);
    obs.set(Key::from("x"), Value::Int(2)).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn conditional_reads_retrack_each_run() {
    let obs = record_obs([
        (Key::from("flag"), Value::Bool(true)),
        (Key::from("a"), Value::Int(0)),
        (Key::from("b"), Value::Int(0)),
    ]);

    let watched = obs.clone();
    let reaction = observe(move || {
        let flag = watched
            .get(&Key::from("flag"))
            .unwrap()
            .and_then(|v| v.as_bool())
            .unwrap();
        let branch = if flag { "a" } else { "b" };
        let _ = watched.get(&Key::from(branch));
    });
    assert_eq!(reaction.run_count(), 1);

    // While the flag is true, only `a` is a dependency.
    obs.set(Key::from("b"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 1);
    obs.set(Key::from("a"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 2);

    // Flip the branch; the stale `a` dependency must be gone.
    obs.set(Key::from("flag"), Value::Bool(false)).unwrap();
    assert_eq!(reaction.run_count(), 3);
    obs.set(Key::from("a"), Value::Int(2)).unwrap();
    assert_eq!(reaction.run_count(), 3);
    obs.set(Key::from("b"), Value::Int(2)).unwrap();
    assert_eq!(reaction.run_count(), 4);

    reaction.unobserve();
}

#[test]
fn deep_wrapping_tracks_nested_values() {
    let inner = RawNode::record_from([(Key::from("leaf"), Value::Int(0))]);
    let obs = record_obs([(Key::from("inner"), Value::Raw(Arc::clone(&inner)))]);

    let watched = obs.clone();
    let reaction = observe(move || {
        let nested = watched
            .get(&Key::from("inner"))
            .unwrap()
            .and_then(|v| v.into_obs())
            .unwrap();
        let _ = nested.get(&Key::from("leaf"));
    });
    assert_eq!(reaction.run_count(), 1);

    // Mutating the nested value through its own façade re-runs the reader.
    let nested = wrap(Value::Raw(inner)).into_obs().unwrap();
    nested.set(Key::from("leaf"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 2);

    reaction.unobserve();
}

#[test]
fn shallow_wrapping_hands_out_raw_nested_values() {
    let inner = RawNode::record_from([(Key::from("leaf"), Value::Int(0))]);
    let obs = wrap_shallow(Value::Raw(RawNode::record_from([(
        Key::from("inner"),
        Value::Raw(inner),
    )])))
    .into_obs()
    .unwrap();

    assert!(!obs.is_deep());
    let nested = obs.get(&Key::from("inner")).unwrap().unwrap();
    assert!(matches!(nested, Value::Raw(_)));
}

#[test]
fn nan_rewrite_is_not_a_change() {
    let obs = record_obs([(Key::from("f"), Value::Float(f64::NAN))]);

    let watched = obs.clone();
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("f"));
    });

    obs.set(Key::from("f"), Value::Float(f64::NAN)).unwrap();
    assert_eq!(reaction.run_count(), 1);

    // The two zeros are distinct values.
    obs.set(Key::from("f"), Value::Float(0.0)).unwrap();
    assert_eq!(reaction.run_count(), 2);
    obs.set(Key::from("f"), Value::Float(-0.0)).unwrap();
    assert_eq!(reaction.run_count(), 3);

    reaction.unobserve();
}

#[test]
fn replacing_node_with_equal_contents_is_a_change() {
    let obs = record_obs([(Key::from("child"), Value::Raw(RawNode::record()))]);

    let watched = obs.clone();
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("child"));
    });

    // Equal shape, different identity.
    obs.set(Key::from("child"), Value::Raw(RawNode::record()))
        .unwrap();
    assert_eq!(reaction.run_count(), 2);

    reaction.unobserve();
}

#[test]
fn delegated_read_tracks_both_links() {
    let parent = RawNode::record_from([(Key::from("greeting"), Value::from("hi"))]);
    let child = RawNode::record_with_parent(Arc::clone(&parent)).unwrap();
    let child_obs = wrap(Value::Raw(child)).into_obs().unwrap();
    let parent_obs = wrap(Value::Raw(parent)).into_obs().unwrap();

    let watched = child_obs.clone();
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("greeting"));
    });
    assert_eq!(reaction.run_count(), 1);

    // The key resolves on the parent, so a parent write re-runs the reader.
    parent_obs
        .set(Key::from("greeting"), Value::from("hello"))
        .unwrap();
    assert_eq!(reaction.run_count(), 2);

    // A write through the child lands in the child's own storage and fires
    // exactly once.
    child_obs
        .set(Key::from("greeting"), Value::from("hey"))
        .unwrap();
    assert_eq!(reaction.run_count(), 3);
    assert_eq!(
        parent_obs
            .raw()
            .get_untracked(&Key::from("greeting")),
        Some(Value::from("hello"))
    );

    // The child now shadows the key; the parent link is no longer tracked.
    parent_obs
        .set(Key::from("greeting"), Value::from("bye"))
        .unwrap();
    assert_eq!(reaction.run_count(), 3);

    reaction.unobserve();
}

#[test]
fn fixed_slots_ignore_writes() {
    let raw = RawNode::record_from([(Key::from("pinned"), Value::Int(7))]);
    raw.freeze(&Key::from("pinned")).unwrap();
    let obs = wrap(Value::Raw(raw)).into_obs().unwrap();

    let watched = obs.clone();
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("pinned"));
    });

    obs.set(Key::from("pinned"), Value::Int(8)).unwrap();
    assert_eq!(reaction.run_count(), 1);
    assert_eq!(
        obs.get(&Key::from("pinned")).unwrap(),
        Some(Value::Int(7))
    );

    reaction.unobserve();
}

#[test]
fn weak_collections_restrict_keys_and_iteration() {
    let weak_map = wrap(Value::Raw(RawNode::weak_map())).into_obs().unwrap();

    // Primitive keys are rejected.
    assert!(weak_map.set(Key::from("k"), Value::Int(1)).is_err());

    // Identity keys work, without the iteration protocol.
    let key_node = RawNode::record();
    weak_map
        .set(Key::Ref(Arc::clone(&key_node)), Value::Int(1))
        .unwrap();
    assert!(weak_map.has(&Key::Ref(Arc::clone(&key_node))).unwrap());
    assert!(weak_map.len().is_err());
    assert!(weak_map.entries().is_err());
    assert!(weak_map.clear().is_err());

    let weak_set = wrap(Value::Raw(RawNode::weak_set())).into_obs().unwrap();
    assert!(weak_set.add(Value::Int(1)).is_err());
    assert!(weak_set.add(Value::Raw(RawNode::record())).unwrap());
}

#[derive(Clone, Default)]
struct BatchQueue {
    pending: Arc<Mutex<Vec<Reaction>>>,
}

impl BatchQueue {
    fn len(&self) -> usize {
        self.pending.lock().len()
    }

    fn drain(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for reaction in pending {
            reaction.trigger();
        }
    }
}

impl ReactionQueue for BatchQueue {
    fn add(&self, reaction: Reaction) {
        let mut pending = self.pending.lock();
        if !pending.contains(&reaction) {
            pending.push(reaction);
        }
    }

    fn remove(&self, reaction: &Reaction) {
        self.pending.lock().retain(|queued| queued != reaction);
    }
}

#[test]
fn queue_scheduler_batches_triggers() {
    let queue = BatchQueue::default();
    let obs = record_obs([(Key::from("x"), Value::Int(0))]);

    let watched = obs.clone();
    let reaction = observe_with(
        move || {
            let _ = watched.get(&Key::from("x"));
        },
        ObserveOptions {
            scheduler: Some(Scheduler::queue(Arc::new(queue.clone()))),
            ..Default::default()
        },
    );
    assert_eq!(reaction.run_count(), 1);

    // Two writes, one queued dispatch.
    obs.set(Key::from("x"), Value::Int(1)).unwrap();
    obs.set(Key::from("x"), Value::Int(2)).unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(reaction.run_count(), 1);

    queue.drain();
    assert_eq!(reaction.run_count(), 2);

    // Unobserving removes the pending dispatch from the queue.
    obs.set(Key::from("x"), Value::Int(3)).unwrap();
    assert_eq!(queue.len(), 1);
    reaction.unobserve();
    assert_eq!(queue.len(), 0);
}

#[test]
fn function_scheduler_receives_triggered_reactions() {
    let delivered = Arc::new(AtomicI32::new(0));
    let obs = record_obs([(Key::from("x"), Value::Int(0))]);

    let watched = obs.clone();
    let delivered_clone = Arc::clone(&delivered);
    let reaction = observe_with(
        move || {
            let _ = watched.get(&Key::from("x"));
        },
        ObserveOptions {
            scheduler: Some(Scheduler::func(move |reaction| {
                delivered_clone.fetch_add(1, Ordering::SeqCst);
                reaction.trigger();
            })),
            ..Default::default()
        },
    );

    obs.set(Key::from("x"), Value::Int(1)).unwrap();
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert_eq!(reaction.run_count(), 2);

    reaction.unobserve();
}

#[test]
fn debug_hook_sees_reads_and_writes() {
    let ops = Arc::new(Mutex::new(Vec::new()));
    let obs = record_obs([(Key::from("x"), Value::Int(0))]);

    let watched = obs.clone();
    let ops_clone = Arc::clone(&ops);
    let reaction = observe_with(
        move || {
            let _ = watched.get(&Key::from("x"));
        },
        ObserveOptions {
            debugger: Some(Arc::new(move |op| {
                ops_clone.lock().push(op.kind);
            })),
            ..Default::default()
        },
    );

    obs.set(Key::from("x"), Value::Int(1)).unwrap();
    reaction.unobserve();

    // Initial read, the write that hit the reaction, the re-run's read.
    assert_eq!(*ops.lock(), vec![OpKind::Get, OpKind::Set, OpKind::Get]);
}

#[test]
fn dependency_transform_filters_dispatch() {
    let obs = wrap_with(
        Value::Raw(RawNode::record_from([(Key::from("x"), Value::Int(0))])),
        WrapOptions {
            dependency_transform: Some(Arc::new(|_| Vec::new())),
            ..Default::default()
        },
    )
    .into_obs()
    .unwrap();

    let watched = obs.clone();
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("x"));
    });

    // The transform drops every candidate; nothing is delivered.
    obs.set(Key::from("x"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 1);
    assert_eq!(
        obs.raw().get_untracked(&Key::from("x")),
        Some(Value::Int(1))
    );

    reaction.unobserve();
}

#[test]
fn writes_through_distinct_wrap_calls_share_tracking() {
    let raw = RawNode::record_from([(Key::from("x"), Value::Int(0))]);
    let reader = wrap(Value::Raw(Arc::clone(&raw))).into_obs().unwrap();
    let writer = wrap(Value::Raw(raw)).into_obs().unwrap();
    assert_eq!(reader, writer);

    let watched = reader.clone();
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("x"));
    });

    writer.set(Key::from("x"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 2);

    reaction.unobserve();
}

#[test]
fn stored_facades_are_unwrapped() {
    let child = wrap(Value::Raw(RawNode::record()));
    let obs = wrap(Value::Raw(RawNode::record())).into_obs().unwrap();

    obs.set(Key::from("child"), child.clone()).unwrap();
    let stored = obs
        .raw()
        .get_untracked(&Key::from("child"))
        .unwrap();
    assert!(matches!(stored, Value::Raw(_)));
    assert_eq!(stored.raw_id(), child.raw_id());
}

#[test]
fn debug_hook_reading_tracked_data_does_not_recurse() {
    let ops = Arc::new(Mutex::new(Vec::new()));
    let obs = record_obs([(Key::from("x"), Value::Int(0))]);
    let side = record_obs([(Key::from("y"), Value::Int(0))]);

    let watched = obs.clone();
    let ops_clone = Arc::clone(&ops);
    let reaction = observe_with(
        move || {
            let _ = watched.get(&Key::from("x"));
        },
        ObserveOptions {
            debugger: Some(Arc::new(move |op| {
                // A hook performing tracked reads of its own must not
                // trigger nested hook invocations.
                let _ = side.get(&Key::from("y"));
                ops_clone.lock().push(op.kind);
            })),
            ..Default::default()
        },
    );

    obs.set(Key::from("x"), Value::Int(1)).unwrap();
    reaction.unobserve();

    // Only the outer operations appear; the hook's own reads are silent.
    assert_eq!(*ops.lock(), vec![OpKind::Get, OpKind::Set, OpKind::Get]);
}

#[test]
fn construct_follows_wrap_mode() {
    let deep = wrap(Value::Raw(RawNode::record())).into_obs().unwrap();
    let produced = RawNode::record();
    let produced_id = produced.id();
    let built = deep.construct(move || Value::Raw(produced));
    assert!(is_wrapped(&built));
    assert_eq!(built.raw_id(), Some(produced_id));

    // A shallow façade hands the produced instance back raw, even when the
    // producer returns it wrapped; identity survives either way.
    let shallow = wrap_shallow(Value::Raw(RawNode::record()))
        .into_obs()
        .unwrap();
    let produced = wrap(Value::Raw(RawNode::record()));
    let produced_id = produced.raw_id();
    let built = shallow.construct(move || produced);
    assert!(!is_wrapped(&built));
    assert_eq!(built.raw_id(), produced_id);
}

struct CountingStructural {
    inner: TrackingStructural,
    reads: Arc<AtomicI32>,
}

impl StructuralHandlers for CountingStructural {
    fn get(&self, obs: &Observable, key: &Key) -> Result<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(obs, key)
    }

    fn has(&self, obs: &Observable, key: &Key) -> Result<bool> {
        self.inner.has(obs, key)
    }

    fn keys(&self, obs: &Observable) -> Result<Vec<Key>> {
        self.inner.keys(obs)
    }

    fn len(&self, obs: &Observable) -> Result<usize> {
        self.inner.len(obs)
    }

    fn set(&self, obs: &Observable, key: Key, value: Value) -> Result<()> {
        self.inner.set(obs, key, value)
    }

    fn delete(&self, obs: &Observable, key: &Key) -> Result<bool> {
        self.inner.delete(obs, key)
    }

    fn construct(&self, obs: &Observable, produced: Value) -> Value {
        self.inner.construct(obs, produced)
    }
}

#[test]
fn structural_handler_override_intercepts_reads() {
    let reads = Arc::new(AtomicI32::new(0));
    let obs = wrap_with(
        Value::Raw(RawNode::record_from([(Key::from("x"), Value::Int(0))])),
        WrapOptions {
            structural: Some(Arc::new(CountingStructural {
                inner: TrackingStructural::new(true),
                reads: Arc::clone(&reads),
            })),
            ..Default::default()
        },
    )
    .into_obs()
    .unwrap();

    let watched = obs.clone();
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("x"));
    });
    assert_eq!(reads.load(Ordering::SeqCst), 1);

    // Tracking still flows through the delegating override.
    obs.set(Key::from("x"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 2);
    assert_eq!(reads.load(Ordering::SeqCst), 2);

    reaction.unobserve();
}

struct CountingCollection {
    inner: TrackingCollection,
    reads: Arc<AtomicI32>,
}

impl CollectionHandlers for CountingCollection {
    fn get(&self, obs: &Observable, key: &Key) -> Result<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(obs, key)
    }

    fn has(&self, obs: &Observable, key: &Key) -> Result<bool> {
        self.inner.has(obs, key)
    }

    fn set(&self, obs: &Observable, key: Key, value: Value) -> Result<()> {
        self.inner.set(obs, key, value)
    }

    fn add(&self, obs: &Observable, value: Value) -> Result<bool> {
        self.inner.add(obs, value)
    }

    fn delete(&self, obs: &Observable, key: &Key) -> Result<bool> {
        self.inner.delete(obs, key)
    }

    fn clear(&self, obs: &Observable) -> Result<()> {
        self.inner.clear(obs)
    }

    fn size(&self, obs: &Observable) -> Result<usize> {
        self.inner.size(obs)
    }

    fn entries(&self, obs: &Observable) -> Result<Vec<(Value, Value)>> {
        self.inner.entries(obs)
    }
}

#[test]
fn collection_handler_override_intercepts_reads() {
    let reads = Arc::new(AtomicI32::new(0));
    let map = wrap_with(
        Value::Raw(RawNode::map_from([(Key::from("k"), Value::Int(0))])),
        WrapOptions {
            collections: Some(Arc::new(CountingCollection {
                inner: TrackingCollection::new(true),
                reads: Arc::clone(&reads),
            })),
            ..Default::default()
        },
    )
    .into_obs()
    .unwrap();

    let watched = map.clone();
    let reaction = observe(move || {
        let _ = watched.get(&Key::from("k"));
    });
    assert_eq!(reads.load(Ordering::SeqCst), 1);

    map.set(Key::from("k"), Value::Int(1)).unwrap();
    assert_eq!(reaction.run_count(), 2);
    assert_eq!(reads.load(Ordering::SeqCst), 2);

    reaction.unobserve();
}

#[test]
fn for_each_visits_map_entries_in_insertion_order() {
    let map = wrap(Value::Raw(RawNode::map_from([
        (Key::from("first"), Value::Int(1)),
        (Key::from("second"), Value::Int(2)),
    ])))
    .into_obs()
    .unwrap();

    let mut visited = Vec::new();
    map.for_each(|value, key| {
        visited.push((
            key.as_str().map(str::to_owned).unwrap(),
            value.as_int().unwrap(),
        ));
    })
    .unwrap();

    assert_eq!(
        visited,
        vec![(String::from("first"), 1), (String::from("second"), 2)]
    );
}
