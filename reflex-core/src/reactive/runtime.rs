//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects observed sources
//! to the computations that read them. It owns the subscription store and
//! the subscriber registry, and it is where reads turn into dependencies
//! and writes turn into re-runs.
//!
//! # How It Works
//!
//! 1. While a computation runs, every read of an observed (source, key)
//!    pair passes through [`Runtime::track`], which links that pair to the
//!    computation.
//!
//! 2. A write to a (source, key) pair passes through [`Runtime::trigger`],
//!    which notifies every linked computation. A computation with a
//!    scheduler override is handed to its scheduler; any other runs
//!    synchronously, in no guaranteed order.
//!
//! 3. Before a computation re-runs, it unlinks itself from every pair it
//!    read last time (see `effect.rs`), so subscription sets always
//!    reflect only the most recent execution.
//!
//! # Self-trigger suppression
//!
//! A computation that writes a key it also reads would otherwise re-invoke
//! itself forever. Trigger excludes the innermost running computation from
//! the run-set. Only the innermost one: two computations that trigger each
//! other indirectly can still recurse without bound.
//!
//! # Thread Safety
//!
//! The tracking scope is thread-local; the registry and subscription store
//! are global maps behind locks. No lock is held while a computation body
//! or scheduler callback runs.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::scope::TrackingScope;
use super::subscriber::{SourceId, Subscriber, SubscriberId};

/// Coordinates of one subscription: which source and which key was read.
pub(crate) type DepKey = (SourceId, Arc<str>);

/// The key under which single-value sources (signals, memos) publish.
pub(crate) const VALUE_KEY: &str = "value";

// Global registry of subscribers. Weak references, so a dropped
// computation never keeps itself alive through the runtime.
static REGISTRY: OnceLock<RwLock<HashMap<SubscriberId, Weak<dyn Subscriber>>>> = OnceLock::new();

// The subscription store: source -> key -> set of subscribed computations.
// Entries are created lazily on first tracked read.
static SUBSCRIPTIONS: OnceLock<
    RwLock<IndexMap<SourceId, IndexMap<Arc<str>, IndexSet<SubscriberId>>>>,
> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<SubscriberId, Weak<dyn Subscriber>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn subscriptions() -> &'static RwLock<IndexMap<SourceId, IndexMap<Arc<str>, IndexSet<SubscriberId>>>>
{
    SUBSCRIPTIONS.get_or_init(|| RwLock::new(IndexMap::new()))
}

/// The global reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Register a subscriber so trigger can reach it.
    pub(crate) fn register(subscriber: Arc<dyn Subscriber>) {
        let id = subscriber.id();
        registry().write().insert(id, Arc::downgrade(&subscriber));
        debug!(?id, "subscriber registered");
    }

    /// Remove a subscriber from the registry.
    pub(crate) fn unregister(id: SubscriberId) {
        registry().write().remove(&id);
    }

    /// Record a read of (source, key) against the innermost running
    /// computation.
    ///
    /// A read outside any computation is a no-op; plain inspection code
    /// does not subscribe to anything.
    pub fn track(source: SourceId, key: &str) {
        if !TrackingScope::is_active() {
            trace!(?source, key, "read outside any computation");
            return;
        }

        let key: Arc<str> = Arc::from(key);
        let Some(subscriber) = TrackingScope::record_read((source, Arc::clone(&key))) else {
            return;
        };

        subscriptions()
            .write()
            .entry(source)
            .or_insert_with(IndexMap::new)
            .entry(key)
            .or_insert_with(IndexSet::new)
            .insert(subscriber);

        trace!(?source, ?subscriber, "dependency recorded");
    }

    /// Notify every computation subscribed to (source, key) that it was
    /// written.
    ///
    /// A write to a pair nobody reads is a no-op. The innermost running
    /// computation is excluded from the run-set, so a computation that
    /// writes a key it also reads does not re-invoke itself.
    pub fn trigger(source: SourceId, key: &str) {
        let active = TrackingScope::current_subscriber();

        let run_set: SmallVec<[SubscriberId; 8]> = {
            let store = subscriptions().read();
            let Some(subscribers) = store.get(&source).and_then(|keys| keys.get(key)) else {
                trace!(?source, key, "write with no subscribers");
                return;
            };
            subscribers
                .iter()
                .copied()
                .filter(|id| Some(*id) != active)
                .collect()
        };

        if run_set.is_empty() {
            return;
        }
        trace!(?source, key, count = run_set.len(), "notifying subscribers");

        // Locks are released here: notify re-enters track/trigger/cleanup.
        let mut stale: SmallVec<[SubscriberId; 8]> = SmallVec::new();
        for id in run_set {
            let subscriber = registry().read().get(&id).and_then(|weak| weak.upgrade());
            match subscriber {
                Some(subscriber) => subscriber.notify(),
                None => stale.push(id),
            }
        }

        // Subscribers that were dropped without cleanup are pruned lazily.
        if !stale.is_empty() {
            let mut registry = registry().write();
            let mut store = subscriptions().write();
            for id in &stale {
                registry.remove(id);
                if let Some(set) = store.get_mut(&source).and_then(|keys| keys.get_mut(key)) {
                    set.shift_remove(id);
                }
            }
        }
    }

    /// Remove `subscriber` from every subscription set named by
    /// `back_links`.
    ///
    /// This is the cleanup half of the re-run protocol: cost is
    /// proportional to the number of dependencies, not the size of the
    /// store. Emptied sets are left in place; the next tracked read
    /// re-fills them.
    pub(crate) fn remove_subscriptions(
        subscriber: SubscriberId,
        back_links: impl IntoIterator<Item = DepKey>,
    ) {
        let mut store = subscriptions().write();
        for (source, key) in back_links {
            if let Some(set) = store.get_mut(&source).and_then(|keys| keys.get_mut(&key)) {
                set.shift_remove(&subscriber);
            }
        }
    }

    /// Number of computations currently subscribed to (source, key).
    pub fn subscriber_count(source: SourceId, key: &str) -> usize {
        subscriptions()
            .read()
            .get(&source)
            .and_then(|keys| keys.get(key))
            .map_or(0, IndexSet::len)
    }

    /// Get the innermost running computation's ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        TrackingScope::current_subscriber()
    }

    /// Check if a computation is currently running on this thread.
    pub fn is_tracking() -> bool {
        TrackingScope::is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct MockSubscriber {
        id: SubscriberId,
        notified: AtomicI32,
    }

    impl MockSubscriber {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                notified: AtomicI32::new(0),
            })
        }

        fn notified(&self) -> i32 {
            self.notified.load(Ordering::SeqCst)
        }
    }

    impl Subscriber for MockSubscriber {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn notify(&self) {
            self.notified.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn track_in_scope(subscriber: &Arc<MockSubscriber>, source: SourceId, key: &str) {
        let links = Arc::new(Mutex::new(IndexSet::new()));
        let _scope = TrackingScope::enter(subscriber.id, links);
        Runtime::track(source, key);
    }

    #[test]
    fn track_then_trigger_notifies() {
        let subscriber = MockSubscriber::new();
        let source = SourceId::new();

        Runtime::register(subscriber.clone());
        track_in_scope(&subscriber, source, "count");

        assert_eq!(Runtime::subscriber_count(source, "count"), 1);

        Runtime::trigger(source, "count");
        assert_eq!(subscriber.notified(), 1);

        Runtime::trigger(source, "count");
        assert_eq!(subscriber.notified(), 2);
    }

    #[test]
    fn track_outside_scope_is_noop() {
        let source = SourceId::new();

        Runtime::track(source, "count");
        assert_eq!(Runtime::subscriber_count(source, "count"), 0);
    }

    #[test]
    fn trigger_on_unobserved_key_is_noop() {
        let subscriber = MockSubscriber::new();
        let source = SourceId::new();

        Runtime::register(subscriber.clone());
        track_in_scope(&subscriber, source, "count");

        // Different key of the same source: nothing to run
        Runtime::trigger(source, "other");
        assert_eq!(subscriber.notified(), 0);

        // Entirely unobserved source: nothing to run
        Runtime::trigger(SourceId::new(), "count");
        assert_eq!(subscriber.notified(), 0);
    }

    #[test]
    fn trigger_suppresses_active_subscriber() {
        let subscriber = MockSubscriber::new();
        let source = SourceId::new();

        Runtime::register(subscriber.clone());
        track_in_scope(&subscriber, source, "count");

        // Writes from inside the subscribed computation do not re-notify it
        {
            let links = Arc::new(Mutex::new(IndexSet::new()));
            let _scope = TrackingScope::enter(subscriber.id, links);
            Runtime::trigger(source, "count");
        }
        assert_eq!(subscriber.notified(), 0);

        // From outside it does
        Runtime::trigger(source, "count");
        assert_eq!(subscriber.notified(), 1);
    }

    #[test]
    fn cleanup_removes_subscriptions() {
        let subscriber = MockSubscriber::new();
        let source = SourceId::new();

        Runtime::register(subscriber.clone());
        track_in_scope(&subscriber, source, "count");
        assert_eq!(Runtime::subscriber_count(source, "count"), 1);

        Runtime::remove_subscriptions(subscriber.id, [(source, Arc::from("count"))]);
        assert_eq!(Runtime::subscriber_count(source, "count"), 0);

        Runtime::trigger(source, "count");
        assert_eq!(subscriber.notified(), 0);
    }

    #[test]
    fn dead_subscribers_are_pruned_on_trigger() {
        let subscriber = MockSubscriber::new();
        let source = SourceId::new();

        Runtime::register(subscriber.clone());
        track_in_scope(&subscriber, source, "count");

        drop(subscriber);

        // The weak registry entry no longer upgrades; trigger drops it and
        // its subscription
        Runtime::trigger(source, "count");
        assert_eq!(Runtime::subscriber_count(source, "count"), 0);
    }
}
