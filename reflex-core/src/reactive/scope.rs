//! Tracking Scope
//!
//! The tracking scope records which computation is currently running. This
//! enables automatic dependency tracking: when an observed value is read,
//! the read is attributed to the innermost running computation.
//!
//! # Implementation
//!
//! We use a thread-local stack of scopes. When a computation starts
//! running, it pushes a scope; when it finishes, the scope pops. A stack
//! (rather than a single slot) is what keeps nested computations correct:
//! reads inside an inner computation attribute to the inner one, and the
//! outer one resumes being active when the inner completes.
//!
//! Each scope shares the computation's own back-link set, so every read is
//! written into the back-links the moment it happens. A computation whose
//! body panics mid-run therefore leaves the bookkeeping consistent: the
//! subscriptions it re-established before the panic are all back-linked
//! and will be cleaned up on the next run (or on drop).

use std::cell::RefCell;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;

use super::runtime::DepKey;
use super::subscriber::SubscriberId;

thread_local! {
    static SCOPE_STACK: RefCell<Vec<ScopeEntry>> = RefCell::new(Vec::new());
}

/// An entry in the scope stack.
struct ScopeEntry {
    /// The subscriber ID of the running computation.
    subscriber: SubscriberId,
    /// The computation's back-link set, shared so reads land in it
    /// immediately.
    back_links: Arc<Mutex<IndexSet<DepKey>>>,
}

/// Guard that pops the scope when dropped.
///
/// Popping on drop keeps the stack correct on every exit path, a panicking
/// computation body included.
pub struct TrackingScope {
    subscriber: SubscriberId,
}

impl TrackingScope {
    /// Enter a new tracking scope for the given subscriber.
    ///
    /// While the scope is active, reads of observed values attribute to
    /// this subscriber. The scope exits when the returned guard drops.
    pub(crate) fn enter(
        subscriber: SubscriberId,
        back_links: Arc<Mutex<IndexSet<DepKey>>>,
    ) -> Self {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(ScopeEntry {
                subscriber,
                back_links,
            });
        });

        Self { subscriber }
    }

    /// Check if any computation is currently running on this thread.
    pub fn is_active() -> bool {
        SCOPE_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the innermost running computation's ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        SCOPE_STACK.with(|stack| stack.borrow().last().map(|entry| entry.subscriber))
    }

    /// Attribute a read to the innermost scope.
    ///
    /// Records the dependency in the running computation's back-link set
    /// and returns its ID so the caller can update the subscription store.
    /// Returns `None` when no computation is running.
    pub(crate) fn record_read(dep: DepKey) -> Option<SubscriberId> {
        SCOPE_STACK.with(|stack| {
            let stack = stack.borrow();
            let entry = stack.last()?;
            entry.back_links.lock().insert(dep);
            Some(entry.subscriber)
        })
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched push/pop pairs early in debug builds.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber, self.subscriber,
                    "TrackingScope mismatch: expected {:?}, got {:?}",
                    self.subscriber, entry.subscriber
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::subscriber::SourceId;
    use super::*;

    fn empty_links() -> Arc<Mutex<IndexSet<DepKey>>> {
        Arc::new(Mutex::new(IndexSet::new()))
    }

    #[test]
    fn scope_tracks_subscriber() {
        let id = SubscriberId::new();

        assert!(!TrackingScope::is_active());
        assert!(TrackingScope::current_subscriber().is_none());

        {
            let _scope = TrackingScope::enter(id, empty_links());

            assert!(TrackingScope::is_active());
            assert_eq!(TrackingScope::current_subscriber(), Some(id));
        }

        // Scope should be cleaned up after drop
        assert!(!TrackingScope::is_active());
        assert!(TrackingScope::current_subscriber().is_none());
    }

    #[test]
    fn record_read_lands_in_back_links() {
        let id = SubscriberId::new();
        let links = empty_links();
        let source = SourceId::new();

        let _scope = TrackingScope::enter(id, links.clone());

        assert_eq!(TrackingScope::record_read((source, "a".into())), Some(id));
        assert_eq!(TrackingScope::record_read((source, "b".into())), Some(id));
        // Repeated reads collapse to one back-link
        assert_eq!(TrackingScope::record_read((source, "a".into())), Some(id));

        assert_eq!(links.lock().len(), 2);
    }

    #[test]
    fn record_read_without_scope_is_none() {
        let source = SourceId::new();
        assert_eq!(TrackingScope::record_read((source, "a".into())), None);
    }

    #[test]
    fn nested_scopes() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let outer_links = empty_links();
        let inner_links = empty_links();
        let source = SourceId::new();

        {
            let _outer = TrackingScope::enter(id1, outer_links.clone());
            assert_eq!(TrackingScope::current_subscriber(), Some(id1));
            TrackingScope::record_read((source, "outer".into()));

            {
                let _inner = TrackingScope::enter(id2, inner_links.clone());
                assert_eq!(TrackingScope::current_subscriber(), Some(id2));
                TrackingScope::record_read((source, "inner".into()));
            }

            // After the inner scope drops, the outer one is active again
            assert_eq!(TrackingScope::current_subscriber(), Some(id1));
        }

        // Reads were attributed to the scope that made them, not the
        // outermost one
        assert_eq!(outer_links.lock().len(), 1);
        assert_eq!(inner_links.lock().len(), 1);
        let outer_key: DepKey = (source, "outer".into());
        let inner_key: DepKey = (source, "inner".into());
        assert!(outer_links.lock().contains(&outer_key));
        assert!(inner_links.lock().contains(&inner_key));
    }

    #[test]
    fn scope_pops_on_panic() {
        let id = SubscriberId::new();

        let result = std::panic::catch_unwind(|| {
            let _scope = TrackingScope::enter(id, empty_links());
            panic!("boom");
        });

        assert!(result.is_err());
        assert!(!TrackingScope::is_active());
    }
}
