//! Identity types for the reactive system.
//!
//! A Subscriber is any computation that depends on observed values (an
//! effect, or the evaluation half of a memo). A Source is anything that can
//! be observed (a signal, a store, or a memo's output).

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Each computation gets a unique ID when created. The ID is what the
/// runtime stores in subscription sets, so set semantics deduplicate
/// repeated reads by the same computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for an observed source.
///
/// Sources have no intrinsic identity beyond this ID; a store, a signal,
/// and a memo each allocate one at construction and keep it for life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// The type-erased notification surface the runtime registry stores.
///
/// `notify` is called when one of the subscriber's dependencies changes.
/// The implementation decides what that means: run now, or hand itself to
/// a scheduler override.
pub trait Subscriber: Send + Sync {
    /// Get this subscriber's unique ID.
    fn id(&self) -> SubscriberId;

    /// React to a dependency change.
    fn notify(&self);
}
