//! Signal Implementation
//!
//! A Signal is a single observed value behind an explicit `get`/`set`
//! surface. Every `get` passes through the runtime's tracker, so a
//! computation that reads a signal subscribes to it; every `set` passes
//! through the trigger after the write lands, so subscribed computations
//! re-run (or reschedule).
//!
//! For a record with several independently-tracked attributes, see
//! [`Store`](super::store::Store).

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::runtime::{Runtime, VALUE_KEY};
use super::subscriber::SourceId;

/// A reactive cell holding a value of type T.
///
/// Cheap to clone; clones share the same value and identity.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Reads inside a computation subscribe it to the signal
/// let value = count.get();
///
/// // Writes re-run subscribed computations
/// count.set(5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Identity in the subscription store.
    source: SourceId,

    /// The current value.
    value: Arc<RwLock<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            source: SourceId::new(),
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Get the signal's source ID.
    pub fn id(&self) -> SourceId {
        self.source
    }

    /// Get the current value.
    ///
    /// If a computation is running, it becomes subscribed to this signal.
    pub fn get(&self) -> T {
        Runtime::track(self.source, VALUE_KEY);
        self.value.read().clone()
    }

    /// Get the current value without establishing a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.value.write();
            *guard = value;
        }
        Runtime::trigger(self.source, VALUE_KEY);
    }

    /// Update the value using a function of the current value.
    ///
    /// The read does not establish a dependency; the write triggers as
    /// usual.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.value.read();
            f(&guard)
        };
        self.set(new_value);
    }

    /// Number of computations currently subscribed to this signal.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.source, VALUE_KEY)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("source", &self.source)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
