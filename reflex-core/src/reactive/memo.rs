//! Memo Implementation
//!
//! A Memo is a cached derived value that recomputes lazily, and only when
//! stale.
//!
//! # How Memos Work
//!
//! 1. The getter does not run at construction. The first read computes and
//!    caches the result.
//!
//! 2. While the getter runs, its reads are tracked like any effect's, so
//!    the memo subscribes to everything the getter depends on.
//!
//! 3. When a dependency is written, the memo does not recompute. Its
//!    scheduler override flips the dirty flag and, if the flag was
//!    previously clean, triggers the memo's own subscribers, so
//!    invalidation propagates through chains of derived values.
//!
//! 4. The next read recomputes, clears the flag, and re-caches.
//!
//! A memo is itself an observed source: computations that read it
//! subscribe to it and are re-run when it is invalidated, exactly as if
//! they had read a signal.
//!
//! # State machine
//!
//! Two states, starting dirty so the first read computes:
//!
//! - dirty -> clean on getter evaluation;
//! - clean -> dirty on a write to any dependency of the getter. Only this
//!   edge notifies the memo's subscribers; repeated invalidations while
//!   already dirty stay silent, so a burst of writes costs one cascade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::effect::{Effect, EffectOptions};
use super::runtime::{Runtime, VALUE_KEY};
use super::subscriber::SourceId;

/// Cache state of a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is safe to return without recomputation.
    Clean,

    /// A dependency was written; the next read recomputes.
    Dirty,
}

/// A lazily-evaluated, cached derived value.
///
/// Cheap to clone; clones share the same cache and dirty state.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(1);
///
/// let doubled = {
///     let count = count.clone();
///     Memo::new(move || count.get() * 2)
/// };
///
/// assert_eq!(doubled.get(), 2); // getter runs here, not earlier
/// count.set(5);
/// assert_eq!(doubled.get(), 10); // recomputes exactly once
/// ```
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
}

struct MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The memo's identity as an observed source; readers subscribe to
    /// (source, "value").
    source: SourceId,

    /// The wrapped getter, lazy, with the invalidation scheduler.
    effect: Effect<T>,

    /// The cached result of the most recent evaluation.
    value: Mutex<Option<T>>,

    /// True when the cache is stale. Starts true.
    dirty: AtomicBool,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a memo from a getter. The getter is not invoked until the
    /// first [`Memo::get`].
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let source = SourceId::new();

        let inner = Arc::new_cyclic(|weak: &std::sync::Weak<MemoInner<T>>| {
            let weak = weak.clone();
            let options = EffectOptions::default().lazy().scheduler(move |_effect| {
                if let Some(memo) = weak.upgrade() {
                    memo.invalidate();
                }
            });

            MemoInner {
                source,
                effect: Effect::with_options(getter, options),
                value: Mutex::new(None),
                dirty: AtomicBool::new(true),
            }
        });

        Self { inner }
    }

    /// Get the memo's value, recomputing if stale.
    ///
    /// Reading a memo inside a running computation subscribes that
    /// computation to the memo's future invalidations.
    pub fn get(&self) -> T {
        let value = {
            let mut cache = self.inner.value.lock();
            if self.inner.dirty.load(Ordering::SeqCst) {
                *cache = Some(self.inner.effect.run());
                self.inner.dirty.store(false, Ordering::SeqCst);
            }
            cache
                .get_or_insert_with(|| self.inner.effect.run())
                .clone()
        };

        Runtime::track(self.inner.source, VALUE_KEY);
        value
    }

    /// Get the memo's source ID.
    pub fn source(&self) -> SourceId {
        self.inner.source
    }

    /// Current cache state.
    pub fn state(&self) -> MemoState {
        if self.inner.dirty.load(Ordering::SeqCst) {
            MemoState::Dirty
        } else {
            MemoState::Clean
        }
    }

    /// Check if the memo has ever been evaluated.
    pub fn has_value(&self) -> bool {
        self.inner.value.lock().is_some()
    }

    /// Number of computations currently subscribed to this memo.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.source, VALUE_KEY)
    }
}

impl<T> MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Clean -> dirty transition. Notifies the memo's own subscribers, but
    /// only on the edge: invalidating an already-dirty memo stays silent.
    fn invalidate(&self) {
        if !self.dirty.swap(true, Ordering::SeqCst) {
            debug!(source = ?self.source, "memo invalidated");
            Runtime::trigger(self.source, VALUE_KEY);
        }
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("source", &self.inner.source)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
