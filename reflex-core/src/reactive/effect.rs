//! Effect Implementation
//!
//! An Effect wraps a closure so that every execution re-records which
//! observed values the closure reads, and a later write to any of them
//! re-invokes (or reschedules) the closure.
//!
//! # Run protocol
//!
//! Every run, whether from construction, from a trigger, or from a manual
//! [`Effect::run`] call:
//!
//! 1. Cleanup: the effect unlinks itself from every subscription recorded
//!    by the previous run. This happens before the closure runs, so the
//!    dependency set always reflects only the latest execution: a branch
//!    that stopped reading a key stops being re-run by writes to it.
//!
//! 2. A tracking scope is pushed; reads during the run attribute to this
//!    effect, nested effects included (see `scope.rs`).
//!
//! 3. The closure runs. Its return value is the run's return value.
//!
//! 4. The scope pops, on unwind as well.
//!
//! # Scheduling
//!
//! By default a triggered effect runs synchronously. An effect constructed
//! with a scheduler override is instead handed to the scheduler, which
//! decides if and when to actually run it (for example by pushing it onto
//! a task queue for a later turn).
//! A lazy effect does not run at construction; its owner invokes it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::debug;

use super::runtime::{DepKey, Runtime};
use super::scope::TrackingScope;
use super::subscriber::{Subscriber, SubscriberId};

/// A scheduler override: called with the effect handle instead of running
/// it, whenever the effect's dependencies change.
pub type Scheduler<T> = Arc<dyn Fn(Effect<T>) + Send + Sync>;

/// Construction options for an effect.
#[derive(Clone)]
pub struct EffectOptions<T: 'static> {
    /// Skip the initial run at construction.
    pub lazy: bool,
    /// Invoked by trigger instead of running the effect directly.
    pub scheduler: Option<Scheduler<T>>,
}

impl<T> Default for EffectOptions<T> {
    fn default() -> Self {
        Self {
            lazy: false,
            scheduler: None,
        }
    }
}

impl<T> EffectOptions<T> {
    /// Mark the effect lazy: it will not run until invoked.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Install a scheduler override.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(Effect<T>) + Send + Sync + 'static,
    {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }
}

/// A dependency-tracked computation.
///
/// Cheap to clone; clones share the same computation. Dropping the last
/// handle unregisters the effect and removes its subscriptions.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let effect = {
///     let count = count.clone();
///     Effect::new(move || println!("count is {}", count.get()))
/// };
///
/// count.set(5); // prints: "count is 5"
/// ```
pub struct Effect<T: 'static> {
    inner: Arc<EffectInner<T>>,
}

struct EffectInner<T: 'static> {
    /// The subscriber ID used for dependency tracking.
    id: SubscriberId,

    /// The wrapped closure.
    func: Box<dyn Fn() -> T + Send + Sync>,

    /// Subscriptions recorded by the most recent run. Shared with the
    /// tracking scope so reads land here the moment they happen.
    back_links: Arc<Mutex<IndexSet<DepKey>>>,

    /// Optional scheduler override.
    scheduler: Option<Scheduler<T>>,

    /// A disposed effect ignores triggers and no longer tracks.
    disposed: AtomicBool,

    /// Number of completed runs.
    runs: AtomicUsize,

    /// Handle back to ourselves, for constructing the `Effect` passed to
    /// the scheduler.
    weak_self: Weak<EffectInner<T>>,
}

impl<T: 'static> Effect<T> {
    /// Create an effect and run it once to establish initial dependencies.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_options(func, EffectOptions::default())
    }

    /// Create an effect with explicit options.
    pub fn with_options<F>(func: F, options: EffectOptions<T>) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak| EffectInner {
            id: SubscriberId::new(),
            func: Box::new(func),
            back_links: Arc::new(Mutex::new(IndexSet::new())),
            scheduler: options.scheduler,
            disposed: AtomicBool::new(false),
            runs: AtomicUsize::new(0),
            weak_self: weak.clone(),
        });

        Runtime::register(inner.clone());

        let effect = Self { inner };
        if !options.lazy {
            effect.run();
        }
        effect
    }

    /// Get the effect's subscriber ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Run the computation now, re-recording its dependencies, and return
    /// the closure's value.
    pub fn run(&self) -> T {
        self.inner.execute()
    }

    /// Dispose of the effect.
    ///
    /// The effect is unlinked from everything it reads and stops reacting
    /// to triggers. Invoking a disposed effect still evaluates the closure,
    /// without tracking.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        Runtime::unregister(self.inner.id);
        let links = std::mem::take(&mut *self.inner.back_links.lock());
        Runtime::remove_subscriptions(self.inner.id, links);
        debug!(id = ?self.inner.id, "effect disposed");
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }

    /// Number of (source, key) pairs the most recent run read.
    pub fn dependency_count(&self) -> usize {
        self.inner.back_links.lock().len()
    }
}

impl<T: 'static> EffectInner<T> {
    fn execute(&self) -> T {
        if self.disposed.load(Ordering::SeqCst) {
            return (self.func)();
        }

        // Cleanup before the run, so reads during this run produce a
        // dependency set reflecting only this run.
        let previous = std::mem::take(&mut *self.back_links.lock());
        Runtime::remove_subscriptions(self.id, previous);

        // The guard pops the scope on every exit path, unwind included.
        let _scope = TrackingScope::enter(self.id, Arc::clone(&self.back_links));
        let value = (self.func)();

        self.runs.fetch_add(1, Ordering::SeqCst);
        value
    }
}

impl<T: 'static> Subscriber for EffectInner<T> {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn notify(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        match &self.scheduler {
            Some(scheduler) => {
                let Some(inner) = self.weak_self.upgrade() else {
                    return;
                };
                scheduler(Effect { inner });
            }
            None => {
                self.execute();
            }
        }
    }
}

impl<T: 'static> Drop for EffectInner<T> {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
        let links = std::mem::take(&mut *self.back_links.lock());
        Runtime::remove_subscriptions(self.id, links);
    }
}

impl<T: 'static> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> std::fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
