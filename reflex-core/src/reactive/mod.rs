//! Reactive Primitives
//!
//! This module implements the core reactive system: observed state
//! (signals and stores), effects, and memos, tied together by a global
//! runtime that records who-reads-what and re-runs the right computations
//! on writes.
//!
//! # Concepts
//!
//! ## Signals and Stores
//!
//! A Signal is a container for one mutable value; a Store is a record of
//! named attributes, each tracked independently. When either is read
//! within a tracking context (a memo or effect), it automatically
//! registers that context as a dependent. When written, all dependents
//! are notified.
//!
//! ## Effects
//!
//! An Effect is a computation that re-runs whenever its dependencies
//! change. Each run re-records the dependency set from scratch, so a
//! conditional branch that stops reading a value stops depending on it.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result and recomputes
//! lazily, only when a dependency changed since the last read. Memos are
//! themselves observable: effects (and other memos) that read one are
//! re-run when it is invalidated.
//!
//! # Implementation Notes
//!
//! The system uses a thread-local tracking scope to detect dependencies.
//! When an observed value is read, the read is attributed to the innermost
//! running computation, if any.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod effect;
mod memo;
mod runtime;
mod scope;
mod signal;
mod store;
mod subscriber;

pub use effect::{Effect, EffectOptions, Scheduler};
pub use memo::{Memo, MemoState};
pub use runtime::Runtime;
pub use scope::TrackingScope;
pub use signal::Signal;
pub use store::{observe, Store, StoreError};
pub use subscriber::{SourceId, Subscriber, SubscriberId};
