//! Reflex Core
//!
//! This crate provides the dependency-tracking engine at the core of the
//! Reflex reactive framework. It implements:
//!
//! - Observed state with transparent read/write interception (`Signal`,
//!   `Store`)
//! - Dependency-tracked computations with automatic re-run (`Effect`)
//! - Lazy, cached derived values (`Memo`)
//! - A pluggable scheduling hook for deferring re-runs
//!
//! # Architecture
//!
//! Everything lives in the `reactive` module: reads are attributed to the
//! innermost running computation by a thread-local tracking scope, and a
//! global runtime maps each observed (source, key) pair to the set of
//! computations that read it most recently. Writes look that set up and
//! re-invoke (or hand to a scheduler) each entry.
//!
//! # Example
//!
//! ```rust,ignore
//! use reflex_core::{observe, Effect, Memo};
//!
//! let state = observe([("count", 1)]);
//!
//! // A derived value; the getter runs on first read, then caches
//! let doubled = {
//!     let state = state.clone();
//!     Memo::new(move || state.get("count").unwrap() * 2)
//! };
//! assert_eq!(doubled.get(), 2);
//!
//! // An effect; re-runs whenever a value it read changes
//! let _logger = {
//!     let doubled = doubled.clone();
//!     Effect::new(move || println!("doubled: {}", doubled.get()))
//! };
//!
//! state.set("count", 5).unwrap();
//! // Effect automatically re-runs, prints: "doubled: 10"
//! ```

pub mod reactive;

pub use reactive::{
    observe, Effect, EffectOptions, Memo, MemoState, Runtime, Scheduler, Signal, SourceId, Store,
    StoreError, Subscriber, SubscriberId, TrackingScope,
};
