//! Observed Store
//!
//! A Store is a record of named attributes whose reads and writes route
//! through the runtime, each key tracked independently: a computation that
//! reads `"count"` is not re-run by a write to `"label"`.
//!
//! The attribute set is fixed when the store is created; reading or
//! writing a key that was not part of the initial record is an error, not
//! a lazily-created attribute.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use thiserror::Error;

use super::runtime::Runtime;
use super::subscriber::SourceId;

/// Errors from store attribute access.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key was not part of the record the store was created with.
    #[error("unknown attribute `{key}`")]
    UnknownKey { key: String },
}

/// Wrap a record so attribute reads and writes become observable.
///
/// # Example
///
/// ```rust,ignore
/// let state = observe([("count", 1), ("total", 0)]);
///
/// let count = state.get("count")?; // tracked read
/// state.set("count", count + 1)?;  // triggering write
/// ```
pub fn observe<K, V, I>(initial: I) -> Store<V>
where
    K: Into<String>,
    V: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = (K, V)>,
{
    Store::new(initial)
}

/// A keyed observed record.
///
/// Cheap to clone; clones share the same record and identity.
pub struct Store<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Identity in the subscription store.
    source: SourceId,

    /// The attribute values, keyed by name.
    values: Arc<RwLock<IndexMap<String, V>>>,
}

impl<V> Store<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store from an initial record. The keys given here are the
    /// store's complete attribute set.
    pub fn new<K, I>(initial: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let values = initial.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            source: SourceId::new(),
            values: Arc::new(RwLock::new(values)),
        }
    }

    /// Get the store's source ID.
    pub fn id(&self) -> SourceId {
        self.source
    }

    /// Read an attribute.
    ///
    /// If a computation is running, it becomes subscribed to this key.
    pub fn get(&self, key: &str) -> Result<V, StoreError> {
        let value = {
            let values = self.values.read();
            values.get(key).cloned().ok_or_else(|| StoreError::UnknownKey {
                key: key.to_string(),
            })?
        };
        Runtime::track(self.source, key);
        Ok(value)
    }

    /// Read an attribute without establishing a dependency.
    pub fn get_untracked(&self, key: &str) -> Result<V, StoreError> {
        self.values
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::UnknownKey {
                key: key.to_string(),
            })
    }

    /// Write an attribute and notify the computations subscribed to it.
    pub fn set(&self, key: &str, value: V) -> Result<(), StoreError> {
        {
            let mut values = self.values.write();
            let slot = values.get_mut(key).ok_or_else(|| StoreError::UnknownKey {
                key: key.to_string(),
            })?;
            *slot = value;
        }
        Runtime::trigger(self.source, key);
        Ok(())
    }

    /// Update an attribute using a function of its current value.
    ///
    /// The read does not establish a dependency; the write triggers as
    /// usual.
    pub fn update<F>(&self, key: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&V) -> V,
    {
        let new_value = {
            let values = self.values.read();
            let current = values.get(key).ok_or_else(|| StoreError::UnknownKey {
                key: key.to_string(),
            })?;
            f(current)
        };
        self.set(key, new_value)
    }

    /// Check whether the store carries an attribute.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Number of computations currently subscribed to a key.
    pub fn subscriber_count(&self, key: &str) -> usize {
        Runtime::subscriber_count(self.source, key)
    }
}

impl<V> Clone for Store<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            values: Arc::clone(&self.values),
        }
    }
}

impl<V> std::fmt::Debug for Store<V>
where
    V: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("source", &self.source)
            .field("values", &*self.values.read())
            .finish()
    }
}
