//! State Store
//!
//! The store is a flat, insertion-ordered map from string keys to JSON
//! values. Every access goes through the accessor methods on
//! [`StateStore`]; the first write of a batch captures a [`Snapshot`] of the
//! store as it was before the batch began.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by store access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The store is owned by the renderer and cannot be swapped out.
    #[error("the state store cannot be replaced; update it with set_state")]
    ReplaceRejected,

    /// A partial update built from JSON was not an object.
    #[error("a partial update must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// An immutable shallow copy of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot(Arc<IndexMap<String, Value>>);

impl Snapshot {
    /// A snapshot of a JSON object's entries. Other values give an empty
    /// snapshot.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(Arc::new(map.into_iter().collect())),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The snapshot as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<_, _>>(),
        )
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

/// A batch of entries for [`set_state`](StateStore::set_state).
///
/// An entry holding `None` is undefined and is skipped; every `Some` is
/// written, including `null`, `false`, `0` and `""`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partial(IndexMap<String, Option<Value>>);

impl Partial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a defined entry.
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), Some(value));
        self
    }

    /// Add an undefined entry, which is never written.
    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    /// Build a partial from a JSON object; every entry is defined.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, Some(v))).collect()),
            Value::Null => Err(StoreError::NotAnObject("null")),
            Value::Bool(_) => Err(StoreError::NotAnObject("a boolean")),
            Value::Number(_) => Err(StoreError::NotAnObject("a number")),
            Value::String(_) => Err(StoreError::NotAnObject("a string")),
            Value::Array(_) => Err(StoreError::NotAnObject("an array")),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<Value>)> for Partial {
    fn from_iter<I: IntoIterator<Item = (K, Option<Value>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Partial {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), Some(v))).collect())
    }
}

impl IntoIterator for Partial {
    type Item = (String, Option<Value>);
    type IntoIter = indexmap::map::IntoIter<String, Option<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The renderer's application state.
#[derive(Debug, Default)]
pub struct StateStore {
    entries: IndexMap<String, Value>,
    pending: Option<Snapshot>,
}

impl StateStore {
    pub fn new(initial: IndexMap<String, Value>) -> Self {
        Self {
            entries: initial,
            pending: None,
        }
    }

    pub fn read(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Write one entry, capturing the pre-batch snapshot on the first write.
    pub fn write(&mut self, key: impl Into<String>, value: Value) {
        if self.pending.is_none() {
            self.pending = Some(self.snapshot());
        }
        self.entries.insert(key.into(), value);
    }

    /// Delete an entry. The pending snapshot is left alone.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Write every defined entry of `partial`, in order.
    ///
    /// Returns the number of entries written.
    pub fn set_state(&mut self, partial: Partial) -> usize {
        let mut written = 0;
        for (key, value) in partial {
            if let Some(value) = value {
                self.write(key, value);
                written += 1;
            }
        }
        written
    }

    /// Whole-store replacement is always rejected.
    pub fn replace(&mut self, entries: IndexMap<String, Value>) -> Result<(), StoreError> {
        tracing::error!(
            keys = entries.len(),
            "rejected whole-store replacement; use set_state instead"
        );
        Err(StoreError::ReplaceRejected)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(Arc::new(self.entries.clone()))
    }

    /// The snapshot captured before the current batch, if any.
    pub fn pending_snapshot(&self) -> Option<&Snapshot> {
        self.pending.as_ref()
    }

    pub fn take_snapshot(&mut self) -> Option<Snapshot> {
        self.pending.take()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for StateStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}
