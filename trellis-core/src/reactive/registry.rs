//! Callback registries.
//!
//! The renderer keeps its side effects and deferred startup callbacks in
//! [`CallbackRegistry`] instances, each entry addressable by a
//! [`CallbackId`] so it can be unregistered later.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a registered callback.
///
/// Generated from an atomic counter, so ids never repeat across registries
/// or threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CallbackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered callbacks with register / unregister / drain.
pub struct CallbackRegistry<T> {
    entries: Vec<(CallbackId, T)>,
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn register(&mut self, callback: T) -> CallbackId {
        let id = CallbackId::new();
        self.entries.push((id, callback));
        id
    }

    /// Remove a callback, returning it if it was still registered.
    pub fn unregister(&mut self, id: CallbackId) -> Option<T> {
        let position = self.entries.iter().position(|(entry, _)| *entry == id)?;
        Some(self.entries.remove(position).1)
    }

    /// Remove and return every callback, in registration order.
    pub fn drain(&mut self) -> Vec<T> {
        self.entries.drain(..).map(|(_, callback)| callback).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, callback)| callback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone> CallbackRegistry<T> {
    /// Copies of every callback, so they can run after a lock is released.
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
