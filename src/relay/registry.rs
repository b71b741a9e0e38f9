//! Listener registry.
//!
//! Maps a driver-chosen [`ListenerId`] to the handler the relay installed
//! for it. Owned by one relay instance and injected at construction.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::host::Listener;
use crate::identifiers::ListenerId;

// ============================================================================
// Registration
// ============================================================================

/// An installed forwarding handler.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Event path the handler was installed on.
    pub property: String,
    /// The handler itself.
    pub listener: Listener,
}

impl Registration {
    /// Creates a registration.
    #[inline]
    #[must_use]
    pub fn new(property: impl Into<String>, listener: Listener) -> Self {
        Self {
            property: property.into(),
            listener,
        }
    }
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// In-memory map from listener id to registration.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    entries: Mutex<FxHashMap<ListenerId, Registration>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a registration, returning the one it replaced.
    pub fn insert(&self, id: ListenerId, registration: Registration) -> Option<Registration> {
        self.entries.lock().insert(id, registration)
    }

    /// Removes a registration.
    pub fn remove(&self, id: &ListenerId) -> Option<Registration> {
        self.entries.lock().remove(id)
    }

    /// Returns a copy of a registration.
    #[must_use]
    pub fn get(&self, id: &ListenerId) -> Option<Registration> {
        self.entries.lock().get(id).cloned()
    }

    /// Returns `true` if the id is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ListenerId) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Returns the number of registrations.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes and returns every registration.
    pub fn drain(&self) -> Vec<(ListenerId, Registration)> {
        self.entries.lock().drain().collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites_silently() {
        let registry = ListenerRegistry::new();
        let first = Listener::new(|_| {});
        let second = Listener::new(|_| {});
        let id = ListenerId::from("l1");

        assert!(registry.insert(id.clone(), Registration::new("a.onX", first.clone())).is_none());
        let replaced = registry
            .insert(id.clone(), Registration::new("a.onX", second.clone()))
            .expect("previous entry");

        assert!(replaced.listener.same(&first));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&id).expect("entry").listener.same(&second));
    }

    #[test]
    fn test_remove_and_drain() {
        let registry = ListenerRegistry::new();
        registry.insert(ListenerId::from("a"), Registration::new("x.onA", Listener::new(|_| {})));
        registry.insert(ListenerId::from("b"), Registration::new("x.onB", Listener::new(|_| {})));

        assert!(registry.remove(&ListenerId::from("a")).is_some());
        assert!(registry.remove(&ListenerId::from("a")).is_none());
        assert!(registry.contains(&ListenerId::from("b")));

        let drained = registry.drain();
        assert_eq!(drained.len(), 1);
        assert!(registry.is_empty());
    }
}
