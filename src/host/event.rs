//! Host events.
//!
//! An [`EventTarget`] is the relay's view of an event object such as
//! `tabs.onUpdated`: handlers are added and removed by identity, and the
//! host fires the event with [`EventTarget::dispatch`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;

// ============================================================================
// Listener
// ============================================================================

type ListenerFn = dyn Fn(Value) + Send + Sync;

/// An event handler.
///
/// Cloning yields the same handler; equality is identity.
#[derive(Clone)]
pub struct Listener(Arc<ListenerFn>);

impl Listener {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invokes the handler.
    #[inline]
    pub fn call(&self, payload: Value) {
        (self.0)(payload);
    }

    /// Returns `true` if both handles refer to the same handler.
    #[inline]
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

// ============================================================================
// EventTarget
// ============================================================================

/// An event of the host API.
///
/// Clones share the same handler list, so the host keeps one handle to fire
/// the event while the registered tree keeps another.
#[derive(Clone, Default)]
pub struct EventTarget {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl EventTarget {
    /// Creates an event with no handlers.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler. Adding the same handler twice has no effect.
    ///
    /// Returns `true` if the handler was added.
    pub fn add_listener(&self, listener: Listener) -> bool {
        let mut listeners = self.listeners.lock();
        if listeners.iter().any(|l| l.same(&listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Removes a handler.
    ///
    /// Returns `true` if the handler was installed.
    pub fn remove_listener(&self, listener: &Listener) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !l.same(listener));
        listeners.len() != before
    }

    /// Returns `true` if the handler is installed.
    #[must_use]
    pub fn has_listener(&self, listener: &Listener) -> bool {
        self.listeners.lock().iter().any(|l| l.same(listener))
    }

    /// Returns `true` if any handler is installed.
    #[inline]
    #[must_use]
    pub fn has_listeners(&self) -> bool {
        !self.listeners.lock().is_empty()
    }

    /// Returns the number of installed handlers.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Fires the event, calling every installed handler in order.
    ///
    /// Handlers run outside the lock and may add or remove handlers.
    /// Returns the number of handlers called.
    pub fn dispatch(&self, payload: Value) -> usize {
        let snapshot = self.listeners.lock().clone();
        trace!(count = snapshot.len(), "Dispatching event");

        for listener in &snapshot {
            listener.call(payload.clone());
        }
        snapshot.len()
    }
}

impl fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTarget")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    fn counting_listener(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        Listener::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispatch_reaches_all_listeners() {
        let event = EventTarget::new();
        let counter = Arc::new(AtomicUsize::new(0));

        event.add_listener(counting_listener(&counter));
        event.add_listener(counting_listener(&counter));

        assert_eq!(event.dispatch(json!({ "tabId": 1 })), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_duplicate_add_is_ignored() {
        let event = EventTarget::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let listener = counting_listener(&counter);

        assert!(event.add_listener(listener.clone()));
        assert!(!event.add_listener(listener.clone()));
        assert_eq!(event.listener_count(), 1);
        assert!(event.has_listener(&listener));
    }

    #[test]
    fn test_remove_by_identity() {
        let event = EventTarget::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = counting_listener(&counter);
        let b = counting_listener(&counter);

        event.add_listener(a.clone());
        event.add_listener(b.clone());

        assert!(event.remove_listener(&a));
        assert!(!event.remove_listener(&a));
        assert!(!event.has_listener(&a));
        assert!(event.has_listener(&b));

        event.dispatch(Value::Null);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_listeners() {
        let event = EventTarget::new();
        let handle = event.clone();
        handle.add_listener(Listener::new(|_| {}));

        assert!(event.has_listeners());
        assert_eq!(event.listener_count(), 1);
    }

    #[test]
    fn test_listener_may_remove_itself_during_dispatch() {
        let event = EventTarget::new();
        let slot: Arc<Mutex<Option<Listener>>> = Arc::new(Mutex::new(None));

        let target = event.clone();
        let slot_clone = Arc::clone(&slot);
        let listener = Listener::new(move |_| {
            if let Some(me) = slot_clone.lock().take() {
                target.remove_listener(&me);
            }
        });
        *slot.lock() = Some(listener.clone());
        event.add_listener(listener);

        assert_eq!(event.dispatch(Value::Null), 1);
        assert!(!event.has_listeners());
    }
}
