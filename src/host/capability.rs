//! Nodes of the host API tree.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use super::event::EventTarget;
use super::method::HostMethod;

// ============================================================================
// Capability
// ============================================================================

/// A node of the host API.
#[derive(Debug, Clone)]
pub enum Capability {
    /// Plain data, readable as a property.
    Value(Value),
    /// Named children.
    Namespace(Namespace),
    /// Callable member.
    Method(HostMethod),
    /// Event that accepts listeners.
    Event(EventTarget),
}

impl Capability {
    /// Returns the node kind for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Namespace(_) => "namespace",
            Self::Method(_) => "method",
            Self::Event(_) => "event",
        }
    }

    /// Converts the node to JSON for a property read.
    ///
    /// Methods and events have no data representation and read as `null`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Namespace(namespace) => namespace.to_value(),
            Self::Method(_) | Self::Event(_) => Value::Null,
        }
    }

    /// Returns the namespace, if this is one.
    #[inline]
    #[must_use]
    pub fn as_namespace(&self) -> Option<&Namespace> {
        match self {
            Self::Namespace(namespace) => Some(namespace),
            _ => None,
        }
    }

    /// Returns the method, if this is one.
    #[inline]
    #[must_use]
    pub fn as_method(&self) -> Option<&HostMethod> {
        match self {
            Self::Method(method) => Some(method),
            _ => None,
        }
    }

    /// Returns the event, if this is one.
    #[inline]
    #[must_use]
    pub fn as_event(&self) -> Option<&EventTarget> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }
}

// ============================================================================
// Namespace
// ============================================================================

/// An object of the host API with named members.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    members: FxHashMap<String, Capability>,
}

impl Namespace {
    /// Creates an empty namespace.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a member.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.members.get(name)
    }

    /// Returns a member mutably.
    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Capability> {
        self.members.get_mut(name)
    }

    /// Inserts a member, returning the one it replaced.
    #[inline]
    pub fn insert(&mut self, name: impl Into<String>, member: Capability) -> Option<Capability> {
        self.members.insert(name.into(), member)
    }

    /// Returns the namespace member `name`, creating it if absent.
    ///
    /// Fails with the member's kind if it exists but is not a namespace.
    pub(crate) fn namespace_mut(&mut self, name: &str) -> Result<&mut Namespace, &'static str> {
        match self
            .members
            .entry(name.to_string())
            .or_insert_with(|| Capability::Namespace(Namespace::new()))
        {
            Capability::Namespace(ns) => Ok(ns),
            other => Err(other.kind()),
        }
    }

    /// Returns the member names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Returns the number of members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the namespace has no members.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Converts data-bearing members to a JSON object.
    ///
    /// Methods and events are skipped, the way structured cloning drops
    /// functions.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .members
            .iter()
            .filter(|(_, member)| {
                matches!(member, Capability::Value(_) | Capability::Namespace(_))
            })
            .map(|(name, member)| (name.clone(), member.to_value()))
            .collect();
        Value::Object(map)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_namespace_to_value_skips_callables() {
        let mut inner = Namespace::new();
        inner.insert("name", Capability::Value(json!("relay")));

        let mut ns = Namespace::new();
        ns.insert("id", Capability::Value(json!("abc")));
        ns.insert("manifest", Capability::Namespace(inner));
        ns.insert("getURL", Capability::Method(HostMethod::sync(|_| Ok(Value::Null))));
        ns.insert("onMessage", Capability::Event(EventTarget::new()));

        assert_eq!(
            ns.to_value(),
            json!({ "id": "abc", "manifest": { "name": "relay" } })
        );
        assert_eq!(ns.len(), 4);
    }

    #[test]
    fn test_callables_read_as_null() {
        let method = Capability::Method(HostMethod::sync(|_| Ok(Value::Null)));
        assert_eq!(method.to_value(), Value::Null);
        assert_eq!(method.kind(), "method");
        assert!(method.as_method().is_some());
        assert!(method.as_event().is_none());
    }
}
