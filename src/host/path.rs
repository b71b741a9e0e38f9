//! Dot-path resolution over the host API tree.
//!
//! `resolve_path(root, "storage.local")` follows each segment in order:
//! namespace members first, then keys and array indices inside plain JSON
//! values. An empty or whitespace-only path yields the root.
//!
//! Only intermediate segments must exist. An absent final segment resolves
//! to [`Target::Missing`], which reads as `null`.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};

use super::capability::Capability;
use super::event::EventTarget;
use super::method::HostMethod;

// ============================================================================
// Target
// ============================================================================

/// The node a path resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// A registered namespace, method or event.
    Node(&'a Capability),
    /// Plain data, possibly nested inside a registered value.
    Value(&'a Value),
    /// An absent final segment under an existing parent.
    Missing,
}

impl<'a> Target<'a> {
    /// Converts the target to JSON for a property read.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Node(node) => node.to_value(),
            Self::Value(value) => (*value).clone(),
            Self::Missing => Value::Null,
        }
    }

    /// Looks up a method member of a namespace target.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&'a HostMethod> {
        match *self {
            Self::Node(Capability::Namespace(ns)) => ns.get(name).and_then(Capability::as_method),
            _ => None,
        }
    }

    /// Returns the event, if the target is one.
    #[must_use]
    pub fn as_event(&self) -> Option<&'a EventTarget> {
        match *self {
            Self::Node(node) => node.as_event(),
            Self::Value(_) | Self::Missing => None,
        }
    }

    /// Returns the node kind for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Node(node) => node.kind(),
            Self::Value(_) => "value",
            Self::Missing => "undefined",
        }
    }

    /// Returns `true` if the path named nothing.
    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Whether a member lookup on this target is defined at all.
    fn has_members(&self) -> bool {
        !matches!(
            self,
            Self::Missing | Self::Value(Value::Null) | Self::Node(Capability::Value(Value::Null))
        )
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves a dot-separated path against `root`.
///
/// # Errors
///
/// Returns [`Error::PathResolution`] naming the first absent intermediate
/// segment, or an absent final segment under a `null` parent.
pub fn resolve_path<'a>(root: &'a Capability, path: &str) -> Result<Target<'a>> {
    if path.trim().is_empty() {
        return Ok(Target::Node(root));
    }

    let mut segments = path.split('.').peekable();
    let mut position = Target::Node(root);

    while let Some(segment) = segments.next() {
        position = match step(position, segment) {
            Some(next) => next,
            None if segments.peek().is_none() && position.has_members() => Target::Missing,
            None => return Err(Error::path_resolution(path, segment)),
        };
    }

    Ok(position)
}

/// Follows one segment.
fn step<'a>(position: Target<'a>, segment: &str) -> Option<Target<'a>> {
    match position {
        Target::Node(Capability::Namespace(ns)) => ns.get(segment).map(|member| match member {
            Capability::Value(value) => Target::Value(value),
            other => Target::Node(other),
        }),
        Target::Node(Capability::Value(value)) => step_value(value, segment).map(Target::Value),
        Target::Value(value) => step_value(value, segment).map(Target::Value),
        Target::Node(_) | Target::Missing => None,
    }
}

/// Follows one segment inside plain JSON.
fn step_value<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::host::Namespace;

    fn sample_root() -> Capability {
        let mut local = Namespace::new();
        local.insert("get", Capability::Method(HostMethod::sync(|_| Ok(json!({})))));
        local.insert("QUOTA_BYTES", Capability::Value(json!(5_242_880)));

        let mut storage = Namespace::new();
        storage.insert("local", Capability::Namespace(local));

        let mut runtime = Namespace::new();
        runtime.insert(
            "manifest",
            Capability::Value(json!({ "name": "relay", "permissions": ["tabs", "storage"] })),
        );
        runtime.insert("onMessage", Capability::Event(EventTarget::new()));

        let mut root = Namespace::new();
        root.insert("storage", Capability::Namespace(storage));
        root.insert("runtime", Capability::Namespace(runtime));
        Capability::Namespace(root)
    }

    #[test]
    fn test_empty_path_returns_root() {
        let root = sample_root();
        for path in ["", "   ", "\t"] {
            let target = resolve_path(&root, path).expect("resolve");
            assert!(matches!(target, Target::Node(node) if std::ptr::eq(node, &root)));
        }
    }

    #[test]
    fn test_nested_namespace() {
        let root = sample_root();
        let target = resolve_path(&root, "storage.local").expect("resolve");
        assert_eq!(target.kind(), "namespace");
        assert!(target.method("get").is_some());
        assert!(target.method("set").is_none());
        assert_eq!(target.to_value(), json!({ "QUOTA_BYTES": 5_242_880 }));
    }

    #[test]
    fn test_walks_into_json_values() {
        let root = sample_root();
        let name = resolve_path(&root, "runtime.manifest.name").expect("resolve");
        assert_eq!(name.to_value(), json!("relay"));

        let permission = resolve_path(&root, "runtime.manifest.permissions.1").expect("resolve");
        assert_eq!(permission.to_value(), json!("storage"));
    }

    #[test]
    fn test_event_target() {
        let root = sample_root();
        let target = resolve_path(&root, "runtime.onMessage").expect("resolve");
        assert!(target.as_event().is_some());
    }

    #[test]
    fn test_missing_segment_names_it() {
        let root = sample_root();
        let err = resolve_path(&root, "bogus.path").expect_err("should fail");
        assert!(matches!(
            err,
            Error::PathResolution { ref path, ref segment } if path == "bogus.path" && segment == "bogus"
        ));

        let err = resolve_path(&root, "storage.sync.get").expect_err("should fail");
        assert!(matches!(err, Error::PathResolution { ref segment, .. } if segment == "sync"));
    }

    #[test]
    fn test_missing_leaf_reads_as_null() {
        let root = sample_root();
        for path in ["runtime.lastError", "runtime.manifest.author", "runtime.manifest.permissions.9"] {
            let target = resolve_path(&root, path).expect("leaf may be absent");
            assert!(target.is_missing(), "{path}");
            assert_eq!(target.to_value(), Value::Null);
            assert!(target.as_event().is_none());
            assert!(target.method("get").is_none());
        }
    }

    #[test]
    fn test_null_parent_cannot_be_indexed() {
        let mut runtime = Namespace::new();
        runtime.insert("lastError", Capability::Value(Value::Null));
        let mut root = Namespace::new();
        root.insert("runtime", Capability::Namespace(runtime));
        let root = Capability::Namespace(root);

        let err = resolve_path(&root, "runtime.lastError.message").expect_err("null parent");
        assert!(matches!(err, Error::PathResolution { ref segment, .. } if segment == "message"));
    }

    #[test]
    fn test_cannot_descend_through_callables() {
        let root = sample_root();
        assert!(resolve_path(&root, "storage.local.get.name").expect("leaf").is_missing());
        assert!(resolve_path(&root, "storage.local.get.name.length").is_err());
        assert!(resolve_path(&root, "runtime.onMessage.addListener.x").is_err());
    }

    #[test]
    fn test_empty_segment_is_missing() {
        let root = sample_root();
        assert!(resolve_path(&root, "storage..local").is_err());
        assert!(resolve_path(&root, "storage.").expect("leaf").is_missing());
    }

    proptest! {
        #[test]
        fn prop_resolves_registered_values(
            segments in prop::collection::vec("[a-z]{1,8}", 1..5),
            leaf in any::<i64>(),
        ) {
            // Build a chain of namespaces ending in a value.
            let mut node = Capability::Value(json!(leaf));
            for segment in segments.iter().rev() {
                let mut ns = Namespace::new();
                ns.insert(segment.clone(), node);
                node = Capability::Namespace(ns);
            }

            let path = segments.join(".");
            let target = resolve_path(&node, &path).expect("registered path resolves");
            prop_assert_eq!(target.to_value(), json!(leaf));
        }

        #[test]
        fn prop_unregistered_first_segment_fails(segment in "[A-Z]{1,8}") {
            let root = sample_root();
            let path = format!("{segment}.anything");
            let err = resolve_path(&root, &path).expect_err("unregistered path");
            prop_assert!(err.is_resolution_error());
        }
    }
}
