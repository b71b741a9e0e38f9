//! The host API root and its registration table.
//!
//! The relay can only reach what was registered here. Paths are registered
//! once, up front, through [`HostApiBuilder`]; intermediate namespaces are
//! created on demand.
//!
//! # Example
//!
//! ```
//! use browser_ext_relay::host::{EventTarget, HostApi, HostMethod};
//! use serde_json::json;
//!
//! # fn example() -> browser_ext_relay::Result<()> {
//! let on_updated = EventTarget::new();
//!
//! let api = HostApi::builder()
//!     .value("runtime.id", json!("relay@example"))
//!     .method("storage.local.get", HostMethod::promise(|_| async { Ok(json!({})) }))
//!     .event("tabs.onUpdated", on_updated.clone())
//!     .build()?;
//!
//! assert!(api.event("tabs.onUpdated").is_ok());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::error::{Error, Result};

use super::capability::{Capability, Namespace};
use super::event::EventTarget;
use super::method::{HostMethod, LastError};
use super::path::{Target, resolve_path};

// ============================================================================
// HostApi
// ============================================================================

/// Root of the host API.
#[derive(Debug)]
pub struct HostApi {
    root: Capability,
    last_error: LastError,
}

impl HostApi {
    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> HostApiBuilder {
        HostApiBuilder::new()
    }

    /// Returns the root node.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Capability {
        &self.root
    }

    /// Returns the last-error slot shared with callback-style methods.
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> &LastError {
        &self.last_error
    }

    /// Resolves a dot path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathResolution`] if an intermediate segment is
    /// absent. An absent final segment resolves to [`Target::Missing`].
    #[inline]
    pub fn resolve(&self, path: &str) -> Result<Target<'_>> {
        resolve_path(&self.root, path)
    }

    /// Resolves a dot path that must name an event.
    ///
    /// # Errors
    ///
    /// - [`Error::PathResolution`] if any segment is absent, the last included
    /// - [`Error::NotAnEvent`] if the node is not an event
    pub fn event(&self, path: &str) -> Result<&EventTarget> {
        match self.resolve(path)? {
            Target::Missing => {
                let leaf = path.rsplit('.').next().unwrap_or(path);
                Err(Error::path_resolution(path, leaf))
            }
            target => target.as_event().ok_or_else(|| Error::not_an_event(path)),
        }
    }
}

// ============================================================================
// HostApiBuilder
// ============================================================================

/// Registers the members of a [`HostApi`].
///
/// Registration errors are deferred to [`HostApiBuilder::build`].
#[derive(Debug, Default)]
pub struct HostApiBuilder {
    root: Namespace,
    last_error: LastError,
    error: Option<Error>,
}

impl HostApiBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last-error slot the built API will use.
    ///
    /// Host closures that report failures through the slot capture a clone.
    #[inline]
    #[must_use]
    pub fn last_error_handle(&self) -> LastError {
        self.last_error.clone()
    }

    /// Uses an existing last-error slot.
    #[inline]
    #[must_use]
    pub fn with_last_error(mut self, last_error: LastError) -> Self {
        self.last_error = last_error;
        self
    }

    /// Registers a plain value.
    #[inline]
    #[must_use]
    pub fn value(self, path: &str, value: serde_json::Value) -> Self {
        self.register(path, Capability::Value(value))
    }

    /// Registers a method.
    #[inline]
    #[must_use]
    pub fn method(self, path: &str, method: HostMethod) -> Self {
        self.register(path, Capability::Method(method))
    }

    /// Registers an event.
    #[inline]
    #[must_use]
    pub fn event(self, path: &str, event: EventTarget) -> Self {
        self.register(path, Capability::Event(event))
    }

    /// Registers an empty namespace.
    #[inline]
    #[must_use]
    pub fn namespace(self, path: &str) -> Self {
        self.register(path, Capability::Namespace(Namespace::new()))
    }

    /// Registers any node.
    #[must_use]
    pub fn register(mut self, path: &str, node: Capability) -> Self {
        if self.error.is_none()
            && let Err(e) = insert_at(&mut self.root, path, node)
        {
            self.error = Some(e);
        }
        self
    }

    /// Builds the API.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for the first invalid registration.
    pub fn build(self) -> Result<HostApi> {
        if let Some(e) = self.error {
            return Err(e);
        }

        debug!(members = self.root.len(), "Host API built");

        Ok(HostApi {
            root: Capability::Namespace(self.root),
            last_error: self.last_error,
        })
    }
}

/// Inserts `node` at `path`, creating intermediate namespaces.
fn insert_at(root: &mut Namespace, path: &str, node: Capability) -> Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    if path.trim().is_empty() || segments.iter().any(|s| s.trim().is_empty()) {
        return Err(Error::config(format!("invalid registration path '{path}'")));
    }

    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| Error::config(format!("invalid registration path '{path}'")))?;

    let mut current = root;
    for segment in parents {
        current = current.namespace_mut(segment).map_err(|kind| {
            Error::config(format!("cannot register '{path}': '{segment}' is a {kind}"))
        })?;
    }

    if let Some(previous) = current.insert(*leaf, node) {
        debug!(path, replaced = previous.kind(), "Host API member replaced");
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
