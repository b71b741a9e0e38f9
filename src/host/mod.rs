//! The host API surface the relay operates on.
//!
//! The relay never reflects over arbitrary objects: everything it can read,
//! call or subscribe to is registered up front in a [`HostApi`] tree.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `api` | [`HostApi`] root and its builder |
//! | `capability` | Tree nodes: values, namespaces, methods, events |
//! | `event` | [`EventTarget`] and [`Listener`] |
//! | `method` | [`HostMethod`] calling conventions, [`Completion`], [`LastError`] |
//! | `path` | Dot-path resolution |

// ============================================================================
// Submodules
// ============================================================================

/// Host API root and registration.
pub mod api;

/// Tree nodes.
pub mod capability;

/// Host events.
pub mod event;

/// Host methods.
pub mod method;

/// Dot-path resolution.
pub mod path;

// ============================================================================
// Re-exports
// ============================================================================

pub use api::{HostApi, HostApiBuilder};
pub use capability::{Capability, Namespace};
pub use event::{EventTarget, Listener};
pub use method::{Completion, HostMethod, HostResult, LastError};
pub use path::{Target, resolve_path};
