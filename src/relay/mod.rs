//! The relay component.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Relay`] dispatcher and [`Dispatch`] outcome |
//! | `options` | [`RelayOptions`] configuration |
//! | `registry` | [`ListenerRegistry`] owned by a relay |

// ============================================================================
// Submodules
// ============================================================================

/// Relay dispatcher.
pub mod core;

/// Relay configuration.
pub mod options;

/// Listener registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Dispatch, Relay};
pub use options::RelayOptions;
pub use registry::{ListenerRegistry, Registration};
