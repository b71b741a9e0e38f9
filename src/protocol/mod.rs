//! Relay message types.
//!
//! This module defines the JSON messages exchanged between the driver
//! and the relay.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Reply |
//! |---------|-----------|-------|
//! | `BrowserCommand` | Driver → Relay | One [`Response`] |
//! | `BrowserSubscription` | Driver → Relay | None, later [`ListenerEvent`]s |
//! | `BrowserUnsubscription` | Driver → Relay | None |
//! | `BrowserListener` | Relay → Driver | None |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Inbound messages and the discriminant |
//! | `response` | Responses and listener events |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound message types.
pub mod message;

/// Outbound message types.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{
    CommandMessage, InboundMessage, MessageKind, ReturnType, SubscriptionMessage, TYPE_KEY,
    is_relay_message,
};
pub use response::{LISTENER_SOURCE, ListenerEvent, RESPONSE_SOURCE, Response};
