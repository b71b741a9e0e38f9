//! Browser extension background relay.
//!
//! Lets a test driver outside the extension sandbox call browser-extension
//! APIs and subscribe to their events, by relaying JSON messages between
//! the driver and a host API registered up front.
//!
//! # Architecture
//!
//! The relay follows a client-server model:
//!
//! - **Driver**: Sends commands and subscriptions, receives responses and
//!   listener events
//! - **Relay**: Resolves dot paths against the host API, invokes methods
//!   under their calling convention, forwards event payloads
//!
//! Key design principles:
//!
//! - Every reply carries the command's `responseId`; replies may arrive in
//!   any order
//! - Every message carries a `cypressExtType` discriminant
//! - Messages that are themselves relay messages are never forwarded as
//!   events, so the relay cannot feed itself
//! - Each driver connection owns its listener registry; disconnecting
//!   detaches everything it installed
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use browser_ext_relay::{
//!     CommandMessage, Connection, HostApi, HostMethod, RelayOptions, RelayServer, Result,
//!     ReturnType,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Register what the driver may touch
//!     let api = HostApi::builder()
//!         .method(
//!             "storage.local.get",
//!             HostMethod::promise(|_| async { Ok(json!({ "key": "value" })) }),
//!         )
//!         .build()?;
//!
//!     let server = RelayServer::bind(Arc::new(api), RelayOptions::new()).await?;
//!     let url = server.ws_url();
//!     tokio::spawn(server.serve());
//!
//!     // Drive it
//!     let connection = Connection::connect(&url).await?;
//!     let value = connection
//!         .command(
//!             CommandMessage::new("storage.local")
//!                 .method("get")
//!                 .return_type(ReturnType::Promise)
//!                 .arg(json!(["key"])),
//!         )
//!         .await?;
//!     println!("Stored: {value}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | Host API tree: values, methods, events |
//! | [`identifiers`] | Correlation ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`relay`] | Message dispatch and listener registry |
//! | [`transport`] | WebSocket server and driver connection |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Host API tree.
///
/// Use [`HostApi::builder()`] to register the surface the relay exposes.
pub mod host;

/// Correlation identifiers.
///
/// Newtype wrappers keep response and listener IDs apart.
pub mod identifiers;

/// Wire message types.
pub mod protocol;

/// Message dispatch.
///
/// - [`Relay`] - Handles one driver's messages
/// - [`ListenerRegistry`] - Listeners that relay installed
pub mod relay;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Host types
pub use host::{Completion, EventTarget, HostApi, HostApiBuilder, HostMethod, LastError, Listener};

// Identifier types
pub use identifiers::{ListenerId, ResponseId};

// Protocol types
pub use protocol::{CommandMessage, ListenerEvent, Response, ReturnType, SubscriptionMessage};

// Relay types
pub use relay::{Dispatch, ListenerRegistry, Relay, RelayOptions};

// Transport types
pub use transport::{Connection, MessageSink, RelayServer};
