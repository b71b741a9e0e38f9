//! WebSocket transport layer.
//!
//! Carries relay messages between the driver and the relay, one JSON
//! message per text frame.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Driver         │                              │  RelayServer    │
//! │                 │         WebSocket            │                 │
//! │  Connection     │◄────────────────────────────►│  Relay per      │
//! │                 │      localhost:PORT          │  connection     │
//! └─────────────────┘                              └────────┬────────┘
//!                                                           │
//!                                                      ┌────▼────┐
//!                                                      │ HostApi │
//!                                                      └─────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `RelayServer::bind` - Bind to the configured address
//! 2. `RelayServer::serve` - Accept drivers, one relay each
//! 3. `Connection::connect` - Driver connects and sends commands
//! 4. Driver disconnects - the relay detaches its listeners
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Driver-side connection and event loop |
//! | `server` | Relay-side WebSocket server |
//! | `sink` | Outward message channel |

// ============================================================================
// Submodules
// ============================================================================

/// Driver-side WebSocket connection.
pub mod connection;

/// Relay-side WebSocket server.
pub mod server;

/// Outward message channel.
pub mod sink;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ListenerHandler};
pub use server::RelayServer;
pub use sink::MessageSink;
