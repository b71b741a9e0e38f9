//! Error types for the relay.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use browser_ext_relay::{CommandMessage, Result};
//!
//! async fn example(connection: &Connection) -> Result<()> {
//!     let tabs = connection
//!         .command(CommandMessage::new("tabs").method("query"))
//!         .await?;
//!     println!("{tabs}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Resolution | [`Error::PathResolution`], [`Error::NotCallable`], [`Error::NotAnEvent`] |
//! | Host | [`Error::Invocation`], [`Error::PromiseRejection`], [`Error::HostApi`], [`Error::CompletionDropped`] |
//! | Protocol | [`Error::Protocol`], [`Error::CommandFailed`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! # Wire Payloads
//!
//! Errors raised on the command path travel back to the driver inside the
//! `error` field of a response. [`Error::to_payload`] produces that JSON:
//! host-originated errors pass their payload through untouched, relay-originated
//! errors are described as `{"name": ..., "message": ...}`.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use serde_json::{Value, json};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ResponseId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when relay options or host API registration are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// A property path segment is absent on the host API.
    #[error("Cannot resolve '{path}': '{segment}' is undefined")]
    PathResolution {
        /// Full property path being resolved.
        path: String,
        /// First segment that could not be found.
        segment: String,
    },

    /// The named member is missing or is not a method.
    #[error("{path}.{method} is not a function")]
    NotCallable {
        /// Property path of the owning namespace.
        path: String,
        /// Requested method name.
        method: String,
    },

    /// The resolved node does not accept listeners.
    #[error("{path} is not an event target")]
    NotAnEvent {
        /// Property path that was resolved.
        path: String,
    },

    // ========================================================================
    // Host Errors
    // ========================================================================
    /// A synchronous host method threw.
    #[error("Invocation error: {}", describe(.payload))]
    Invocation {
        /// Value thrown by the host method.
        payload: Value,
    },

    /// A promise-returning host method rejected.
    #[error("Promise rejected: {}", describe(.payload))]
    PromiseRejection {
        /// Rejection reason.
        payload: Value,
    },

    /// The host reported a last-error condition during a callback-style call.
    #[error("Host API error: {}", describe(.payload))]
    HostApi {
        /// Last-error payload reported by the host.
        payload: Value,
    },

    /// A callback-style host method dropped its completion without calling it.
    #[error("{path}.{method} dropped its completion callback")]
    CompletionDropped {
        /// Property path of the owning namespace.
        path: String,
        /// Method that was invoked.
        method: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or malformed message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The relay answered a command with an error payload.
    ///
    /// Driver-side view of any command-path error.
    #[error("Command failed: {}", describe(.payload))]
    CommandFailed {
        /// Error payload from the response.
        payload: Value,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Timed out while establishing a connection.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection or outbound channel closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Command response did not arrive in time.
    #[error("Request {response_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Correlation id of the request that timed out.
        response_id: ResponseId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a path resolution error.
    #[inline]
    pub fn path_resolution(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.into(),
            segment: segment.into(),
        }
    }

    /// Creates a not-callable error.
    #[inline]
    pub fn not_callable(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self::NotCallable {
            path: path.into(),
            method: method.into(),
        }
    }

    /// Creates a not-an-event error.
    #[inline]
    pub fn not_an_event(path: impl Into<String>) -> Self {
        Self::NotAnEvent { path: path.into() }
    }

    /// Creates an invocation error from a thrown value.
    #[inline]
    pub fn invocation(payload: impl Into<Value>) -> Self {
        Self::Invocation {
            payload: payload.into(),
        }
    }

    /// Creates a promise rejection error.
    #[inline]
    pub fn promise_rejection(payload: impl Into<Value>) -> Self {
        Self::PromiseRejection {
            payload: payload.into(),
        }
    }

    /// Creates a host API (last-error) error.
    #[inline]
    pub fn host_api(payload: impl Into<Value>) -> Self {
        Self::HostApi {
            payload: payload.into(),
        }
    }

    /// Creates a completion dropped error.
    #[inline]
    pub fn completion_dropped(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self::CompletionDropped {
            path: path.into(),
            method: method.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a command failed error.
    #[inline]
    pub fn command_failed(payload: Value) -> Self {
        Self::CommandFailed { payload }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(response_id: ResponseId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            response_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if a property path or member could not be resolved.
    #[inline]
    #[must_use]
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::PathResolution { .. } | Self::NotCallable { .. } | Self::NotAnEvent { .. }
        )
    }

    /// Returns `true` if the error originated in the host API.
    #[inline]
    #[must_use]
    pub fn is_host_error(&self) -> bool {
        matches!(
            self,
            Self::Invocation { .. }
                | Self::PromiseRejection { .. }
                | Self::HostApi { .. }
                | Self::CompletionDropped { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Wire Conversion
// ============================================================================

impl Error {
    /// Short name of the variant, used in wire payloads.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigError",
            Self::PathResolution { .. } => "PathResolutionError",
            Self::NotCallable { .. } | Self::Invocation { .. } => "InvocationError",
            Self::NotAnEvent { .. } => "TypeError",
            Self::PromiseRejection { .. } => "PromiseRejection",
            Self::HostApi { .. } => "HostAPIError",
            Self::CompletionDropped { .. } => "CompletionDropped",
            Self::Protocol { .. } | Self::CommandFailed { .. } => "ProtocolError",
            Self::Connection { .. }
            | Self::ConnectionTimeout { .. }
            | Self::ConnectionClosed
            | Self::RequestTimeout { .. }
            | Self::WebSocket(_) => "ConnectionError",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
        }
    }

    /// Converts the error into the JSON carried by a response's `error` field.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Invocation { payload }
            | Self::PromiseRejection { payload }
            | Self::HostApi { payload }
            | Self::CommandFailed { payload } => payload.clone(),
            other => json!({
                "name": other.name(),
                "message": other.to_string(),
            }),
        }
    }
}

/// Renders an error payload for display.
///
/// Uses the payload's `message` field when present, the string itself for
/// string payloads, and compact JSON otherwise.
fn describe(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => payload.to_string(),
        },
        other => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
