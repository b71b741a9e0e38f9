//! Outbound message types.
//!
//! The relay emits two kinds of messages: a [`Response`] per command and a
//! [`ListenerEvent`] per forwarded host event.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{ListenerId, ResponseId};

use super::message::{LISTENER_TYPE, TYPE_KEY};

// ============================================================================
// Constants
// ============================================================================

/// Source tag of command responses.
pub const RESPONSE_SOURCE: &str = "CypressBrowserExtensionBackgroundResponse";

/// Source tag of listener events.
pub const LISTENER_SOURCE: &str = "CypressBrowserExtensionBackgroundListener";

// ============================================================================
// Response
// ============================================================================

/// The answer to a command.
///
/// # Format
///
/// Success:
/// ```json
/// {
///   "responseId": "r1",
///   "source": "CypressBrowserExtensionBackgroundResponse",
///   "response": { "key": "value" }
/// }
/// ```
///
/// Error:
/// ```json
/// {
///   "responseId": "r2",
///   "source": "CypressBrowserExtensionBackgroundResponse",
///   "error": { "name": "PathResolutionError", "message": "..." }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Matches the command's `responseId`.
    #[serde(
        rename = "responseId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_id: Option<ResponseId>,

    /// Origin tag.
    pub source: String,

    /// Result value (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,

    /// Error payload (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Response {
    /// Creates a success response.
    #[must_use]
    pub fn success(response_id: Option<ResponseId>, value: Value) -> Self {
        Self {
            response_id,
            source: RESPONSE_SOURCE.to_string(),
            response: Some(value),
            error: None,
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn failure(response_id: Option<ResponseId>, error: &Error) -> Self {
        Self {
            response_id,
            source: RESPONSE_SOURCE.to_string(),
            response: None,
            error: Some(error.to_payload()),
        }
    }

    /// Creates a response from a command outcome.
    #[must_use]
    pub fn from_result(response_id: Option<ResponseId>, result: Result<Value>) -> Self {
        match result {
            Ok(value) => Self::success(response_id, value),
            Err(e) => Self::failure(response_id, &e),
        }
    }

    /// Returns `true` if this response carries an error.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns `true` if the source tag marks this as a relay response.
    #[inline]
    #[must_use]
    pub fn is_relay_response(&self) -> bool {
        self.source == RESPONSE_SOURCE
    }

    /// Extracts the result value.
    ///
    /// A success whose value serialized as `null` yields [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandFailed`] if the response carries an error.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(payload) => Err(Error::command_failed(payload)),
            None => Ok(self.response.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// ListenerEvent
// ============================================================================

/// A host event forwarded to the driver.
///
/// # Format
///
/// ```json
/// {
///   "cypressExtType": "BrowserListener",
///   "source": "CypressBrowserExtensionBackgroundListener",
///   "listenerId": "l1",
///   "property": "tabs.onUpdated",
///   "debug": false,
///   "payload": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerEvent {
    /// Discriminant (always `BrowserListener`).
    #[serde(rename = "cypressExtType")]
    pub ext_type: String,

    /// Origin tag.
    pub source: String,

    /// Subscription that produced this event.
    pub listener_id: ListenerId,

    /// Event path.
    pub property: String,

    /// Debug flag of the subscription.
    #[serde(default)]
    pub debug: bool,

    /// Raw event payload.
    #[serde(default)]
    pub payload: Value,
}

impl ListenerEvent {
    /// Creates a listener event.
    #[must_use]
    pub fn new(listener_id: ListenerId, property: impl Into<String>, debug: bool, payload: Value) -> Self {
        Self {
            ext_type: LISTENER_TYPE.to_string(),
            source: LISTENER_SOURCE.to_string(),
            listener_id,
            property: property.into(),
            debug,
            payload,
        }
    }

    /// Parses a listener event, returning `None` for any other message.
    #[must_use]
    pub fn parse(value: &Value) -> Option<Self> {
        let tag = value.get(TYPE_KEY).and_then(Value::as_str)?;
        if tag != LISTENER_TYPE {
            return None;
        }
        Self::deserialize(value).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
