//! Inbound message types.
//!
//! Every message the relay receives is a JSON object tagged by
//! `cypressExtType`. Unknown or missing tags parse to
//! [`InboundMessage::Other`] so the relay can ignore them.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{ListenerId, ResponseId};

// ============================================================================
// Constants
// ============================================================================

/// Discriminant key present on every relay message.
pub const TYPE_KEY: &str = "cypressExtType";

/// Discriminant of a command message.
pub const COMMAND_TYPE: &str = "BrowserCommand";

/// Discriminant of a subscription message.
pub const SUBSCRIPTION_TYPE: &str = "BrowserSubscription";

/// Discriminant of an unsubscription message.
pub const UNSUBSCRIPTION_TYPE: &str = "BrowserUnsubscription";

/// Discriminant of a listener event sent by the relay.
pub const LISTENER_TYPE: &str = "BrowserListener";

// ============================================================================
// MessageKind
// ============================================================================

/// Message discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// `BrowserCommand`.
    Command,
    /// `BrowserSubscription`.
    Subscription,
    /// `BrowserUnsubscription`.
    Unsubscription,
    /// `BrowserListener` (relay output).
    Listener,
}

impl MessageKind {
    /// Parses a discriminant string.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            COMMAND_TYPE => Some(Self::Command),
            SUBSCRIPTION_TYPE => Some(Self::Subscription),
            UNSUBSCRIPTION_TYPE => Some(Self::Unsubscription),
            LISTENER_TYPE => Some(Self::Listener),
            _ => None,
        }
    }

    /// Returns the wire discriminant.
    #[inline]
    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Command => COMMAND_TYPE,
            Self::Subscription => SUBSCRIPTION_TYPE,
            Self::Unsubscription => UNSUBSCRIPTION_TYPE,
            Self::Listener => LISTENER_TYPE,
        }
    }
}

/// Returns `true` if the value is a relay message.
///
/// A message counts when its discriminant is truthy: `null`, `false`, `0`
/// and `""` do not. Used to keep the relay from forwarding its own traffic.
#[inline]
#[must_use]
pub fn is_relay_message(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|map| map.get(TYPE_KEY))
        .is_some_and(is_truthy)
}

/// Truthiness of a discriminant value.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ============================================================================
// ReturnType
// ============================================================================

/// Calling convention the driver expects for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    /// Plain return value.
    #[default]
    Sync,
    /// Returns a promise.
    Promise,
    /// Takes a trailing completion callback.
    Callback,
}

// ============================================================================
// CommandMessage
// ============================================================================

/// Invoke a method on, or read, a node of the host API.
///
/// # Format
///
/// ```json
/// {
///   "cypressExtType": "BrowserCommand",
///   "responseId": "r1",
///   "property": "storage.local",
///   "method": "get",
///   "returnType": "promise",
///   "args": [["key"]],
///   "debug": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMessage {
    /// Correlation id echoed in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<ResponseId>,

    /// Dot path of the target node. Empty means the root.
    #[serde(default, deserialize_with = "null_as_default")]
    pub property: String,

    /// Method to invoke. `None` reads the property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Expected calling convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,

    /// Positional arguments.
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Vec<Value>,

    /// Emit diagnostic log lines for this command.
    #[serde(default, deserialize_with = "null_as_default")]
    pub debug: bool,
}

impl CommandMessage {
    /// Creates a property read of `property` with a fresh response id.
    #[must_use]
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            response_id: Some(ResponseId::generate()),
            property: property.into(),
            method: None,
            return_type: None,
            args: Vec::new(),
            debug: false,
        }
    }

    /// Sets the method to invoke.
    #[inline]
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets the expected calling convention.
    #[inline]
    #[must_use]
    pub fn return_type(mut self, return_type: ReturnType) -> Self {
        self.return_type = Some(return_type);
        self
    }

    /// Appends one argument.
    #[inline]
    #[must_use]
    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replaces the argument list.
    #[inline]
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Enables diagnostic logging on the relay side.
    #[inline]
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets an explicit response id.
    #[inline]
    #[must_use]
    pub fn response_id(mut self, id: impl Into<ResponseId>) -> Self {
        self.response_id = Some(id.into());
        self
    }

    /// Returns `property.method` for log lines.
    #[must_use]
    pub fn target_display(&self) -> String {
        match &self.method {
            Some(method) if self.property.trim().is_empty() => method.clone(),
            Some(method) => format!("{}.{method}", self.property),
            None => self.property.clone(),
        }
    }

    /// Serializes with the discriminant attached.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_wire(&self) -> Result<Value> {
        tagged(self, MessageKind::Command)
    }
}

// ============================================================================
// SubscriptionMessage
// ============================================================================

/// Subscribe to or unsubscribe from an event of the host API.
///
/// Shared by `BrowserSubscription` and `BrowserUnsubscription`.
///
/// # Format
///
/// ```json
/// {
///   "cypressExtType": "BrowserSubscription",
///   "listenerId": "l1",
///   "property": "tabs.onUpdated",
///   "debug": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionMessage {
    /// Registry key of the listener.
    pub listener_id: ListenerId,

    /// Dot path of the event.
    #[serde(default, deserialize_with = "null_as_default")]
    pub property: String,

    /// Emit diagnostic log lines for this listener.
    #[serde(default, deserialize_with = "null_as_default")]
    pub debug: bool,
}

impl SubscriptionMessage {
    /// Creates a subscription message.
    #[inline]
    #[must_use]
    pub fn new(listener_id: ListenerId, property: impl Into<String>) -> Self {
        Self {
            listener_id,
            property: property.into(),
            debug: false,
        }
    }

    /// Enables diagnostic logging on the relay side.
    #[inline]
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Serializes as a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_subscribe_wire(&self) -> Result<Value> {
        tagged(self, MessageKind::Subscription)
    }

    /// Serializes as an unsubscription.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_unsubscribe_wire(&self) -> Result<Value> {
        tagged(self, MessageKind::Unsubscription)
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Invoke or read.
    Command(CommandMessage),
    /// Install a listener.
    Subscription(SubscriptionMessage),
    /// Remove a listener.
    Unsubscription(SubscriptionMessage),
    /// Anything else, including the relay's own listener events.
    Other,
}

impl InboundMessage {
    /// Parses a JSON message by its discriminant.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if a recognized message is malformed.
    pub fn parse(value: Value) -> Result<Self> {
        let kind = value
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .and_then(MessageKind::from_tag);

        Ok(match kind {
            Some(MessageKind::Command) => Self::Command(serde_json::from_value(value)?),
            Some(MessageKind::Subscription) => {
                Self::Subscription(serde_json::from_value(value)?)
            }
            Some(MessageKind::Unsubscription) => {
                Self::Unsubscription(serde_json::from_value(value)?)
            }
            Some(MessageKind::Listener) | None => Self::Other,
        })
    }

    /// Returns the message kind, if recognized.
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Self::Command(_) => Some(MessageKind::Command),
            Self::Subscription(_) => Some(MessageKind::Subscription),
            Self::Unsubscription(_) => Some(MessageKind::Unsubscription),
            Self::Other => None,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Serializes `message` and inserts the discriminant.
fn tagged<T: Serialize>(message: &T, kind: MessageKind) -> Result<Value> {
    let mut value = serde_json::to_value(message)?;
    if let Value::Object(map) = &mut value {
        map.insert(TYPE_KEY.to_string(), Value::from(kind.as_tag()));
    }
    Ok(value)
}

// ============================================================================
// Tests
// ============================================================================
