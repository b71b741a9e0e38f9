//! Type-safe correlation identifiers.
//!
//! Drivers choose their own correlation ids, so both types are opaque:
//! a JSON string or integer is accepted and echoed back in the same form.
//!
//! | Type | Links |
//! |------|-------|
//! | [`ResponseId`] | A command to its single response |
//! | [`ListenerId`] | A subscription to its event stream |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

// ============================================================================
// IdRepr
// ============================================================================

/// Wire representation shared by the id types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdRepr {
    Text(String),
    Int(i64),
}

impl fmt::Display for IdRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for IdRepr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Int(n) => serializer.serialize_i64(*n),
        }
    }
}

impl<'de> Deserialize<'de> for IdRepr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self::Text(s),
            Raw::Int(n) => Self::Int(n),
        })
    }
}

// ============================================================================
// Id Macro
// ============================================================================

macro_rules! correlation_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(IdRepr);

        impl $name {
            /// Generates a fresh random id (UUID v4).
            #[inline]
            #[must_use]
            pub fn generate() -> Self {
                Self(IdRepr::Text(Uuid::new_v4().to_string()))
            }

            /// Creates an id from an integer.
            #[inline]
            #[must_use]
            pub const fn from_int(value: i64) -> Self {
                Self(IdRepr::Int(value))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(IdRepr::Text(value.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(IdRepr::Text(value))
            }
        }
    };
}

correlation_id! {
    /// Correlates a command with its response.
    ResponseId
}

correlation_id! {
    /// Correlates a subscription with the listener events it produces.
    ListenerId
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ResponseId::generate();
        let b = ResponseId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_string_id_echoes_as_string() {
        let id: ListenerId = serde_json::from_value(json!("listener-1")).expect("parse");
        assert_eq!(id, ListenerId::from("listener-1"));
        assert_eq!(serde_json::to_value(&id).expect("serialize"), json!("listener-1"));
    }

    #[test]
    fn test_integer_id_echoes_as_integer() {
        let id: ResponseId = serde_json::from_value(json!(17)).expect("parse");
        assert_eq!(id, ResponseId::from_int(17));
        assert_eq!(serde_json::to_value(&id).expect("serialize"), json!(17));
        assert_eq!(id.to_string(), "17");
    }

    #[test]
    fn test_text_and_int_ids_differ() {
        assert_ne!(ResponseId::from("17"), ResponseId::from_int(17));
    }

    #[test]
    fn test_rejects_non_scalar_id() {
        assert!(serde_json::from_value::<ResponseId>(json!({ "id": 1 })).is_err());
        assert!(serde_json::from_value::<ResponseId>(json!(1.5)).is_err());
    }
}
