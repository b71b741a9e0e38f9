//! Outward message channel.
//!
//! The relay sends listener events through a [`MessageSink`]: a
//! fire-and-forget send on the same transport that carries responses.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

// ============================================================================
// MessageSink
// ============================================================================

/// Fire-and-forget outward send.
pub trait MessageSink: Send + Sync {
    /// Queues a message for the driver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the transport is gone.
    fn send(&self, message: Value) -> Result<()>;
}

impl MessageSink for mpsc::UnboundedSender<Value> {
    fn send(&self, message: Value) -> Result<()> {
        mpsc::UnboundedSender::send(self, message).map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_channel_sink_delivers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        MessageSink::send(&tx, json!({ "n": 1 })).expect("send");
        assert_eq!(rx.try_recv().expect("message"), json!({ "n": 1 }));
    }

    #[test]
    fn test_closed_channel_is_connection_closed() {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        drop(rx);
        let err = MessageSink::send(&tx, json!(null)).expect_err("closed");
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
