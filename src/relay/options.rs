//! Relay configuration.
//!
//! Configuration is programmatic; nothing is read from files or the
//! environment.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use browser_ext_relay::RelayOptions;
//!
//! let options = RelayOptions::new()
//!     .with_port(9222)
//!     .with_debug()
//!     .with_message_event("runtime.onMessage")
//!     .with_request_timeout(Duration::from_secs(5));
//!
//! assert!(options.validate().is_ok());
//! assert_eq!(options.socket_addr().port(), 9222);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (localhost).
const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default driver-side command timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// RelayOptions
// ============================================================================

/// Relay and driver connection options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOptions {
    /// Address the relay server binds to.
    pub bind_ip: IpAddr,

    /// Port the relay server binds to (0 = OS-assigned).
    pub port: u16,

    /// Log every command and listener as if its `debug` flag were set.
    pub debug: bool,

    /// Event that also receives every inbound driver message.
    ///
    /// Emulates the host's own message channel, e.g. `runtime.onMessage`.
    pub message_event: Option<String>,

    /// How long the driver waits for a command response.
    ///
    /// Read by [`crate::Connection::connect_with_options`]; the relay side
    /// never times a command out.
    pub request_timeout: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl RelayOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bind_ip: DEFAULT_BIND_IP,
            port: 0,
            debug: false,
            message_event: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl RelayOptions {
    /// Sets the bind address.
    #[inline]
    #[must_use]
    pub fn with_bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    /// Sets the bind port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Forces debug logging for every message.
    #[inline]
    #[must_use]
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Mirrors inbound messages into the event at `path`.
    #[inline]
    #[must_use]
    pub fn with_message_event(mut self, path: impl Into<String>) -> Self {
        self.message_event = Some(path.into());
        self
    }

    /// Sets the driver-side command timeout.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl RelayOptions {
    /// Returns the socket address to bind.
    #[inline]
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the message event path is blank or the
    /// request timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.message_event
            && path.trim().is_empty()
        {
            return Err(Error::config("message event path must not be blank"));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::config("request timeout must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RelayOptions::default();
        assert_eq!(options.bind_ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(options.port, 0);
        assert!(!options.debug);
        assert!(options.message_event.is_none());
        assert_eq!(options.request_timeout, Duration::from_secs(30));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = RelayOptions::new()
            .with_bind_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .with_port(4000)
            .with_debug()
            .with_message_event("runtime.onMessage");

        assert_eq!(options.socket_addr().to_string(), "0.0.0.0:4000");
        assert!(options.debug);
        assert_eq!(options.message_event.as_deref(), Some("runtime.onMessage"));
    }

    #[test]
    fn test_validate_rejects_blank_event() {
        let options = RelayOptions::new().with_message_event("  ");
        assert!(matches!(options.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let options = RelayOptions::new().with_request_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }
}
