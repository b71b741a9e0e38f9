//! Relay-side WebSocket server.
//!
//! Drivers connect here. Each connection gets its own [`Relay`] with its
//! own listener registry, whose handlers forward events back over that
//! connection.
//!
//! # Connection Flow
//!
//! 1. Bind to `RelayOptions::socket_addr` (port 0 picks a random port)
//! 2. Driver connects and upgrades to WebSocket
//! 3. Each text frame is parsed and dispatched to the relay
//! 4. Command replies are written as their futures settle
//! 5. On disconnect, the relay detaches every listener it installed

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, from_str, to_string};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::host::{EventTarget, HostApi};
use crate::relay::{Dispatch, ListenerRegistry, Relay, RelayOptions};

// ============================================================================
// RelayServer
// ============================================================================

/// WebSocket server exposing a [`HostApi`] to drivers.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use browser_ext_relay::{HostApi, RelayOptions, RelayServer};
///
/// let api = Arc::new(HostApi::builder().build()?);
/// let server = RelayServer::bind(api, RelayOptions::new()).await?;
/// println!("Relay listening on {}", server.ws_url());
/// server.serve().await?;
/// ```
pub struct RelayServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the server is bound to.
    local_addr: SocketAddr,
    /// Host API shared by every connection.
    api: Arc<HostApi>,
    /// Relay options.
    options: RelayOptions,
}

impl RelayServer {
    /// Binds the server.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Config`] if the options are invalid
    /// - [`crate::Error::Io`] if binding fails
    pub async fn bind(api: Arc<HostApi>, options: RelayOptions) -> Result<Self> {
        options.validate()?;

        let listener = TcpListener::bind(options.socket_addr()).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "Relay server bound");

        Ok(Self {
            listener,
            local_addr,
            api,
            options,
        })
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL for this server.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Accepts drivers until the process ends.
    ///
    /// # Errors
    ///
    /// Currently never fails; accept errors are logged and skipped.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accepts drivers until `shutdown` completes.
    ///
    /// Sessions already running are not interrupted.
    ///
    /// # Errors
    ///
    /// Currently never fails; accept errors are logged and skipped.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(url = %self.ws_url(), "Relay server listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Relay server shutting down");
                    break;
                }

                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!(?addr, "TCP connection accepted");
                            tokio::spawn(Self::serve_stream(
                                stream,
                                Arc::clone(&self.api),
                                self.options.clone(),
                            ));
                        }
                        Err(e) => warn!(error = %e, "Accept failed"),
                    }
                }
            }
        }

        Ok(())
    }

    /// Upgrades a TCP stream and runs a driver session on it.
    async fn serve_stream(stream: TcpStream, api: Arc<HostApi>, options: RelayOptions) {
        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                warn!(error = %e, "WebSocket upgrade failed");
                return;
            }
        };

        info!("Driver connected");
        Self::run_session(ws_stream, api, options).await;
        info!("Driver disconnected");
    }

    /// Session loop for one driver.
    async fn run_session(
        ws_stream: WebSocketStream<TcpStream>,
        api: Arc<HostApi>,
        options: RelayOptions,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Value>();

        let message_event = options
            .message_event
            .as_deref()
            .and_then(|path| match api.event(path) {
                Ok(event) => Some(event.clone()),
                Err(e) => {
                    warn!(path, error = %e, "Message event unavailable");
                    None
                }
            });

        let relay = Relay::new(
            Arc::clone(&api),
            Arc::new(ListenerRegistry::new()),
            Arc::new(outbound_tx.clone()),
            options,
        );

        loop {
            tokio::select! {
                // Frames from the driver
                frame = ws_read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_frame(&text, &relay, message_event.as_ref(), &outbound_tx);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by driver");
                            break;
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Responses and listener events for the driver
                outbound = outbound_rx.recv() => {
                    let Some(message) = outbound else {
                        break;
                    };

                    match to_string(&message) {
                        Ok(json) => {
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                warn!(error = %e, "Failed to send to driver");
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to serialize outbound message"),
                    }
                }
            }
        }

        let removed = relay.clear_listeners();
        debug!(removed, "Session listeners detached");
    }

    /// Handles one text frame from the driver.
    fn handle_frame(
        text: &str,
        relay: &Relay,
        message_event: Option<&EventTarget>,
        outbound: &mpsc::UnboundedSender<Value>,
    ) {
        let message: Value = match from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping unparsable frame");
                return;
            }
        };

        if let Some(event) = message_event {
            event.dispatch(message.clone());
        }

        match relay.dispatch(message) {
            Ok(Dispatch::Reply(reply)) => {
                let outbound = outbound.clone();
                tokio::spawn(async move {
                    let response = reply.await;
                    trace!(response_id = ?response.response_id, "Command settled");

                    match serde_json::to_value(&response) {
                        Ok(value) => {
                            if outbound.send(value).is_err() {
                                debug!("Driver gone before response was sent");
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to serialize response"),
                    }
                });
            }
            Ok(Dispatch::Handled | Dispatch::Ignored) => {}
            Err(e) => warn!(error = %e, "Message handling failed"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
