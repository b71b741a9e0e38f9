//! Driver-side WebSocket connection and event loop.
//!
//! A driver process uses [`Connection`] to talk to a relay: it sends
//! commands, awaits their responses, and receives listener events for the
//! subscriptions it installed.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming messages from the relay (responses, listener events)
//! - Outgoing commands and subscription messages
//! - Response correlation by `responseId`
//! - Listener event routing by `listenerId`

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, from_str, to_string};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ListenerId, ResponseId};
use crate::protocol::{CommandMessage, ListenerEvent, Response, SubscriptionMessage};
use crate::relay::RelayOptions;

// ============================================================================
// Constants
// ============================================================================

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 100;

/// Timeout for the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Map of response IDs to response channels.
type CorrelationMap = FxHashMap<ResponseId, oneshot::Sender<Result<Response>>>;

/// Listener event handler.
///
/// Called on the event loop task for each event of its subscription.
pub type ListenerHandler = Arc<dyn Fn(ListenerEvent) + Send + Sync>;

/// Map of listener IDs to their event path and handler.
type SubscriptionMap = FxHashMap<ListenerId, (String, ListenerHandler)>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a command and wait for its response.
    Send {
        response_id: ResponseId,
        message: Value,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Send a message that has no response.
    Post(Value),
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(ResponseId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to a relay.
///
/// Cloning shares the same underlying connection.
///
/// # Example
///
/// ```ignore
/// use browser_ext_relay::{CommandMessage, Connection, ReturnType};
///
/// let connection = Connection::connect("ws://127.0.0.1:9222").await?;
/// let value = connection
///     .command(
///         CommandMessage::new("storage.local")
///             .method("get")
///             .return_type(ReturnType::Promise)
///             .arg(serde_json::json!(["key"])),
///     )
///     .await?;
/// ```
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Active subscriptions (shared with event loop).
    subscriptions: Arc<Mutex<SubscriptionMap>>,
    /// Timeout used by [`Connection::command`].
    request_timeout: Duration,
}

impl Connection {
    /// Connects to a relay at `url` with default options.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake takes longer than 30s
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_options(url, &RelayOptions::new()).await
    }

    /// Connects to a relay at `url`, taking the command timeout from
    /// `options.request_timeout`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::ConnectionTimeout`] if the handshake takes longer than 30s
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn connect_with_options(url: &str, options: &RelayOptions) -> Result<Self> {
        options.validate()?;

        let (ws_stream, _) = timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| Error::connection_timeout(CONNECT_TIMEOUT.as_millis() as u64))??;

        debug!(url, request_timeout = ?options.request_timeout, "Connected to relay");

        Ok(Self::new(ws_stream).with_request_timeout(options.request_timeout))
    }

    /// Creates a connection from an established WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub fn new<S>(ws_stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let subscriptions = Arc::new(Mutex::new(SubscriptionMap::default()));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            Arc::clone(&subscriptions),
        ));

        Self {
            command_tx,
            correlation,
            subscriptions,
            request_timeout: RelayOptions::new().request_timeout,
        }
    }

    /// Sets the timeout used by [`Connection::command`].
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

// ============================================================================
// Commands
// ============================================================================

impl Connection {
    /// Sends a command and waits for its result.
    ///
    /// # Errors
    ///
    /// - [`Error::CommandFailed`] if the relay answered with an error
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if too many requests are pending
    pub async fn command(&self, command: CommandMessage) -> Result<Value> {
        self.command_with_timeout(command, self.request_timeout)
            .await
    }

    /// Sends a command and waits for its result with a custom timeout.
    ///
    /// A command without a `responseId` is given a fresh one.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::command`].
    pub async fn command_with_timeout(
        &self,
        mut command: CommandMessage,
        request_timeout: Duration,
    ) -> Result<Value> {
        let response_id = command
            .response_id
            .get_or_insert_with(ResponseId::generate)
            .clone();

        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let message = command.to_wire()?;
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                response_id: response_id.clone(),
                message,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result?.into_result(),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(response_id.clone()));

                Err(Error::request_timeout(
                    response_id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Returns the number of pending commands.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

impl Connection {
    /// Subscribes `handler` to the event at `property`.
    ///
    /// The relay does not acknowledge subscriptions; a bad path only shows
    /// up in the relay's log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection is closed.
    pub fn subscribe<F>(&self, property: &str, handler: F) -> Result<ListenerId>
    where
        F: Fn(ListenerEvent) + Send + Sync + 'static,
    {
        let listener_id = ListenerId::generate();
        let message = SubscriptionMessage::new(listener_id.clone(), property).to_subscribe_wire()?;

        self.subscriptions.lock().insert(
            listener_id.clone(),
            (property.to_string(), Arc::new(handler)),
        );

        if self.command_tx.send(ConnectionCommand::Post(message)).is_err() {
            self.subscriptions.lock().remove(&listener_id);
            return Err(Error::ConnectionClosed);
        }

        debug!(%listener_id, property, "Subscribed");
        Ok(listener_id)
    }

    /// Removes a subscription. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection is closed.
    pub fn unsubscribe(&self, listener_id: &ListenerId) -> Result<()> {
        let Some((property, _)) = self.subscriptions.lock().remove(listener_id) else {
            return Ok(());
        };

        let message =
            SubscriptionMessage::new(listener_id.clone(), property.as_str()).to_unsubscribe_wire()?;

        self.command_tx
            .send(ConnectionCommand::Post(message))
            .map_err(|_| Error::ConnectionClosed)?;

        debug!(%listener_id, property, "Unsubscribed");
        Ok(())
    }

    /// Returns the number of active subscriptions.
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Shuts down the connection.
    ///
    /// Pending commands fail with [`Error::ConnectionClosed`].
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }
}

// ============================================================================
// Event Loop
// ============================================================================

impl Connection {
    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        subscriptions: Arc<Mutex<SubscriptionMap>>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming messages from the relay
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &correlation, &subscriptions);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by relay");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
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

                // Commands from the driver API
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { response_id, message, response_tx }) => {
                            Self::handle_send_command(
                                response_id,
                                &message,
                                response_tx,
                                &mut ws_write,
                                &correlation,
                            ).await;
                        }

                        Some(ConnectionCommand::Post(message)) => {
                            if let Err(e) = Self::write_json(&mut ws_write, &message).await {
                                warn!(error = %e, "Failed to send subscription message");
                            }
                        }

                        Some(ConnectionCommand::RemoveCorrelation(response_id)) => {
                            correlation.lock().remove(&response_id);
                            debug!(%response_id, "Removed timed-out correlation");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Self::fail_pending_requests(&correlation);

        debug!("Event loop terminated");
    }

    /// Handles an incoming text message from the relay.
    fn handle_incoming_message(
        text: &str,
        correlation: &Mutex<CorrelationMap>,
        subscriptions: &Mutex<SubscriptionMap>,
    ) {
        let value: Value = match from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to parse incoming message");
                return;
            }
        };

        if let Some(event) = ListenerEvent::parse(&value) {
            let handler = subscriptions
                .lock()
                .get(&event.listener_id)
                .map(|(_, handler)| Arc::clone(handler));

            match handler {
                Some(handler) => handler(event),
                None => trace!(listener_id = %event.listener_id, "Event for removed subscription"),
            }
            return;
        }

        match serde_json::from_value::<Response>(value) {
            Ok(response) if response.is_relay_response() => {
                let Some(response_id) = response.response_id.clone() else {
                    warn!("Response without responseId");
                    return;
                };

                match correlation.lock().remove(&response_id) {
                    Some(tx) => {
                        let _ = tx.send(Ok(response));
                    }
                    None => warn!(%response_id, "Response for unknown request"),
                }
            }
            _ => trace!("Ignoring non-relay message"),
        }
    }

    /// Handles a send command from the driver API.
    async fn handle_send_command<S>(
        response_id: ResponseId,
        message: &Value,
        response_tx: oneshot::Sender<Result<Response>>,
        ws_write: &mut SplitSink<WebSocketStream<S>, Message>,
        correlation: &Mutex<CorrelationMap>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // Store correlation before sending
        correlation.lock().insert(response_id.clone(), response_tx);

        if let Err(e) = Self::write_json(ws_write, message).await
            && let Some(tx) = correlation.lock().remove(&response_id)
        {
            let _ = tx.send(Err(e));
            return;
        }

        trace!(%response_id, "Command sent");
    }

    /// Serializes and writes one message.
    async fn write_json<S>(
        ws_write: &mut SplitSink<WebSocketStream<S>, Message>,
        message: &Value,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let json = to_string(message)?;
        ws_write
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| Error::connection(e.to_string()))
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(correlation: &Mutex<CorrelationMap>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
