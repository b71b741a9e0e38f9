//! The relay dispatcher.
//!
//! Routes each inbound message to one of three operations:
//!
//! | Message | Operation | Reply |
//! |---------|-----------|-------|
//! | `BrowserCommand` | [`Relay::execute_command`] | [`Dispatch::Reply`] |
//! | `BrowserSubscription` | [`Relay::add_listener`] | [`Dispatch::Handled`] |
//! | `BrowserUnsubscription` | [`Relay::remove_listener`] | [`Dispatch::Handled`] |
//! | anything else | none | [`Dispatch::Ignored`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::host::{HostApi, Listener};
use crate::identifiers::ResponseId;
use crate::protocol::{
    CommandMessage, InboundMessage, ListenerEvent, MessageKind, Response, ReturnType,
    SubscriptionMessage, TYPE_KEY, is_relay_message,
};
use crate::transport::MessageSink;

use super::options::RelayOptions;
use super::registry::{ListenerRegistry, Registration};

// ============================================================================
// Dispatch
// ============================================================================

/// What the transport should do after handing a message to the relay.
pub enum Dispatch {
    /// Send the response once the future settles.
    Reply(BoxFuture<'static, Response>),
    /// Handled synchronously, no reply.
    Handled,
    /// Not a relay message, no reply.
    Ignored,
}

impl Dispatch {
    /// Returns `true` if a reply will follow asynchronously.
    #[inline]
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Reply(_))
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply(_) => f.write_str("Reply(..)"),
            Self::Handled => f.write_str("Handled"),
            Self::Ignored => f.write_str("Ignored"),
        }
    }
}

// ============================================================================
// Relay
// ============================================================================

/// Relays driver messages to a [`HostApi`].
///
/// The listener registry is injected, so its lifetime is the relay's:
/// [`Relay::clear_listeners`] detaches everything the relay installed.
pub struct Relay {
    api: Arc<HostApi>,
    registry: Arc<ListenerRegistry>,
    sink: Arc<dyn MessageSink>,
    options: RelayOptions,
}

impl Relay {
    /// Creates a relay.
    ///
    /// # Arguments
    ///
    /// * `api` - Host API to operate on
    /// * `registry` - Listener registry owned by this relay
    /// * `sink` - Outward channel for listener events
    /// * `options` - Relay options (only `debug` is read here)
    pub fn new(
        api: Arc<HostApi>,
        registry: Arc<ListenerRegistry>,
        sink: Arc<dyn MessageSink>,
        options: RelayOptions,
    ) -> Self {
        Self {
            api,
            registry,
            sink,
            options,
        }
    }

    /// Returns the host API.
    #[inline]
    #[must_use]
    pub fn api(&self) -> &Arc<HostApi> {
        &self.api
    }

    /// Returns the listener registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    #[inline]
    fn debug_enabled(&self, flag: bool) -> bool {
        flag || self.options.debug
    }
}

// ============================================================================
// Dispatch
// ============================================================================

impl Relay {
    /// Routes one inbound message.
    ///
    /// A malformed command still gets an error reply. Subscription errors
    /// are returned to the caller; no reply is sent for them.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if a subscription message is malformed
    /// - any error from [`Relay::add_listener`] or [`Relay::remove_listener`]
    pub fn dispatch(&self, message: Value) -> Result<Dispatch> {
        let kind = message
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .and_then(MessageKind::from_tag);

        let parsed = match InboundMessage::parse(message.clone()) {
            Ok(parsed) => parsed,
            Err(e) if kind == Some(MessageKind::Command) => {
                let response_id = message
                    .get("responseId")
                    .and_then(|id| serde_json::from_value::<ResponseId>(id.clone()).ok());
                warn!(error = %e, "Malformed command");
                let response = Response::failure(response_id, &Error::protocol(e.to_string()));
                return Ok(Dispatch::Reply(future::ready(response).boxed()));
            }
            Err(e) => return Err(e),
        };

        match parsed {
            InboundMessage::Command(command) => Ok(Dispatch::Reply(self.handle_command(command))),
            InboundMessage::Subscription(subscription) => {
                self.add_listener(&subscription)?;
                Ok(Dispatch::Handled)
            }
            InboundMessage::Unsubscription(subscription) => {
                self.remove_listener(&subscription)?;
                Ok(Dispatch::Handled)
            }
            InboundMessage::Other => {
                trace!("Ignoring non-relay message");
                Ok(Dispatch::Ignored)
            }
        }
    }

    /// Runs a command and packages its outcome as a [`Response`].
    pub fn handle_command(&self, command: CommandMessage) -> BoxFuture<'static, Response> {
        let response_id = command.response_id.clone();
        let call = self.execute_command(&command);
        async move { Response::from_result(response_id, call.await) }.boxed()
    }
}

// ============================================================================
// Commands
// ============================================================================

impl Relay {
    /// Reads a property of, or invokes a method on, the host API.
    ///
    /// The returned future settles exactly once. No timeout is applied.
    pub fn execute_command(&self, command: &CommandMessage) -> BoxFuture<'static, Result<Value>> {
        let debug = self.debug_enabled(command.debug);
        let name = command.target_display();

        if debug {
            info!(command = %name, args = ?command.args, return_type = ?command.return_type, "Calling command");
        }

        let call = self.start_command(command);
        if !debug {
            return call;
        }

        async move {
            let result = call.await;
            match &result {
                Ok(value) => info!(command = %name, response = %value, "Command success"),
                Err(e) => info!(command = %name, error = %e, "Command error"),
            }
            result
        }
        .boxed()
    }

    /// Resolves the target and starts the call.
    fn start_command(&self, command: &CommandMessage) -> BoxFuture<'static, Result<Value>> {
        let target = match self.api.resolve(&command.property) {
            Ok(target) => target,
            Err(e) => return future::ready(Err(e)).boxed(),
        };

        let Some(method_name) = command.method.as_deref() else {
            return future::ready(Ok(target.to_value())).boxed();
        };

        let Some(method) = target.method(method_name) else {
            return future::ready(Err(Error::not_callable(&command.property, method_name))).boxed();
        };

        if let Some(expected) = command.return_type
            && (expected == ReturnType::Callback) != (method.convention() == ReturnType::Callback)
        {
            warn!(
                command = %command.target_display(),
                expected = ?expected,
                actual = ?method.convention(),
                "Calling convention mismatch, using the registered one"
            );
        }

        method.invoke(
            command.args.clone(),
            self.api.last_error(),
            &command.property,
            method_name,
        )
    }
}

// ============================================================================
// Listeners
// ============================================================================

impl Relay {
    /// Installs a forwarding handler on an event.
    ///
    /// Reusing a listener id replaces the previous registration and detaches
    /// its handler.
    ///
    /// # Errors
    ///
    /// - [`Error::PathResolution`] if the path does not resolve
    /// - [`Error::NotAnEvent`] if the node is not an event
    pub fn add_listener(&self, message: &SubscriptionMessage) -> Result<()> {
        let debug = self.debug_enabled(message.debug);
        if debug {
            info!(listener_id = %message.listener_id, property = %message.property, "Adding listener");
        }

        let target = self.api.event(&message.property)?;
        let listener = self.forwarding_listener(message, debug);

        let registration = Registration::new(message.property.clone(), listener.clone());
        if let Some(previous) = self.registry.insert(message.listener_id.clone(), registration) {
            debug!(listener_id = %message.listener_id, "Listener id reused, replacing handler");
            self.detach(&previous);
        }

        target.add_listener(listener);
        Ok(())
    }

    /// Removes the handler registered under the message's listener id.
    ///
    /// An unknown id is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::PathResolution`] if the path does not resolve
    /// - [`Error::NotAnEvent`] if the node is not an event
    pub fn remove_listener(&self, message: &SubscriptionMessage) -> Result<()> {
        if self.debug_enabled(message.debug) {
            info!(listener_id = %message.listener_id, property = %message.property, "Removing listener");
        }

        let target = self.api.event(&message.property)?;

        match self.registry.remove(&message.listener_id) {
            Some(registration) => {
                if !target.remove_listener(&registration.listener) {
                    debug!(
                        listener_id = %message.listener_id,
                        registered_on = %registration.property,
                        "Handler not on requested event, detaching from its own"
                    );
                    self.detach(&registration);
                }
            }
            None => debug!(listener_id = %message.listener_id, "Unknown listener id"),
        }

        Ok(())
    }

    /// Detaches every registered handler and empties the registry.
    ///
    /// Returns the number of registrations removed.
    pub fn clear_listeners(&self) -> usize {
        let drained = self.registry.drain();
        for (_, registration) in &drained {
            self.detach(registration);
        }
        drained.len()
    }

    /// Removes a registration's handler from the event it was installed on.
    fn detach(&self, registration: &Registration) {
        match self.api.event(&registration.property) {
            Ok(target) => {
                target.remove_listener(&registration.listener);
            }
            Err(e) => warn!(error = %e, "Cannot detach listener"),
        }
    }

    /// Builds the handler that forwards event payloads to the driver.
    fn forwarding_listener(&self, message: &SubscriptionMessage, debug: bool) -> Listener {
        let sink = Arc::clone(&self.sink);
        let listener_id = message.listener_id.clone();
        let property = message.property.clone();

        Listener::new(move |payload: Value| {
            // The relay's own traffic must not loop back out.
            if is_relay_message(&payload) {
                trace!(listener_id = %listener_id, "Skipping relay message");
                return;
            }

            if debug {
                info!(listener_id = %listener_id, property = %property, payload = %payload, "Calling listener");
            }

            let event = ListenerEvent::new(listener_id.clone(), property.clone(), debug, payload);
            let sent = serde_json::to_value(&event)
                .map_err(Error::from)
                .and_then(|value| sink.send(value));

            if let Err(e) = sent {
                warn!(listener_id = %listener_id, error = %e, "Failed to forward event");
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::host::{EventTarget, HostMethod};
    use crate::identifiers::ListenerId;
    use crate::protocol::{LISTENER_SOURCE, RESPONSE_SOURCE};

    struct Fixture {
        relay: Relay,
        outbound: mpsc::UnboundedReceiver<Value>,
        on_updated: EventTarget,
        on_message: EventTarget,
    }

    fn fixture() -> Fixture {
        let on_updated = EventTarget::new();
        let on_message = EventTarget::new();

        let builder = HostApi::builder();
        let last_error = builder.last_error_handle();

        let api = builder
            .value("runtime.id", json!("relay@test"))
            .value("runtime.manifest", json!({ "name": "relay", "version": "1.2" }))
            .method(
                "storage.local.get",
                HostMethod::promise(|args| async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    match args.first() {
                        Some(keys) if keys == &json!(["key"]) => Ok(json!({ "key": "value" })),
                        _ => Ok(json!({})),
                    }
                }),
            )
            .method(
                "runtime.getURL",
                HostMethod::sync(|args| match args.first().and_then(Value::as_str) {
                    Some(path) => Ok(json!(format!("moz-extension://abc/{path}"))),
                    None => Err(json!({ "message": "getURL requires a path" })),
                }),
            )
            .method(
                "tabs.get",
                HostMethod::callback(move |args, completion| {
                    let last_error = last_error.clone();
                    tokio::spawn(async move {
                        match args.first().and_then(Value::as_i64) {
                            Some(1) => completion.complete(json!({ "id": 1, "active": true })),
                            Some(id) => {
                                last_error.set(json!({ "message": format!("No tab with id: {id}.") }));
                                completion.complete(Value::Null);
                            }
                            None => completion.fail(json!({ "message": "tabId required" })),
                        }
                    });
                }),
            )
            .event("tabs.onUpdated", on_updated.clone())
            .event("runtime.onMessage", on_message.clone())
            .build()
            .expect("build api");

        let (tx, rx) = mpsc::unbounded_channel();
        let relay = Relay::new(
            Arc::new(api),
            Arc::new(ListenerRegistry::new()),
            Arc::new(tx),
            RelayOptions::new(),
        );

        Fixture {
            relay,
            outbound: rx,
            on_updated,
            on_message,
        }
    }

    async fn reply(relay: &Relay, message: Value) -> Response {
        match relay.dispatch(message).expect("dispatch") {
            Dispatch::Reply(reply) => reply.await,
            other => panic!("expected reply, got {other:?}"),
        }
    }

    fn subscribe(relay: &Relay, id: &str, property: &str) {
        let dispatch = relay
            .dispatch(json!({
                "cypressExtType": "BrowserSubscription",
                "listenerId": id,
                "property": property
            }))
            .expect("subscribe");
        assert!(!dispatch.is_async());
    }

    fn unsubscribe(relay: &Relay, id: &str, property: &str) {
        relay
            .dispatch(json!({
                "cypressExtType": "BrowserUnsubscription",
                "listenerId": id,
                "property": property
            }))
            .expect("unsubscribe");
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_promise_command_scenario() {
        let f = fixture();
        let response = reply(
            &f.relay,
            json!({
                "cypressExtType": "BrowserCommand",
                "property": "storage.local",
                "method": "get",
                "returnType": "promise",
                "args": [["key"]],
                "responseId": "r1"
            }),
        )
        .await;

        assert_eq!(
            serde_json::to_value(&response).expect("serialize"),
            json!({
                "responseId": "r1",
                "source": RESPONSE_SOURCE,
                "response": { "key": "value" }
            })
        );
    }

    #[tokio::test]
    async fn test_bogus_path_scenario() {
        let f = fixture();
        let response = reply(
            &f.relay,
            json!({
                "cypressExtType": "BrowserCommand",
                "property": "bogus.path",
                "responseId": "r2"
            }),
        )
        .await;

        assert_eq!(response.response_id, Some(ResponseId::from("r2")));
        assert!(response.response.is_none());
        let error = response.error.expect("error payload");
        assert_eq!(error["name"], "PathResolutionError");
        assert_eq!(error["message"], "Cannot resolve 'bogus.path': 'bogus' is undefined");
    }

    #[tokio::test]
    async fn test_absent_leaf_reads_successfully() {
        let f = fixture();
        let response = reply(
            &f.relay,
            json!({
                "cypressExtType": "BrowserCommand",
                "property": "runtime.lastError",
                "responseId": "r9"
            }),
        )
        .await;

        assert_eq!(response.response_id, Some(ResponseId::from("r9")));
        assert!(response.error.is_none());
        assert_eq!(response.response, Some(Value::Null));
    }

    #[tokio::test]
    async fn test_property_read() {
        let f = fixture();
        let response = reply(
            &f.relay,
            json!({ "cypressExtType": "BrowserCommand", "property": "runtime.manifest.version", "responseId": 1 }),
        )
        .await;

        assert_eq!(response.response_id, Some(ResponseId::from_int(1)));
        assert_eq!(response.response, Some(json!("1.2")));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_namespace_read_drops_callables() {
        let f = fixture();
        let value = f
            .relay
            .execute_command(&CommandMessage::new("runtime"))
            .await
            .expect("read");

        assert_eq!(
            value,
            json!({ "id": "relay@test", "manifest": { "name": "relay", "version": "1.2" } })
        );
    }

    #[tokio::test]
    async fn test_sync_method() {
        let f = fixture();
        let value = f
            .relay
            .execute_command(&CommandMessage::new("runtime").method("getURL").arg("popup.html"))
            .await
            .expect("call");
        assert_eq!(value, json!("moz-extension://abc/popup.html"));
    }

    #[tokio::test]
    async fn test_throwing_method_yields_error_only() {
        let f = fixture();
        let response = reply(
            &f.relay,
            json!({
                "cypressExtType": "BrowserCommand",
                "property": "runtime",
                "method": "getURL",
                "responseId": "r3"
            }),
        )
        .await;

        assert!(response.response.is_none());
        assert_eq!(response.error, Some(json!({ "message": "getURL requires a path" })));
    }

    #[tokio::test]
    async fn test_callback_method() {
        let f = fixture();
        let ok = f
            .relay
            .execute_command(
                &CommandMessage::new("tabs")
                    .method("get")
                    .return_type(ReturnType::Callback)
                    .arg(1),
            )
            .await
            .expect("call");
        assert_eq!(ok, json!({ "id": 1, "active": true }));

        let err = f
            .relay
            .execute_command(
                &CommandMessage::new("tabs")
                    .method("get")
                    .return_type(ReturnType::Callback)
                    .arg(7),
            )
            .await
            .expect_err("last error");
        assert!(matches!(err, Error::HostApi { .. }));
        assert_eq!(err.to_payload(), json!({ "message": "No tab with id: 7." }));
        assert!(!f.relay.api().last_error().is_set());

        let err = f
            .relay
            .execute_command(&CommandMessage::new("tabs").method("get").return_type(ReturnType::Callback))
            .await
            .expect_err("fail");
        assert_eq!(err.to_payload(), json!({ "message": "tabId required" }));
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_callable() {
        let f = fixture();
        let err = f
            .relay
            .execute_command(&CommandMessage::new("storage.local").method("frobnicate"))
            .await
            .expect_err("not callable");
        assert!(matches!(err, Error::NotCallable { .. }));

        let err = f
            .relay
            .execute_command(&CommandMessage::new("runtime").method("id"))
            .await
            .expect_err("value is not callable");
        assert_eq!(err.to_string(), "runtime.id is not a function");
    }

    #[tokio::test]
    async fn test_convention_mismatch_still_runs() {
        let f = fixture();
        let value = f
            .relay
            .execute_command(
                &CommandMessage::new("storage.local")
                    .method("get")
                    .return_type(ReturnType::Callback)
                    .arg(json!(["key"])),
            )
            .await
            .expect("call");
        assert_eq!(value, json!({ "key": "value" }));
    }

    #[tokio::test]
    async fn test_debug_flag_has_no_behavioral_effect() {
        let f = fixture();
        let plain = f
            .relay
            .execute_command(&CommandMessage::new("runtime.id"))
            .await
            .expect("read");
        let debugged = f
            .relay
            .execute_command(&CommandMessage::new("runtime.id").debug(true))
            .await
            .expect("read");
        assert_eq!(plain, debugged);
    }

    #[tokio::test]
    async fn test_concurrent_commands_complete_out_of_order() {
        let f = fixture();
        let slow = f.relay.handle_command(
            CommandMessage::new("storage.local")
                .method("get")
                .arg(json!(["key"]))
                .response_id("slow"),
        );
        let fast = f
            .relay
            .handle_command(CommandMessage::new("runtime.id").response_id("fast"));

        let fast = fast.await;
        assert_eq!(fast.response_id, Some(ResponseId::from("fast")));

        let slow = slow.await;
        assert_eq!(slow.response_id, Some(ResponseId::from("slow")));
        assert_eq!(slow.response, Some(json!({ "key": "value" })));
    }

    #[tokio::test]
    async fn test_malformed_command_still_replies() {
        let f = fixture();
        let response = reply(
            &f.relay,
            json!({
                "cypressExtType": "BrowserCommand",
                "responseId": "r4",
                "property": "runtime.id",
                "returnType": "eventually"
            }),
        )
        .await;

        assert_eq!(response.response_id, Some(ResponseId::from("r4")));
        assert_eq!(response.error.expect("error")["name"], "ProtocolError");
    }

    #[test]
    fn test_other_messages_are_ignored() {
        let f = fixture();
        for message in [
            json!({ "cypressExtType": "Unknown" }),
            json!({ "cypressExtType": "BrowserListener", "listenerId": "x" }),
            json!({ "greeting": "hello" }),
        ] {
            let dispatch = f.relay.dispatch(message).expect("dispatch");
            assert!(matches!(dispatch, Dispatch::Ignored));
        }
    }

    // ------------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------------

    #[test]
    fn test_subscribe_forwards_then_unsubscribe_stops() {
        let mut f = fixture();
        subscribe(&f.relay, "L", "tabs.onUpdated");

        assert_eq!(f.on_updated.dispatch(json!({ "tabId": 3, "status": "complete" })), 1);
        let event = f.outbound.try_recv().expect("forwarded event");
        assert_eq!(
            event,
            json!({
                "cypressExtType": "BrowserListener",
                "source": LISTENER_SOURCE,
                "listenerId": "L",
                "property": "tabs.onUpdated",
                "debug": false,
                "payload": { "tabId": 3, "status": "complete" }
            })
        );
        assert!(f.outbound.try_recv().is_err(), "exactly one event");

        unsubscribe(&f.relay, "L", "tabs.onUpdated");
        assert_eq!(f.on_updated.dispatch(json!({ "tabId": 3 })), 0);
        assert!(f.outbound.try_recv().is_err());
        assert!(f.relay.registry().is_empty());
    }

    #[test]
    fn test_relay_messages_are_not_reforwarded() {
        let mut f = fixture();
        subscribe(&f.relay, "self", "runtime.onMessage");

        f.on_message.dispatch(json!({
            "cypressExtType": "BrowserListener",
            "source": LISTENER_SOURCE,
            "listenerId": "self",
            "payload": 1
        }));
        f.on_message.dispatch(json!({ "cypressExtType": "BrowserCommand", "property": "" }));
        assert!(f.outbound.try_recv().is_err());

        f.on_message.dispatch(json!({ "greeting": "hi" }));
        let event = f.outbound.try_recv().expect("forwarded");
        assert_eq!(event["payload"], json!({ "greeting": "hi" }));

        f.on_message.dispatch(json!({ "cypressExtType": false, "n": 1 }));
        f.on_message.dispatch(json!({ "cypressExtType": "", "n": 2 }));
        let first = f.outbound.try_recv().expect("falsy discriminant forwarded");
        let second = f.outbound.try_recv().expect("empty discriminant forwarded");
        assert_eq!(first["payload"]["n"], 1);
        assert_eq!(second["payload"]["n"], 2);
    }

    #[test]
    fn test_reused_listener_id_replaces_handler() {
        let mut f = fixture();
        subscribe(&f.relay, "dup", "tabs.onUpdated");
        subscribe(&f.relay, "dup", "tabs.onUpdated");

        assert_eq!(f.on_updated.listener_count(), 1);
        assert_eq!(f.relay.registry().len(), 1);

        f.on_updated.dispatch(json!(1));
        assert!(f.outbound.try_recv().is_ok());
        assert!(f.outbound.try_recv().is_err());
    }

    #[test]
    fn test_unknown_listener_id_is_noop() {
        let f = fixture();
        subscribe(&f.relay, "a", "tabs.onUpdated");
        unsubscribe(&f.relay, "b", "tabs.onUpdated");

        assert_eq!(f.on_updated.listener_count(), 1);
        assert!(f.relay.registry().contains(&ListenerId::from("a")));
    }

    #[test]
    fn test_unsubscribe_from_other_event_still_detaches() {
        let f = fixture();
        subscribe(&f.relay, "a", "tabs.onUpdated");
        unsubscribe(&f.relay, "a", "runtime.onMessage");

        assert_eq!(f.on_updated.listener_count(), 0);
        assert!(f.relay.registry().is_empty());
    }

    #[test]
    fn test_subscription_errors_propagate() {
        let f = fixture();
        let err = f
            .relay
            .dispatch(json!({
                "cypressExtType": "BrowserSubscription",
                "listenerId": "x",
                "property": "tabs.onZoomChange"
            }))
            .expect_err("missing event");
        assert!(matches!(err, Error::PathResolution { .. }));

        let err = f
            .relay
            .dispatch(json!({
                "cypressExtType": "BrowserSubscription",
                "listenerId": "x",
                "property": "runtime.id"
            }))
            .expect_err("not an event");
        assert!(matches!(err, Error::NotAnEvent { .. }));
        assert!(f.relay.registry().is_empty());
    }

    #[test]
    fn test_clear_listeners_detaches_everything() {
        let f = fixture();
        subscribe(&f.relay, "a", "tabs.onUpdated");
        subscribe(&f.relay, "b", "runtime.onMessage");

        assert_eq!(f.relay.clear_listeners(), 2);
        assert!(!f.on_updated.has_listeners());
        assert!(!f.on_message.has_listeners());
    }

    #[test]
    fn test_closed_sink_does_not_panic() {
        let f = fixture();
        subscribe(&f.relay, "a", "tabs.onUpdated");
        drop(f.outbound);

        assert_eq!(f.on_updated.dispatch(json!({ "tabId": 1 })), 1);
    }
}
