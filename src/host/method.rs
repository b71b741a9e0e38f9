//! Host methods and their calling conventions.
//!
//! A host API method is registered with the convention it natively uses.
//! All three are adapted into one future at this boundary, so the relay
//! only ever awaits a `BoxFuture<'static, Result<Value>>`.
//!
//! | Convention | Host signature | Failure |
//! |------------|----------------|---------|
//! | [`HostMethod::sync`] | `Fn(args) -> Result<Value, Value>` | `Err` = thrown value |
//! | [`HostMethod::promise`] | `Fn(args) -> impl Future<Output = Result<Value, Value>>` | `Err` = rejection |
//! | [`HostMethod::callback`] | `Fn(args, Completion)` | [`LastError`] set at completion |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::protocol::ReturnType;

// ============================================================================
// Types
// ============================================================================

/// Outcome of a host call: `Ok(value)` or `Err(thrown or rejected value)`.
pub type HostResult = std::result::Result<Value, Value>;

type SyncFn = dyn Fn(Vec<Value>) -> HostResult + Send + Sync;
type PromiseFn = dyn Fn(Vec<Value>) -> BoxFuture<'static, HostResult> + Send + Sync;
type CallbackFn = dyn Fn(Vec<Value>, Completion) + Send + Sync;

// ============================================================================
// LastError
// ============================================================================

/// The host's last-error slot.
///
/// Callback-style methods report failure by setting this slot before
/// completing; the relay takes (and clears) it when the completion fires.
#[derive(Clone, Default)]
pub struct LastError(Arc<Mutex<Option<Value>>>);

impl LastError {
    /// Creates an empty slot.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error.
    #[inline]
    pub fn set(&self, error: impl Into<Value>) {
        *self.0.lock() = Some(error.into());
    }

    /// Removes and returns the recorded error.
    #[inline]
    #[must_use]
    pub fn take(&self) -> Option<Value> {
        self.0.lock().take()
    }

    /// Returns a copy of the recorded error.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        self.0.lock().clone()
    }

    /// Returns `true` if an error is recorded.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.lock().is_some()
    }
}

impl fmt::Debug for LastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LastError").field(&self.get()).finish()
    }
}

// ============================================================================
// Completion
// ============================================================================

/// Completion callback handed to callback-style host methods.
///
/// Consumed on use, so a call settles at most once. Dropping it without
/// calling either method fails the command with
/// [`Error::CompletionDropped`].
pub struct Completion {
    tx: oneshot::Sender<Result<Value>>,
    last_error: LastError,
}

impl Completion {
    /// Completes the call with `value`.
    ///
    /// If the host's last-error slot is set at this point, the call fails
    /// with [`Error::HostApi`] carrying that error instead.
    pub fn complete(self, value: Value) {
        let outcome = match self.last_error.take() {
            Some(error) => Err(Error::host_api(error)),
            None => Ok(value),
        };
        let _ = self.tx.send(outcome);
    }

    /// Sets the last-error slot and completes.
    pub fn fail(self, error: impl Into<Value>) {
        self.last_error.set(error);
        self.complete(Value::Null);
    }

    /// Returns the last-error slot this completion checks.
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> &LastError {
        &self.last_error
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

// ============================================================================
// HostMethod
// ============================================================================

/// A callable member of the host API.
#[derive(Clone)]
pub enum HostMethod {
    /// Returns its value directly.
    Sync(Arc<SyncFn>),
    /// Returns a future.
    Promise(Arc<PromiseFn>),
    /// Reports through a trailing [`Completion`].
    Callback(Arc<CallbackFn>),
}

impl HostMethod {
    /// Wraps a synchronous method.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> HostResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wraps a promise-returning method.
    pub fn promise<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HostResult> + Send + 'static,
    {
        Self::Promise(Arc::new(move |args| f(args).boxed()))
    }

    /// Wraps a callback-style method.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>, Completion) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Returns the native calling convention.
    #[inline]
    #[must_use]
    pub const fn convention(&self) -> ReturnType {
        match self {
            Self::Sync(_) => ReturnType::Sync,
            Self::Promise(_) => ReturnType::Promise,
            Self::Callback(_) => ReturnType::Callback,
        }
    }

    /// Invokes the method and adapts its outcome into a single future.
    ///
    /// `path` and `method` only label a dropped completion.
    pub fn invoke(
        &self,
        args: Vec<Value>,
        last_error: &LastError,
        path: &str,
        method: &str,
    ) -> BoxFuture<'static, Result<Value>> {
        match self {
            Self::Sync(f) => future::ready(f(args).map_err(Error::invocation)).boxed(),

            Self::Promise(f) => f(args).map(|res| res.map_err(Error::promise_rejection)).boxed(),

            Self::Callback(f) => {
                let (tx, rx) = oneshot::channel();
                f(
                    args,
                    Completion {
                        tx,
                        last_error: last_error.clone(),
                    },
                );

                let path = path.to_string();
                let method = method.to_string();
                async move {
                    match rx.await {
                        Ok(result) => result,
                        Err(_) => Err(Error::completion_dropped(path, method)),
                    }
                }
                .boxed()
            }
        }
    }
}

impl fmt::Debug for HostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostMethod").field(&self.convention()).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_sync_method_returns_value() {
        let method = HostMethod::sync(|args| Ok(json!(args.len())));
        let value = assert_ok!(method.invoke(vec![json!(1), json!(2)], &LastError::new(), "x", "y").await);
        assert_eq!(value, json!(2));
        assert_eq!(method.convention(), ReturnType::Sync);
    }

    #[tokio::test]
    async fn test_sync_method_throw_is_invocation_error() {
        let method = HostMethod::sync(|_| Err(json!({ "message": "bad" })));
        let err = assert_err!(method.invoke(vec![], &LastError::new(), "x", "y").await);
        assert!(matches!(err, Error::Invocation { .. }));
        assert_eq!(err.to_payload(), json!({ "message": "bad" }));
    }

    #[tokio::test]
    async fn test_promise_method_awaits() {
        let method = HostMethod::promise(|args| async move {
            tokio::task::yield_now().await;
            Ok(json!({ "echo": args }))
        });
        let value = assert_ok!(method.invoke(vec![json!("a")], &LastError::new(), "x", "y").await);
        assert_eq!(value, json!({ "echo": ["a"] }));
    }

    #[tokio::test]
    async fn test_promise_rejection() {
        let method = HostMethod::promise(|_| async { Err(json!("nope")) });
        let err = assert_err!(method.invoke(vec![], &LastError::new(), "x", "y").await);
        assert!(matches!(err, Error::PromiseRejection { .. }));
    }

    #[tokio::test]
    async fn test_callback_completes_from_another_task() {
        let method = HostMethod::callback(|args, completion| {
            tokio::spawn(async move {
                completion.complete(json!({ "count": args.len() }));
            });
        });
        let value = assert_ok!(method.invoke(vec![json!(1)], &LastError::new(), "x", "y").await);
        assert_eq!(value, json!({ "count": 1 }));
    }

    #[tokio::test]
    async fn test_callback_last_error_wins() {
        let last_error = LastError::new();
        let method = HostMethod::callback(|_, completion| {
            completion.last_error().set(json!({ "message": "No tab with id: 9." }));
            completion.complete(json!("ignored"));
        });

        let err = assert_err!(method.invoke(vec![], &last_error, "tabs", "get").await);
        assert!(matches!(err, Error::HostApi { .. }));
        assert_eq!(err.to_string(), "Host API error: No tab with id: 9.");
        assert!(!last_error.is_set(), "slot is cleared after completion");
    }

    #[tokio::test]
    async fn test_callback_fail_shortcut() {
        let method = HostMethod::callback(|_, completion| completion.fail("denied"));
        let err = assert_err!(method.invoke(vec![], &LastError::new(), "x", "y").await);
        assert_eq!(err.to_payload(), json!("denied"));
    }

    #[tokio::test]
    async fn test_dropped_completion_fails() {
        let method = HostMethod::callback(|_, completion| drop(completion));
        let err = assert_err!(method.invoke(vec![], &LastError::new(), "alarms", "create").await);
        assert_eq!(err.to_string(), "alarms.create dropped its completion callback");
    }
}
