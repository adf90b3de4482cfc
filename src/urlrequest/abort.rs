//! Cooperative cancellation.
//!
//! [`AbortController`] owns the right to abort; [`AbortSignal`] is the cheap
//! clonable observer handed to requests. Both wrap a tokio-util
//! `CancellationToken` plus the first abort reason.
//!
//! [`CancellationGate`] sits in front of every engine call:
//! - a signal already fired fails with [`NetError::AlreadyAborted`] and the
//!   engine is never invoked;
//! - a signal firing while the engine is pending drops the engine future and
//!   fails with [`NetError::Aborted`];
//! - once headers arrive the signal is linked to the response body.

use crate::base::neterror::NetError;
use crate::http::HttpResponse;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

pub const DEFAULT_ABORT_REASON: &str = "This operation was aborted";
pub const TIMEOUT_ABORT_REASON: &str = "The operation timed out";

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    reason: OnceLock<String>,
}

/// Observer side of an abort.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    inner: Arc<Inner>,
}

impl AbortSignal {
    fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                token: CancellationToken::new(),
                reason: OnceLock::new(),
            }),
        }
    }

    /// A signal that is already aborted.
    pub fn aborted(reason: impl Into<String>) -> Self {
        let signal = Self::new();
        signal.fire(reason.into());
        signal
    }

    /// A signal that aborts itself after `duration`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn timeout(duration: Duration) -> Self {
        let controller = AbortController::new();
        let signal = controller.signal();
        let watch = signal.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    controller.abort_with(TIMEOUT_ABORT_REASON);
                }
                // Someone else aborted first; nothing left to do.
                _ = watch.cancelled() => {}
            }
        });
        signal
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// The reason the signal fired with, if it has fired.
    pub fn reason(&self) -> Option<String> {
        if self.is_aborted() {
            Some(self.reason_or_default())
        } else {
            None
        }
    }

    /// Resolves once the signal fires.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }

    /// Owned variant of [`cancelled`](Self::cancelled) for storage in
    /// poll-based types.
    pub(crate) fn cancelled_owned(&self) -> WaitForCancellationFutureOwned {
        self.inner.token.clone().cancelled_owned()
    }

    pub(crate) fn reason_or_default(&self) -> String {
        self.inner
            .reason
            .get()
            .cloned()
            .unwrap_or_else(|| DEFAULT_ABORT_REASON.to_string())
    }

    /// Whether both handles observe the same abort.
    pub fn same_as(&self, other: &AbortSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn fire(&self, reason: String) {
        // First reason wins.
        let _ = self.inner.reason.set(reason);
        self.inner.token.cancel();
    }
}

/// Owner side of an abort.
#[derive(Debug, Clone)]
pub struct AbortController {
    signal: AbortSignal,
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortController {
    pub fn new() -> Self {
        Self {
            signal: AbortSignal::new(),
        }
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Abort with the default reason.
    pub fn abort(&self) {
        self.signal.fire(DEFAULT_ABORT_REASON.to_string());
    }

    /// Abort with a caller-provided reason. Later calls are no-ops.
    pub fn abort_with(&self, reason: impl Into<String>) {
        self.signal.fire(reason.into());
    }
}

/// Races engine calls against an optional [`AbortSignal`].
#[derive(Debug, Clone, Default)]
pub struct CancellationGate {
    signal: Option<AbortSignal>,
}

impl CancellationGate {
    pub fn new(signal: Option<AbortSignal>) -> Self {
        Self { signal }
    }

    pub fn signal(&self) -> Option<&AbortSignal> {
        self.signal.as_ref()
    }

    /// Fail with `AlreadyAborted` if the signal has fired.
    pub fn check(&self) -> Result<(), NetError> {
        match &self.signal {
            Some(signal) if signal.is_aborted() => {
                Err(NetError::AlreadyAborted(signal.reason_or_default()))
            }
            _ => Ok(()),
        }
    }

    /// Run `call` unless the signal fires first. The future is only created
    /// after the pre-check passes, so an aborted request never reaches the
    /// engine.
    pub async fn run<F, Fut>(&self, call: F) -> Result<HttpResponse, NetError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HttpResponse, NetError>>,
    {
        self.check()?;

        let Some(signal) = &self.signal else {
            return call().await;
        };

        let mut response = tokio::select! {
            biased;
            _ = signal.cancelled() => {
                tracing::debug!("request aborted while waiting for headers");
                return Err(NetError::Aborted(signal.reason_or_default()));
            }
            result = call() => result?,
        };

        // The engine may have resolved in the same tick the signal fired.
        if signal.is_aborted() {
            response.abort();
            return Err(NetError::Aborted(signal.reason_or_default()));
        }

        response.bind_signal(signal.clone());
        Ok(response)
    }
}
