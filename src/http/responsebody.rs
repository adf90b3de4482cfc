//! Response body streaming.
//! Mirrors Chromium's HttpStream::ReadResponseBody.
//!
//! A body is a single-pass stream of chunks. It may be linked to abort
//! signals; once one fires, the pending read fails with
//! [`NetError::Aborted`] and the engine stream is dropped. Bytes already
//! handed out are unaffected.

use crate::base::neterror::NetError;
use crate::urlrequest::abort::AbortSignal;
use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::sync::WaitForCancellationFutureOwned;

/// Snapshot of a download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    /// Bytes received so far.
    pub transferred: u64,
    /// Declared length, or 0 when unknown.
    pub total: u64,
    /// `transferred / total * 100`, or 0 when the total is unknown.
    pub percent: f64,
}

/// Shared counter observing a body while it is read.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    transferred: Arc<AtomicU64>,
    total: Option<u64>,
}

impl ProgressTracker {
    pub fn snapshot(&self) -> DownloadProgress {
        let transferred = self.transferred.load(Ordering::Relaxed);
        let total = self.total.unwrap_or(0);
        let percent = if total > 0 {
            (transferred as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        DownloadProgress {
            transferred,
            total,
            percent,
        }
    }
}

struct LinkedSignal {
    signal: AbortSignal,
    wait: Pin<Box<WaitForCancellationFutureOwned>>,
}

/// Response body wrapper for streaming.
pub struct ResponseBody {
    inner: Option<BoxStream<'static, Result<Bytes, NetError>>>,
    signals: Vec<LinkedSignal>,
    transferred: Arc<AtomicU64>,
    total: Option<u64>,
    pending: Option<NetError>,
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody")
            .field("open", &self.inner.is_some())
            .field("signals", &self.signals.len())
            .field("transferred", &self.transferred.load(Ordering::Relaxed))
            .field("total", &self.total)
            .finish()
    }
}

impl ResponseBody {
    /// Wrap an engine stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, NetError>> + Send + 'static,
    {
        Self {
            inner: Some(stream.boxed()),
            signals: Vec::new(),
            transferred: Arc::new(AtomicU64::new(0)),
            total: None,
            pending: None,
        }
    }

    /// A body with a single fully-buffered chunk.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        let chunks = if bytes.is_empty() {
            Vec::new()
        } else {
            vec![Ok(bytes)]
        };
        Self::from_stream(futures::stream::iter(chunks)).with_total(Some(len))
    }

    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// Declare the expected length (usually from Content-Length).
    pub fn with_total(mut self, total: Option<u64>) -> Self {
        self.total = total;
        self
    }

    /// Terminate pending and future reads with `Aborted` once `signal` fires.
    pub fn link(&mut self, signal: AbortSignal) {
        if self.signals.iter().any(|s| s.signal.same_as(&signal)) {
            return;
        }
        let wait = Box::pin(signal.cancelled_owned());
        self.signals.push(LinkedSignal { signal, wait });
    }

    /// Drop the engine stream. Later reads yield `None`.
    pub fn close(&mut self) {
        self.inner = None;
    }

    /// Drop the engine stream; the next read fails with `Aborted(reason)`.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.inner.take().is_some() {
            self.pending = Some(NetError::Aborted(reason.into()));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn progress(&self) -> ProgressTracker {
        ProgressTracker {
            transferred: self.transferred.clone(),
            total: self.total,
        }
    }

    /// Read entire body as bytes.
    pub async fn bytes(mut self) -> Result<Bytes, NetError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Read body as UTF-8 string.
    pub async fn text(self) -> Result<String, NetError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| NetError::InvalidUtf8)
    }

    /// Read body as JSON, deserializing to type T.
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, NetError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|_| NetError::JsonParseError)
    }
}

impl Stream for ResponseBody {
    type Item = Result<Bytes, NetError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(err) = this.pending.take() {
            return Poll::Ready(Some(Err(err)));
        }

        if this.inner.is_none() {
            return Poll::Ready(None);
        }

        for linked in &mut this.signals {
            if linked.wait.as_mut().poll(cx).is_ready() {
                this.inner = None;
                let reason = linked.signal.reason_or_default();
                return Poll::Ready(Some(Err(NetError::Aborted(reason))));
            }
        }

        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.transferred
                    .fetch_add(chunk.len() as u64, Ordering::Relaxed);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.inner = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::urlrequest::abort::AbortController;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bytes_and_text() {
        let body = ResponseBody::from_bytes("hello");
        assert_eq!(body.text().await.unwrap(), "hello");

        let body = ResponseBody::from_bytes(vec![0xffu8, 0xfe]);
        assert_eq!(body.text().await, Err(NetError::InvalidUtf8));
    }

    #[tokio::test]
    async fn test_json() {
        let body = ResponseBody::from_bytes(r#"{"ok":true}"#);
        let v: serde_json::Value = body.json().await.unwrap();
        assert_eq!(v["ok"], true);

        let body = ResponseBody::from_bytes("not json");
        assert_eq!(
            body.json::<serde_json::Value>().await.unwrap_err(),
            NetError::JsonParseError
        );
    }

    #[tokio::test]
    async fn test_abort_after_first_chunk() {
        let controller = AbortController::new();
        let (tx, rx) = futures::channel::mpsc::unbounded::<Result<Bytes, NetError>>();
        let mut body = ResponseBody::from_stream(rx);
        body.link(controller.signal());

        tx.unbounded_send(Ok(Bytes::from_static(b"first"))).unwrap();
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"first");

        let abort = controller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            abort.abort_with("stop reading");
        });

        let second = body.next().await.unwrap();
        assert_eq!(second, Err(NetError::Aborted("stop reading".into())));
        assert!(body.next().await.is_none());
        assert!(body.is_closed());
        drop(tx);
    }

    #[tokio::test]
    async fn test_abort_after_completion_is_noop() {
        let controller = AbortController::new();
        let mut body = ResponseBody::from_bytes("done");
        body.link(controller.signal());

        let bytes = body.bytes().await.unwrap();
        controller.abort();
        assert_eq!(&bytes[..], b"done");
    }

    #[tokio::test]
    async fn test_direct_abort_fails_next_read() {
        let mut body = ResponseBody::from_bytes("unread");
        body.abort("released");
        assert_eq!(
            body.bytes().await,
            Err(NetError::Aborted("released".into()))
        );
    }

    #[tokio::test]
    async fn test_progress() {
        let chunks = vec![Ok(Bytes::from_static(b"12345")), Ok(Bytes::from_static(b"67890"))];
        let mut body = ResponseBody::from_stream(futures::stream::iter(chunks)).with_total(Some(20));
        let tracker = body.progress();

        body.next().await.unwrap().unwrap();
        let p = tracker.snapshot();
        assert_eq!(p.transferred, 5);
        assert_eq!(p.total, 20);
        assert!((p.percent - 25.0).abs() < f64::EPSILON);

        body.next().await.unwrap().unwrap();
        assert!((tracker.snapshot().percent - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_progress_unknown_total() {
        let body = ResponseBody::from_stream(futures::stream::iter(vec![Ok(Bytes::from_static(b"ab"))]));
        let tracker = body.progress();
        body.bytes().await.unwrap();
        let p = tracker.snapshot();
        assert_eq!(p.transferred, 2);
        assert_eq!(p.total, 0);
        assert_eq!(p.percent, 0.0);
    }
}
