//! Connected transport for the bundled engine.
//!
//! Plain TCP or BoringSSL over TCP. The TLS variant also reports the ALPN
//! result so the engine can pick the HTTP/1.1 or HTTP/2 handshake.

use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_boring::SslStream;

#[derive(Debug)]
pub enum EngineStream {
    Tcp(TcpStream),
    Tls(SslStream<TcpStream>),
}

impl EngineStream {
    /// Whether ALPN selected `h2`.
    pub fn negotiated_h2(&self) -> bool {
        match self {
            EngineStream::Tcp(_) => false,
            EngineStream::Tls(s) => s.ssl().selected_alpn_protocol() == Some(b"h2".as_slice()),
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, EngineStream::Tls(_))
    }
}

impl AsyncRead for EngineStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            EngineStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            EngineStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for EngineStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            EngineStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            EngineStream::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            EngineStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            EngineStream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            EngineStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            EngineStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}
