use thiserror::Error;
use url::Url;

/// Coarse grouping of [`NetError`] values, used by callers deciding on a
/// retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection, DNS, TLS and timeout failures reported by the engine.
    Transport,
    /// Malformed request input (body, headers, URL, method).
    Request,
    /// Redirect policy failures.
    Redirect,
    /// Cooperative cancellation.
    Cancelled,
    /// Response decoding failures.
    Response,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("Address unreachable")]
    AddressUnreachable,
    #[error("Tunnel connection failed")]
    TunnelConnectionFailed,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Proxy connection failed")]
    ProxyConnectionFailed,
    #[error("Operation timed out")]
    TimedOut,
    #[error("No supported proxies")]
    NoSupportedProxies,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Invalid redirect")]
    InvalidRedirect,
    #[error("Too many redirects, maximum is {max} ({attempted} hops attempted)")]
    TooManyRedirects {
        max: usize,
        attempted: usize,
        chain: Vec<Url>,
    },
    #[error("Redirect response missing Location header")]
    MissingRedirectLocation,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Method not supported")]
    MethodNotSupported,
    #[error("Invalid header")]
    InvalidHeader,
    #[error("GET/HEAD requests cannot carry a body")]
    BodyNotAllowed,

    // Body Errors
    #[error("Unsupported body type: {0}")]
    UnsupportedBodyType(String),
    #[error("HTTP body error")]
    HttpBodyError,
    #[error("Body already consumed")]
    BodyAlreadyConsumed,
    #[error("Invalid UTF-8 in body")]
    InvalidUtf8,
    #[error("JSON parse error")]
    JsonParseError,

    // Cancellation
    #[error("Request aborted before it started: {0}")]
    AlreadyAborted(String),
    #[error("Request aborted: {0}")]
    Aborted(String),

    /// Failure reported by an external engine that has no closer mapping.
    #[error("Engine error: {0}")]
    Engine(String),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::SslProtocolError => -107,
            NetError::AddressUnreachable => -109,
            NetError::TunnelConnectionFailed => -111,
            NetError::ConnectionTimedOut => -118,
            NetError::ProxyConnectionFailed => -130,
            NetError::TimedOut => -7,

            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,
            NetError::InvalidRedirect => -303,
            NetError::TooManyRedirects { .. } => -310,
            NetError::InvalidResponse => -320,
            NetError::MethodNotSupported => -322,
            NetError::EmptyResponse => -324,
            NetError::NoSupportedProxies => -336,

            // Facade errors (custom codes starting at -1000, clear of Chromium's ranges)
            NetError::MissingRedirectLocation => -1000,
            NetError::UnsupportedBodyType(_) => -1001,
            NetError::AlreadyAborted(_) => -1002,
            NetError::Aborted(_) => -1003,
            NetError::InvalidHeader => -1004,
            NetError::BodyNotAllowed => -1005,
            NetError::HttpBodyError => -1006,
            NetError::BodyAlreadyConsumed => -1007,
            NetError::InvalidUtf8 => -1008,
            NetError::JsonParseError => -1009,
            NetError::Engine(_) => -1010,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            NetError::ConnectionClosed
            | NetError::ConnectionReset
            | NetError::ConnectionRefused
            | NetError::ConnectionAborted
            | NetError::ConnectionFailed
            | NetError::NameNotResolved
            | NetError::SslProtocolError
            | NetError::AddressUnreachable
            | NetError::TunnelConnectionFailed
            | NetError::ConnectionTimedOut
            | NetError::ProxyConnectionFailed
            | NetError::TimedOut
            | NetError::NoSupportedProxies
            | NetError::EmptyResponse
            | NetError::Engine(_) => ErrorCategory::Transport,

            NetError::InvalidUrl
            | NetError::UnknownUrlScheme
            | NetError::MethodNotSupported
            | NetError::InvalidHeader
            | NetError::BodyNotAllowed
            | NetError::UnsupportedBodyType(_) => ErrorCategory::Request,

            NetError::InvalidRedirect
            | NetError::TooManyRedirects { .. }
            | NetError::MissingRedirectLocation => ErrorCategory::Redirect,

            NetError::AlreadyAborted(_) | NetError::Aborted(_) => ErrorCategory::Cancelled,

            NetError::InvalidResponse
            | NetError::HttpBodyError
            | NetError::BodyAlreadyConsumed
            | NetError::InvalidUtf8
            | NetError::JsonParseError => ErrorCategory::Response,
        }
    }

    /// Whether re-issuing the same request may succeed.
    ///
    /// Mirrors Chromium's `RetryReason` set: resets, closes, empty responses
    /// and timeouts are retryable; request, redirect and cancellation
    /// failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetError::ConnectionReset
                | NetError::ConnectionClosed
                | NetError::ConnectionAborted
                | NetError::ConnectionTimedOut
                | NetError::TimedOut
                | NetError::EmptyResponse
        )
    }

    /// Number of hops attempted, for redirect budget failures.
    pub fn redirect_attempts(&self) -> Option<usize> {
        match self {
            NetError::TooManyRedirects { attempted, .. } => Some(*attempted),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NetError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            ErrorKind::ConnectionReset => NetError::ConnectionReset,
            ErrorKind::ConnectionAborted => NetError::ConnectionAborted,
            ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            ErrorKind::UnexpectedEof | ErrorKind::BrokenPipe => NetError::ConnectionClosed,
            _ => NetError::ConnectionFailed,
        }
    }
}
