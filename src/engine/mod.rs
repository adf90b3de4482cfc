//! The request engine boundary.
//!
//! An [`Engine`] issues exactly one HTTP request and returns status, headers
//! and a body stream. It never follows redirects; the redirect job drives
//! every hop. [`EngineAdapter`] is the shared handle the client cache hands
//! out, and [`EngineConfig`] is everything that decides which engine instance
//! serves a request.

pub mod connectjob;
pub mod hyperengine;
pub mod stream;
pub mod tls;

use crate::base::neterror::NetError;
use crate::http::{HeaderList, HttpMethod, HttpResponse};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub use self::hyperengine::{HyperEngine, HyperEngineFactory};

/// One hop of a request, fully normalized. Never mutated after construction;
/// a redirect builds a new value.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    url: Url,
    method: HttpMethod,
    headers: HeaderList,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl NormalizedRequest {
    /// Build a request. Empty bodies are stored as `None`; zero timeouts are
    /// dropped.
    pub fn new(
        url: Url,
        method: HttpMethod,
        headers: HeaderList,
        body: Option<Bytes>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            url,
            method,
            headers,
            body: body.filter(|b| !b.is_empty()),
            timeout: timeout.filter(|t| !t.is_zero()),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Alias for the `Future` type returned by an engine.
pub type Performing = Pin<Box<dyn Future<Output = Result<HttpResponse, NetError>> + Send>>;

/// Performs a single, non-redirecting request.
///
/// Implementations must be thread-safe; one instance serves every concurrent
/// request that shares its configuration. Dropping the returned future
/// cancels the request.
pub trait Engine: Send + Sync {
    fn perform(&self, request: NormalizedRequest) -> Performing;
}

/// Builds engines for a configuration.
pub trait EngineFactory: Send + Sync {
    fn create(&self, config: &EngineConfig) -> Result<Arc<dyn Engine>, NetError>;
}

/// Shared handle to one engine instance.
#[derive(Clone)]
pub struct EngineAdapter {
    engine: Arc<dyn Engine>,
}

impl fmt::Debug for EngineAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineAdapter")
            .field("engine", &Arc::as_ptr(&self.engine).cast::<()>())
            .finish()
    }
}

impl EngineAdapter {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Perform one hop. Redirect statuses are returned as-is.
    pub fn perform(&self, request: NormalizedRequest) -> Performing {
        self.engine.perform(request)
    }

    /// Whether both adapters share the same engine instance.
    pub fn same_engine(&self, other: &EngineAdapter) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine)
    }
}

/// Preferred HTTP version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpVersionPref {
    /// Let ALPN decide (h2 preferred over TLS).
    #[default]
    Auto,
    Http1,
    Http2,
    /// Requested HTTP/3. The bundled engine has no QUIC transport and
    /// falls back to ALPN negotiation.
    Http3,
}

impl FromStr for HttpVersionPref {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(HttpVersionPref::Auto),
            "1.1" | "1" | "http/1.1" | "http1" => Ok(HttpVersionPref::Http1),
            "2" | "2.0" | "h2" | "http2" => Ok(HttpVersionPref::Http2),
            "3" | "3.0" | "h3" | "http3" => Ok(HttpVersionPref::Http3),
            _ => Err(NetError::Engine(format!("unknown http version: {}", s))),
        }
    }
}

/// Address family restriction for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpResolve {
    #[default]
    Any,
    V4,
    V6,
}

impl IpResolve {
    pub fn allows(&self, ip: &IpAddr) -> bool {
        match self {
            IpResolve::Any => true,
            IpResolve::V4 => ip.is_ipv4(),
            IpResolve::V6 => ip.is_ipv6(),
        }
    }
}

impl FromStr for IpResolve {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "whatever" => Ok(IpResolve::Any),
            "v4" | "ipv4" | "4" => Ok(IpResolve::V4),
            "v6" | "ipv6" | "6" => Ok(IpResolve::V6),
            _ => Err(NetError::Engine(format!("unknown ip resolve mode: {}", s))),
        }
    }
}

/// Static address override for one host (and optionally one port).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnsOverride {
    pub host: String,
    pub port: Option<u16>,
    pub addrs: Vec<IpAddr>,
}

impl DnsOverride {
    pub fn new(host: impl Into<String>, port: Option<u16>, addrs: Vec<IpAddr>) -> Self {
        Self {
            host: host.into(),
            port,
            addrs,
        }
    }

    pub fn matches(&self, host: &str, port: u16) -> bool {
        self.host.eq_ignore_ascii_case(host) && self.port.map_or(true, |p| p == port)
    }
}

/// Everything that selects an engine instance. Two requests with equal
/// configs share an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub timeout: Option<Duration>,
    pub proxy: Option<String>,
    /// Hosts that bypass `proxy`.
    pub no_proxy: Vec<String>,
    pub ignore_tls_errors: bool,
    /// PEM bundle used instead of the system roots.
    pub ca_path: Option<String>,
    pub browser: Option<String>,
    pub doh_url: Option<String>,
    pub dns_overrides: Vec<DnsOverride>,
    pub headers: Vec<(String, String)>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub http_version: HttpVersionPref,
    pub ip_resolve: IpResolve,
    pub verbose: bool,
}

impl EngineConfig {
    /// Stable cache key for this configuration.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}
