//! Client configuration.
//!
//! [`ClientConfig`] is the options surface a [`Client`](crate::Client) is
//! built from. It deserializes from JSON with every field optional, and
//! derives the [`EngineConfig`] that selects an engine instance.

use crate::base::neterror::NetError;
use crate::cookies::CookieStore;
use crate::emulation::normalize_browser;
use crate::engine::{DnsOverride, EngineConfig, HttpVersionPref, IpResolve};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Proxy schemes accepted as written; anything else gets `http://`.
const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h", "socks4", "socks4a"];

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeout, in milliseconds on the wire.
    #[serde(rename = "timeout_ms", with = "duration_ms")]
    pub timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    /// Log request and response heads at `info` instead of `trace`.
    pub debug: bool,
    #[serde(alias = "impersonate")]
    pub browser: Option<String>,
    pub proxy_url: Option<String>,
    /// Hosts reached without the proxy. A comma-separated string is
    /// accepted in place of a list.
    #[serde(deserialize_with = "string_or_list::deserialize")]
    pub no_proxy: Vec<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// `"1.1"`, `"2"`/`"h2"` or `"3"`/`"h3"`.
    pub http_version: Option<String>,
    /// `"v4"`, `"v6"` or `"any"`.
    pub ip_resolve: Option<String>,
    pub doh_url: Option<String>,
    pub ignore_tls_errors: bool,
    /// PEM file of trusted roots.
    pub ca_path: Option<String>,
    /// Baseline headers sent on every request.
    pub headers: Vec<(String, String)>,
    #[serde(skip)]
    pub cookie_store: Option<Arc<dyn CookieStore>>,
    pub cache_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            debug: false,
            browser: None,
            proxy_url: None,
            no_proxy: Vec::new(),
            user_agent: None,
            referer: None,
            http_version: None,
            ip_resolve: None,
            doh_url: None,
            ignore_tls_errors: false,
            ca_path: None,
            headers: Vec::new(),
            cookie_store: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("timeout", &self.timeout)
            .field("follow_redirects", &self.follow_redirects)
            .field("max_redirects", &self.max_redirects)
            .field("debug", &self.debug)
            .field("browser", &self.browser)
            .field("proxy_url", &self.proxy_url)
            .field("no_proxy", &self.no_proxy)
            .field("user_agent", &self.user_agent)
            .field("referer", &self.referer)
            .field("http_version", &self.http_version)
            .field("ip_resolve", &self.ip_resolve)
            .field("doh_url", &self.doh_url)
            .field("ignore_tls_errors", &self.ignore_tls_errors)
            .field("ca_path", &self.ca_path)
            .field("headers_count", &self.headers.len())
            .field("cookie_store", &self.cookie_store.is_some())
            .field("cache_capacity", &self.cache_capacity)
            .finish()
    }
}

impl ClientConfig {
    /// Engine configuration for one request. `proxy_override` replaces the
    /// client-wide proxy when set.
    pub fn engine_config(&self, proxy_override: Option<&str>) -> Result<EngineConfig, NetError> {
        let http_version = match self.http_version.as_deref() {
            Some(v) => v.parse()?,
            None => HttpVersionPref::Auto,
        };
        let ip_resolve = match self.ip_resolve.as_deref() {
            Some(v) => v.parse()?,
            None => IpResolve::Any,
        };
        let proxy = proxy_override
            .or(self.proxy_url.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(normalize_proxy_url);

        Ok(EngineConfig {
            timeout: self.timeout,
            proxy,
            no_proxy: self.no_proxy.clone(),
            ignore_tls_errors: self.ignore_tls_errors,
            ca_path: self.ca_path.clone(),
            browser: self.browser.as_deref().map(normalize_browser),
            doh_url: self.doh_url.clone(),
            dns_overrides: self
                .doh_url
                .as_deref()
                .map(doh_bootstrap_overrides)
                .unwrap_or_default(),
            headers: self.headers.clone(),
            user_agent: self.user_agent.clone(),
            referer: self.referer.clone(),
            http_version,
            ip_resolve,
            verbose: self.debug,
        })
    }
}

/// Prefix `http://` unless the URL already names a known proxy scheme.
pub fn normalize_proxy_url(proxy: &str) -> String {
    let has_scheme = proxy
        .split_once("://")
        .is_some_and(|(scheme, _)| PROXY_SCHEMES.iter().any(|s| scheme.eq_ignore_ascii_case(s)));
    if has_scheme {
        proxy.to_string()
    } else {
        format!("http://{}", proxy)
    }
}

/// Static addresses for well-known DoH endpoints, so the resolver itself
/// never needs a DNS lookup.
pub fn doh_bootstrap_overrides(doh_url: &str) -> Vec<DnsOverride> {
    let host = Url::parse(doh_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase));

    let addrs = match host.as_deref() {
        Some("cloudflare-dns.com") => [Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(1, 0, 0, 1)],
        Some("dns.google") => [Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)],
        _ => return Vec::new(),
    };

    vec![DnsOverride::new(
        host.unwrap_or_default(),
        Some(443),
        addrs.into_iter().map(IpAddr::V4).collect(),
    )]
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

mod string_or_list {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let list = match Raw::deserialize(d)? {
            Raw::One(s) => s.split(',').map(str::to_string).collect(),
            Raw::Many(v) => v,
        };
        Ok(list
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}
