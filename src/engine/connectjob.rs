use super::stream::EngineStream;
use super::tls::TlsConfig;
use super::{DnsOverride, HttpVersionPref, IpResolve};
use crate::base::neterror::NetError;
use base64::{engine::general_purpose, Engine as _};
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;
use zeroize::Zeroizing;

/// Upper bound on a CONNECT response head.
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

/// Connection-level settings taken from the engine configuration.
#[derive(Debug, Clone, Default)]
pub struct ConnectSettings {
    pub proxy: Option<Url>,
    pub no_proxy: Vec<String>,
    pub dns_overrides: Vec<DnsOverride>,
    pub ip_resolve: IpResolve,
    pub http_version: HttpVersionPref,
    pub ignore_tls_errors: bool,
    pub ca_path: Option<String>,
}

impl ConnectSettings {
    /// The proxy to use for `host`, or `None` when it is on the bypass list.
    pub fn proxy_for(&self, host: &str) -> Option<&Url> {
        let proxy = self.proxy.as_ref()?;
        if bypasses_proxy(host, &self.no_proxy) {
            tracing::trace!(host, "proxy bypassed");
            return None;
        }
        Some(proxy)
    }
}

/// Entries may be comma-separated. `*` matches every host; otherwise an
/// entry matches the host itself and its subdomains, with an optional
/// leading dot.
pub fn bypasses_proxy(host: &str, no_proxy: &[String]) -> bool {
    let host = host.trim_matches(|c| c == '[' || c == ']');
    no_proxy
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(|entry| entry.trim().trim_start_matches('.').trim_matches(|c| c == '[' || c == ']'))
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            if entry == "*" || host.eq_ignore_ascii_case(entry) {
                return true;
            }
            host.len() > entry.len()
                && host.as_bytes()[host.len() - entry.len() - 1] == b'.'
                && host[host.len() - entry.len()..].eq_ignore_ascii_case(entry)
        })
}

/// Manages the connection process: DNS -> TCP -> proxy tunnel -> TLS.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob;

impl ConnectJob {
    pub async fn connect(url: &Url, settings: &ConnectSettings) -> Result<EngineStream, NetError> {
        let target_host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let target_port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;

        let proxy = settings.proxy_for(target_host);
        let (host, port) = match proxy {
            Some(proxy) => {
                if proxy.scheme() != "http" {
                    tracing::debug!(scheme = proxy.scheme(), "unsupported proxy scheme");
                    return Err(NetError::NoSupportedProxies);
                }
                let phost = proxy.host_str().ok_or(NetError::InvalidUrl)?;
                let pport = proxy.port_or_known_default().ok_or(NetError::InvalidUrl)?;
                (phost, pport)
            }
            None => (target_host, target_port),
        };

        // 1. DNS Resolution
        let addrs = Self::resolve(host, port, settings).await?;

        // 2. TCP Connect (to proxy or destination)
        let mut stream = None;
        let mut last_err = NetError::ConnectionFailed;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => {
                    tracing::trace!(%addr, error = %e, "tcp connect attempt failed");
                    last_err = NetError::from(e);
                }
            }
        }

        let mut stream = match stream {
            Some(s) => s,
            None if proxy.is_some() => return Err(NetError::ProxyConnectionFailed),
            None => return Err(last_err),
        };
        let _ = stream.set_nodelay(true);

        // 2b. Proxy tunnel; `stream` then behaves like a connection to the target.
        if let Some(proxy) = proxy {
            Self::establish_tunnel(&mut stream, proxy, target_host, target_port).await?;
        }

        // 3. TLS, always after any tunnel is established
        if url.scheme() != "https" {
            return Ok(EngineStream::Tcp(stream));
        }

        let mut tls = TlsConfig::for_engine(settings.http_version, settings.ignore_tls_errors);
        tls.ca_file = settings.ca_path.clone();
        let connector = tls.build_connector()?;
        let mut config = connector
            .configure()
            .map_err(|_| NetError::SslProtocolError)?;

        let sni_host = target_host.trim_matches(|c| c == '[' || c == ']');
        if !TlsConfig::should_set_sni(target_host) {
            config.set_use_server_name_indication(false);
        }
        if tls.insecure {
            config.set_verify_hostname(false);
        }

        let tls_stream = tokio_boring::connect(config, sni_host, stream)
            .await
            .map_err(|e| {
                tracing::debug!(host = target_host, error = ?e, "TLS handshake failed");
                NetError::SslProtocolError
            })?;

        Ok(EngineStream::Tls(tls_stream))
    }

    async fn resolve(
        host: &str,
        port: u16,
        settings: &ConnectSettings,
    ) -> Result<Vec<SocketAddr>, NetError> {
        let bare = host.trim_matches(|c| c == '[' || c == ']');

        let candidates: Vec<SocketAddr> = if let Ok(ip) = bare.parse::<IpAddr>() {
            vec![SocketAddr::new(ip, port)]
        } else if let Some(o) = settings.dns_overrides.iter().find(|o| o.matches(bare, port)) {
            tracing::trace!(host = bare, "using static address override");
            o.addrs.iter().map(|ip| SocketAddr::new(*ip, port)).collect()
        } else {
            tokio::net::lookup_host((bare, port))
                .await
                .map_err(|_| NetError::NameNotResolved)?
                .collect()
        };

        let filtered: Vec<SocketAddr> = candidates
            .into_iter()
            .filter(|a| settings.ip_resolve.allows(&a.ip()))
            .collect();

        if filtered.is_empty() {
            return Err(NetError::NameNotResolved);
        }
        Ok(filtered)
    }

    async fn establish_tunnel(
        stream: &mut TcpStream,
        proxy: &Url,
        target_host: &str,
        target_port: u16,
    ) -> Result<(), NetError> {
        let target = format!("{}:{}", target_host, target_port);
        let mut connect_req = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", target, target);

        if let Some(auth) = proxy_authorization(proxy) {
            connect_req.push_str(&format!("Proxy-Authorization: {}\r\n", auth.as_str()));
        }
        connect_req.push_str("\r\n");
        let connect_req = Zeroizing::new(connect_req);

        stream
            .write_all(connect_req.as_bytes())
            .await
            .map_err(|_| NetError::TunnelConnectionFailed)?;

        // Read until the end of the response head.
        let mut head = Vec::with_capacity(256);
        let mut buf = [0u8; 512];
        loop {
            let n = stream
                .read(&mut buf)
                .await
                .map_err(|_| NetError::TunnelConnectionFailed)?;
            if n == 0 {
                return Err(NetError::TunnelConnectionFailed);
            }
            head.extend_from_slice(&buf[..n]);
            if head.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
            if head.len() > MAX_TUNNEL_RESPONSE {
                return Err(NetError::TunnelConnectionFailed);
            }
        }

        let status_line = String::from_utf8_lossy(&head);
        let status_line = status_line.lines().next().unwrap_or_default();
        let ok = status_line
            .split_whitespace()
            .nth(1)
            .is_some_and(|code| code.starts_with('2'));

        if !ok {
            tracing::debug!(status = status_line, "proxy refused tunnel");
            return Err(NetError::TunnelConnectionFailed);
        }
        Ok(())
    }
}

/// Basic `Proxy-Authorization` value built from the proxy URL's userinfo.
pub fn proxy_authorization(proxy: &Url) -> Option<Zeroizing<String>> {
    if proxy.username().is_empty() {
        return None;
    }

    let user = percent_decode(proxy.username());
    let pass = Zeroizing::new(percent_decode(proxy.password().unwrap_or("")));
    let creds = Zeroizing::new(format!("{}:{}", user, pass.as_str()));
    let encoded = general_purpose::STANDARD.encode(creds.as_bytes());
    Some(Zeroizing::new(format!("Basic {}", encoded)))
}

/// Userinfo is percent-encoded only; `+` stays a literal plus.
fn percent_decode(s: &str) -> String {
    percent_encoding::percent_decode_str(s)
        .decode_utf8_lossy()
        .into_owned()
}
