//! Bundled engine built on hyper's connection-level client.
//!
//! One connection per request: connect (optionally through an HTTP CONNECT
//! tunnel), negotiate TLS and ALPN, hand the socket to hyper's HTTP/1.1 or
//! HTTP/2 handshake, send the request and return the response head with a
//! streaming body. Redirects are never followed here.

use super::connectjob::{ConnectJob, ConnectSettings};
use super::{Engine, EngineConfig, EngineFactory, NormalizedRequest, Performing};
use crate::base::neterror::NetError;
use crate::emulation::BrowserProfile;
use crate::http::{HeaderList, HttpResponse, ResponseBody};
use futures::{StreamExt, TryStreamExt};
use http_body_util::{BodyStream, Full};
use hyper::client::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::sync::Arc;
use url::{Position, Url};

/// Headers HTTP/2 forbids on requests.
const H2_FORBIDDEN: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug)]
struct EngineInner {
    config: EngineConfig,
    settings: ConnectSettings,
    base_headers: HeaderList,
}

/// Hyper + BoringSSL engine.
#[derive(Debug, Clone)]
pub struct HyperEngine {
    inner: Arc<EngineInner>,
}

impl HyperEngine {
    pub fn new(config: EngineConfig) -> Result<Self, NetError> {
        let proxy = match config.proxy.as_deref() {
            Some(p) if !p.is_empty() => Some(Url::parse(p).map_err(|_| NetError::InvalidUrl)?),
            _ => None,
        };

        let settings = ConnectSettings {
            proxy,
            no_proxy: config.no_proxy.clone(),
            dns_overrides: config.dns_overrides.clone(),
            ip_resolve: config.ip_resolve,
            http_version: config.http_version,
            ignore_tls_errors: config.ignore_tls_errors,
            ca_path: config.ca_path.clone(),
        };

        let base_headers = base_headers(&config);

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                settings,
                base_headers,
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    async fn send(inner: Arc<EngineInner>, request: NormalizedRequest) -> Result<HttpResponse, NetError> {
        let url = request.url().clone();
        match url.scheme() {
            "http" | "https" => {}
            _ => return Err(NetError::UnknownUrlScheme),
        }
        if !request.method().allows_body() && request.body().is_some() {
            return Err(NetError::BodyNotAllowed);
        }

        let stream = ConnectJob::connect(&url, &inner.settings).await?;
        let is_h2 = stream.negotiated_h2();
        let headers = merge_headers(&inner.base_headers, request.headers(), &url, is_h2);

        if inner.config.verbose {
            tracing::info!(method = %request.method(), %url, h2 = is_h2, "sending request");
        } else {
            tracing::trace!(method = %request.method(), %url, h2 = is_h2, "sending request");
        }

        let target = if is_h2 {
            &url[..Position::AfterQuery]
        } else {
            &url[Position::BeforePath..Position::AfterQuery]
        };
        let version = if is_h2 {
            http::Version::HTTP_2
        } else {
            http::Version::HTTP_11
        };

        let body = request.body().cloned().unwrap_or_default();
        let mut req = http::Request::builder()
            .method(http::Method::from(request.method()))
            .uri(target)
            .version(version)
            .body(Full::new(body))
            .map_err(|_| NetError::InvalidUrl)?;
        *req.headers_mut() = headers.to_header_map()?;

        let io = TokioIo::new(stream);
        let response = if is_h2 {
            let (mut sender, conn) = http2::handshake(TokioExecutor::new(), io)
                .await
                .map_err(|e| map_hyper_error(&e))?;
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!(error = %e, "h2 connection closed with error");
                }
            });
            sender.send_request(req).await.map_err(|e| map_hyper_error(&e))?
        } else {
            let (mut sender, conn) = http1::handshake(io)
                .await
                .map_err(|e| map_hyper_error(&e))?;
            tokio::spawn(async move {
                if let Err(e) = conn.await {
                    tracing::debug!(error = %e, "h1 connection closed with error");
                }
            });
            sender.send_request(req).await.map_err(|e| map_hyper_error(&e))?
        };

        let (parts, incoming) = response.into_parts();
        let status = parts.status.as_u16();

        if inner.config.verbose {
            tracing::info!(status, %url, "received response headers");
        } else {
            tracing::trace!(status, %url, "received response headers");
        }

        let headers = HeaderList::from_header_map(&parts.headers);
        let total = parts
            .headers
            .get(http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let chunks = BodyStream::new(incoming)
            .map_err(|e| {
                tracing::debug!(error = %e, "response body read failed");
                NetError::HttpBodyError
            })
            .try_filter_map(|frame| async move { Ok(frame.into_data().ok()) })
            .boxed();

        Ok(HttpResponse::new(
            status,
            url,
            headers,
            ResponseBody::from_stream(chunks).with_total(total),
        ))
    }
}

impl Engine for HyperEngine {
    fn perform(&self, request: NormalizedRequest) -> Performing {
        let inner = self.inner.clone();
        let timeout = request.timeout().or(inner.config.timeout);
        Box::pin(async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, Self::send(inner, request))
                    .await
                    .map_err(|_| NetError::TimedOut)?,
                None => Self::send(inner, request).await,
            }
        })
    }
}

/// Builds a [`HyperEngine`] per configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct HyperEngineFactory;

impl EngineFactory for HyperEngineFactory {
    fn create(&self, config: &EngineConfig) -> Result<Arc<dyn Engine>, NetError> {
        Ok(Arc::new(HyperEngine::new(config.clone())?))
    }
}

/// Profile defaults, then baseline headers, then User-Agent and Referer
/// overrides. Later layers replace earlier ones by name.
fn base_headers(config: &EngineConfig) -> HeaderList {
    let mut headers = config
        .browser
        .as_deref()
        .map(|b| BrowserProfile::parse(b).default_headers())
        .unwrap_or_default();

    for (name, value) in &config.headers {
        headers.set(name.clone(), value.clone());
    }
    if let Some(ua) = &config.user_agent {
        headers.set("User-Agent", ua.clone());
    }
    if let Some(referer) = &config.referer {
        headers.set("Referer", referer.clone());
    }
    headers
}

/// Request headers win over engine defaults; every name the request sets
/// replaces all default entries of that name.
fn merge_headers(base: &HeaderList, request: &HeaderList, url: &Url, is_h2: bool) -> HeaderList {
    let mut merged = base.clone();
    for (name, _) in request.iter() {
        merged.remove(name);
    }
    merged.extend(request.clone());

    if is_h2 {
        for name in H2_FORBIDDEN {
            merged.remove(name);
        }
    } else if !merged.contains("host") {
        if let Some(host) = url.host_str() {
            let value = match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            merged.append("Host", value);
        }
    }
    merged
}

fn map_hyper_error(e: &hyper::Error) -> NetError {
    tracing::debug!(error = %e, "hyper request failed");
    if e.is_timeout() {
        NetError::TimedOut
    } else if e.is_incomplete_message() {
        NetError::EmptyResponse
    } else if e.is_canceled() || e.is_closed() {
        NetError::ConnectionClosed
    } else if e.is_parse() {
        NetError::InvalidResponse
    } else {
        NetError::ConnectionFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_base_headers_layering() {
        let config = EngineConfig {
            browser: Some("chrome".into()),
            headers: vec![("Accept".into(), "application/json".into())],
            user_agent: Some("custom-agent/1.0".into()),
            referer: Some("https://ref.test/".into()),
            ..Default::default()
        };
        let headers = base_headers(&config);
        assert_eq!(headers.get("accept"), Some("application/json"));
        assert_eq!(headers.get("user-agent"), Some("custom-agent/1.0"));
        assert_eq!(headers.get("referer"), Some("https://ref.test/"));
        assert_eq!(headers.get_all("user-agent").count(), 1);
        assert!(headers.contains("sec-ch-ua"));
    }

    #[test]
    fn test_request_headers_win() {
        let mut base = HeaderList::new();
        base.append("Accept", "*/*");
        base.append("X-Base", "1");
        let mut req = HeaderList::new();
        req.append("accept", "text/plain");

        let url = Url::parse("http://merge.test:8080/p").unwrap();
        let merged = merge_headers(&base, &req, &url, false);
        assert_eq!(merged.get_all("Accept").collect::<Vec<_>>(), vec!["text/plain"]);
        assert_eq!(merged.get("x-base"), Some("1"));
        assert_eq!(merged.get("host"), Some("merge.test:8080"));
    }

    #[test]
    fn test_h2_strips_connection_headers() {
        let mut req = HeaderList::new();
        req.append("Connection", "keep-alive");
        req.append("Host", "x.test");
        let url = Url::parse("https://x.test/").unwrap();
        let merged = merge_headers(&HeaderList::new(), &req, &url, true);
        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn test_get_with_body_rejected() {
        let engine = HyperEngine::new(EngineConfig::default()).unwrap();
        let req = NormalizedRequest::new(
            Url::parse("http://127.0.0.1:9/").unwrap(),
            crate::http::HttpMethod::Get,
            HeaderList::new(),
            Some(Bytes::from_static(b"x")),
            None,
        );
        assert_eq!(engine.perform(req).await.err(), Some(NetError::BodyNotAllowed));
    }

    #[tokio::test]
    async fn test_unknown_scheme_rejected() {
        let engine = HyperEngine::new(EngineConfig::default()).unwrap();
        let req = NormalizedRequest::new(
            Url::parse("ftp://files.test/").unwrap(),
            crate::http::HttpMethod::Get,
            HeaderList::new(),
            None,
            None,
        );
        assert_eq!(engine.perform(req).await.err(), Some(NetError::UnknownUrlScheme));
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let config = EngineConfig {
            proxy: Some("http://[bad".into()),
            ..Default::default()
        };
        assert!(matches!(HyperEngine::new(config), Err(NetError::InvalidUrl)));
    }
}
