//! HTTP Client with builder pattern.
//!
//! # Example
//!
//! ```rust,no_run
//! use fetchnet::Client;
//!
//! # async fn run() -> Result<(), fetchnet::NetError> {
//! let client = Client::builder()
//!     .browser("chrome")
//!     .max_redirects(5)
//!     .build();
//!
//! let resp = client.get("https://example.com").send().await?;
//! println!("{} {}", resp.status(), resp.text().await?);
//! # Ok(())
//! # }
//! ```

use crate::base::neterror::NetError;
use crate::cookies::CookieStore;
use crate::engine::{EngineFactory, HyperEngineFactory};
use crate::http::{
    canonicalize, Form, FormParams, HeaderInput, HeaderList, HttpMethod, HttpResponse,
    ProgressTracker, RequestBody, ResponseBody,
};
use crate::urlrequest::{AbortSignal, ClientCache, ClientConfig, RedirectJob, Request};
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use url::Url;

struct ClientInner {
    config: ClientConfig,
    cache: ClientCache,
}

/// HTTP Client for making requests.
///
/// Cheap to clone; clones share configuration and the engine cache.
/// Use [`Client::builder()`] to configure and create a client.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("cache", &self.inner.cache)
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new client with default settings and the bundled engine.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The engine cache shared by every clone of this client.
    pub fn cache(&self) -> &ClientCache {
        &self.inner.cache
    }

    /// Start building a GET request.
    pub fn get<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(HttpMethod::Get, url)
    }

    /// Start building a POST request.
    pub fn post<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(HttpMethod::Post, url)
    }

    /// Start building a PUT request.
    pub fn put<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(HttpMethod::Put, url)
    }

    /// Start building a DELETE request.
    pub fn delete<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(HttpMethod::Delete, url)
    }

    /// Start building a HEAD request.
    pub fn head<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(HttpMethod::Head, url)
    }

    /// Start building a PATCH request.
    pub fn patch<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(HttpMethod::Patch, url)
    }

    /// Start building a request with custom method.
    pub fn request<U: AsRef<str>>(&self, method: HttpMethod, url: U) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            request: Request::parse(method, url.as_ref()),
        }
    }

    /// Run a request through redirects, cookies and cancellation.
    pub async fn execute(&self, request: Request) -> Result<HttpResponse, NetError> {
        RedirectJob::new(&self.inner.config, &self.inner.cache)
            .run(request)
            .await
    }

    /// Execute and read the whole body in the requested shape.
    pub async fn send_request(
        &self,
        request: Request,
        response_type: ResponseType,
    ) -> Result<ParsedResponse, NetError> {
        let mut response = self.execute(request).await?;
        let body = response.take_body().ok_or(NetError::BodyAlreadyConsumed)?;
        let content_type = response.content_type().map(str::to_string);

        let data = match response_type {
            ResponseType::Text => ResponseData::Text(body.text().await?),
            ResponseType::Json => ResponseData::Json(body.json().await?),
            ResponseType::Bytes => ResponseData::Bytes(body.bytes().await?),
            ResponseType::Auto => auto_decode(body.bytes().await?, content_type.as_deref())?,
        };

        Ok(ParsedResponse {
            status: response.status(),
            url: response.url().clone(),
            headers: response.headers().clone(),
            redirect_urls: response.redirect_urls().to_vec(),
            data,
        })
    }

    /// Execute and hand back the body as a stream with progress reporting.
    pub async fn stream(&self, request: Request) -> Result<StreamingResponse, NetError> {
        let mut response = self.execute(request).await?;
        let body = response.take_body().ok_or(NetError::BodyAlreadyConsumed)?;
        let progress = body.progress();
        Ok(StreamingResponse {
            status: response.status(),
            url: response.url().clone(),
            headers: response.headers().clone(),
            redirect_urls: response.redirect_urls().to_vec(),
            body,
            progress,
        })
    }
}

/// Builder for creating a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    engine_factory: Option<Arc<dyn EngineFactory>>,
}

impl ClientBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a different engine. Defaults to [`HyperEngineFactory`].
    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Browser profile name, e.g. `chrome` or `firefox144`.
    pub fn browser(mut self, name: impl Into<String>) -> Self {
        self.config.browser = Some(name.into());
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.config.proxy_url = Some(url.into());
        self
    }

    /// Add a host that bypasses the proxy.
    pub fn no_proxy(mut self, host: impl Into<String>) -> Self {
        self.config.no_proxy.push(host.into());
        self
    }

    pub fn ca_path(mut self, path: impl Into<String>) -> Self {
        self.config.ca_path = Some(path.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.config.referer = Some(referer.into());
        self
    }

    pub fn http_version(mut self, version: impl Into<String>) -> Self {
        self.config.http_version = Some(version.into());
        self
    }

    pub fn ip_resolve(mut self, mode: impl Into<String>) -> Self {
        self.config.ip_resolve = Some(mode.into());
        self
    }

    pub fn doh_url(mut self, url: impl Into<String>) -> Self {
        self.config.doh_url = Some(url.into());
        self
    }

    pub fn ignore_tls_errors(mut self, ignore: bool) -> Self {
        self.config.ignore_tls_errors = ignore;
        self
    }

    /// Add a baseline header sent on every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.push((name.into(), value.into()));
        self
    }

    pub fn cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.config.cookie_store = Some(store);
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        let factory = self
            .engine_factory
            .unwrap_or_else(|| Arc::new(HyperEngineFactory));
        let cache = ClientCache::new(factory, self.config.cache_capacity);
        Client {
            inner: Arc::new(ClientInner {
                config: self.config,
                cache,
            }),
        }
    }
}

/// Builder for a single request.
///
/// URL and body errors are held until [`RequestBuilder::send`].
#[must_use]
pub struct RequestBuilder {
    client: Client,
    request: Result<Request, NetError>,
}

impl RequestBuilder {
    fn with_request(mut self, f: impl FnOnce(&mut Request)) -> Self {
        if let Ok(req) = self.request.as_mut() {
            f(req);
        }
        self
    }

    /// Append a header.
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        self.with_request(|req| req.headers_mut().append(name, value))
    }

    /// Append headers from any supported header shape.
    pub fn headers(self, headers: impl Into<HeaderInput>) -> Self {
        let list = canonicalize(headers);
        self.with_request(|req| req.headers_mut().extend(list))
    }

    /// Set request body.
    pub fn body(self, body: impl Into<RequestBody>) -> Self {
        let body = body.into();
        self.with_request(|req| req.set_body(body))
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.body(RequestBody::Text(text.into()))
    }

    pub fn form(self, params: FormParams) -> Self {
        self.body(RequestBody::Form(params))
    }

    /// Set JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize>(mut self, json: &T) -> Self {
        match serde_json::to_value(json) {
            Ok(value) => self.body(RequestBody::Json(value)),
            Err(e) => {
                self.request = Err(NetError::UnsupportedBodyType(e.to_string()));
                self
            }
        }
    }

    pub fn multipart(self, form: Form) -> Self {
        self.body(RequestBody::Multipart(form))
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.with_request(|req| req.set_timeout(Some(timeout)))
    }

    pub fn signal(self, signal: AbortSignal) -> Self {
        self.with_request(|req| req.set_signal(Some(signal)))
    }

    /// Proxy for this request only.
    pub fn proxy(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.with_request(|req| req.set_proxy(Some(url)))
    }

    /// Cookie store for this request only.
    pub fn cookie_store(self, store: Arc<dyn CookieStore>) -> Self {
        self.with_request(|req| req.set_cookie_store(Some(store)))
    }

    pub fn max_redirects(self, max: usize) -> Self {
        self.with_request(|req| req.set_max_redirects(Some(max)))
    }

    /// Finish without sending.
    pub fn build(self) -> Result<Request, NetError> {
        self.request
    }

    /// Send the request.
    pub async fn send(self) -> Result<HttpResponse, NetError> {
        let request = self.request?;
        self.client.execute(request).await
    }

    /// Send and read the body in the requested shape.
    pub async fn send_as(self, response_type: ResponseType) -> Result<ParsedResponse, NetError> {
        let request = self.request?;
        self.client.send_request(request, response_type).await
    }

    /// Send and stream the body.
    pub async fn stream(self) -> Result<StreamingResponse, NetError> {
        let request = self.request?;
        self.client.stream(request).await
    }
}

/// How [`Client::send_request`] reads the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// JSON when the content type says so, else UTF-8 text when valid,
    /// else raw bytes.
    #[default]
    Auto,
    Text,
    Json,
    Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Text(String),
    Json(serde_json::Value),
    Bytes(Bytes),
}

/// A response whose body has been read in full.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub status: u16,
    pub url: Url,
    pub headers: HeaderList,
    pub redirect_urls: Vec<Url>,
    pub data: ResponseData,
}

/// A response whose body is read chunk by chunk.
#[derive(Debug)]
pub struct StreamingResponse {
    pub status: u16,
    pub url: Url,
    pub headers: HeaderList,
    pub redirect_urls: Vec<Url>,
    body: ResponseBody,
    progress: ProgressTracker,
}

impl StreamingResponse {
    pub fn download_progress(&self) -> crate::http::DownloadProgress {
        self.progress.snapshot()
    }

    /// Tracker that stays valid after the body is moved elsewhere.
    pub fn progress_tracker(&self) -> ProgressTracker {
        self.progress.clone()
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Stop reading and release the engine stream.
    pub fn abort(&mut self) {
        self.body.close();
    }
}

impl Stream for StreamingResponse {
    type Item = Result<Bytes, NetError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().body).poll_next(cx)
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn auto_decode(bytes: Bytes, content_type: Option<&str>) -> Result<ResponseData, NetError> {
    if content_type.is_some_and(is_json_content_type) {
        let value = serde_json::from_slice(&bytes).map_err(|_| NetError::JsonParseError)?;
        return Ok(ResponseData::Json(value));
    }
    match std::str::from_utf8(&bytes) {
        Ok(text) => Ok(ResponseData::Text(text.to_string())),
        Err(_) => Ok(ResponseData::Bytes(bytes)),
    }
}
