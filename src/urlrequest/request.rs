use crate::base::neterror::NetError;
use crate::cookies::CookieStore;
use crate::http::{canonicalize, HeaderInput, HeaderList, HttpMethod, RequestBody};
use crate::urlrequest::abort::AbortSignal;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A request as the application describes it, before normalization.
pub struct Request {
    url: Url,
    method: HttpMethod,
    headers: HeaderList,
    body: RequestBody,
    timeout: Option<Duration>,
    signal: Option<AbortSignal>,
    proxy: Option<String>,
    cookie_store: Option<Arc<dyn CookieStore>>,
    max_redirects: Option<usize>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url.as_str())
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("signal", &self.signal.is_some())
            .field("proxy", &self.proxy)
            .field("cookie_store", &self.cookie_store.is_some())
            .finish()
    }
}

impl Request {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            url,
            method,
            headers: HeaderList::new(),
            body: RequestBody::Empty,
            timeout: None,
            signal: None,
            proxy: None,
            cookie_store: None,
            max_redirects: None,
        }
    }

    /// Parse `url` and build a request. Relative URLs are rejected.
    pub fn parse(method: HttpMethod, url: &str) -> Result<Self, NetError> {
        let url = Url::parse(url).map_err(|_| NetError::InvalidUrl)?;
        Ok(Self::new(method, url))
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

    pub fn headers_mut(&mut self) -> &mut HeaderList {
        &mut self.headers
    }

    /// Replace the headers with any supported header shape.
    pub fn set_headers(&mut self, headers: impl Into<HeaderInput>) {
        self.headers = canonicalize(headers);
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<RequestBody>) {
        self.body = body.into();
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn signal(&self) -> Option<&AbortSignal> {
        self.signal.as_ref()
    }

    pub fn set_signal(&mut self, signal: Option<AbortSignal>) {
        self.signal = signal;
    }

    /// Proxy for this request only; overrides the client's proxy.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn set_proxy(&mut self, proxy: Option<String>) {
        self.proxy = proxy;
    }

    /// Cookie store for this request only; overrides the client's store.
    pub fn cookie_store(&self) -> Option<&Arc<dyn CookieStore>> {
        self.cookie_store.as_ref()
    }

    pub fn set_cookie_store(&mut self, store: Option<Arc<dyn CookieStore>>) {
        self.cookie_store = store;
    }

    /// Redirect budget for this request only.
    pub fn max_redirects(&self) -> Option<usize> {
        self.max_redirects
    }

    pub fn set_max_redirects(&mut self, max: Option<usize>) {
        self.max_redirects = max;
    }

    pub(crate) fn into_parts(self) -> RequestParts {
        RequestParts {
            url: self.url,
            method: self.method,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
            signal: self.signal,
            proxy: self.proxy,
            cookie_store: self.cookie_store,
            max_redirects: self.max_redirects,
        }
    }
}

pub(crate) struct RequestParts {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: HeaderList,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
    pub signal: Option<AbortSignal>,
    pub proxy: Option<String>,
    pub cookie_store: Option<Arc<dyn CookieStore>>,
    pub max_redirects: Option<usize>,
}
