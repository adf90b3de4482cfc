//! HTTP Response with body access.

use crate::base::neterror::NetError;
use crate::http::{HeaderList, ResponseBody};
use crate::urlrequest::abort::AbortSignal;
use bytes::Bytes;
use http::HeaderMap;
use url::Url;

const RESPONSE_ABORT_REASON: &str = "response aborted";

/// HTTP Response with accessible body.
/// This is the user-facing response type that owns the body.
#[derive(Debug)]
pub struct HttpResponse {
    status: u16,
    url: Url,
    headers: HeaderList,
    body: Option<ResponseBody>,
    redirect_urls: Vec<Url>,
}

impl HttpResponse {
    pub fn new(status: u16, url: Url, headers: HeaderList, body: ResponseBody) -> Self {
        Self {
            status,
            url,
            headers,
            body: Some(body),
            redirect_urls: Vec::new(),
        }
    }

    /// Get the status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// URL the engine fetched for this response.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get a reference to the headers, in wire order.
    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    /// Headers as an `http::HeaderMap`.
    pub fn header_map(&self) -> Result<HeaderMap, NetError> {
        self.headers.to_header_map()
    }

    /// Content-Length, if declared and valid.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Every Location followed to reach this response, in order.
    pub fn redirect_urls(&self) -> &[Url] {
        &self.redirect_urls
    }

    pub(crate) fn set_redirect_urls(&mut self, chain: Vec<Url>) {
        self.redirect_urls = chain;
    }

    /// Link an abort signal to the body.
    pub fn bind_signal(&mut self, signal: AbortSignal) {
        if let Some(body) = self.body.as_mut() {
            body.link(signal);
        }
    }

    /// Release the engine resources held by the body without reading it.
    pub fn abort(&mut self) {
        if let Some(body) = self.body.as_mut() {
            body.abort(RESPONSE_ABORT_REASON);
        }
    }

    /// Take the response body for consumption.
    /// Can only be called once - subsequent calls return None.
    pub fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    pub fn into_body(mut self) -> Result<ResponseBody, NetError> {
        self.body.take().ok_or(NetError::BodyAlreadyConsumed)
    }

    /// Convenience method to consume body as bytes.
    pub async fn bytes(self) -> Result<Bytes, NetError> {
        self.into_body()?.bytes().await
    }

    /// Convenience method to consume body as text.
    pub async fn text(self) -> Result<String, NetError> {
        self.into_body()?.text().await
    }

    /// Convenience method to consume body as JSON.
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, NetError> {
        self.into_body()?.json().await
    }
}
