//! The redirect job.
//!
//! One [`RedirectJob`] drives one logical request through as many engine
//! hops as its redirects need:
//!
//! ```text
//! Preparing -> Requesting -> Deciding -> Returning
//!     ^                          |
//!     +------- Redirecting <-----+
//! ```
//!
//! The body is materialized once and every hop reuses it with the same
//! headers; a redirect only changes the method and URL. The budget is
//! checked before a hop is issued, so the hop past the budget is never
//! fetched. A superseded redirect response is aborted and dropped before
//! the next hop starts.

use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::cookies::CookieBridge;
use crate::engine::NormalizedRequest;
use crate::http::{HttpMethod, HttpResponse};
use crate::urlrequest::abort::CancellationGate;
use crate::urlrequest::cache::ClientCache;
use crate::urlrequest::context::ClientConfig;
use crate::urlrequest::request::Request;
use bytes::Bytes;

pub struct RedirectJob<'a> {
    config: &'a ClientConfig,
    cache: &'a ClientCache,
    state: LoadState,
}

impl<'a> RedirectJob<'a> {
    pub fn new(config: &'a ClientConfig, cache: &'a ClientCache) -> Self {
        Self {
            config,
            cache,
            state: LoadState::Idle,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub async fn run(&mut self, request: Request) -> Result<HttpResponse, NetError> {
        let parts = request.into_parts();
        let gate = CancellationGate::new(parts.signal);
        gate.check()?;

        self.state = LoadState::Preparing;
        let materialized = parts.body.materialize().await?;
        let mut headers = parts.headers;
        if let Some(content_type) = materialized.content_type {
            if !headers.contains("content-type") {
                headers.append("Content-Type", content_type);
            }
        }
        let body: Option<Bytes> = Some(materialized.bytes).filter(|b| !b.is_empty());

        let engine_config = self.config.engine_config(parts.proxy.as_deref())?;
        let bridge = CookieBridge::new(parts.cookie_store.or_else(|| self.config.cookie_store.clone()));
        let timeout = parts.timeout.or(self.config.timeout);
        let max_redirects = parts.max_redirects.unwrap_or(self.config.max_redirects);

        let mut url = parts.url;
        let mut method = parts.method;
        let mut chain = Vec::new();

        loop {
            self.state = LoadState::Preparing;
            if chain.len() > max_redirects {
                tracing::debug!(max = max_redirects, %url, "redirect budget exhausted");
                return Err(NetError::TooManyRedirects {
                    max: max_redirects,
                    attempted: chain.len(),
                    chain,
                });
            }
            gate.check()?;

            let mut hop_headers = headers.clone();
            bridge.inject(&url, &mut hop_headers).await;
            let hop = NormalizedRequest::new(url.clone(), method, hop_headers, body.clone(), timeout);

            self.state = LoadState::Requesting;
            let adapter = self.cache.get_client(&engine_config, bridge.store())?;
            let mut response = gate.run(|| adapter.perform(hop)).await?;
            bridge.ingest(&url, response.headers()).await;

            self.state = LoadState::Deciding;
            let status = response.status();
            if !self.config.follow_redirects || !(300..400).contains(&status) {
                self.state = LoadState::Returning;
                response.set_redirect_urls(chain);
                return Ok(response);
            }

            let location = response
                .headers()
                .get("location")
                .ok_or(NetError::MissingRedirectLocation)?;
            let next_url = url
                .join(location.trim())
                .map_err(|_| NetError::InvalidRedirect)?;
            let next_method = redirect_method(status, method);

            self.state = LoadState::Redirecting;
            tracing::debug!(status, from = %url, to = %next_url, method = %next_method, "following redirect");
            response.abort();
            drop(response);

            chain.push(next_url.clone());
            url = next_url;
            method = next_method;
        }
    }
}

/// Method for the next hop. 301/302 turn POST into GET; 303 turns
/// everything but HEAD into GET; every other status keeps the method.
pub fn redirect_method(status: u16, method: HttpMethod) -> HttpMethod {
    match status {
        301 | 302 if method == HttpMethod::Post => HttpMethod::Get,
        303 if method != HttpMethod::Head => HttpMethod::Get,
        _ => method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, EngineConfig, EngineFactory, Performing};
    use crate::http::{HeaderList, ResponseBody};
    use std::sync::Arc;

    /// Answers 200 to everything.
    struct OkEngine;

    impl Engine for OkEngine {
        fn perform(&self, request: NormalizedRequest) -> Performing {
            let url = request.url().clone();
            Box::pin(async move {
                Ok(HttpResponse::new(200, url, HeaderList::new(), ResponseBody::empty()))
            })
        }
    }

    struct OkFactory;

    impl EngineFactory for OkFactory {
        fn create(&self, _config: &EngineConfig) -> Result<Arc<dyn Engine>, NetError> {
            Ok(Arc::new(OkEngine))
        }
    }

    #[tokio::test]
    async fn test_state_ends_in_returning() {
        let config = ClientConfig::default();
        let cache = ClientCache::new(Arc::new(OkFactory), 1);
        let mut job = RedirectJob::new(&config, &cache);
        assert_eq!(job.state(), LoadState::Idle);
        assert!(!job.state().is_terminal());

        let request = Request::parse(HttpMethod::Get, "http://state.test/").unwrap();
        let response = job.run(request).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(job.state().is_terminal());
    }

    #[test]
    fn test_redirect_method_rewrite() {
        assert_eq!(redirect_method(301, HttpMethod::Post), HttpMethod::Get);
        assert_eq!(redirect_method(302, HttpMethod::Post), HttpMethod::Get);
        assert_eq!(redirect_method(302, HttpMethod::Put), HttpMethod::Put);
        assert_eq!(redirect_method(303, HttpMethod::Put), HttpMethod::Get);
        assert_eq!(redirect_method(303, HttpMethod::Head), HttpMethod::Head);
        assert_eq!(redirect_method(307, HttpMethod::Post), HttpMethod::Post);
        assert_eq!(redirect_method(308, HttpMethod::Delete), HttpMethod::Delete);
    }
}
