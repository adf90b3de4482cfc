//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use fetchnet::engine::{Engine, EngineConfig, EngineFactory, NormalizedRequest, Performing};
use fetchnet::http::{HeaderList, HttpResponse, ResponseBody};
use fetchnet::{Client, ClientConfig, NetError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

type Handler = dyn Fn(&NormalizedRequest) -> Result<HttpResponse, NetError> + Send + Sync;

/// Engine answering from a closure and recording every request it sees.
pub struct MockEngine {
    handler: Box<Handler>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<NormalizedRequest>>,
}

impl MockEngine {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&NormalizedRequest) -> Result<HttpResponse, NetError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Like `new`, but every response arrives after `delay`.
    pub fn delayed<F>(delay: Duration, handler: F) -> Arc<Self>
    where
        F: Fn(&NormalizedRequest) -> Result<HttpResponse, NetError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<NormalizedRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Engine for MockEngine {
    fn perform(&self, request: NormalizedRequest) -> Performing {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        let result = (self.handler)(&request);
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

/// Factory handing out the same mock engine and counting creations.
pub struct MockFactory {
    engine: Arc<MockEngine>,
    created: AtomicUsize,
    configs: Mutex<Vec<EngineConfig>>,
}

impl MockFactory {
    pub fn new(engine: Arc<MockEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            created: AtomicUsize::new(0),
            configs: Mutex::new(Vec::new()),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn configs(&self) -> Vec<EngineConfig> {
        self.configs.lock().unwrap().clone()
    }
}

impl EngineFactory for MockFactory {
    fn create(&self, config: &EngineConfig) -> Result<Arc<dyn Engine>, NetError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(config.clone());
        let engine: Arc<dyn Engine> = self.engine.clone();
        Ok(engine)
    }
}

pub fn client_with(engine: Arc<MockEngine>, config: ClientConfig) -> (Client, Arc<MockFactory>) {
    let factory = MockFactory::new(engine);
    let client = Client::builder()
        .config(config)
        .engine_factory(factory.clone())
        .build();
    (client, factory)
}

pub fn respond(url: &Url, status: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
    let mut list = HeaderList::new();
    for (name, value) in headers {
        list.append(*name, *value);
    }
    HttpResponse::new(status, url.clone(), list, ResponseBody::from_bytes(body.to_string()))
}

pub fn redirect(url: &Url, status: u16, location: &str) -> HttpResponse {
    respond(url, status, &[("Location", location)], "")
}

pub fn ok(url: &Url, body: &str) -> HttpResponse {
    respond(url, 200, &[], body)
}
