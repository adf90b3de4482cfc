//! # fetchnet
//!
//! A fetch-style HTTP client façade over a pluggable request engine.
//!
//! The engine issues exactly one request and returns status, headers and a
//! body stream. `fetchnet` adds what a fetch client needs on top:
//!
//! - **Bodies**: text, URL-encoded forms, bytes, blobs, multipart forms,
//!   streams and JSON, materialized once with an inferred Content-Type
//! - **Headers**: maps, pair lists and `http::HeaderMap`s canonicalized into
//!   one ordered list
//! - **Redirects**: followed hop by hop with 301/302/303 method rewrite and a
//!   budget checked before each hop
//! - **Cookies**: any async [`CookieStore`](cookies::CookieStore), bridged
//!   on every hop
//! - **Cancellation**: [`AbortController`] signals that reach into response
//!   bodies
//! - **Engine reuse**: a per-client LRU cache keyed by engine configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fetchnet::{Client, cookies::CookieJar};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fetchnet::NetError> {
//!     let client = Client::builder()
//!         .browser("chrome")
//!         .cookie_store(Arc::new(CookieJar::new()))
//!         .build();
//!     let response = client.get("https://example.com").send().await?;
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy and job states
//! - [`cookies`] - Cookie store boundary, bridge and in-memory jar
//! - [`emulation`] - Browser profile names and default headers
//! - [`engine`] - Engine boundary and the bundled hyper engine
//! - [`http`] - Methods, headers, request bodies and responses
//! - [`urlrequest`] - Configuration, engine cache, cancellation, redirects

pub mod base;
pub mod client;
pub mod cookies;
pub mod emulation;
pub mod engine;
pub mod http;
pub mod urlrequest;

pub use base::neterror::NetError;
pub use client::{
    Client, ClientBuilder, ParsedResponse, RequestBuilder, ResponseData, ResponseType,
    StreamingResponse,
};
pub use http::{Blob, Form, FormParams, HttpMethod, HttpResponse, Part, RequestBody};
pub use urlrequest::{AbortController, AbortSignal, ClientConfig, Request};
