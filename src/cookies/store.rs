//! The cookie store boundary.
//!
//! A [`CookieStore`] is owned by the application. The client only asks it
//! for a `Cookie` header value before each hop and hands it every raw
//! `Set-Cookie` line after each hop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Failures reported by a cookie store. These never fail a request; the
/// client logs them and carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CookieStoreError {
    #[error("malformed cookie: {0}")]
    Malformed(String),

    #[error("cookie rejected: {0}")]
    Rejected(String),

    #[error("cookie store backend failed: {0}")]
    Backend(String),
}

/// Alias for the `Future` type returned by a cookie store.
pub type CookieFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CookieStoreError>> + Send + 'a>>;

/// Asynchronous cookie storage.
pub trait CookieStore: Send + Sync {
    /// The `Cookie` header value to send to `url`, if any.
    fn cookie_header_for<'a>(&'a self, url: &'a Url) -> CookieFuture<'a, Option<String>>;

    /// Record one raw `Set-Cookie` header value received from `url`.
    fn store_cookie<'a>(&'a self, set_cookie: &'a str, url: &'a Url) -> CookieFuture<'a, ()>;
}

/// Whether two handles point at the same store object.
pub fn same_store(a: &Arc<dyn CookieStore>, b: &Arc<dyn CookieStore>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}
