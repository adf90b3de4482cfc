//! Cookie handling.
//!
//! | Piece | Responsibility |
//! |-------|----------------|
//! | [`CookieStore`] | application-owned storage, async |
//! | [`CookieBridge`] | injects `Cookie` before a hop, forwards `Set-Cookie` after it |
//! | [`CookieJar`] | bundled in-memory store with JSON persistence |
//! | [`CanonicalCookie`] | one parsed cookie with RFC 6265 matching |
//!
//! ```rust,no_run
//! use fetchnet::cookies::CookieJar;
//! use url::Url;
//!
//! let jar = CookieJar::new();
//! let url = Url::parse("https://example.com/").unwrap();
//! jar.set_cookie("session=abc; Path=/", &url).unwrap();
//! assert_eq!(jar.header_value(&url).as_deref(), Some("session=abc"));
//! ```

pub mod bridge;
pub mod canonicalcookie;
pub mod jar;
pub mod store;

pub use self::bridge::CookieBridge;
pub use self::canonicalcookie::CanonicalCookie;
pub use self::jar::CookieJar;
pub use self::store::{same_store, CookieFuture, CookieStore, CookieStoreError};
