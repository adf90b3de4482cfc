use super::store::CookieStore;
use crate::http::HeaderList;
use std::sync::Arc;
use url::Url;

/// Moves cookies between a [`CookieStore`] and each redirect hop.
///
/// Store failures are logged and swallowed; they never fail a request.
#[derive(Clone, Default)]
pub struct CookieBridge {
    store: Option<Arc<dyn CookieStore>>,
}

impl std::fmt::Debug for CookieBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieBridge")
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl CookieBridge {
    pub fn new(store: Option<Arc<dyn CookieStore>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Option<&Arc<dyn CookieStore>> {
        self.store.as_ref()
    }

    /// Append a `Cookie` header for `url` unless the request already
    /// carries one. Returns whether a header was added.
    pub async fn inject(&self, url: &Url, headers: &mut HeaderList) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        if headers.contains("cookie") {
            return false;
        }

        match store.cookie_header_for(url).await {
            Ok(Some(value)) if !value.is_empty() => {
                headers.append("Cookie", value);
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(%url, error = %e, "cookie lookup failed");
                false
            }
        }
    }

    /// Hand every `Set-Cookie` value to the store, in order, one at a time.
    /// Returns how many the store accepted.
    pub async fn ingest(&self, url: &Url, headers: &HeaderList) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };

        let mut accepted = 0;
        for value in headers.get_all("set-cookie") {
            match store.store_cookie(value, url).await {
                Ok(()) => accepted += 1,
                Err(e) => tracing::warn!(%url, error = %e, "failed to store cookie"),
            }
        }
        accepted
    }
}
