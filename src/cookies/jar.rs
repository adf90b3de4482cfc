use super::canonicalcookie::CanonicalCookie;
use super::store::{CookieFuture, CookieStore, CookieStoreError};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use time::OffsetDateTime;
use url::Url;

/// Maximum cookies per domain (Chromium default).
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// Maximum cookies in one jar.
const MAX_COOKIES_TOTAL: usize = 3000;

/// In-memory cookie jar.
///
/// Cookies are keyed by domain. Lookups walk the host and its parent
/// domains, then filter on domain, path, Secure and expiry. Results come
/// back longest path first, then oldest first.
#[derive(Debug, Default)]
pub struct CookieJar {
    store: DashMap<String, Vec<CanonicalCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and store one `Set-Cookie` line. An already-expired cookie
    /// deletes any stored cookie with the same name, domain and path.
    pub fn set_cookie(&self, line: &str, url: &Url) -> Result<(), CookieStoreError> {
        let now = OffsetDateTime::now_utc();
        let cookie = CanonicalCookie::parse(line, url, now)?;
        if cookie.is_expired(now) {
            self.remove_matching(&cookie);
            return Ok(());
        }
        self.insert(cookie);
        Ok(())
    }

    /// Insert a cookie, replacing one with the same name, path and host-only
    /// flag. A replacement keeps the original creation time.
    pub fn insert(&self, mut cookie: CanonicalCookie) {
        let mut entry = self.store.entry(cookie.domain.clone()).or_default();

        if let Some(pos) = entry.iter().position(|c| same_identity(c, &cookie)) {
            cookie.creation_time = entry[pos].creation_time;
            entry.remove(pos);
        }

        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            match oldest_index(&entry) {
                Some(idx) => {
                    entry.remove(idx);
                }
                None => break,
            }
        }
        entry.push(cookie);
        drop(entry);

        self.enforce_global_limit();
    }

    fn remove_matching(&self, cookie: &CanonicalCookie) {
        if let Some(mut entry) = self.store.get_mut(&cookie.domain) {
            entry.retain(|c| !same_identity(c, cookie));
        }
    }

    fn enforce_global_limit(&self) {
        while self.len() > MAX_COOKIES_TOTAL {
            let oldest = self
                .store
                .iter()
                .filter_map(|entry| {
                    oldest_index(entry.value())
                        .map(|idx| (entry.key().clone(), idx, entry.value()[idx].creation_time))
                })
                .min_by_key(|(_, _, created)| *created);

            match oldest {
                Some((domain, idx, _)) => {
                    if let Some(mut entry) = self.store.get_mut(&domain) {
                        if idx < entry.len() {
                            entry.remove(idx);
                        }
                    }
                }
                None => break,
            }
        }
    }

    /// Cookies that apply to `url`, in send order.
    pub fn cookies_for_url(&self, url: &Url) -> Vec<CanonicalCookie> {
        let host = url
            .host_str()
            .unwrap_or("")
            .trim_matches(|c| c == '[' || c == ']')
            .to_ascii_lowercase();
        let now = OffsetDateTime::now_utc();

        let mut result: Vec<CanonicalCookie> = candidate_domains(&host)
            .iter()
            .filter_map(|domain| self.store.get(domain))
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|c| c.matches_url(url, now))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        result.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });
        result
    }

    /// `Cookie` header value for `url`, or `None` when nothing applies.
    pub fn header_value(&self, url: &Url) -> Option<String> {
        let cookies = self.cookies_for_url(url);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Every stored cookie, expired ones included.
    pub fn cookies(&self) -> Vec<CanonicalCookie> {
        self.store
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    /// Write unexpired cookies to `path` as JSON.
    pub fn save_json(&self, path: &Path) -> io::Result<()> {
        let now = OffsetDateTime::now_utc();
        let persisted: Vec<PersistentCookie> = self
            .cookies()
            .into_iter()
            .filter(|c| !c.is_expired(now))
            .map(PersistentCookie::from)
            .collect();

        let json = serde_json::to_string_pretty(&persisted)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    /// Load a jar written by [`CookieJar::save_json`], skipping anything
    /// that has expired since.
    pub fn load_json(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        let persisted: Vec<PersistentCookie> =
            serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let jar = CookieJar::new();
        let now = OffsetDateTime::now_utc();
        for pc in persisted {
            let cookie = pc.into_cookie(now);
            if !cookie.is_expired(now) {
                jar.insert(cookie);
            }
        }
        Ok(jar)
    }
}

impl CookieStore for CookieJar {
    fn cookie_header_for<'a>(&'a self, url: &'a Url) -> CookieFuture<'a, Option<String>> {
        Box::pin(async move { Ok(self.header_value(url)) })
    }

    fn store_cookie<'a>(&'a self, set_cookie: &'a str, url: &'a Url) -> CookieFuture<'a, ()> {
        Box::pin(async move { self.set_cookie(set_cookie, url) })
    }
}

fn same_identity(a: &CanonicalCookie, b: &CanonicalCookie) -> bool {
    a.name == b.name && a.path == b.path && a.host_only == b.host_only
}

fn oldest_index(cookies: &[CanonicalCookie]) -> Option<usize> {
    cookies
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| c.creation_time)
        .map(|(i, _)| i)
}

/// The host itself and each parent domain.
fn candidate_domains(host: &str) -> Vec<String> {
    let mut domains = vec![host.to_string()];
    if host.parse::<std::net::IpAddr>().is_ok() {
        return domains;
    }
    let parts: Vec<&str> = host.split('.').collect();
    for i in 1..parts.len() {
        domains.push(parts[i..].join("."));
    }
    domains
}

/// On-disk form of a cookie.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct PersistentCookie {
    name: String,
    value: String,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
    host_only: bool,
    expires_unix_secs: Option<i64>,
}

impl From<CanonicalCookie> for PersistentCookie {
    fn from(c: CanonicalCookie) -> Self {
        Self {
            name: c.name,
            value: c.value,
            domain: c.domain,
            path: c.path,
            secure: c.secure,
            http_only: c.http_only,
            host_only: c.host_only,
            expires_unix_secs: c.expiration_time.map(|t| t.unix_timestamp()),
        }
    }
}

impl PersistentCookie {
    fn into_cookie(self, now: OffsetDateTime) -> CanonicalCookie {
        CanonicalCookie {
            name: self.name,
            value: self.value,
            domain: self.domain,
            path: self.path,
            creation_time: now,
            expiration_time: self
                .expires_unix_secs
                .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok()),
            secure: self.secure,
            http_only: self.http_only,
            host_only: self.host_only,
        }
    }
}
