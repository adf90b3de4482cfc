use super::store::CookieStoreError;
use psl::{List, Psl};
use time::OffsetDateTime;
use url::Url;

/// A parsed cookie bound to the domain and path it applies to.
/// Modeled after Chromium's `net::CanonicalCookie`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub creation_time: OffsetDateTime,
    pub expiration_time: Option<OffsetDateTime>,
    pub secure: bool,
    pub http_only: bool,
    pub host_only: bool,
}

impl CanonicalCookie {
    /// Parse a raw `Set-Cookie` value received from `url`.
    ///
    /// A cookie with `Max-Age <= 0` or a past `Expires` parses fine and
    /// comes back already expired; the jar treats it as a deletion.
    pub fn parse(line: &str, url: &Url, now: OffsetDateTime) -> Result<Self, CookieStoreError> {
        let parsed = cookie::Cookie::parse(line.trim())
            .map_err(|e| CookieStoreError::Malformed(e.to_string()))?;
        if parsed.name().is_empty() {
            return Err(CookieStoreError::Malformed("empty cookie name".into()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| CookieStoreError::Rejected("url has no host".into()))?
            .trim_matches(|c| c == '[' || c == ']')
            .to_ascii_lowercase();

        let (domain, host_only) = match parsed.domain() {
            Some(d) if !d.is_empty() => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                if d == host {
                    // A public suffix may only name itself, as a host-only cookie.
                    (d, is_public_suffix(&host))
                } else if is_public_suffix(&d) {
                    return Err(CookieStoreError::Rejected(format!(
                        "domain {} is a public suffix",
                        d
                    )));
                } else if !domain_matches(&d, &host, false) {
                    return Err(CookieStoreError::Rejected(format!(
                        "domain {} does not match host {}",
                        d, host
                    )));
                } else {
                    (d, false)
                }
            }
            _ => (host, true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url.path()),
        };

        // Max-Age wins over Expires.
        let expiration_time = match parsed.max_age() {
            Some(age) if age.is_positive() => now.checked_add(age),
            Some(_) => Some(OffsetDateTime::UNIX_EPOCH),
            None => parsed.expires_datetime(),
        };

        let cookie = CanonicalCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            creation_time: now,
            expiration_time,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            host_only,
        };
        cookie.validate_prefix(url.scheme() == "https")?;
        Ok(cookie)
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expiration_time.is_some_and(|expiry| expiry <= now)
    }

    /// Whether this cookie should be sent to `url` at `now`.
    pub fn matches_url(&self, url: &Url, now: OffsetDateTime) -> bool {
        let host = url.host_str().unwrap_or("").trim_matches(|c| c == '[' || c == ']');
        domain_matches(&self.domain, host, self.host_only)
            && path_matches(&self.path, url.path())
            && (!self.secure || url.scheme() == "https")
            && !self.is_expired(now)
    }

    /// `__Secure-` needs the Secure flag from a secure origin; `__Host-`
    /// additionally needs `Path=/` and no Domain attribute.
    fn validate_prefix(&self, secure_origin: bool) -> Result<(), CookieStoreError> {
        if self.name.starts_with("__Secure-") && (!self.secure || !secure_origin) {
            return Err(CookieStoreError::Rejected("__Secure- prefix requirements".into()));
        }
        if self.name.starts_with("__Host-")
            && (!self.secure || self.path != "/" || !self.host_only || !secure_origin)
        {
            return Err(CookieStoreError::Rejected("__Host- prefix requirements".into()));
        }
        Ok(())
    }
}

/// Whether `domain` is itself a public suffix (`com`, `co.uk`, ...).
pub fn is_public_suffix(domain: &str) -> bool {
    let lower = domain.to_ascii_lowercase();
    List.suffix(lower.as_bytes())
        .is_some_and(|suffix| suffix.is_known() && suffix.as_bytes() == lower.as_bytes())
}

/// RFC 6265 domain matching. Host-only cookies need an exact match.
pub fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
    if cookie_domain.eq_ignore_ascii_case(request_host) {
        return true;
    }
    if host_only || request_host.len() <= cookie_domain.len() {
        return false;
    }
    let split = request_host.len() - cookie_domain.len();
    request_host.is_char_boundary(split)
        && request_host[split..].eq_ignore_ascii_case(cookie_domain)
        && request_host.as_bytes()[split - 1] == b'.'
}

/// RFC 6265 path matching.
pub fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// RFC 6265 default-path: the request path up to, not including, its last `/`.
fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_host_only_default() {
        let now = OffsetDateTime::now_utc();
        let c = CanonicalCookie::parse("sid=1", &url("https://www.example.com/a/b"), now).unwrap();
        assert_eq!(c.domain, "www.example.com");
        assert!(c.host_only);
        assert_eq!(c.path, "/a");
        assert!(c.matches_url(&url("https://www.example.com/a/c"), now));
        assert!(!c.matches_url(&url("https://sub.www.example.com/a"), now));
    }

    #[test]
    fn test_domain_attribute() {
        let now = OffsetDateTime::now_utc();
        let c = CanonicalCookie::parse(
            "sid=1; Domain=.example.com; Path=/",
            &url("https://www.example.com/"),
            now,
        )
        .unwrap();
        assert_eq!(c.domain, "example.com");
        assert!(!c.host_only);
        assert!(c.matches_url(&url("https://api.example.com/x"), now));
        assert!(!c.matches_url(&url("https://badexample.com/"), now));
    }

    #[test]
    fn test_public_suffix_rejected() {
        let now = OffsetDateTime::now_utc();
        let err = CanonicalCookie::parse("a=1; Domain=com", &url("https://example.com/"), now);
        assert!(matches!(err, Err(CookieStoreError::Rejected(_))));
        let err = CanonicalCookie::parse("a=1; Domain=co.uk", &url("https://bbc.co.uk/"), now);
        assert!(matches!(err, Err(CookieStoreError::Rejected(_))));
    }

    #[test]
    fn test_foreign_domain_rejected() {
        let now = OffsetDateTime::now_utc();
        let err = CanonicalCookie::parse("a=1; Domain=other.com", &url("https://example.com/"), now);
        assert!(matches!(err, Err(CookieStoreError::Rejected(_))));
    }

    #[test]
    fn test_max_age_zero_is_expired() {
        let now = OffsetDateTime::now_utc();
        let c = CanonicalCookie::parse("a=1; Max-Age=0", &url("https://example.com/"), now).unwrap();
        assert!(c.is_expired(now));
        let c = CanonicalCookie::parse("a=1; Max-Age=60", &url("https://example.com/"), now).unwrap();
        assert!(!c.is_expired(now));
    }

    #[test]
    fn test_secure_cookie_needs_https() {
        let now = OffsetDateTime::now_utc();
        let c = CanonicalCookie::parse("a=1; Secure", &url("https://example.com/"), now).unwrap();
        assert!(!c.matches_url(&url("http://example.com/"), now));
    }

    #[test]
    fn test_prefixes() {
        let now = OffsetDateTime::now_utc();
        let https = url("https://example.com/");
        assert!(CanonicalCookie::parse("__Secure-a=1", &https, now).is_err());
        assert!(CanonicalCookie::parse("__Secure-a=1; Secure", &https, now).is_ok());
        assert!(CanonicalCookie::parse("__Host-a=1; Secure; Path=/", &https, now).is_ok());
        assert!(CanonicalCookie::parse(
            "__Host-a=1; Secure; Path=/; Domain=example.com",
            &https,
            now
        )
        .is_err());
    }

    #[test]
    fn test_path_matching() {
        assert!(path_matches("/", "/anything"));
        assert!(path_matches("/docs", "/docs/web"));
        assert!(path_matches("/docs/", "/docs/web"));
        assert!(!path_matches("/docs", "/docsets"));
        assert!(!path_matches("/docs", "/"));
    }

    #[test]
    fn test_malformed() {
        let now = OffsetDateTime::now_utc();
        assert!(matches!(
            CanonicalCookie::parse("novalue", &url("https://example.com/"), now),
            Err(CookieStoreError::Malformed(_))
        ));
    }
}
