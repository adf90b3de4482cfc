//! Browser profiles.
//!
//! Maps a browser name to the default request headers that browser sends.
//! Bare family names resolve to the current default version:
//! - `chrome` → `chrome142`
//! - `firefox` → `firefox144`
//!
//! Any other name is kept verbatim as a custom profile with no default
//! headers of its own.

use crate::http::HeaderList;
use std::fmt;

pub const DEFAULT_CHROME_VERSION: u16 = 142;
pub const DEFAULT_FIREFOX_VERSION: u16 = 144;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BrowserProfile {
    Chrome(u16),
    Firefox(u16),
    Custom(String),
}

impl BrowserProfile {
    /// Parse and normalize a profile name.
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        let lower = trimmed.to_ascii_lowercase();

        if lower == "chrome" {
            return BrowserProfile::Chrome(DEFAULT_CHROME_VERSION);
        }
        if lower == "firefox" {
            return BrowserProfile::Firefox(DEFAULT_FIREFOX_VERSION);
        }
        if let Some(v) = lower.strip_prefix("chrome").and_then(|v| v.parse().ok()) {
            return BrowserProfile::Chrome(v);
        }
        if let Some(v) = lower.strip_prefix("firefox").and_then(|v| v.parse().ok()) {
            return BrowserProfile::Firefox(v);
        }
        BrowserProfile::Custom(trimmed.to_string())
    }

    /// Canonical profile name.
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Headers the browser sends on a top-level navigation, in order.
    /// Accept-Encoding is omitted; response bodies are passed through
    /// undecoded.
    pub fn default_headers(&self) -> HeaderList {
        match self {
            BrowserProfile::Chrome(v) => chrome_headers(*v),
            BrowserProfile::Firefox(v) => firefox_headers(*v),
            BrowserProfile::Custom(_) => HeaderList::new(),
        }
    }

    pub fn user_agent(&self) -> Option<String> {
        match self {
            BrowserProfile::Chrome(v) => Some(format!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36",
                v
            )),
            BrowserProfile::Firefox(v) => Some(format!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:{}.0) Gecko/20100101 Firefox/{}.0",
                v, v
            )),
            BrowserProfile::Custom(_) => None,
        }
    }
}

impl fmt::Display for BrowserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserProfile::Chrome(v) => write!(f, "chrome{}", v),
            BrowserProfile::Firefox(v) => write!(f, "firefox{}", v),
            BrowserProfile::Custom(name) => f.write_str(name),
        }
    }
}

/// Normalize a browser name (`chrome` → `chrome142`, others passthrough).
pub fn normalize_browser(name: &str) -> String {
    BrowserProfile::parse(name).name()
}

/// Generate Sec-CH-UA header value for Chrome.
///
/// Format: `"Brand";v="version", ...`
pub fn generate_sec_ch_ua(version: u16) -> String {
    format!(
        "\"Chromium\";v=\"{v}\", \"Google Chrome\";v=\"{v}\", \"Not_A Brand\";v=\"99\"",
        v = version
    )
}

fn chrome_headers(version: u16) -> HeaderList {
    let mut headers = HeaderList::new();
    headers.append("sec-ch-ua", generate_sec_ch_ua(version));
    headers.append("sec-ch-ua-mobile", "?0");
    headers.append("sec-ch-ua-platform", "\"Windows\"");
    headers.append("Upgrade-Insecure-Requests", "1");
    if let Some(ua) = BrowserProfile::Chrome(version).user_agent() {
        headers.append("User-Agent", ua);
    }
    headers.append(
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    );
    headers.append("Sec-Fetch-Site", "none");
    headers.append("Sec-Fetch-Mode", "navigate");
    headers.append("Sec-Fetch-User", "?1");
    headers.append("Sec-Fetch-Dest", "document");
    headers.append("Accept-Language", "en-US,en;q=0.9");
    headers
}

fn firefox_headers(version: u16) -> HeaderList {
    let mut headers = HeaderList::new();
    if let Some(ua) = BrowserProfile::Firefox(version).user_agent() {
        headers.append("User-Agent", ua);
    }
    headers.append(
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    );
    headers.append("Accept-Language", "en-US,en;q=0.5");
    headers.append("Upgrade-Insecure-Requests", "1");
    headers.append("Sec-Fetch-Dest", "document");
    headers.append("Sec-Fetch-Mode", "navigate");
    headers.append("Sec-Fetch-Site", "none");
    headers.append("Sec-Fetch-User", "?1");
    headers.append("Priority", "u=0, i");
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_names_normalize() {
        assert_eq!(normalize_browser("chrome"), "chrome142");
        assert_eq!(normalize_browser("Chrome"), "chrome142");
        assert_eq!(normalize_browser("firefox"), "firefox144");
        assert_eq!(normalize_browser("Firefox"), "firefox144");
    }

    #[test]
    fn test_versioned_and_custom_passthrough() {
        assert_eq!(BrowserProfile::parse("chrome131"), BrowserProfile::Chrome(131));
        assert_eq!(normalize_browser("safari18_0"), "safari18_0");
        assert!(BrowserProfile::parse("edge101").default_headers().is_empty());
    }

    #[test]
    fn test_chrome_headers() {
        let headers = BrowserProfile::Chrome(142).default_headers();
        assert!(headers.get("user-agent").unwrap().contains("Chrome/142.0.0.0"));
        assert!(headers.get("sec-ch-ua").unwrap().contains("Google Chrome"));
        assert!(!headers.contains("accept-encoding"));
    }

    #[test]
    fn test_firefox_headers() {
        let headers = BrowserProfile::Firefox(144).default_headers();
        assert!(headers.get("User-Agent").unwrap().contains("Firefox/144.0"));
        assert!(!headers.contains("sec-ch-ua"));
    }
}
