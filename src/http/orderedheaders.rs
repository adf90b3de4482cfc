use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// An ordered header list.
///
/// Keeps insertion order and duplicate names. Lookups are case-insensitive;
/// the original casing of every name is kept as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    headers: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Append a header, keeping any existing entries with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Replace every entry named `name` with a single entry at the position
    /// of the first one, or append if absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(idx) => {
                self.headers[idx].1 = value;
                let mut seen = 0usize;
                self.headers.retain(|(n, _)| {
                    if n.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.headers.push((name, value)),
        }
    }

    /// First value for `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Remove every entry named `name`, returning how many were dropped.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.headers.len();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.headers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Append every entry of `other` after the existing ones.
    pub fn extend(&mut self, other: HeaderList) {
        self.headers.extend(other.headers);
    }

    /// Build an `http::HeaderMap`, validating names and values.
    /// `http::HeaderMap` preserves insertion order per name.
    pub fn to_header_map(&self) -> Result<HeaderMap, NetError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = HeaderName::from_str(name).map_err(|_| NetError::InvalidHeader)?;
            let value = HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader)?;
            map.append(name, value);
        }
        Ok(map)
    }

    /// Build a list from an `http::HeaderMap`. Values that are not visible
    /// ASCII are decoded lossily.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let headers = map
            .iter()
            .map(|(name, value)| {
                let value = match value.to_str() {
                    Ok(s) => s.to_string(),
                    Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
                };
                (name.as_str().to_string(), value)
            })
            .collect();
        Self { headers }
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Any of the header shapes a caller may pass in.
#[derive(Debug, Clone, Default)]
pub struct HeaderInput {
    pairs: Vec<(String, String)>,
}

impl HeaderInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl From<HashMap<String, String>> for HeaderInput {
    fn from(map: HashMap<String, String>) -> Self {
        Self {
            pairs: map.into_iter().collect(),
        }
    }
}

impl From<HashMap<String, Vec<String>>> for HeaderInput {
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        Self {
            pairs: expand(map),
        }
    }
}

impl From<BTreeMap<String, String>> for HeaderInput {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self {
            pairs: map.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, Vec<String>>> for HeaderInput {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            pairs: expand(map),
        }
    }
}

impl<K, V> From<Vec<(K, V)>> for HeaderInput
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for HeaderInput
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HeaderMap> for HeaderInput {
    fn from(map: HeaderMap) -> Self {
        Self {
            pairs: HeaderList::from_header_map(&map).headers,
        }
    }
}

impl From<&HeaderMap> for HeaderInput {
    fn from(map: &HeaderMap) -> Self {
        Self {
            pairs: HeaderList::from_header_map(map).headers,
        }
    }
}

impl From<HeaderList> for HeaderInput {
    fn from(list: HeaderList) -> Self {
        Self {
            pairs: list.headers,
        }
    }
}

fn expand<I>(map: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, Vec<String>)>,
{
    map.into_iter()
        .flat_map(|(name, values)| values.into_iter().map(move |v| (name.clone(), v)))
        .collect()
}

/// Convert any accepted header shape into a `HeaderList`. Nothing is dropped:
/// multi-valued entries become repeated pairs in order.
pub fn canonicalize(input: impl Into<HeaderInput>) -> HeaderList {
    HeaderList {
        headers: input.into().pairs,
    }
}
