//! Request bodies and their materialization into bytes.
//!
//! Every body the client accepts is turned into one contiguous [`Bytes`]
//! buffer plus an optional inferred content type before the first hop, so
//! the same bytes can be replayed when a redirect preserves the method.

use crate::base::neterror::NetError;
use crate::http::multipart::Form;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::any::Any;
use std::fmt;

pub const TEXT_PLAIN_UTF8: &str = "text/plain;charset=UTF-8";
pub const FORM_URLENCODED_UTF8: &str = "application/x-www-form-urlencoded;charset=UTF-8";
pub const APPLICATION_JSON: &str = "application/json";

/// Ordered `application/x-www-form-urlencoded` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serialize with `+` for spaces and percent-encoding elsewhere.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Immutable binary data with an optional declared media type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    content_type: Option<String>,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            content_type: None,
        }
    }

    /// Set the declared type. An empty string means "no type".
    pub fn with_type(mut self, content_type: impl Into<String>) -> Self {
        let ct = content_type.into();
        self.content_type = if ct.is_empty() { None } else { Some(ct) };
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Bytes, Option<String>) {
        (self.data, self.content_type)
    }
}

/// A body stream of byte chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Request body accepted by the client.
#[derive(Default)]
pub enum RequestBody {
    /// No body (GET, HEAD, DELETE).
    #[default]
    Empty,
    /// UTF-8 text.
    Text(String),
    /// URL-encoded form parameters.
    Form(FormParams),
    /// Raw bytes, sent verbatim.
    Bytes(Bytes),
    /// Bytes with a declared type.
    Blob(Blob),
    /// Multipart form data.
    Multipart(Form),
    /// A chunk stream, buffered in full before sending.
    Stream(BodyStream),
    /// A JSON document.
    Json(serde_json::Value),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Text(s) => f.debug_tuple("Text").field(&s.len()).finish(),
            RequestBody::Form(p) => f.debug_tuple("Form").field(p).finish(),
            RequestBody::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            RequestBody::Blob(b) => f.debug_tuple("Blob").field(&b.len()).finish(),
            RequestBody::Multipart(m) => f.debug_tuple("Multipart").field(&m.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
            RequestBody::Json(_) => f.write_str("Json(..)"),
        }
    }
}

/// The bytes to send and the content type inferred from the body variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializedBody {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Text(s)
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl From<FormParams> for RequestBody {
    fn from(p: FormParams) -> Self {
        RequestBody::Form(p)
    }
}

impl From<Blob> for RequestBody {
    fn from(b: Blob) -> Self {
        RequestBody::Blob(b)
    }
}

impl From<Form> for RequestBody {
    fn from(f: Form) -> Self {
        RequestBody::Multipart(f)
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(v: serde_json::Value) -> Self {
        RequestBody::Json(v)
    }
}

impl RequestBody {
    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Wrap a chunk stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        RequestBody::Stream(stream.boxed())
    }

    /// Accept a dynamically-typed body value.
    ///
    /// Recognizes `String`, `&'static str`, `Vec<u8>`, `Bytes`, [`FormParams`],
    /// [`Blob`], [`Form`], `serde_json::Value` and `RequestBody`. Any other type
    /// fails with [`NetError::UnsupportedBodyType`].
    pub fn from_any<T: Any + Send>(value: T) -> Result<Self, NetError> {
        let type_name = std::any::type_name::<T>();
        let boxed: Box<dyn Any + Send> = Box::new(value);

        let boxed = match boxed.downcast::<RequestBody>() {
            Ok(b) => return Ok(*b),
            Err(b) => b,
        };
        let boxed = match boxed.downcast::<String>() {
            Ok(s) => return Ok(RequestBody::Text(*s)),
            Err(b) => b,
        };
        let boxed = match boxed.downcast::<&'static str>() {
            Ok(s) => return Ok(RequestBody::Text((*s).to_owned())),
            Err(b) => b,
        };
        let boxed = match boxed.downcast::<Vec<u8>>() {
            Ok(v) => return Ok(RequestBody::Bytes(Bytes::from(*v))),
            Err(b) => b,
        };
        let boxed = match boxed.downcast::<Bytes>() {
            Ok(b) => return Ok(RequestBody::Bytes(*b)),
            Err(b) => b,
        };
        let boxed = match boxed.downcast::<FormParams>() {
            Ok(p) => return Ok(RequestBody::Form(*p)),
            Err(b) => b,
        };
        let boxed = match boxed.downcast::<Blob>() {
            Ok(b) => return Ok(RequestBody::Blob(*b)),
            Err(b) => b,
        };
        let boxed = match boxed.downcast::<Form>() {
            Ok(f) => return Ok(RequestBody::Multipart(*f)),
            Err(b) => b,
        };
        match boxed.downcast::<serde_json::Value>() {
            Ok(v) => Ok(RequestBody::Json(*v)),
            Err(_) => Err(NetError::UnsupportedBodyType(type_name.to_string())),
        }
    }

    /// Convert the body into bytes and an inferred content type.
    pub async fn materialize(self) -> Result<MaterializedBody, NetError> {
        let (bytes, content_type) = match self {
            RequestBody::Empty => (Bytes::new(), None),
            RequestBody::Text(s) => (Bytes::from(s), Some(TEXT_PLAIN_UTF8.to_string())),
            RequestBody::Form(params) => (
                Bytes::from(params.encode()),
                Some(FORM_URLENCODED_UTF8.to_string()),
            ),
            RequestBody::Bytes(b) => (Bytes::copy_from_slice(&b), None),
            RequestBody::Blob(blob) => blob.into_parts(),
            RequestBody::Multipart(form) => {
                let content_type = form.content_type();
                (form.into_body().await?, Some(content_type))
            }
            RequestBody::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|_| NetError::HttpBodyError)?;
                    buf.extend_from_slice(&chunk);
                }
                (buf.freeze(), None)
            }
            RequestBody::Json(value) => {
                let encoded = serde_json::to_vec(&value).map_err(|_| NetError::JsonParseError)?;
                (Bytes::from(encoded), Some(APPLICATION_JSON.to_string()))
            }
        };

        Ok(MaterializedBody {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::stream;

    #[test]
    fn test_empty_body() {
        let body = RequestBody::Empty;
        assert!(body.is_empty());
        let m = block_on(body.materialize()).unwrap();
        assert!(m.bytes.is_empty());
        assert_eq!(m.content_type, None);
    }

    #[test]
    fn test_text_body() {
        let m = block_on(RequestBody::from("héllo").materialize()).unwrap();
        assert_eq!(&m.bytes[..], "héllo".as_bytes());
        assert_eq!(m.content_type.as_deref(), Some(TEXT_PLAIN_UTF8));
    }

    #[test]
    fn test_form_params_body() {
        let params = FormParams::new().with("a", "1").with("b", "x y&z");
        let m = block_on(RequestBody::from(params).materialize()).unwrap();
        assert_eq!(&m.bytes[..], b"a=1&b=x+y%26z");
        assert_eq!(m.content_type.as_deref(), Some(FORM_URLENCODED_UTF8));
    }

    #[test]
    fn test_bytes_body_has_no_type() {
        let m = block_on(RequestBody::from(vec![0u8, 255, 7]).materialize()).unwrap();
        assert_eq!(&m.bytes[..], &[0u8, 255, 7]);
        assert_eq!(m.content_type, None);
    }

    #[test]
    fn test_blob_body_keeps_declared_type() {
        let blob = Blob::new(b"<p/>".as_slice()).with_type("text/html");
        let m = block_on(RequestBody::from(blob).materialize()).unwrap();
        assert_eq!(&m.bytes[..], b"<p/>");
        assert_eq!(m.content_type.as_deref(), Some("text/html"));

        let untyped = Blob::new(b"x".as_slice()).with_type("");
        let m = block_on(RequestBody::from(untyped).materialize()).unwrap();
        assert_eq!(m.content_type, None);
    }

    #[test]
    fn test_stream_body_concatenates_in_order() {
        let chunks = vec![
            Ok(Bytes::from_static(b"one,")),
            Ok(Bytes::from_static(b"two,")),
            Ok(Bytes::from_static(b"three")),
        ];
        let m = block_on(RequestBody::stream(stream::iter(chunks)).materialize()).unwrap();
        assert_eq!(&m.bytes[..], b"one,two,three");
        assert_eq!(m.content_type, None);
    }

    #[test]
    fn test_json_body() {
        let m = block_on(RequestBody::from(serde_json::json!({"k": 1})).materialize()).unwrap();
        assert_eq!(&m.bytes[..], br#"{"k":1}"#);
        assert_eq!(m.content_type.as_deref(), Some(APPLICATION_JSON));
    }

    #[test]
    fn test_multipart_body_type_carries_boundary() {
        let form = Form::new().text("a", "b");
        let boundary = form.boundary().to_string();
        let m = block_on(RequestBody::from(form).materialize()).unwrap();
        assert_eq!(
            m.content_type,
            Some(format!("multipart/form-data; boundary={}", boundary))
        );
    }

    #[test]
    fn test_from_any_supported() {
        assert!(matches!(
            RequestBody::from_any(String::from("x")),
            Ok(RequestBody::Text(_))
        ));
        assert!(matches!(
            RequestBody::from_any("static"),
            Ok(RequestBody::Text(_))
        ));
        assert!(matches!(
            RequestBody::from_any(vec![1u8]),
            Ok(RequestBody::Bytes(_))
        ));
        assert!(matches!(
            RequestBody::from_any(RequestBody::Empty),
            Ok(RequestBody::Empty)
        ));
    }

    #[test]
    fn test_from_any_unsupported() {
        let err = RequestBody::from_any(42u32).unwrap_err();
        assert_eq!(err, NetError::UnsupportedBodyType("u32".to_string()));
    }

    #[test]
    fn test_default_is_empty() {
        let body = RequestBody::default();
        assert!(body.is_empty());
    }
}
