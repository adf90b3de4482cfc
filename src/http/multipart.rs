//! Multipart form data support.
//!
//! Provides RFC 7578 multipart/form-data encoding. Every part is buffered,
//! stream-valued parts included, so the encoded form is one contiguous
//! [`Bytes`] value that can be replayed across redirect hops.
//!
//! # Example
//! ```ignore
//! use fetchnet::http::multipart::{Form, Part};
//!
//! let form = Form::new()
//!     .text("username", "user123")
//!     .part("file", Part::bytes(b"file content".as_slice()).file_name("doc.txt"));
//!
//! let body = form.into_body().await?;
//! ```

use crate::base::neterror::NetError;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use rand::Rng;
use std::borrow::Cow;
use std::fmt;

const BOUNDARY_PREFIX: &str = "----formdata-fetchnet-";
const DEFAULT_PART_TYPE: &str = "application/octet-stream";

/// A multipart form.
#[derive(Debug)]
pub struct Form {
    boundary: String,
    fields: Vec<(Cow<'static, str>, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form.
    pub fn new() -> Self {
        Self {
            boundary: generate_boundary(),
            fields: Vec::new(),
        }
    }

    /// Get the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text<N, V>(self, name: N, value: V) -> Self
    where
        N: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        self.part(name, Part::text(value))
    }

    /// Add a custom part.
    pub fn part<N>(mut self, name: N, part: Part) -> Self
    where
        N: Into<Cow<'static, str>>,
    {
        self.fields.push((name.into(), part));
        self
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Compute the encoded length when every part is already buffered.
    ///
    /// Returns None if any part is a stream.
    pub fn content_length(&self) -> Option<usize> {
        let mut length = 0usize;

        for (name, part) in &self.fields {
            // --boundary\r\n
            length += 2 + self.boundary.len() + 2;
            length += part.format_headers(name).len();
            // \r\n\r\n
            length += 4;
            length += part.buffered_len()?;
            // \r\n
            length += 2;
        }

        // --boundary--\r\n
        length += 2 + self.boundary.len() + 4;

        Some(length)
    }

    /// Encode the form, draining any stream-valued parts in field order.
    pub async fn into_body(self) -> Result<Bytes, NetError> {
        let mut output = BytesMut::with_capacity(self.content_length().unwrap_or(1024));

        for (name, part) in self.fields {
            output.extend_from_slice(b"--");
            output.extend_from_slice(self.boundary.as_bytes());
            output.extend_from_slice(b"\r\n");

            output.extend_from_slice(part.format_headers(&name).as_bytes());
            output.extend_from_slice(b"\r\n\r\n");

            match part.data {
                PartData::Text(value) => {
                    output.extend_from_slice(normalize_line_endings(&value).as_bytes())
                }
                PartData::Bytes(bytes) => output.extend_from_slice(&bytes),
                PartData::Stream(mut stream) => {
                    while let Some(chunk) = stream.next().await {
                        let chunk = chunk.map_err(|_| NetError::HttpBodyError)?;
                        output.extend_from_slice(&chunk);
                    }
                }
            }
            output.extend_from_slice(b"\r\n");
        }

        output.extend_from_slice(b"--");
        output.extend_from_slice(self.boundary.as_bytes());
        output.extend_from_slice(b"--\r\n");

        Ok(output.freeze())
    }
}

enum PartData {
    Text(String),
    Bytes(Bytes),
    Stream(BoxStream<'static, Result<Bytes, std::io::Error>>),
}

impl fmt::Debug for PartData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartData::Text(s) => f.debug_tuple("Text").field(s).finish(),
            PartData::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            PartData::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A part of a multipart form.
///
/// Text parts render without a Content-Type. Byte, blob and stream parts are
/// file-like and always carry one (`application/octet-stream` when unset).
#[derive(Debug)]
pub struct Part {
    data: PartData,
    content_type: Option<String>,
    file_name: Option<Cow<'static, str>>,
}

impl Part {
    /// Create a text part.
    pub fn text<V>(value: V) -> Self
    where
        V: Into<Cow<'static, str>>,
    {
        Self {
            data: PartData::Text(value.into().into_owned()),
            content_type: None,
            file_name: None,
        }
    }

    /// Create a file-like part from bytes.
    pub fn bytes<B>(data: B) -> Self
    where
        B: Into<Bytes>,
    {
        Self {
            data: PartData::Bytes(data.into()),
            content_type: None,
            file_name: None,
        }
    }

    /// Create a file-like part from a blob, keeping its declared type.
    pub fn blob(blob: super::requestbody::Blob) -> Self {
        let (data, content_type) = blob.into_parts();
        Self {
            data: PartData::Bytes(data),
            content_type,
            file_name: None,
        }
    }

    /// Create a file-like part that is drained when the form is encoded.
    pub fn stream(stream: BoxStream<'static, Result<Bytes, std::io::Error>>) -> Self {
        Self {
            data: PartData::Stream(stream),
            content_type: None,
            file_name: None,
        }
    }

    /// Set the content type. Ignored for text parts.
    pub fn content_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Set the file name. Ignored for text parts.
    pub fn file_name<S>(mut self, name: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        self.file_name = Some(name.into());
        self
    }

    fn is_text(&self) -> bool {
        matches!(self.data, PartData::Text(_))
    }

    fn buffered_len(&self) -> Option<usize> {
        match &self.data {
            PartData::Text(s) => Some(normalize_line_endings(s).len()),
            PartData::Bytes(b) => Some(b.len()),
            PartData::Stream(_) => None,
        }
    }

    fn format_headers(&self, name: &str) -> String {
        let mut header = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_field(name)
        );

        if self.is_text() {
            return header;
        }

        if let Some(ref filename) = self.file_name {
            header.push_str(&format!("; filename=\"{}\"", escape_field(filename)));
        }

        let mime = match self.content_type.as_deref() {
            Some(m) if !m.is_empty() => m,
            _ => DEFAULT_PART_TYPE,
        };
        header.push_str(&format!("\r\nContent-Type: {}", mime));

        header
    }
}

/// Rewrite `\r\n`, lone `\r` and lone `\n` as `\r\n`.
fn normalize_line_endings(s: &str) -> Cow<'_, str> {
    if !s.contains(['\r', '\n']) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 8);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Percent-escape a field or file name for the Content-Disposition header.
fn escape_field(s: &str) -> Cow<'_, str> {
    if !s.contains(['\r', '\n', '"']) {
        return Cow::Borrowed(s);
    }

    let normalized = normalize_line_endings(s);
    Cow::Owned(
        normalized
            .replace('\n', "%0A")
            .replace('\r', "%0D")
            .replace('"', "%22"),
    )
}

fn generate_boundary() -> String {
    let n: u64 = rand::rng().random_range(0..100_000_000_000);
    format!("{}{:011}", BOUNDARY_PREFIX, n)
}
