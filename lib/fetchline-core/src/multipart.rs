//! Multipart form data.
//!
//! [`Form`] is used both ways: encoded as a request body (document uploads) and
//! parsed from `multipart/form-data` responses.
//!
//! # Example
//!
//! ```
//! use fetchline_core::{Form, Part};
//!
//! let form = Form::with_boundary("xyz")
//!     .text("title", "Quarterly report")
//!     .part(Part::file("file", "report.pdf", vec![0x25, 0x50, 0x44, 0x46]));
//!
//! let (content_type, body) = form.into_body();
//! let parsed = Form::parse(&content_type, &body).expect("parse");
//! assert_eq!(parsed.get("title").map(|part| part.data().as_ref()), Some(&b"Quarterly report"[..]));
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// A single part in a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Part {
    /// Create a new part with the given name and data.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Create a text part (`text/plain; charset=utf-8`).
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Bytes::from(value.into())).with_content_type("text/plain; charset=utf-8")
    }

    /// Create a file part; the content type is guessed from the extension.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self::new(name, data)
            .with_filename(filename)
            .with_content_type(content_type)
    }

    /// Set the filename for this part.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type for this part.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Part name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Part data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Part data as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// A multipart form containing multiple parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    parts: Vec<Part>,
    boundary: String,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create a new form with a custom boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            parts: Vec::new(),
            boundary: boundary.into(),
        }
    }

    /// Add a part to the form.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a text field to the form.
    #[must_use]
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(Part::text(name, value))
    }

    /// Add a file to the form.
    #[must_use]
    pub fn file(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.part(Part::file(name, filename, data))
    }

    /// Boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Parts in order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// First part with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.name == name)
    }

    /// `Content-Type` header value: `multipart/form-data; boundary=<boundary>`.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Convert the form into (content-type header value, body bytes).
    #[must_use]
    pub fn into_body(self) -> (String, Bytes) {
        (self.content_type(), self.encode())
    }

    /// Encode the form into bytes.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(part.name.as_bytes());
            buf.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(filename.as_bytes());
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");

            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(b"\r\n");
            }

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }

    /// Parse a `multipart/form-data` body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the content type has no boundary, the body is not
    /// terminated, or a part has no `name`.
    pub fn parse(content_type: &str, body: &Bytes) -> Result<Self> {
        let boundary = boundary_from_content_type(content_type)
            .ok_or_else(|| Error::decode("multipart content type without boundary"))?;
        let opening = format!("--{boundary}");
        let separator = format!("\r\n--{boundary}");

        let mut form = Self::with_boundary(boundary);
        let mut offset = find(body, opening.as_bytes())
            .ok_or_else(|| Error::decode("multipart body without opening boundary"))?
            + opening.len();

        loop {
            let rest = body.get(offset..).unwrap_or_default();
            if rest.starts_with(b"--") {
                break;
            }
            let start = offset + if rest.starts_with(b"\r\n") { 2 } else { 0 };
            let section = body.get(start..).unwrap_or_default();
            let end = find(section, separator.as_bytes())
                .ok_or_else(|| Error::decode("unterminated multipart body"))?;

            form.parts.push(parse_part(&body.slice(start..start + end))?);
            offset = start + end + separator.len();
        }

        Ok(form)
    }
}

/// Extract the `boundary` parameter of a `multipart/*` content type.
#[must_use]
pub fn boundary_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"'))
            .filter(|boundary| !boundary.is_empty())
    })
}

fn parse_part(raw: &Bytes) -> Result<Part> {
    let (headers, data) = if raw.starts_with(b"\r\n") {
        ("", raw.slice(2..))
    } else {
        let split = find(raw, b"\r\n\r\n")
            .ok_or_else(|| Error::decode("multipart part without header terminator"))?;
        let headers = std::str::from_utf8(raw.get(..split).unwrap_or_default())
            .map_err(|e| Error::decode(format!("multipart part headers: {e}")))?;
        (headers, raw.slice(split + 4..))
    };

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in headers.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').skip(1) {
                match param.split_once('=') {
                    Some((k, v)) if k.trim() == "name" => {
                        name = Some(v.trim().trim_matches('"').to_string());
                    }
                    Some((k, v)) if k.trim() == "filename" => {
                        filename = Some(v.trim().trim_matches('"').to_string());
                    }
                    _ => {}
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_string());
        }
    }

    let name = name.ok_or_else(|| Error::decode("multipart part without name"))?;
    Ok(Part {
        name,
        filename,
        content_type,
        data,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----FetchlineBoundary{timestamp:x}")
}
