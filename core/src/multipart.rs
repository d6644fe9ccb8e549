//! In-memory `multipart/form-data` body (RFC 7578).
//!
//! A `Form` collects parts in insertion order and is serialized only when the
//! whole request has been encoded, so a failed encode never leaves a partial
//! body behind.

use uuid::Uuid;

/// One named field or file inside a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Value as text; file contents are returned lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct Form {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    pub fn new() -> Self {
        Self {
            boundary: Uuid::new_v4().simple().to_string(),
            parts: Vec::new(),
        }
    }

    pub fn text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push(Part {
            name: name.into(),
            filename: None,
            data: value.into().into_bytes(),
        });
    }

    pub fn file(&mut self, name: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) {
        self.parts.push(Part {
            name: name.into(),
            filename: Some(filename.into()),
            data,
        });
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// First part with the given name.
    pub fn get(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.name == name)
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");

            let mut disposition = format!(
                "Content-Disposition: form-data; name=\"{}\"",
                escape_param(&part.name)
            );
            if let Some(filename) = &part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", escape_param(filename)));
            }
            out.extend_from_slice(disposition.as_bytes());
            out.extend_from_slice(b"\r\n");
            if part.is_file() {
                out.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
        out
    }
}

/// Percent-encode the characters that would end a quoted header parameter
/// or the header line itself (RFC 7578 section 4.2).
fn escape_param(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("%22"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            c => out.push(c),
        }
    }
    out
}
