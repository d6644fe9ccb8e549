//! Request execution.
//!
//! # Design
//! The client never performs I/O itself; it hands an `HttpRequest` to a
//! `Transport` and gets an `HttpResponse` back. Status codes are returned as
//! data so the client decides what counts as an error. `UreqTransport` is the
//! default blocking implementation; tests substitute `MockTransport`.

use std::time::Duration;

use ureq::http::{HeaderName, HeaderValue};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Upper bound on response bodies; merged PDFs and ZIP bundles can be large.
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// Executes one HTTP round trip.
///
/// Implementations must read the whole response body before returning and
/// must not turn non-2xx statuses into errors.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = match (method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&url), &headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(&url), &headers).send(&body[..])
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(&url), &headers).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| header_pair(name, value))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Header values are not guaranteed to be ASCII; keep them readable.
fn header_pair(name: &HeaderName, value: &HeaderValue) -> (String, String) {
    (
        name.as_str().to_string(),
        String::from_utf8_lossy(value.as_bytes()).into_owned(),
    )
}
