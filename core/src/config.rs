//! Immutable client configuration.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.hellosign.com/v3";

/// API key, base URL, and transport timeout.
///
/// Can be deserialized from any serde format, e.g.
/// `{"api_key": "...", "base_url": "http://localhost:3000/v3", "timeout_secs": 30}`.
/// Only `api_key` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api_key: SecretString,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Base URL without a trailing slash.
    pub(crate) fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// `Basic` credentials: the API key as user name with an empty password.
    pub(crate) fn authorization(&self) -> String {
        let credentials = format!("{}:", self.api_key.expose_secret());
        format!("Basic {}", STANDARD.encode(credentials))
    }
}
