//! Error types for the HelloSign client.
//!
//! # Design
//! Errors fall into three groups that callers usually react to differently:
//! local validation failures raised before anything is sent, transport
//! failures (including non-2xx statuses), and decode failures for response
//! bodies that are not the expected JSON. [`ApiError::kind`] exposes the group
//! so callers do not need to match every variant.

use std::io;
use std::path::PathBuf;

use serde::Deserialize;

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Decode,
}

/// Errors returned by `HelloSignClient`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("the number of signers and roles must match. [SignerRoles: {roles}, Signers: {signers}]")]
    SignerRoleMismatch { roles: usize, signers: usize },

    #[error("cannot read attachment {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("transport failed: {0}")]
    Transport(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// Non-2xx response carrying the API's error envelope.
    #[error("HTTP {status}: {name}: {message}")]
    Api {
        status: u16,
        name: String,
        message: String,
    },

    /// Non-2xx response without a recognizable error envelope.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("deserialization failed: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::SignerRoleMismatch { .. }
            | ApiError::File { .. }
            | ApiError::Save { .. }
            | ApiError::Encode(_) => ErrorKind::Validation,
            ApiError::Transport(_)
            | ApiError::NotFound
            | ApiError::Api { .. }
            | ApiError::Http { .. } => ErrorKind::Transport,
            ApiError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Build the error for a non-2xx status, preferring the API's own
    /// `{"error": {...}}` envelope when the body carries one.
    pub(crate) fn from_status(status: u16, body: &[u8]) -> Self {
        if status == 404 {
            return ApiError::NotFound;
        }
        match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(envelope) => ApiError::Api {
                status,
                name: envelope.error.error_name,
                message: envelope.error.error_msg,
            },
            Err(_) => ApiError::Http {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_msg: String,
    #[serde(default)]
    error_name: String,
}
