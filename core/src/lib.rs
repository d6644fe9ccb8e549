//! Blocking client for the HelloSign v3 document-signature API.
//!
//! # Overview
//! Typed request objects are encoded into JSON or `multipart/form-data`
//! bodies, sent through a [`Transport`], and the JSON responses decoded into
//! typed results. File downloads return raw PDF or ZIP bytes.
//!
//! # Design
//! - `HelloSignClient` holds immutable configuration and a transport; it has
//!   no other state and makes no retries.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`), with a combined method on top.
//! - Multipart bodies come from one generic encoder driven by a per-type
//!   field table ([`FormEncode`]).
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod encode;
pub mod error;
pub mod http;
pub mod multipart;
pub mod response;
pub mod transport;
pub mod types;

pub use client::HelloSignClient;
pub use config::ClientConfig;
pub use encode::{encode_form, FieldValue, FormEncode, WithSignerRoles};
pub use error::{ApiError, ErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use multipart::{Form, Part};
pub use transport::{Transport, UreqTransport};
pub use types::{
    CreateEmbeddedTemplateRequest, CreatedTemplate, CustomField, DocumentFormField,
    EditUrlResponse, EmbeddedSignatureRequest, EmbeddedSignatureWithTemplateRequest, FileResponse,
    FileType, ListInfo, ListSignaturesResponse, ListTemplatesResponse, SignUrlResponse, Signature,
    SignatureRequest, Signer, SignerRole, Template,
};
