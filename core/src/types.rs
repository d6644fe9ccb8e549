//! Request and response records for the HelloSign v3 API.
//!
//! # Design
//! Request types are built by the caller and consumed by a single encode call.
//! Response types mirror the remote JSON; every field has `#[serde(default)]`
//! so a field the server omits decodes to its zero value instead of failing,
//! and non-`Option` fields also read an explicit `null` as that zero value.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Request side
// ---------------------------------------------------------------------------

/// A person asked to sign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub email: String,
    pub name: String,
    /// Signing position; 0 leaves the order unspecified.
    #[serde(default)]
    pub order: u32,
    /// Access code the signer must enter; empty for none.
    #[serde(default)]
    pub pin: String,
}

impl Signer {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = pin.into();
        self
    }
}

/// Named signing position of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerRole {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: u32,
}

impl SignerRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: 0,
        }
    }
}

/// Merge field value for template-based requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    pub value: serde_json::Value,
}

impl CustomField {
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Wire form of the value: strings unquoted, everything else as JSON text.
    pub fn value_string(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Field placed on a document, sent inside `form_fields_per_document`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFormField {
    pub api_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub required: bool,
    pub signer: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Body of `signature_request/create_embedded`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddedSignatureRequest {
    pub test_mode: bool,
    pub client_id: String,
    pub file: Vec<PathBuf>,
    pub file_url: Vec<String>,
    pub title: String,
    pub subject: String,
    pub message: String,
    pub signing_redirect_url: String,
    pub signers: Vec<Signer>,
    pub cc_email_addresses: Vec<String>,
    pub use_text_tags: bool,
    pub hide_text_tags: bool,
    pub allow_decline: bool,
    pub show_preview: bool,
    pub metadata: BTreeMap<String, String>,
    /// One list of fields per attached document.
    pub form_fields_per_document: Vec<Vec<DocumentFormField>>,
    pub custom_fields: Vec<CustomField>,
}

/// Body of `signature_request/create_embedded_with_template`.
///
/// Signers are bound to template roles by position; the roles are supplied
/// separately when the request is sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddedSignatureWithTemplateRequest {
    pub test_mode: bool,
    pub client_id: String,
    pub template_id: String,
    pub title: String,
    pub subject: String,
    pub message: String,
    pub signing_redirect_url: String,
    pub signers: Vec<Signer>,
    pub cc_email_addresses: Vec<String>,
    pub allow_decline: bool,
    pub show_preview: bool,
    pub custom_fields: Vec<CustomField>,
    pub metadata: BTreeMap<String, String>,
}

/// Body of `template/create_embedded_draft`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateEmbeddedTemplateRequest {
    pub test_mode: bool,
    pub client_id: String,
    pub file: Vec<PathBuf>,
    pub file_url: Vec<String>,
    pub title: String,
    pub subject: String,
    pub message: String,
    pub signer_roles: Vec<SignerRole>,
    pub cc_roles: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub show_preview: bool,
    pub skip_me_now: bool,
}

/// Archive format for `signature_request/files`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Zip,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Zip => "zip",
        }
    }
}

// ---------------------------------------------------------------------------
// Response side
// ---------------------------------------------------------------------------

/// Treat an explicit JSON `null` like a missing key: the API sends `null` for
/// fields it has no value for.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A signature request as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureRequest {
    #[serde(deserialize_with = "null_as_default")]
    pub signature_request_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub original_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subject: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub test_mode: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_complete: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_declined: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub has_error: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub requester_email_address: String,
    pub signing_url: Option<String>,
    pub signing_redirect_url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub details_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub files_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cc_email_addresses: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub custom_fields: Vec<ResponseCustomField>,
    #[serde(deserialize_with = "null_as_default")]
    pub response_data: Vec<ResponseData>,
    #[serde(deserialize_with = "null_as_default")]
    pub signatures: Vec<Signature>,
}

/// One signer's state within a [`SignatureRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signature {
    #[serde(deserialize_with = "null_as_default")]
    pub signature_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub signer_email_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub signer_name: String,
    pub signer_role: Option<String>,
    pub order: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub status_code: String,
    pub decline_reason: Option<String>,
    pub signed_at: Option<i64>,
    pub last_viewed_at: Option<i64>,
    pub last_reminded_at: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub has_pin: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseCustomField {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub field_type: String,
    pub value: serde_json::Value,
    #[serde(deserialize_with = "null_as_default")]
    pub required: bool,
    pub editor: Option<String>,
}

/// A value a signer entered into a document field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseData {
    #[serde(deserialize_with = "null_as_default")]
    pub api_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub signature_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub field_type: String,
    pub value: serde_json::Value,
    #[serde(deserialize_with = "null_as_default")]
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub num_pages: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub num_results: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub page_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListSignaturesResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub list_info: ListInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub signature_requests: Vec<SignatureRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    #[serde(deserialize_with = "null_as_default")]
    pub template_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_creator: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_embedded: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub can_edit: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_locked: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub signer_roles: Vec<SignerRole>,
    #[serde(deserialize_with = "null_as_default")]
    pub cc_roles: Vec<TemplateCcRole>,
    #[serde(deserialize_with = "null_as_default")]
    pub documents: Vec<TemplateDocument>,
    #[serde(deserialize_with = "null_as_default")]
    pub custom_fields: Vec<ResponseCustomField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateCcRole {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateDocument {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListTemplatesResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub list_info: ListInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub templates: Vec<Template>,
}

/// Embedded signing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignUrlResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub sign_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub expires_at: i64,
}

/// Embedded template editing session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditUrlResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub edit_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub expires_at: i64,
}

/// Draft template returned by `template/create_embedded_draft`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatedTemplate {
    #[serde(deserialize_with = "null_as_default")]
    pub template_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub edit_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub expires_at: i64,
}

/// Temporary download link for a signature request's documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub file_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub expires_at: i64,
}
