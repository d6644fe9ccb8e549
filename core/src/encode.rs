//! Request-object to multipart form encoding.
//!
//! # Design
//! Every request type lists its fields once, in declaration order, as
//! `(form tag, FieldValue)` pairs via [`FormEncode`]. A single encoder walks
//! that table and lets the value kind decide how the field lands in the form:
//!
//! - maps become `tag[key]` parts
//! - signers become `tag[i][email_address]`, `tag[i][name]`, and optional
//!   `order` / `pin` parts
//! - string lists become `tag[i]` parts
//! - form fields and custom fields become a single JSON part
//! - local files are read and attached as `tag[i]`
//! - booleans are always sent as `1` / `0`
//! - text is sent only when non-empty
//!
//! Encoding is all-or-nothing: the table is validated first, files are read
//! into an in-memory [`Form`], and any failure drops the partial form.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ApiError;
use crate::multipart::Form;
use crate::types::{
    CreateEmbeddedTemplateRequest, CustomField, DocumentFormField, EmbeddedSignatureRequest,
    EmbeddedSignatureWithTemplateRequest, Signer, SignerRole,
};

/// The value half of a field-table entry.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Metadata(&'a BTreeMap<String, String>),
    Signers(&'a [Signer]),
    /// Signers keyed by the role name at the same position.
    TemplateSigners {
        signers: &'a [Signer],
        roles: &'a [SignerRole],
    },
    SignerRoles(&'a [SignerRole]),
    List(&'a [String]),
    FormFieldsPerDocument(&'a [Vec<DocumentFormField>]),
    CustomFields(&'a [CustomField]),
    Files(&'a [PathBuf]),
    Bool(bool),
    Text(&'a str),
}

/// A request that can be sent as a multipart form.
pub trait FormEncode {
    /// Form tag and value for each field, in declaration order. An empty tag
    /// excludes the field from the form.
    fn form_fields(&self) -> Vec<(&'static str, FieldValue<'_>)>;
}

/// Encode `request` into a multipart form.
pub fn encode_form<T: FormEncode + ?Sized>(request: &T) -> Result<Form, ApiError> {
    let fields = request.form_fields();
    validate(&fields)?;

    let mut form = Form::new();
    for (tag, value) in &fields {
        if tag.is_empty() {
            continue;
        }
        emit(&mut form, tag, *value)?;
    }
    tracing::trace!(parts = form.parts().len(), "encoded multipart form");
    Ok(form)
}

fn validate(fields: &[(&'static str, FieldValue<'_>)]) -> Result<(), ApiError> {
    for (_, value) in fields {
        if let FieldValue::TemplateSigners { signers, roles } = value {
            if signers.len() != roles.len() {
                return Err(ApiError::SignerRoleMismatch {
                    roles: roles.len(),
                    signers: signers.len(),
                });
            }
        }
    }
    Ok(())
}

fn emit(form: &mut Form, tag: &str, value: FieldValue<'_>) -> Result<(), ApiError> {
    match value {
        FieldValue::Metadata(map) => {
            for (key, value) in map {
                form.text(format!("{tag}[{key}]"), value.as_str());
            }
        }
        FieldValue::Signers(signers) => {
            for (i, signer) in signers.iter().enumerate() {
                form.text(format!("{tag}[{i}][email_address]"), signer.email.as_str());
                form.text(format!("{tag}[{i}][name]"), signer.name.as_str());
                if signer.order != 0 {
                    form.text(format!("{tag}[{i}][order]"), signer.order.to_string());
                }
                if !signer.pin.is_empty() {
                    form.text(format!("{tag}[{i}][pin]"), signer.pin.as_str());
                }
            }
        }
        FieldValue::TemplateSigners { signers, roles } => {
            for (i, (signer, role)) in signers.iter().zip(roles).enumerate() {
                let role = &role.name;
                form.text(format!("{tag}[{role}][email_address]"), signer.email.as_str());
                form.text(format!("{tag}[{role}][name]"), signer.name.as_str());
                // The API keys the access code by position, not by role.
                if !signer.pin.is_empty() {
                    form.text(format!("{tag}[{i}][pin]"), signer.pin.as_str());
                }
            }
        }
        FieldValue::SignerRoles(roles) => {
            for (i, role) in roles.iter().enumerate() {
                form.text(format!("{tag}[{i}][name]"), role.name.as_str());
                if role.order != 0 {
                    form.text(format!("{tag}[{i}][order]"), role.order.to_string());
                }
            }
        }
        FieldValue::List(values) => {
            for (i, value) in values.iter().enumerate() {
                form.text(format!("{tag}[{i}]"), value.as_str());
            }
        }
        FieldValue::FormFieldsPerDocument(documents) => {
            if !documents.is_empty() {
                let json = serde_json::to_string(documents).map_err(ApiError::Encode)?;
                form.text(tag, json);
            }
        }
        FieldValue::CustomFields(fields) => {
            let by_name: BTreeMap<&str, String> = fields
                .iter()
                .map(|field| (field.name.as_str(), field.value_string()))
                .collect();
            let json = serde_json::to_string(&by_name).map_err(ApiError::Encode)?;
            form.text(tag, json);
        }
        FieldValue::Files(paths) => {
            for (i, path) in paths.iter().enumerate() {
                let data = fs::read(path).map_err(|source| ApiError::File {
                    path: path.clone(),
                    source,
                })?;
                form.file(format!("{tag}[{i}]"), base_name(path), data);
            }
        }
        FieldValue::Bool(value) => {
            form.text(tag, if value { "1" } else { "0" });
        }
        FieldValue::Text(value) => {
            if !value.is_empty() {
                form.text(tag, value);
            }
        }
    }
    Ok(())
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl FormEncode for EmbeddedSignatureRequest {
    fn form_fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("test_mode", FieldValue::Bool(self.test_mode)),
            ("client_id", FieldValue::Text(&self.client_id)),
            ("file", FieldValue::Files(&self.file)),
            ("file_url", FieldValue::List(&self.file_url)),
            ("title", FieldValue::Text(&self.title)),
            ("subject", FieldValue::Text(&self.subject)),
            ("message", FieldValue::Text(&self.message)),
            ("signing_redirect_url", FieldValue::Text(&self.signing_redirect_url)),
            ("signers", FieldValue::Signers(&self.signers)),
            ("cc_email_addresses", FieldValue::List(&self.cc_email_addresses)),
            ("use_text_tags", FieldValue::Bool(self.use_text_tags)),
            ("hide_text_tags", FieldValue::Bool(self.hide_text_tags)),
            ("allow_decline", FieldValue::Bool(self.allow_decline)),
            ("show_preview", FieldValue::Bool(self.show_preview)),
            ("metadata", FieldValue::Metadata(&self.metadata)),
            (
                "form_fields_per_document",
                FieldValue::FormFieldsPerDocument(&self.form_fields_per_document),
            ),
            ("custom_fields", FieldValue::CustomFields(&self.custom_fields)),
        ]
    }
}

/// A template signature request paired with the roles its signers fill.
#[derive(Debug, Clone, Copy)]
pub struct WithSignerRoles<'a> {
    pub request: &'a EmbeddedSignatureWithTemplateRequest,
    pub roles: &'a [SignerRole],
}

impl FormEncode for WithSignerRoles<'_> {
    fn form_fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        let request = self.request;
        vec![
            ("test_mode", FieldValue::Bool(request.test_mode)),
            ("client_id", FieldValue::Text(&request.client_id)),
            ("template_id", FieldValue::Text(&request.template_id)),
            ("title", FieldValue::Text(&request.title)),
            ("subject", FieldValue::Text(&request.subject)),
            ("message", FieldValue::Text(&request.message)),
            ("signing_redirect_url", FieldValue::Text(&request.signing_redirect_url)),
            (
                "signers",
                FieldValue::TemplateSigners {
                    signers: &request.signers,
                    roles: self.roles,
                },
            ),
            ("cc_email_addresses", FieldValue::List(&request.cc_email_addresses)),
            ("allow_decline", FieldValue::Bool(request.allow_decline)),
            ("show_preview", FieldValue::Bool(request.show_preview)),
            ("custom_fields", FieldValue::CustomFields(&request.custom_fields)),
            ("metadata", FieldValue::Metadata(&request.metadata)),
        ]
    }
}

impl FormEncode for CreateEmbeddedTemplateRequest {
    fn form_fields(&self) -> Vec<(&'static str, FieldValue<'_>)> {
        vec![
            ("test_mode", FieldValue::Bool(self.test_mode)),
            ("client_id", FieldValue::Text(&self.client_id)),
            ("file", FieldValue::Files(&self.file)),
            ("file_url", FieldValue::List(&self.file_url)),
            ("title", FieldValue::Text(&self.title)),
            ("subject", FieldValue::Text(&self.subject)),
            ("message", FieldValue::Text(&self.message)),
            ("signer_roles", FieldValue::SignerRoles(&self.signer_roles)),
            ("cc_roles", FieldValue::List(&self.cc_roles)),
            ("metadata", FieldValue::Metadata(&self.metadata)),
            ("show_preview", FieldValue::Bool(self.show_preview)),
            ("skip_me_now", FieldValue::Bool(self.skip_me_now)),
        ]
    }
}
