//! JSON envelopes returned by the API and their decoders.
//!
//! Single-object endpoints wrap the payload in a named key
//! (`{"signature_request": {...}}`, `{"embedded": {...}}`). The envelope
//! types stay private; decoders return the unwrapped value.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ApiError;
use crate::types::{
    null_as_default, CreatedTemplate, EditUrlResponse, FileResponse, ListSignaturesResponse,
    ListTemplatesResponse, SignUrlResponse, SignatureRequest, Template,
};

#[derive(Deserialize)]
struct SignatureRequestEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    signature_request: SignatureRequest,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Default + Deserialize<'de>"))]
struct TemplateEnvelope<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    template: T,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Default + Deserialize<'de>"))]
struct EmbeddedEnvelope<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    embedded: T,
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::Decode)
}

pub fn decode_signature_request(body: &[u8]) -> Result<SignatureRequest, ApiError> {
    decode::<SignatureRequestEnvelope>(body).map(|envelope| envelope.signature_request)
}

pub fn decode_signature_list(body: &[u8]) -> Result<ListSignaturesResponse, ApiError> {
    decode(body)
}

pub fn decode_template(body: &[u8]) -> Result<Template, ApiError> {
    decode::<TemplateEnvelope<Template>>(body).map(|envelope| envelope.template)
}

pub fn decode_template_list(body: &[u8]) -> Result<ListTemplatesResponse, ApiError> {
    decode(body)
}

pub fn decode_created_template(body: &[u8]) -> Result<CreatedTemplate, ApiError> {
    decode::<TemplateEnvelope<CreatedTemplate>>(body).map(|envelope| envelope.template)
}

pub fn decode_sign_url(body: &[u8]) -> Result<SignUrlResponse, ApiError> {
    decode::<EmbeddedEnvelope<SignUrlResponse>>(body).map(|envelope| envelope.embedded)
}

pub fn decode_edit_url(body: &[u8]) -> Result<EditUrlResponse, ApiError> {
    decode::<EmbeddedEnvelope<EditUrlResponse>>(body).map(|envelope| envelope.embedded)
}

pub fn decode_file_url(body: &[u8]) -> Result<FileResponse, ApiError> {
    decode(body)
}
