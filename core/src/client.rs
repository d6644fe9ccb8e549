//! Request builders, response parsers, and the blocking façade for the
//! HelloSign v3 API.
//!
//! # Design
//! `HelloSignClient` holds only immutable configuration and a transport. Each
//! remote operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`; the
//! un-prefixed method runs build, transport, and parse in sequence. Callers
//! that want to drive I/O themselves can use the two halves directly.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::config::ClientConfig;
use crate::encode::{encode_form, WithSignerRoles};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::multipart::Form;
use crate::response;
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    CreateEmbeddedTemplateRequest, CreatedTemplate, EditUrlResponse, EmbeddedSignatureRequest,
    EmbeddedSignatureWithTemplateRequest, FileResponse, FileType, ListSignaturesResponse,
    ListTemplatesResponse, SignUrlResponse, SignatureRequest, SignerRole, Template,
};

/// Blocking client for the HelloSign v3 API.
pub struct HelloSignClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl HelloSignClient<UreqTransport> {
    /// Client backed by a `ureq` agent using the configured timeout.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self { config, transport }
    }
}

#[derive(Serialize)]
struct RemindBody<'a> {
    email_address: &'a str,
}

impl<T: Transport> HelloSignClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Signature requests
    // -----------------------------------------------------------------------

    pub fn build_create_embedded_signature_request(
        &self,
        request: &EmbeddedSignatureRequest,
    ) -> Result<HttpRequest, ApiError> {
        let form = encode_form(request)?;
        Ok(self.multipart("signature_request/create_embedded", form))
    }

    /// Creates an embedded signature request from local files or URLs.
    pub fn create_embedded_signature_request(
        &self,
        request: &EmbeddedSignatureRequest,
    ) -> Result<SignatureRequest, ApiError> {
        let http = self.build_create_embedded_signature_request(request)?;
        self.parse_signature_request(self.execute(http)?)
    }

    /// Signers are bound to `roles` by position; the counts must match.
    pub fn build_create_embedded_signature_request_with_template(
        &self,
        request: &EmbeddedSignatureWithTemplateRequest,
        roles: &[SignerRole],
    ) -> Result<HttpRequest, ApiError> {
        let form = encode_form(&WithSignerRoles { request, roles })?;
        Ok(self.multipart("signature_request/create_embedded_with_template", form))
    }

    pub fn create_embedded_signature_request_with_template(
        &self,
        request: &EmbeddedSignatureWithTemplateRequest,
        roles: &[SignerRole],
    ) -> Result<SignatureRequest, ApiError> {
        let http = self.build_create_embedded_signature_request_with_template(request, roles)?;
        self.parse_signature_request(self.execute(http)?)
    }

    pub fn build_get_signature_request(&self, signature_request_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("signature_request/{}", segment(signature_request_id)),
        )
    }

    /// Fetches a signature request including each signer's current status.
    pub fn get_signature_request(
        &self,
        signature_request_id: &str,
    ) -> Result<SignatureRequest, ApiError> {
        let http = self.build_get_signature_request(signature_request_id);
        self.parse_signature_request(self.execute(http)?)
    }

    pub fn build_list_signature_requests(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "signature_request/list")
    }

    pub fn list_signature_requests(&self) -> Result<ListSignaturesResponse, ApiError> {
        let http = self.build_list_signature_requests();
        self.parse_signature_list(self.execute(http)?)
    }

    pub fn build_update_signature_request(
        &self,
        signature_request_id: &str,
        signature_id: &str,
        email_address: &str,
    ) -> HttpRequest {
        let mut form = Form::new();
        form.text("signature_id", signature_id);
        form.text("email_address", email_address);
        self.multipart(
            &format!("signature_request/update/{}", segment(signature_request_id)),
            form,
        )
    }

    /// Changes the email address of one signer on a signature request.
    pub fn update_signature_request(
        &self,
        signature_request_id: &str,
        signature_id: &str,
        email_address: &str,
    ) -> Result<SignatureRequest, ApiError> {
        let http =
            self.build_update_signature_request(signature_request_id, signature_id, email_address);
        self.parse_signature_request(self.execute(http)?)
    }

    pub fn build_remind_signature_request(
        &self,
        signature_request_id: &str,
        email_address: &str,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(&RemindBody { email_address }).map_err(ApiError::Encode)?;
        let mut http = self.request(
            HttpMethod::Post,
            &format!("signature_request/remind/{}", segment(signature_request_id)),
        );
        http.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        http.body = Some(body);
        Ok(http)
    }

    /// Sends a reminder email to a signer who has not signed yet.
    pub fn remind_signature_request(
        &self,
        signature_request_id: &str,
        email_address: &str,
    ) -> Result<SignatureRequest, ApiError> {
        let http = self.build_remind_signature_request(signature_request_id, email_address)?;
        self.parse_signature_request(self.execute(http)?)
    }

    pub fn build_cancel_signature_request(&self, signature_request_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Post,
            &format!("signature_request/cancel/{}", segment(signature_request_id)),
        )
    }

    /// Cancels an incomplete signature request. Not reversible.
    pub fn cancel_signature_request(
        &self,
        signature_request_id: &str,
    ) -> Result<HttpResponse, ApiError> {
        let http = self.build_cancel_signature_request(signature_request_id);
        self.parse_raw(self.execute(http)?)
    }

    pub fn build_delete_signature_request(&self, signature_request_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Post,
            &format!("signature_request/remove/{}", segment(signature_request_id)),
        )
    }

    /// Removes access to a completed signature request. Not reversible.
    pub fn delete_signature_request(
        &self,
        signature_request_id: &str,
    ) -> Result<HttpResponse, ApiError> {
        let http = self.build_delete_signature_request(signature_request_id);
        self.parse_raw(self.execute(http)?)
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    pub fn build_get_files(&self, signature_request_id: &str, file_type: FileType) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!(
                "signature_request/files/{}?file_type={}",
                segment(signature_request_id),
                file_type.as_str()
            ),
        )
    }

    /// Downloads the documents of a signature request: one merged PDF, or a
    /// ZIP of the individual documents.
    pub fn get_files(
        &self,
        signature_request_id: &str,
        file_type: FileType,
    ) -> Result<Vec<u8>, ApiError> {
        let http = self.build_get_files(signature_request_id, file_type);
        self.parse_files(self.execute(http)?)
    }

    pub fn get_pdf(&self, signature_request_id: &str) -> Result<Vec<u8>, ApiError> {
        self.get_files(signature_request_id, FileType::Pdf)
    }

    pub fn build_get_files_url(
        &self,
        signature_request_id: &str,
        file_type: FileType,
    ) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!(
                "signature_request/files/{}?file_type={}&get_url=1",
                segment(signature_request_id),
                file_type.as_str()
            ),
        )
    }

    /// Like [`get_files`](Self::get_files) but returns a temporary download
    /// link instead of the bytes.
    pub fn get_files_url(
        &self,
        signature_request_id: &str,
        file_type: FileType,
    ) -> Result<FileResponse, ApiError> {
        let http = self.build_get_files_url(signature_request_id, file_type);
        self.parse_file_url(self.execute(http)?)
    }

    /// Downloads the documents and writes them to `dest`, returning the
    /// metadata of the written file.
    ///
    /// If the write fails after a successful download, the error is
    /// `ApiError::Save` and the downloaded bytes are lost.
    pub fn save_file(
        &self,
        signature_request_id: &str,
        file_type: FileType,
        dest: impl AsRef<Path>,
    ) -> Result<fs::Metadata, ApiError> {
        let dest = dest.as_ref();
        let bytes = self.get_files(signature_request_id, file_type)?;
        let save_error = |source| ApiError::Save {
            path: dest.to_path_buf(),
            source,
        };
        fs::write(dest, bytes).map_err(save_error)?;
        fs::metadata(dest).map_err(save_error)
    }

    // -----------------------------------------------------------------------
    // Embedded
    // -----------------------------------------------------------------------

    pub fn build_get_embedded_sign_url(&self, signature_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("embedded/sign_url/{}", segment(signature_id)),
        )
    }

    /// Retrieves the URL that opens an embedded signing session.
    pub fn get_embedded_sign_url(&self, signature_id: &str) -> Result<SignUrlResponse, ApiError> {
        let http = self.build_get_embedded_sign_url(signature_id);
        self.parse_sign_url(self.execute(http)?)
    }

    pub fn build_get_embedded_template_edit_url(&self, template_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("embedded/edit_url/{}", segment(template_id)),
        )
    }

    pub fn get_embedded_template_edit_url(
        &self,
        template_id: &str,
    ) -> Result<EditUrlResponse, ApiError> {
        let http = self.build_get_embedded_template_edit_url(template_id);
        self.parse_edit_url(self.execute(http)?)
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    pub fn build_get_template(&self, template_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("template/{}", segment(template_id)))
    }

    pub fn get_template(&self, template_id: &str) -> Result<Template, ApiError> {
        let http = self.build_get_template(template_id);
        self.parse_template(self.execute(http)?)
    }

    pub fn build_list_templates(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "template/list")
    }

    pub fn list_templates(&self) -> Result<ListTemplatesResponse, ApiError> {
        let http = self.build_list_templates();
        self.parse_template_list(self.execute(http)?)
    }

    pub fn build_delete_template(&self, template_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Post,
            &format!("template/delete/{}", segment(template_id)),
        )
    }

    /// Deletes a template. Not reversible.
    pub fn delete_template(&self, template_id: &str) -> Result<HttpResponse, ApiError> {
        let http = self.build_delete_template(template_id);
        self.parse_raw(self.execute(http)?)
    }

    pub fn build_create_embedded_template(
        &self,
        request: &CreateEmbeddedTemplateRequest,
    ) -> Result<HttpRequest, ApiError> {
        let form = encode_form(request)?;
        Ok(self.multipart("template/create_embedded_draft", form))
    }

    /// Creates a template draft to be finished in an embedded editor.
    pub fn create_embedded_template(
        &self,
        request: &CreateEmbeddedTemplateRequest,
    ) -> Result<CreatedTemplate, ApiError> {
        let http = self.build_create_embedded_template(request)?;
        self.parse_created_template(self.execute(http)?)
    }

    // -----------------------------------------------------------------------
    // Parsers
    // -----------------------------------------------------------------------

    pub fn parse_signature_request(
        &self,
        response: HttpResponse,
    ) -> Result<SignatureRequest, ApiError> {
        check_status(&response)?;
        response::decode_signature_request(&response.body)
    }

    pub fn parse_signature_list(
        &self,
        response: HttpResponse,
    ) -> Result<ListSignaturesResponse, ApiError> {
        check_status(&response)?;
        response::decode_signature_list(&response.body)
    }

    pub fn parse_template(&self, response: HttpResponse) -> Result<Template, ApiError> {
        check_status(&response)?;
        response::decode_template(&response.body)
    }

    pub fn parse_template_list(
        &self,
        response: HttpResponse,
    ) -> Result<ListTemplatesResponse, ApiError> {
        check_status(&response)?;
        response::decode_template_list(&response.body)
    }

    pub fn parse_created_template(
        &self,
        response: HttpResponse,
    ) -> Result<CreatedTemplate, ApiError> {
        check_status(&response)?;
        response::decode_created_template(&response.body)
    }

    pub fn parse_sign_url(&self, response: HttpResponse) -> Result<SignUrlResponse, ApiError> {
        check_status(&response)?;
        response::decode_sign_url(&response.body)
    }

    pub fn parse_edit_url(&self, response: HttpResponse) -> Result<EditUrlResponse, ApiError> {
        check_status(&response)?;
        response::decode_edit_url(&response.body)
    }

    pub fn parse_file_url(&self, response: HttpResponse) -> Result<FileResponse, ApiError> {
        check_status(&response)?;
        response::decode_file_url(&response.body)
    }

    /// Raw document bytes; no decoding.
    pub fn parse_files(&self, response: HttpResponse) -> Result<Vec<u8>, ApiError> {
        check_status(&response)?;
        Ok(response.body)
    }

    /// The response itself, after the status check.
    pub fn parse_raw(&self, response: HttpResponse) -> Result<HttpResponse, ApiError> {
        check_status(&response)?;
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}/{path}", self.config.base()),
            headers: vec![("authorization".to_string(), self.config.authorization())],
            body: None,
        }
    }

    fn multipart(&self, path: &str, form: Form) -> HttpRequest {
        let mut http = self.request(HttpMethod::Post, path);
        http.headers
            .push(("content-type".to_string(), form.content_type()));
        http.body = Some(form.into_bytes());
        http
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(request)?;
        tracing::debug!(
            status = response.status,
            bytes = response.body.len(),
            "received response"
        );
        Ok(response)
    }
}

/// Percent-encode an identifier for use as a path segment.
fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    tracing::warn!(status = response.status, "request rejected");
    Err(ApiError::from_status(response.status, &response.body))
}
