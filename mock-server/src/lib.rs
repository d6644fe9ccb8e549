//! In-memory stand-in for the HelloSign v3 API.
//!
//! Implements just enough of the signature-request, embedded, and template
//! endpoints to exercise the client over real HTTP: multipart bodies are
//! parsed back into signers, metadata and files, uploaded documents are
//! served again from the files endpoint, and errors use the API's
//! `{"error": {"error_msg", "error_name"}}` envelope.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub signature_request_id: String,
    pub title: String,
    pub subject: String,
    pub message: String,
    pub test_mode: bool,
    pub is_complete: bool,
    pub is_declined: bool,
    pub has_error: bool,
    pub created_at: i64,
    pub details_url: String,
    pub files_url: String,
    pub signing_redirect_url: Option<String>,
    pub cc_email_addresses: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub custom_fields: Vec<CustomField>,
    pub signatures: Vec<Signature>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Signature {
    pub signature_id: String,
    pub signer_email_address: String,
    pub signer_name: String,
    pub signer_role: Option<String>,
    pub order: Option<u32>,
    pub status_code: String,
    pub has_pin: bool,
    pub last_reminded_at: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Template {
    pub template_id: String,
    pub title: String,
    pub message: String,
    pub is_creator: bool,
    pub is_embedded: bool,
    pub can_edit: bool,
    pub metadata: BTreeMap<String, String>,
    pub signer_roles: Vec<SignerRole>,
    pub cc_roles: Vec<CcRole>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignerRole {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CcRole {
    pub name: String,
}

struct StoredRequest {
    request: SignatureRequest,
    documents: Vec<Vec<u8>>,
}

#[derive(Default)]
pub struct Store {
    signature_requests: Vec<StoredRequest>,
    templates: Vec<Template>,
}

pub type Db = Arc<RwLock<Store>>;

type ApiFailure = (StatusCode, Json<Value>);

const SIGN_URL: &str = "https://app.hellosign.com/editor/embeddedSign";
const EDIT_URL: &str = "https://embedded.hellosign.com/prep-and-send/embedded-template";

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/signature_request/create_embedded", post(create_embedded))
        .route(
            "/signature_request/create_embedded_with_template",
            post(create_embedded_with_template),
        )
        .route("/signature_request/list", get(list_signature_requests))
        .route("/signature_request/{id}", get(get_signature_request))
        .route("/signature_request/update/{id}", post(update_signature_request))
        .route("/signature_request/remind/{id}", post(remind_signature_request))
        .route("/signature_request/cancel/{id}", post(remove_signature_request))
        .route("/signature_request/remove/{id}", post(remove_signature_request))
        .route("/signature_request/files/{id}", get(get_files))
        .route("/embedded/sign_url/{id}", get(get_sign_url))
        .route("/embedded/edit_url/{id}", get(get_edit_url))
        .route("/template/create_embedded_draft", post(create_embedded_template))
        .route("/template/list", get(list_templates))
        .route("/template/{id}", get(get_template))
        .route("/template/delete/{id}", post(delete_template))
        .layer(middleware::from_fn(require_auth))
        .with_state(db);
    Router::new().nest("/v3", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn api_error(status: StatusCode, name: &str, message: &str) -> ApiFailure {
    (
        status,
        Json(json!({"error": {"error_msg": message, "error_name": name}})),
    )
}

fn not_found() -> ApiFailure {
    api_error(StatusCode::NOT_FOUND, "not_found", "Not found")
}

fn bad_request(message: &str) -> ApiFailure {
    api_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

async fn require_auth(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Basic ") && value.len() > "Basic ".len());
    if !authorized {
        return api_error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized api key")
            .into_response();
    }
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Multipart parsing
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FormData {
    fields: Vec<(String, String)>,
    files: Vec<(String, Vec<u8>)>,
}

impl FormData {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiFailure> {
        let mut form = FormData::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| bad_request(&e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if field.file_name().is_some() {
                let bytes = field.bytes().await.map_err(|e| bad_request(&e.body_text()))?;
                form.files.push((name, bytes.to_vec()));
            } else {
                let text = field.text().await.map_err(|e| bad_request(&e.body_text()))?;
                form.fields.push((name, text));
            }
        }
        Ok(form)
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    fn flag(&self, name: &str) -> Result<bool, ApiFailure> {
        match self.get(name) {
            None | Some("0") => Ok(false),
            Some("1") => Ok(true),
            Some(other) => Err(bad_request(&format!("Invalid value for {name}: {other}"))),
        }
    }

    /// Values of `tag[<key>]` parts, in form order.
    fn keyed(&self, tag: &str) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter_map(|(name, value)| {
                let (key, rest) = split_key(name, tag)?;
                rest.is_empty().then(|| (key.to_string(), value.clone()))
            })
            .collect()
    }

    /// `tag[<key>][<attr>]` parts grouped by key, in order of first appearance.
    fn grouped(&self, tag: &str) -> Vec<(String, BTreeMap<String, String>)> {
        let mut groups: Vec<(String, BTreeMap<String, String>)> = Vec::new();
        for (name, value) in &self.fields {
            let Some((key, rest)) = split_key(name, tag) else {
                continue;
            };
            let Some(attr) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) else {
                continue;
            };
            match groups.iter_mut().find(|(k, _)| k == key) {
                Some((_, attrs)) => {
                    attrs.insert(attr.to_string(), value.clone());
                }
                None => {
                    let attrs = BTreeMap::from([(attr.to_string(), value.clone())]);
                    groups.push((key.to_string(), attrs));
                }
            }
        }
        groups
    }

    /// Uploaded `file[i]` parts in index order.
    fn documents(&self) -> Vec<Vec<u8>> {
        let mut indexed: Vec<(usize, &Vec<u8>)> = self
            .files
            .iter()
            .filter_map(|(name, data)| {
                let (key, rest) = split_key(name, "file")?;
                if !rest.is_empty() {
                    return None;
                }
                Some((key.parse().ok()?, data))
            })
            .collect();
        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, data)| data.clone()).collect()
    }
}

/// Split `tag[key]rest` into `(key, rest)`.
fn split_key<'a>(name: &'a str, tag: &str) -> Option<(&'a str, &'a str)> {
    let inner = name.strip_prefix(tag)?.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some((&inner[..end], &inner[end + 1..]))
}

fn signature(email: &str, name: &str) -> Signature {
    Signature {
        signature_id: new_id(),
        signer_email_address: email.to_string(),
        signer_name: name.to_string(),
        status_code: "awaiting_signature".to_string(),
        ..Signature::default()
    }
}

fn new_signature_request(form: &FormData) -> Result<SignatureRequest, ApiFailure> {
    let id = new_id();
    Ok(SignatureRequest {
        details_url: format!("https://app.hellosign.com/home/manage?guid={id}"),
        files_url: format!("https://api.hellosign.com/v3/signature_request/files/{id}"),
        signature_request_id: id,
        title: form.text("title"),
        subject: form.text("subject"),
        message: form.text("message"),
        test_mode: form.flag("test_mode")?,
        created_at: now(),
        signing_redirect_url: form.get("signing_redirect_url").map(str::to_string),
        cc_email_addresses: form
            .keyed("cc_email_addresses")
            .into_iter()
            .map(|(_, value)| value)
            .collect(),
        metadata: form.keyed("metadata").into_iter().collect(),
        ..SignatureRequest::default()
    })
}

fn signature_request_json(request: &SignatureRequest) -> Json<Value> {
    Json(json!({ "signature_request": request }))
}

// ---------------------------------------------------------------------------
// Signature requests
// ---------------------------------------------------------------------------

async fn create_embedded(
    State(db): State<Db>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiFailure> {
    let form = FormData::read(multipart).await?;
    if form.get("client_id").is_none() {
        return Err(bad_request("Missing parameter: client_id"));
    }
    let documents = form.documents();
    if documents.is_empty() && form.keyed("file_url").is_empty() {
        return Err(bad_request("Must specify files to be sent"));
    }
    for flag in ["use_text_tags", "hide_text_tags", "allow_decline", "show_preview"] {
        form.flag(flag)?;
    }

    let mut request = new_signature_request(&form)?;
    for (_, attrs) in form.grouped("signers") {
        let (Some(email), Some(name)) = (attrs.get("email_address"), attrs.get("name")) else {
            return Err(bad_request("Signers require email_address and name"));
        };
        let mut signer = signature(email, name);
        if let Some(order) = attrs.get("order") {
            let order = order
                .parse::<u32>()
                .map_err(|_| bad_request("Invalid signer order"))?;
            signer.order = Some(order);
        }
        signer.has_pin = attrs.contains_key("pin");
        request.signatures.push(signer);
    }
    if request.signatures.is_empty() {
        return Err(bad_request("Must specify at least one signer"));
    }

    tracing::debug!(id = %request.signature_request_id, "created embedded signature request");
    let body = signature_request_json(&request);
    db.write().await.signature_requests.push(StoredRequest {
        request,
        documents,
    });
    Ok(body)
}

async fn create_embedded_with_template(
    State(db): State<Db>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiFailure> {
    let form = FormData::read(multipart).await?;
    let template_id = form.text("template_id");
    let mut store = db.write().await;
    let template = store
        .templates
        .iter()
        .find(|t| t.template_id == template_id)
        .cloned()
        .ok_or_else(not_found)?;

    let mut request = new_signature_request(&form)?;
    let mut pins = Vec::new();
    for (key, attrs) in form.grouped("signers") {
        if let Ok(index) = key.parse::<usize>() {
            if attrs.contains_key("pin") {
                pins.push(index);
            }
            continue;
        }
        if !template.signer_roles.iter().any(|role| role.name == key) {
            return Err(bad_request(&format!("Signer role not found: {key}")));
        }
        let email = attrs.get("email_address").cloned().unwrap_or_default();
        let name = attrs.get("name").cloned().unwrap_or_default();
        let mut signer = signature(&email, &name);
        signer.signer_role = Some(key);
        request.signatures.push(signer);
    }
    for index in pins {
        if let Some(signer) = request.signatures.get_mut(index) {
            signer.has_pin = true;
        }
    }
    if let Some(raw) = form.get("custom_fields") {
        let fields: BTreeMap<String, String> =
            serde_json::from_str(raw).map_err(|_| bad_request("Invalid custom_fields"))?;
        request.custom_fields = fields
            .into_iter()
            .map(|(name, value)| CustomField {
                name,
                field_type: "text".to_string(),
                value,
            })
            .collect();
    }

    tracing::debug!(
        id = %request.signature_request_id,
        %template_id,
        "created templated signature request"
    );
    let body = signature_request_json(&request);
    store.signature_requests.push(StoredRequest {
        request,
        documents: Vec::new(),
    });
    Ok(body)
}

async fn get_signature_request(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    let store = db.read().await;
    store
        .signature_requests
        .iter()
        .find(|stored| stored.request.signature_request_id == id)
        .map(|stored| signature_request_json(&stored.request))
        .ok_or_else(not_found)
}

async fn list_signature_requests(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let requests: Vec<&SignatureRequest> = store
        .signature_requests
        .iter()
        .map(|stored| &stored.request)
        .collect();
    Json(json!({
        "list_info": {"page": 1, "num_pages": 1, "num_results": requests.len(), "page_size": 20},
        "signature_requests": requests,
    }))
}

async fn update_signature_request(
    State(db): State<Db>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiFailure> {
    let form = FormData::read(multipart).await?;
    let signature_id = form.text("signature_id");
    let email = form.text("email_address");
    if email.is_empty() {
        return Err(bad_request("Missing parameter: email_address"));
    }

    let mut store = db.write().await;
    let stored = store
        .signature_requests
        .iter_mut()
        .find(|stored| stored.request.signature_request_id == id)
        .ok_or_else(not_found)?;
    let signer = stored
        .request
        .signatures
        .iter_mut()
        .find(|s| s.signature_id == signature_id)
        .ok_or_else(|| bad_request("Signature not found"))?;
    signer.signer_email_address = email;
    Ok(signature_request_json(&stored.request))
}

#[derive(Deserialize)]
struct RemindInput {
    email_address: String,
}

async fn remind_signature_request(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<RemindInput>,
) -> Result<Json<Value>, ApiFailure> {
    let mut store = db.write().await;
    let stored = store
        .signature_requests
        .iter_mut()
        .find(|stored| stored.request.signature_request_id == id)
        .ok_or_else(not_found)?;
    let signer = stored
        .request
        .signatures
        .iter_mut()
        .find(|s| s.signer_email_address == input.email_address)
        .ok_or_else(|| bad_request("Email address is not a signer"))?;
    signer.last_reminded_at = Some(now());
    Ok(signature_request_json(&stored.request))
}

async fn remove_signature_request(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    let before = store.signature_requests.len();
    store
        .signature_requests
        .retain(|stored| stored.request.signature_request_id != id);
    if store.signature_requests.len() == before {
        return Err(not_found());
    }
    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
struct FilesQuery {
    file_type: Option<String>,
    get_url: Option<String>,
}

async fn get_files(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(query): Query<FilesQuery>,
) -> Result<Response, ApiFailure> {
    let store = db.read().await;
    let stored = store
        .signature_requests
        .iter()
        .find(|stored| stored.request.signature_request_id == id)
        .ok_or_else(not_found)?;

    let file_type = query.file_type.as_deref().unwrap_or("pdf");
    let content_type = match file_type {
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        other => return Err(bad_request(&format!("Invalid file_type: {other}"))),
    };

    if matches!(query.get_url.as_deref(), Some("1") | Some("true")) {
        let body = json!({
            "file_url": format!("https://s3.amazonaws.com/hellosign/{id}.{file_type}"),
            "expires_at": now() + 3600,
        });
        return Ok(Json(body).into_response());
    }

    // The first upload stands in for the merged PDF; a ZIP gets every upload.
    let bytes = match file_type {
        "pdf" => stored.documents.first().cloned().unwrap_or_default(),
        _ => {
            let mut bytes = b"PK\x03\x04".to_vec();
            for document in &stored.documents {
                bytes.extend_from_slice(document);
            }
            bytes
        }
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

// ---------------------------------------------------------------------------
// Embedded
// ---------------------------------------------------------------------------

async fn get_sign_url(
    State(db): State<Db>,
    Path(signature_id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    let store = db.read().await;
    let found = store
        .signature_requests
        .iter()
        .flat_map(|stored| stored.request.signatures.iter())
        .any(|s| s.signature_id == signature_id);
    if !found {
        return Err(not_found());
    }
    Ok(Json(json!({
        "embedded": {
            "sign_url": format!("{SIGN_URL}?signature_id={signature_id}&token={}", new_id()),
            "expires_at": now() + 3600,
        }
    })))
}

async fn get_edit_url(
    State(db): State<Db>,
    Path(template_id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    let store = db.read().await;
    if !store.templates.iter().any(|t| t.template_id == template_id) {
        return Err(not_found());
    }
    Ok(Json(json!({
        "embedded": {
            "edit_url": format!("{EDIT_URL}?cached_params_token={}", new_id()),
            "expires_at": now() + 3600,
        }
    })))
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

async fn create_embedded_template(
    State(db): State<Db>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiFailure> {
    let form = FormData::read(multipart).await?;
    if form.get("client_id").is_none() {
        return Err(bad_request("Missing parameter: client_id"));
    }
    if form.documents().is_empty() && form.keyed("file_url").is_empty() {
        return Err(bad_request("Must specify files to be sent"));
    }
    form.flag("show_preview")?;
    form.flag("skip_me_now")?;

    let mut signer_roles = Vec::new();
    for (_, attrs) in form.grouped("signer_roles") {
        let name = attrs
            .get("name")
            .cloned()
            .ok_or_else(|| bad_request("Signer roles require a name"))?;
        let order = attrs.get("order").and_then(|order| order.parse().ok());
        signer_roles.push(SignerRole { name, order });
    }

    let template = Template {
        template_id: new_id(),
        title: form.text("title"),
        message: form.text("message"),
        is_creator: true,
        is_embedded: true,
        can_edit: true,
        metadata: form.keyed("metadata").into_iter().collect(),
        signer_roles,
        cc_roles: form
            .keyed("cc_roles")
            .into_iter()
            .map(|(_, name)| CcRole { name })
            .collect(),
    };
    let body = json!({
        "template": {
            "template_id": template.template_id,
            "edit_url": format!("{EDIT_URL}?cached_params_token={}", new_id()),
            "expires_at": now() + 3600,
        }
    });
    tracing::debug!(id = %template.template_id, "created embedded template draft");
    db.write().await.templates.push(template);
    Ok(Json(body))
}

async fn get_template(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    let store = db.read().await;
    store
        .templates
        .iter()
        .find(|t| t.template_id == id)
        .map(|template| Json(json!({ "template": template })))
        .ok_or_else(not_found)
}

async fn list_templates(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    Json(json!({
        "list_info": {"page": 1, "num_pages": 1, "num_results": store.templates.len(), "page_size": 20},
        "templates": store.templates,
    }))
}

async fn delete_template(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    let before = store.templates.len();
    store.templates.retain(|t| t.template_id != id);
    if store.templates.len() == before {
        return Err(not_found());
    }
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_key_extracts_bracketed_key() {
        assert_eq!(
            split_key("signers[0][email_address]", "signers"),
            Some(("0", "[email_address]"))
        );
        assert_eq!(split_key("metadata[ref]", "metadata"), Some(("ref", "")));
        assert_eq!(split_key("signer_roles[0][name]", "signers"), None);
        assert_eq!(split_key("title", "title"), None);
    }

    #[test]
    fn grouped_keeps_first_appearance_order() {
        let form = FormData {
            fields: vec![
                ("signers[Client][email_address]".to_string(), "a@x.com".to_string()),
                ("signers[Client][name]".to_string(), "A".to_string()),
                ("signers[Witness][email_address]".to_string(), "b@x.com".to_string()),
                ("signers[0][pin]".to_string(), "1234".to_string()),
            ],
            files: Vec::new(),
        };
        let groups = form.grouped("signers");
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Client", "Witness", "0"]);
        assert_eq!(groups[0].1["name"], "A");
    }

    #[test]
    fn flag_rejects_literal_booleans() {
        let form = FormData {
            fields: vec![("test_mode".to_string(), "true".to_string())],
            files: Vec::new(),
        };
        assert!(form.flag("test_mode").is_err());
        assert!(!form.flag("missing").unwrap());
    }

    #[test]
    fn documents_are_sorted_by_index() {
        let form = FormData {
            fields: Vec::new(),
            files: vec![
                ("file[1]".to_string(), b"second".to_vec()),
                ("file[0]".to_string(), b"first".to_vec()),
            ],
        };
        assert_eq!(form.documents(), vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn signature_request_serializes_envelope() {
        let request = SignatureRequest {
            signature_request_id: "sr1".to_string(),
            ..SignatureRequest::default()
        };
        let json = signature_request_json(&request).0;
        assert_eq!(json["signature_request"]["signature_request_id"], "sr1");
        assert!(json["signature_request"]["signatures"].as_array().unwrap().is_empty());
    }
}
