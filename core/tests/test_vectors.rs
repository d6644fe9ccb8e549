//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Multipart bodies are compared part by part
//! after splitting on the request's own boundary, since the boundary is
//! random per request. Parsed results are compared as typed values.

use hellosign_core::{
    ApiError, ClientConfig, CreateEmbeddedTemplateRequest, CreatedTemplate, EditUrlResponse,
    EmbeddedSignatureRequest, EmbeddedSignatureWithTemplateRequest, FileResponse, FileType,
    HelloSignClient, HttpMethod, HttpRequest, HttpResponse, ListSignaturesResponse,
    ListTemplatesResponse, SignUrlResponse, SignatureRequest, SignerRole, Template,
};
use serde_json::Value;

const BASE_URL: &str = "https://api.hellosign.com/v3";
const AUTHORIZATION: &str = "Basic a2V5Og==";

fn client() -> HelloSignClient {
    HelloSignClient::new(ClientConfig::new("key"))
}

fn vectors(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn parse_file_type(s: &str) -> FileType {
    match s {
        "pdf" => FileType::Pdf,
        "zip" => FileType::Zip,
        other => panic!("unknown file type: {other}"),
    }
}

/// `(name, value)` pairs of a multipart body, in order.
fn multipart_parts(req: &HttpRequest) -> Vec<(String, String)> {
    let content_type = req.header("content-type").unwrap();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .unwrap();
    let body = String::from_utf8(req.body.clone().unwrap()).unwrap();

    body.split(&format!("--{boundary}"))
        .filter(|segment| !segment.is_empty() && !segment.starts_with("--"))
        .map(|segment| {
            let segment = segment.strip_prefix("\r\n").unwrap();
            let (headers, value) = segment.split_once("\r\n\r\n").unwrap();
            let name_start = headers.find("name=\"").unwrap() + "name=\"".len();
            let name_len = headers[name_start..].find('"').unwrap();
            let name = headers[name_start..name_start + name_len].to_string();
            let value = value.strip_suffix("\r\n").unwrap().to_string();
            (name, value)
        })
        .collect()
}

/// Compare method, URL, auth header, and body of a built request.
fn check_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
    assert_eq!(req.header("authorization"), Some(AUTHORIZATION), "{name}: auth");

    if let Some(parts) = expected.get("parts") {
        let expected_parts: Vec<(String, String)> = parts
            .as_array()
            .unwrap()
            .iter()
            .map(|p| {
                let arr = p.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(multipart_parts(req), expected_parts, "{name}: parts");
    } else if let Some(json) = expected.get("json") {
        assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content-type");
        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(&body, json, "{name}: body");
    } else {
        assert!(req.body.is_none(), "{name}: body should be None");
    }
}

/// A string body is sent as-is; anything else is serialized JSON.
fn simulated_response(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    let body = match &sim["body"] {
        Value::String(text) => text.as_bytes().to_vec(),
        other => serde_json::to_vec(other).unwrap(),
    };
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body,
    }
}

fn check_error(name: &str, err: ApiError, expected: &Value) {
    match expected["variant"].as_str().unwrap() {
        "NotFound" => assert!(matches!(err, ApiError::NotFound), "{name}: expected NotFound, got {err:?}"),
        "SignerRoleMismatch" => assert!(
            matches!(err, ApiError::SignerRoleMismatch { .. }),
            "{name}: expected SignerRoleMismatch, got {err:?}"
        ),
        "Decode" => assert!(matches!(err, ApiError::Decode(_)), "{name}: expected Decode, got {err:?}"),
        "Api" => match err {
            ApiError::Api { status, name: error_name, .. } => {
                assert_eq!(u64::from(status), expected["status"].as_u64().unwrap(), "{name}: status");
                assert_eq!(error_name, expected["name"].as_str().unwrap(), "{name}: error_name");
            }
            other => panic!("{name}: expected Api, got {other:?}"),
        },
        "Http" => match err {
            ApiError::Http { status, .. } => {
                assert_eq!(u64::from(status), expected["status"].as_u64().unwrap(), "{name}: status");
            }
            other => panic!("{name}: expected Http, got {other:?}"),
        },
        other => panic!("{name}: unknown expected_error: {other}"),
    }
}

/// Check a parse outcome against `expected_result` or `expected_error`.
fn check_outcome<T>(name: &str, case: &Value, result: Result<T, ApiError>)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    if let Some(expected_error) = case.get("expected_error") {
        check_error(name, result.unwrap_err(), expected_error);
    } else {
        let expected: T = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(result.unwrap(), expected, "{name}: parsed result");
    }
}

/// For operations that return the raw response after the status check.
fn check_raw_outcome(name: &str, case: &Value, result: Result<HttpResponse, ApiError>) {
    if let Some(expected_error) = case.get("expected_error") {
        check_error(name, result.unwrap_err(), expected_error);
    } else {
        assert!(result.is_ok(), "{name}: expected success");
    }
}

fn cases<'a>(vectors: &'a Value, key: &str) -> &'a Vec<Value> {
    vectors[key].as_array().unwrap()
}

fn case_name(case: &Value) -> &str {
    case["name"].as_str().unwrap()
}

fn input_id(case: &Value) -> &str {
    case["input_id"].as_str().unwrap()
}

// ---------------------------------------------------------------------------
// Signature requests
// ---------------------------------------------------------------------------

#[test]
fn create_embedded_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/signature_request.json"));

    let c = client();
    for case in cases(&vectors, "create_embedded") {
        let name = case_name(case);
        let input: EmbeddedSignatureRequest = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_create_embedded_signature_request(&input).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_signature_request(simulated_response(case));
        check_outcome::<SignatureRequest>(name, case, result);
    }
}

#[test]
fn create_embedded_with_template_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/signature_request.json"));

    let c = client();
    for case in cases(&vectors, "create_embedded_with_template") {
        let name = case_name(case);
        let input: EmbeddedSignatureWithTemplateRequest =
            serde_json::from_value(case["input"].clone()).unwrap();
        let roles: Vec<SignerRole> = serde_json::from_value(case["roles"].clone()).unwrap();

        let built = c.build_create_embedded_signature_request_with_template(&input, &roles);
        let Some(expected_req) = case.get("expected_request") else {
            check_error(name, built.unwrap_err(), &case["expected_error"]);
            continue;
        };
        check_request(name, &built.unwrap(), expected_req);

        let result = c.parse_signature_request(simulated_response(case));
        check_outcome::<SignatureRequest>(name, case, result);
    }
}

#[test]
fn get_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/signature_request.json"));

    let c = client();
    for case in cases(&vectors, "get") {
        let name = case_name(case);

        let req = c.build_get_signature_request(input_id(case));
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_signature_request(simulated_response(case));
        check_outcome::<SignatureRequest>(name, case, result);
    }
}

#[test]
fn list_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/signature_request.json"));

    let c = client();
    for case in cases(&vectors, "list") {
        let name = case_name(case);

        let req = c.build_list_signature_requests();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_signature_list(simulated_response(case));
        check_outcome::<ListSignaturesResponse>(name, case, result);
    }
}

#[test]
fn update_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/signature_request.json"));

    let c = client();
    for case in cases(&vectors, "update") {
        let name = case_name(case);

        let req = c.build_update_signature_request(
            input_id(case),
            case["signature_id"].as_str().unwrap(),
            case["email_address"].as_str().unwrap(),
        );
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_signature_request(simulated_response(case));
        check_outcome::<SignatureRequest>(name, case, result);
    }
}

#[test]
fn remind_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/signature_request.json"));

    let c = client();
    for case in cases(&vectors, "remind") {
        let name = case_name(case);

        let req = c
            .build_remind_signature_request(input_id(case), case["email_address"].as_str().unwrap())
            .unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_signature_request(simulated_response(case));
        check_outcome::<SignatureRequest>(name, case, result);
    }
}

#[test]
fn cancel_and_remove_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/signature_request.json"));

    let c = client();
    for case in cases(&vectors, "cancel") {
        let name = case_name(case);
        let req = c.build_cancel_signature_request(input_id(case));
        check_request(name, &req, &case["expected_request"]);
        check_raw_outcome(name, case, c.parse_raw(simulated_response(case)));
    }
    for case in cases(&vectors, "remove") {
        let name = case_name(case);
        let req = c.build_delete_signature_request(input_id(case));
        check_request(name, &req, &case["expected_request"]);
        check_raw_outcome(name, case, c.parse_raw(simulated_response(case)));
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[test]
fn get_files_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/files.json"));

    let c = client();
    for case in cases(&vectors, "get_files") {
        let name = case_name(case);
        let file_type = parse_file_type(case["file_type"].as_str().unwrap());

        let req = c.build_get_files(input_id(case), file_type);
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_files(simulated_response(case));
        if let Some(expected_error) = case.get("expected_error") {
            check_error(name, result.unwrap_err(), expected_error);
        } else {
            let expected = case["expected_bytes"].as_str().unwrap().as_bytes();
            assert_eq!(result.unwrap(), expected, "{name}: bytes");
        }
    }
}

#[test]
fn get_files_url_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/files.json"));

    let c = client();
    for case in cases(&vectors, "get_files_url") {
        let name = case_name(case);
        let file_type = parse_file_type(case["file_type"].as_str().unwrap());

        let req = c.build_get_files_url(input_id(case), file_type);
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_file_url(simulated_response(case));
        check_outcome::<FileResponse>(name, case, result);
    }
}

// ---------------------------------------------------------------------------
// Templates and embedded sessions
// ---------------------------------------------------------------------------

#[test]
fn create_embedded_draft_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/template.json"));

    let c = client();
    for case in cases(&vectors, "create_embedded_draft") {
        let name = case_name(case);
        let input: CreateEmbeddedTemplateRequest =
            serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_create_embedded_template(&input).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let result = c.parse_created_template(simulated_response(case));
        check_outcome::<CreatedTemplate>(name, case, result);
    }
}

#[test]
fn template_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/template.json"));

    let c = client();
    for case in cases(&vectors, "get") {
        let name = case_name(case);
        let req = c.build_get_template(input_id(case));
        check_request(name, &req, &case["expected_request"]);
        check_outcome::<Template>(name, case, c.parse_template(simulated_response(case)));
    }
    for case in cases(&vectors, "list") {
        let name = case_name(case);
        let req = c.build_list_templates();
        check_request(name, &req, &case["expected_request"]);
        check_outcome::<ListTemplatesResponse>(
            name,
            case,
            c.parse_template_list(simulated_response(case)),
        );
    }
    for case in cases(&vectors, "delete") {
        let name = case_name(case);
        let req = c.build_delete_template(input_id(case));
        check_request(name, &req, &case["expected_request"]);
        check_raw_outcome(name, case, c.parse_raw(simulated_response(case)));
    }
}

#[test]
fn embedded_url_test_vectors() {
    let vectors = vectors(include_str!("../../test-vectors/template.json"));

    let c = client();
    for case in cases(&vectors, "sign_url") {
        let name = case_name(case);
        let req = c.build_get_embedded_sign_url(input_id(case));
        check_request(name, &req, &case["expected_request"]);
        check_outcome::<SignUrlResponse>(name, case, c.parse_sign_url(simulated_response(case)));
    }
    for case in cases(&vectors, "edit_url") {
        let name = case_name(case);
        let req = c.build_get_embedded_template_edit_url(input_id(case));
        check_request(name, &req, &case["expected_request"]);
        check_outcome::<EditUrlResponse>(name, case, c.parse_edit_url(simulated_response(case)));
    }
}
