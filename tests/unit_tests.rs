/// Unit tests for core Gauntlet models
/// Tests methods, requests, responses, field mappings and result builders
use gauntlet::models::{
    FieldMapping, FieldType, Method, Request, RequestBody, Response, TestOptions, TestResult, Verdict,
};
use serde_json::json;

#[test]
fn test_method_display() {
    // Test that Method enum writes the wire token
    assert_eq!(Method::GET.to_string(), "GET");
    assert_eq!(Method::POST.to_string(), "POST");
    assert_eq!(Method::PUT.to_string(), "PUT");
    assert_eq!(Method::DELETE.to_string(), "DELETE");
    assert_eq!(Method::PATCH.to_string(), "PATCH");
    assert_eq!(Method::OPTIONS.to_string(), "OPTIONS");
    assert_eq!(Method::HEAD.to_string(), "HEAD");
    assert_eq!(Method::Other("GAUNTLET".into()).to_string(), "GAUNTLET");
}

#[test]
fn test_method_parsing() {
    // Known verbs are case-insensitive, anything else is kept verbatim
    assert_eq!("delete".parse::<Method>().unwrap(), Method::DELETE);
    assert_eq!("PROPFIND".parse::<Method>().unwrap(), Method::Other("PROPFIND".into()));
}

#[test]
fn test_method_body_semantics() {
    assert!(Method::POST.carries_body());
    assert!(Method::DELETE.carries_body());
    assert!(!Method::GET.carries_body());
    assert!(Method::HEAD.is_cacheable_read());
    assert!(!Method::PATCH.is_cacheable_read());
}

#[test]
fn test_method_serializes_as_token() {
    let encoded = serde_json::to_string(&Method::Other("BREW".into())).unwrap();
    assert_eq!(encoded, "\"BREW\"");
    let decoded: Method = serde_json::from_str("\"put\"").unwrap();
    assert_eq!(decoded, Method::PUT);
}

#[test]
fn test_request_headers_are_case_insensitive() {
    let mut request = Request::new(Method::GET, "https://api.example.com/users")
        .with_header("content-type", "text/plain");
    assert_eq!(request.header("Content-Type"), Some("text/plain"));

    // set_header replaces any case variant
    request.set_header("CONTENT-TYPE", "application/json");
    assert_eq!(request.headers.len(), 1);
    assert_eq!(request.content_type(), Some("application/json"));
}

#[test]
fn test_request_body_length() {
    assert_eq!(RequestBody::Empty.len(), 0);
    assert!(RequestBody::Text(String::new()).is_empty());
    assert_eq!(RequestBody::Json(json!({"a": 1})).len(), 7);
    assert_eq!(
        RequestBody::Form(vec![("a".into(), "b c".into())]).len(),
        "a=b+c".len()
    );
}

#[test]
fn test_request_body_defaults_to_empty() {
    assert_eq!(RequestBody::default(), RequestBody::Empty);
    assert_eq!(Request::new(Method::GET, "https://api.example.com").body, RequestBody::Empty);
}

#[test]
fn test_response_classification() {
    let ok = Response::new(204);
    assert!(ok.is_success());
    assert_eq!(ok.status_line(), "204 No Content");

    let redirect = Response::new(302);
    assert!(redirect.is_success());

    assert!(Response::new(404).is_client_error());
    assert!(Response::new(503).is_server_error());
    assert!(!Response::new(499).is_server_error());
}

#[test]
fn test_response_headers_are_lowercased() {
    let response = Response::new(200).with_header("X-Frame-Options", "DENY");
    assert!(response.headers.contains_key("x-frame-options"));
    assert_eq!(response.header("X-FRAME-OPTIONS"), Some("DENY"));
    assert_eq!(response.body_text(), "");
}

#[test]
fn test_verdict_display() {
    assert_eq!(Verdict::Pass.to_string(), "PASS");
    assert_eq!(Verdict::FailNoResponse.to_string(), "FAIL (NO RESPONSE)");
    assert_eq!(Verdict::Bug.to_string(), "BUG");
}

#[test]
fn test_field_type_groups() {
    assert!(FieldType::Email.is_string_like());
    assert!(!FieldType::Number.is_string_like());
    assert!(!FieldType::Boolean.is_string_like());
    assert!(!FieldType::DoNotTest.is_testable());
    assert!(!FieldType::RandomString.is_testable());
}

#[test]
fn test_field_mapping_keeps_insertion_order() {
    let mut mapping = FieldMapping::new();
    mapping.set("b", FieldType::String);
    mapping.set("a", FieldType::Number);
    mapping.set("b", FieldType::DoNotTest);

    let entries: Vec<_> = mapping.iter().collect();
    assert_eq!(entries, vec![("b", FieldType::DoNotTest), ("a", FieldType::Number)]);
    assert_eq!(mapping.len(), 2);
}

#[test]
fn test_options_map_body_and_query() {
    let options = TestOptions::from_request(
        Request::new(Method::POST, "https://api.example.com/users?page=2")
            .with_body(RequestBody::Json(json!({"email": "a@b.co", "profile": {"site": "https://a.io"}}))),
    );
    assert_eq!(options.body_fields.get("email"), Some(FieldType::Email));
    assert_eq!(options.body_fields.get("profile"), Some(FieldType::DoNotTest));
    assert_eq!(options.body_fields.get("profile.site"), Some(FieldType::Url));
    assert_eq!(options.query_fields.get("page"), Some(FieldType::Number));
    assert_eq!(options.with_schema("schema.bin").schema.as_deref(), Some("schema.bin"));
}

#[test]
fn test_result_builders() {
    let result = TestResult::new("HSTS", "present", "absent", Verdict::Warning)
        .with_response(None)
        .with_response_time(12)
        .with_value(json!({"k": 1}));
    assert_eq!(result.response, None);
    assert_eq!(result.response_time, Some(12));
    assert_eq!(result.value, Some(json!({"k": 1})));
    assert!(result.request.is_none());
}
