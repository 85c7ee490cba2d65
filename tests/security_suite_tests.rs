/// Integration tests for the security checklist
/// Drives the suite through a scripted transport

mod common;

use common::{body_text, hardened_server, ScriptedTransport};
use gauntlet::models::{Method, Request, RequestBody, Response, TestOptions, TestResult, Verdict};
use gauntlet::suites::{
    no_progress, SecuritySuite, Suite, LARGE_PAYLOAD_BYTES, REFLECTED_PAYLOAD, SECURITY_CHECKS,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn get_users() -> TestOptions {
    TestOptions::from_request(
        Request::new(Method::GET, "https://api.example.com/users").with_header("Authorization", "Bearer t"),
    )
}

fn find<'a>(results: &'a [TestResult], name: &str) -> &'a TestResult {
    results
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no result named {}", name))
}

// ============================================================================
// Hardened server
// ============================================================================

#[tokio::test]
async fn hardened_server_passes_every_check() {
    let transport = Arc::new(ScriptedTransport::new(hardened_server));
    let suite = SecuritySuite::new(transport.clone());
    let results = suite.run(&get_users(), &no_progress).await;

    for name in [
        "Sensitive server header",
        "Clickjacking protection",
        "HSTS",
        "MIME sniffing",
        "Cache-Control",
        "OPTIONS handling",
        "Unsupported method",
        "Missing authorization",
        "404 handling",
        "Uppercase domain",
        "Uppercase path",
        "Large payload",
    ] {
        assert_eq!(find(&results, name).status, Verdict::Pass, "{}", name);
    }
    assert_eq!(find(&results, "CORS").status, Verdict::Info);
    assert_eq!(find(&results, "CORS").actual, "Private: no cross-origin access");
    assert_eq!(find(&results, "Reflected payload").status, Verdict::Info);

    let crud: Vec<_> = results.iter().filter(|r| r.name.starts_with("CRUD: ")).collect();
    assert_eq!(crud.len(), 2);
    assert!(crud.iter().all(|r| r.status == Verdict::Manual));
    assert_eq!(crud[0].name, "CRUD: GET");
    assert_eq!(crud[1].name, "CRUD: POST");
}

#[tokio::test]
async fn progress_fires_once_per_table_entry() {
    let transport = Arc::new(ScriptedTransport::new(hardened_server));
    let suite = SecuritySuite::new(transport);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let hook = move |_: &TestResult| {
        counter.fetch_add(1, Ordering::SeqCst);
    };

    let results = suite.run(&get_users(), &hook).await;
    assert_eq!(seen.load(Ordering::SeqCst), SECURITY_CHECKS.len());
    assert_eq!(suite.planned_checks(&get_users()), SECURITY_CHECKS.len());
    assert!(results.len() > SECURITY_CHECKS.len());
}

#[tokio::test]
async fn uppercase_domain_sends_uppercased_host() {
    let transport = Arc::new(ScriptedTransport::new(hardened_server));
    SecuritySuite::new(transport.clone()).run(&get_users(), &no_progress).await;

    let sent = transport.requests();
    let upper = sent
        .iter()
        .find(|r| r.header("host").is_some())
        .expect("uppercase domain probe");
    assert_eq!(upper.header("host"), Some("API.EXAMPLE.COM"));
    assert!(upper.url.contains("API.EXAMPLE.COM"));
}

#[tokio::test]
async fn missing_authorization_strips_credentials_only() {
    let transport = Arc::new(ScriptedTransport::new(hardened_server));
    let options = TestOptions::from_request(
        Request::new(Method::GET, "https://api.example.com/users")
            .with_header("Authorization", "Bearer t")
            .with_header("Cookie", "sid=1")
            .with_header("Accept", "application/json"),
    );
    SecuritySuite::new(transport.clone()).run(&options, &no_progress).await;

    let stripped: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|r| r.header("authorization").is_none())
        .collect();
    assert_eq!(stripped.len(), 1);
    assert_eq!(stripped[0].header("cookie"), None);
    assert_eq!(stripped[0].header("accept"), Some("application/json"));
}

// ============================================================================
// Failure modes
// ============================================================================

#[tokio::test]
async fn server_errors_are_bugs() {
    let transport = Arc::new(ScriptedTransport::status(500));
    let results = SecuritySuite::new(transport).run(&get_users(), &no_progress).await;

    for entry in SECURITY_CHECKS {
        let result = find(&results, entry.name);
        if entry.name == "Reflected payload" {
            assert_eq!(result.status, Verdict::Info);
        } else {
            assert_eq!(result.status, Verdict::Bug, "{}", entry.name);
        }
    }
    assert_eq!(find(&results, "CRUD discovery").status, Verdict::Fail);
}

#[tokio::test]
async fn transport_failures_become_results() {
    let transport = Arc::new(ScriptedTransport::unreachable());
    let results = SecuritySuite::new(transport).run(&get_users(), &no_progress).await;

    let hsts = find(&results, "HSTS");
    assert_eq!(hsts.status, Verdict::Bug);
    assert!(hsts.actual.starts_with("Unexpected error:"));
    assert!(hsts.response.is_none());

    let not_found = find(&results, "404 handling");
    assert_eq!(not_found.status, Verdict::FailNoResponse);
    assert!(not_found.actual.contains("connection refused"));
}

#[tokio::test]
async fn versioned_server_header_and_missing_headers_fail() {
    let transport = Arc::new(ScriptedTransport::new(|_, _| {
        Ok(Response::new(200).with_header("Server", "nginx/1.18.0"))
    }));
    let results = SecuritySuite::new(transport).run(&get_users(), &no_progress).await;

    let server = find(&results, "Sensitive server header");
    assert_eq!(server.status, Verdict::Fail);
    assert_eq!(server.actual, "nginx/1.18.0");
    assert_eq!(find(&results, "HSTS").status, Verdict::Warning);
    assert_eq!(find(&results, "MIME sniffing").status, Verdict::Fail);
    // GET is a cacheable read.
    assert_eq!(find(&results, "Cache-Control").status, Verdict::Fail);
    assert_eq!(find(&results, "Missing authorization").status, Verdict::Fail);
}

#[tokio::test]
async fn reflected_payload_echo_fails() {
    let transport = Arc::new(ScriptedTransport::new(|req, _| {
        Ok(Response::new(200).with_body(body_text(req)))
    }));
    let options = TestOptions::from_request(
        Request::new(Method::POST, "https://api.example.com/comments")
            .with_body(RequestBody::Json(json!({ "text": "hi", "meta": { "lang": "en" }, "n": 1 }))),
    );
    let results = SecuritySuite::new(transport.clone()).run(&options, &no_progress).await;
    assert_eq!(find(&results, "Reflected payload").status, Verdict::Fail);

    let probe = transport
        .requests()
        .into_iter()
        .find(|r| body_text(r).contains(REFLECTED_PAYLOAD))
        .expect("reflected payload probe");
    assert_eq!(
        probe.body,
        RequestBody::Json(json!({ "text": REFLECTED_PAYLOAD, "meta": { "lang": REFLECTED_PAYLOAD }, "n": 1 }))
    );
}

#[tokio::test]
async fn large_payload_snapshot_is_summarized() {
    let transport = Arc::new(ScriptedTransport::new(hardened_server));
    let results = SecuritySuite::new(transport.clone()).run(&get_users(), &no_progress).await;

    let large = find(&results, "Large payload");
    let snapshot = large.request.as_ref().expect("request snapshot");
    assert_eq!(snapshot.method, Method::POST);
    assert_eq!(snapshot.body, RequestBody::Text(format!("<{} bytes>", LARGE_PAYLOAD_BYTES)));

    let sent = transport
        .requests()
        .into_iter()
        .find(|r| r.body.len() > 1024 * 1024)
        .expect("large payload on the wire");
    assert_eq!(sent.body.len(), LARGE_PAYLOAD_BYTES);
}

#[tokio::test]
async fn numeric_last_segment_skips_uppercase_path() {
    let transport = Arc::new(ScriptedTransport::new(hardened_server));
    let options = TestOptions::from_request(
        Request::new(Method::GET, "https://api.example.com/users/42").with_header("Authorization", "Bearer t"),
    );
    let results = SecuritySuite::new(transport).run(&options, &no_progress).await;
    assert_eq!(find(&results, "Uppercase path").status, Verdict::Info);
}
