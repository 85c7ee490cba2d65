/// Integration tests for suite orchestration and the test registry

mod common;

use common::{hardened_server, ScriptedTransport};
use gauntlet::models::{Method, Request, RequestBody, TestOptions, TestResult, Verdict};
use gauntlet::registry::count_checks;
use gauntlet::runner::{run_suites, ProgressHooks, SuiteSelection};
use gauntlet::suites::{ProbeHook, DATA_DRIVEN_SUITE, PERFORMANCE_SUITE, SECURITY_SUITE};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counting_hook() -> (Arc<AtomicUsize>, Arc<ProbeHook>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let hook: Arc<ProbeHook> = Arc::new(move |_: &TestResult| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (count, hook)
}

fn create_order() -> TestOptions {
    TestOptions::from_request(
        Request::new(Method::POST, "https://api.example.com/orders?source=web")
            .with_header("Authorization", "Bearer t")
            .with_body(RequestBody::Json(json!({ "sku": "A-100", "quantity": 2 }))),
    )
}

#[tokio::test]
async fn hooks_fire_as_often_as_the_registry_predicts() {
    let options = create_order();
    let counts = count_checks(&options);
    let (data_seen, data_hook) = counting_hook();
    let (security_seen, security_hook) = counting_hook();
    let (perf_seen, perf_hook) = counting_hook();
    let hooks = ProgressHooks::new()
        .on(DATA_DRIVEN_SUITE, data_hook)
        .on(SECURITY_SUITE, security_hook)
        .on(PERFORMANCE_SUITE, perf_hook);

    let transport = Arc::new(ScriptedTransport::new(hardened_server));
    let report = run_suites(transport, &options, SuiteSelection::all(), &hooks).await;

    assert_eq!(data_seen.load(Ordering::SeqCst), counts.data_driven);
    assert_eq!(security_seen.load(Ordering::SeqCst), counts.security);
    assert_eq!(perf_seen.load(Ordering::SeqCst), counts.performance);
    assert_eq!(report.data_driven.len(), counts.data_driven);
    assert_eq!(report.performance.len(), counts.performance);
    assert_eq!(report.by_suite().len(), 3);
}

#[tokio::test]
async fn performance_alone_still_collects_samples() {
    let options = create_order();
    let transport = Arc::new(ScriptedTransport::new(hardened_server));
    let selection = SuiteSelection::only("performance").unwrap();
    let report = run_suites(transport, &options, selection, &ProgressHooks::new()).await;

    assert!(report.security.is_empty());
    assert!(!report.data_driven.is_empty());
    let median = report
        .performance
        .iter()
        .find(|r| r.name == "Median response time")
        .unwrap();
    assert_eq!(
        median.value.as_ref().unwrap()["samples"],
        json!(report.data_driven.len())
    );
}

#[tokio::test]
async fn failed_requests_are_not_latency_samples() {
    let options = create_order();
    let transport = Arc::new(ScriptedTransport::unreachable().with_delay(Duration::from_millis(30)));
    let selection = SuiteSelection::only("performance").unwrap();
    let report = run_suites(transport, &options, selection, &ProgressHooks::new()).await;

    assert!(!report.data_driven.is_empty());
    assert!(report.data_driven.iter().all(|r| r.response.is_none() && r.response_time.is_none()));
    let median = report
        .performance
        .iter()
        .find(|r| r.name == "Median response time")
        .unwrap();
    assert_eq!(median.status, Verdict::Info);
    assert_eq!(median.actual, "no response-time samples");
}

#[tokio::test]
async fn security_only_sends_no_data_driven_probes() {
    let options = create_order();
    let transport = Arc::new(ScriptedTransport::new(hardened_server));
    let selection = SuiteSelection::only("security").unwrap();
    let report = run_suites(transport, &options, selection, &ProgressHooks::new()).await;

    assert!(report.data_driven.is_empty());
    assert!(report.performance.is_empty());
    assert!(report.security.len() >= count_checks(&options).security);
    assert_eq!(report.all_results().len(), report.security.len());
}

#[test]
fn unknown_suite_names_are_rejected() {
    assert!(SuiteSelection::only("fuzz").is_none());
    assert_eq!(SuiteSelection::only("all"), Some(SuiteSelection::all()));
    assert!(SuiteSelection::only("data").unwrap().data_driven);
}

#[test]
fn counts_grow_with_mapped_fields() {
    let bare = TestOptions::from_request(Request::new(Method::GET, "https://api.example.com/orders"));
    let counts = count_checks(&create_order());
    assert!(counts.data_driven > count_checks(&bare).data_driven);
    assert_eq!(counts.total(), counts.data_driven + counts.security + counts.performance);
}
