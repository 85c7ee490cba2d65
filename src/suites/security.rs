// Security checklist for Gauntlet
//
// A fixed table of independent checks. Header checks inspect one baseline
// exchange made when the suite starts; the rest send a single mutated clone
// of the baseline. Every entry yields at least one result, and a failing
// entry never stops the ones after it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::{exchange, run_table, CheckEntry, Exchange, ProbeHook, Suite};
use crate::engine::HttpTransport;
use crate::models::{Method, Request, RequestBody, Response, TestOptions, TestResult, Verdict};
use crate::mutator::{append_path_segment, uppercase_host, uppercase_last_segment};
use crate::parameters::{replace_string_leaves, StructuredBody};
use crate::response_analysis::{allowed_methods, body_echoes};
use crate::verdict::{decide_verdict, decide_verdict_or, Rule};

pub const SECURITY_SUITE: &str = "security";

pub const UNSUPPORTED_METHOD_TOKEN: &str = "GAUNTLET";
pub const CORS_PROBE_ORIGIN: &str = "https://gauntlet.invalid";
pub const NOT_FOUND_SEGMENT: &str = "NOT_FOUND";
pub const REFLECTED_PAYLOAD: &str = "<script>alert('gauntlet')</script>";
pub const LARGE_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Check table. Counting and execution both iterate this list.
pub static SECURITY_CHECKS: &[CheckEntry<SecurityContext>] = &[
    CheckEntry { name: "Sensitive server header", run: sensitive_server_header },
    CheckEntry { name: "Clickjacking protection", run: clickjacking_protection },
    CheckEntry { name: "HSTS", run: hsts },
    CheckEntry { name: "MIME sniffing", run: mime_sniffing },
    CheckEntry { name: "Cache-Control", run: cache_control },
    CheckEntry { name: "OPTIONS handling", run: options_handling },
    CheckEntry { name: "Unsupported method", run: unsupported_method },
    CheckEntry { name: "Missing authorization", run: missing_authorization },
    CheckEntry { name: "CORS", run: cors },
    CheckEntry { name: "404 handling", run: not_found_handling },
    CheckEntry { name: "Reflected payload", run: reflected_payload },
    CheckEntry { name: "Uppercase domain", run: uppercase_domain },
    CheckEntry { name: "Uppercase path", run: uppercase_path },
    CheckEntry { name: "Large payload", run: large_payload },
];

pub struct SecuritySuite {
    transport: Arc<dyn HttpTransport>,
}

impl SecuritySuite {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Suite for SecuritySuite {
    fn name(&self) -> &'static str {
        SECURITY_SUITE
    }

    fn planned_checks(&self, _options: &TestOptions) -> usize {
        SECURITY_CHECKS.len()
    }

    async fn run(&self, options: &TestOptions, on_probe: &ProbeHook) -> Vec<TestResult> {
        let baseline_request = options.request.clone();
        let baseline = exchange(self.transport.as_ref(), &baseline_request).await;
        let ctx = SecurityContext {
            transport: Arc::clone(&self.transport),
            baseline_request,
            baseline,
        };

        let results = run_table(SECURITY_SUITE, SECURITY_CHECKS, &ctx, on_probe).await;
        let failed = results
            .iter()
            .filter(|r| matches!(r.status, Verdict::Fail | Verdict::FailNoResponse | Verdict::Bug))
            .count();
        info!(checks = results.len(), failed, "security suite finished");
        results
    }
}

/// Shared state for one security run.
pub struct SecurityContext {
    transport: Arc<dyn HttpTransport>,
    baseline_request: Request,
    baseline: Exchange,
}

impl SecurityContext {
    /// Evaluate a condition on the baseline response.
    fn baseline_check(
        &self,
        name: &str,
        expected: &str,
        otherwise: Verdict,
        eval: impl FnOnce(&Response) -> (bool, String),
    ) -> TestResult {
        let (status, actual) = match self.baseline.response() {
            Some(resp) => {
                let (holds, actual) = eval(resp);
                (decide_verdict(Some(resp), &Rule::Condition { holds, otherwise }), actual)
            }
            None => (Verdict::Bug, self.baseline.actual()),
        };
        self.baseline
            .to_result(name, expected, actual, status, self.baseline_request.clone())
    }

    /// Send `request` and classify it with the rule `rule_for` derives from the response.
    async fn probe(
        &self,
        name: &str,
        expected: &str,
        request: Request,
        no_response: Verdict,
        rule_for: impl FnOnce(&Response) -> Rule + Send,
    ) -> (TestResult, Exchange) {
        let ex = exchange(self.transport.as_ref(), &request).await;
        let status = match ex.response() {
            Some(resp) => decide_verdict_or(Some(resp), &rule_for(resp), no_response),
            None => no_response,
        };
        let result = ex.to_result(name, expected, ex.actual(), status, request);
        (result, ex)
    }

    /// Result for a probe whose request could not even be built.
    fn unbuildable(&self, name: &str, expected: &str, error: &crate::error::ProbeError, status: Verdict) -> TestResult {
        TestResult::new(name, expected, error.as_actual(), status)
            .with_request(self.baseline_request.clone())
    }
}

fn sensitive_server_header(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        vec![ctx.baseline_check(
            "Sensitive server header",
            "Server header absent or without version",
            Verdict::Fail,
            |resp| match resp.header("server") {
                None => (true, "absent".to_string()),
                Some(server) => (!server.chars().any(|c| c.is_ascii_digit()), server.to_string()),
            },
        )]
    })
}

fn frame_ancestors_restricted(csp: &str) -> bool {
    csp.split(';').map(str::trim).any(|directive| {
        let mut tokens = directive.split_whitespace();
        tokens
            .next()
            .map(|name| name.eq_ignore_ascii_case("frame-ancestors"))
            .unwrap_or(false)
            && tokens.any(|t| t == "'none'" || t == "'self'")
    })
}

fn clickjacking_protection(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        vec![ctx.baseline_check(
            "Clickjacking protection",
            "X-Frame-Options DENY/SAMEORIGIN or CSP frame-ancestors 'none'/'self'",
            Verdict::Fail,
            |resp| {
                let xfo = resp.header("x-frame-options").map(str::trim);
                let xfo_ok = xfo
                    .map(|v| v.eq_ignore_ascii_case("DENY") || v.eq_ignore_ascii_case("SAMEORIGIN"))
                    .unwrap_or(false);
                let csp = resp.header("content-security-policy");
                let csp_ok = csp.map(frame_ancestors_restricted).unwrap_or(false);
                let actual = match (xfo, csp) {
                    (None, None) => "no framing policy".to_string(),
                    (Some(x), None) => format!("X-Frame-Options: {}", x),
                    (None, Some(c)) => format!("Content-Security-Policy: {}", c),
                    (Some(x), Some(c)) => {
                        format!("X-Frame-Options: {}; Content-Security-Policy: {}", x, c)
                    }
                };
                (xfo_ok || csp_ok, actual)
            },
        )]
    })
}

fn hsts(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        vec![ctx.baseline_check(
            "HSTS",
            "Strict-Transport-Security present",
            Verdict::Warning,
            |resp| match resp.header("strict-transport-security") {
                Some(v) => (true, v.to_string()),
                None => (false, "absent".to_string()),
            },
        )]
    })
}

fn mime_sniffing(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        vec![ctx.baseline_check(
            "MIME sniffing",
            "X-Content-Type-Options: nosniff",
            Verdict::Fail,
            |resp| match resp.header("x-content-type-options") {
                Some(v) => (v.trim().eq_ignore_ascii_case("nosniff"), v.to_string()),
                None => (false, "absent".to_string()),
            },
        )]
    })
}

fn cache_control(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let otherwise = if ctx.baseline_request.method.is_cacheable_read() {
            Verdict::Fail
        } else {
            Verdict::Warning
        };
        vec![ctx.baseline_check(
            "Cache-Control",
            "Cache-Control contains no-store or private",
            otherwise,
            |resp| match resp.header("cache-control") {
                Some(v) => {
                    let lower = v.to_ascii_lowercase();
                    (lower.contains("no-store") || lower.contains("private"), v.to_string())
                }
                None => (false, "absent".to_string()),
            },
        )]
    })
}

fn crud_expectation(method: &Method) -> &'static str {
    match method {
        Method::GET => "Reading returns the resource",
        Method::POST => "Creating returns 201 and the new resource",
        Method::PUT => "Replacing updates the whole resource",
        Method::PATCH => "Partial update changes only the sent fields",
        Method::DELETE => "Deleting removes the resource; a later GET returns 404",
        Method::HEAD => "Headers match GET without a body",
        Method::OPTIONS => "Lists the supported methods",
        Method::Other(_) => "Behaviour is documented",
    }
}

fn options_handling(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let mut request = ctx.baseline_request.clone();
        request.method = Method::OPTIONS;
        request.body = RequestBody::Empty;

        let (result, ex) = ctx
            .probe(
                "OPTIONS handling",
                "200 or 204 with Allow / Access-Control-Allow-Methods",
                request,
                Verdict::Bug,
                |resp| Rule::Condition {
                    holds: matches!(resp.status, 200 | 204)
                        && allowed_methods(resp).map(|m| !m.is_empty()).unwrap_or(false),
                    otherwise: Verdict::Fail,
                },
            )
            .await;

        let allowed = match (result.status, ex.response()) {
            (Verdict::Pass, Some(resp)) => allowed_methods(resp).unwrap_or_default(),
            _ => Vec::new(),
        };

        let mut results = vec![result];
        if allowed.is_empty() {
            results.push(TestResult::new(
                "CRUD discovery",
                "OPTIONS lists the allowed methods",
                "no usable Allow header",
                Verdict::Fail,
            ));
        } else {
            for method in allowed {
                results.push(
                    TestResult::new(
                        format!("CRUD: {}", method),
                        crud_expectation(&method),
                        "verify manually",
                        Verdict::Manual,
                    )
                    .with_value(json!(method.to_string())),
                );
            }
        }
        results
    })
}

fn unsupported_method(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let mut request = ctx.baseline_request.clone();
        request.method = Method::Other(UNSUPPORTED_METHOD_TOKEN.to_string());
        let rule = Rule::StatusIn(vec![405, 501]);
        let expected = rule.describe();
        let (result, _) = ctx
            .probe("Unsupported method", &expected, request, Verdict::Bug, move |_| rule)
            .await;
        vec![result]
    })
}

fn missing_authorization(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let mut request = ctx.baseline_request.clone();
        request.headers.retain(|name, _| {
            name.eq_ignore_ascii_case("accept") || name.eq_ignore_ascii_case("content-type")
        });
        let (result, _) = ctx
            .probe("Missing authorization", "401", request, Verdict::Bug, |_| {
                Rule::StatusIn(vec![401])
            })
            .await;
        vec![result]
    })
}

fn describe_cors(resp: &Response) -> String {
    let credentials = resp
        .header("access-control-allow-credentials")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let suffix = if credentials { " with credentials" } else { "" };
    match resp.header("access-control-allow-origin").map(str::trim) {
        Some("*") => format!("Public: any origin allowed{}", suffix),
        Some(origin) if origin == CORS_PROBE_ORIGIN => {
            format!("Reflects arbitrary origins{}", suffix)
        }
        Some(origin) => format!("Private: restricted to {}{}", origin, suffix),
        None => "Private: no cross-origin access".to_string(),
    }
}

fn cors(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let mut request = ctx.baseline_request.clone();
        request.set_header("Origin", CORS_PROBE_ORIGIN);
        let (mut result, ex) = ctx
            .probe("CORS", "informational", request, Verdict::Bug, |_| Rule::Informational)
            .await;
        if let Some(resp) = ex.response() {
            if !resp.is_server_error() {
                result.actual = describe_cors(resp);
            }
            result.value = Some(json!({
                "allow_origin": resp.header("access-control-allow-origin"),
                "allow_credentials": resp.header("access-control-allow-credentials"),
            }));
        }
        vec![result]
    })
}

fn not_found_handling(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let name = "404 handling";
        let url = match append_path_segment(&ctx.baseline_request.url, NOT_FOUND_SEGMENT) {
            Ok(url) => url,
            Err(e) => return vec![ctx.unbuildable(name, "404", &e, Verdict::FailNoResponse)],
        };
        let mut request = ctx.baseline_request.clone();
        request.url = url;
        let (result, _) = ctx
            .probe(name, "404", request, Verdict::FailNoResponse, |_| {
                Rule::StatusIn(vec![404])
            })
            .await;
        vec![result]
    })
}

fn reflected_payload(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let name = "Reflected payload";
        let expected = "400 or 422 without echoing the payload";
        let baseline = &ctx.baseline_request;
        if !baseline.method.carries_body() {
            return vec![TestResult::new(
                name,
                expected,
                format!("not applicable to {}", baseline.method),
                Verdict::Info,
            )];
        }

        let mut request = baseline.clone();
        request.body = match StructuredBody::from_request(&baseline.body, &baseline.headers) {
            Some(structured) => {
                let mut mutated = structured.clone();
                match &mut mutated {
                    StructuredBody::Json(json) => replace_string_leaves(json, REFLECTED_PAYLOAD),
                    StructuredBody::Form(pairs) => {
                        for (_, value) in pairs.iter_mut() {
                            *value = REFLECTED_PAYLOAD.to_string();
                        }
                    }
                }
                if mutated == structured {
                    RequestBody::Text(REFLECTED_PAYLOAD.to_string())
                } else {
                    mutated.into_body()
                }
            }
            None => RequestBody::Text(REFLECTED_PAYLOAD.to_string()),
        };

        let (result, _) = ctx
            .probe(name, expected, request, Verdict::Bug, |resp| Rule::Condition {
                holds: matches!(resp.status, 400 | 422) && !body_echoes(resp, REFLECTED_PAYLOAD),
                otherwise: Verdict::Fail,
            })
            .await;
        vec![result]
    })
}

fn uppercase_domain(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let name = "Uppercase domain";
        let expected = Rule::Success.describe();
        let (url, host) = match uppercase_host(&ctx.baseline_request.url) {
            Ok(rewritten) => rewritten,
            Err(e) => return vec![ctx.unbuildable(name, &expected, &e, Verdict::Bug)],
        };
        let mut request = ctx.baseline_request.clone();
        request.url = url;
        request.set_header("Host", host);
        let (result, _) = ctx
            .probe(name, &expected, request, Verdict::Bug, |_| Rule::Success)
            .await;
        vec![result]
    })
}

fn uppercase_path(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let name = "Uppercase path";
        let url = match uppercase_last_segment(&ctx.baseline_request.url) {
            Ok(Some(url)) => url,
            Ok(None) => {
                return vec![TestResult::new(
                    name,
                    "404",
                    "last path segment has no letters to upper-case",
                    Verdict::Info,
                )]
            }
            Err(e) => return vec![ctx.unbuildable(name, "404", &e, Verdict::Bug)],
        };
        let mut request = ctx.baseline_request.clone();
        request.url = url;
        let (result, _) = ctx
            .probe(name, "404", request, Verdict::Bug, |_| Rule::StatusIn(vec![404]))
            .await;
        vec![result]
    })
}

fn large_payload(ctx: &SecurityContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let mut request = ctx.baseline_request.clone();
        request.method = Method::POST;
        request.set_header("Content-Type", "application/json");
        let filler_len = LARGE_PAYLOAD_BYTES.saturating_sub(r#"{"data":""}"#.len());
        request.body = RequestBody::Text(format!(r#"{{"data":"{}"}}"#, "A".repeat(filler_len)));

        let (mut result, _) = ctx
            .probe("Large payload", "413", request, Verdict::Bug, |_| {
                Rule::StatusIn(vec![413])
            })
            .await;
        if let Some(snapshot) = result.request.as_mut() {
            snapshot.body = RequestBody::Text(format!("<{} bytes>", LARGE_PAYLOAD_BYTES));
        }
        vec![result]
    })
}
