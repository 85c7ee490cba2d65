// Test suites for Gauntlet
//
// Every suite implements `Suite`: a counting pass (`planned_checks`) and an
// execution pass (`run`) over the same table of checks, so progress totals are
// known before the first request is sent.
//
// - data_driven: per-field dataset mutations and normalization probes
// - security: fixed header / method / path / payload checklist
// - performance: latency statistics over already-collected samples

pub mod data_driven;
pub mod performance;
pub mod security;

pub use data_driven::*;
pub use performance::*;
pub use security::*;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::Instant;
use tracing::debug;

use crate::engine::HttpTransport;
use crate::error::ProbeError;
use crate::models::{Request, Response, TestOptions, TestResult};

/// Per-probe progress callback. Invoked once per completed check.
pub type ProbeHook = dyn Fn(&TestResult) + Send + Sync;

/// Hook that ignores every probe.
pub fn no_progress(_: &TestResult) {}

#[async_trait]
pub trait Suite: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of checks `run` will report progress for.
    fn planned_checks(&self, options: &TestOptions) -> usize;

    /// Execute every check. Never fails: transport errors become results.
    async fn run(&self, options: &TestOptions, on_probe: &ProbeHook) -> Vec<TestResult>;
}

/// One named entry of a suite's check table.
pub struct CheckEntry<C: 'static> {
    pub name: &'static str,
    pub run: for<'c> fn(&'c C) -> BoxFuture<'c, Vec<TestResult>>,
}

/// Run a check table in order, reporting each entry's first result.
pub async fn run_table<C: Sync + 'static>(
    suite: &str,
    table: &[CheckEntry<C>],
    ctx: &C,
    on_probe: &ProbeHook,
) -> Vec<TestResult> {
    let mut results = Vec::with_capacity(table.len());
    for entry in table {
        let produced = (entry.run)(ctx).await;
        if let Some(first) = produced.first() {
            debug!(suite, check = entry.name, verdict = %first.status, "check finished");
            on_probe(first);
        }
        results.extend(produced);
    }
    results
}

/// Outcome of sending one probe.
#[derive(Debug)]
pub struct Exchange {
    pub response: Result<Response, ProbeError>,
    pub elapsed_ms: u64,
}

impl Exchange {
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref().ok()
    }

    /// Status line, or the transport error text.
    pub fn actual(&self) -> String {
        match &self.response {
            Ok(resp) => resp.status_line(),
            Err(e) => e.as_actual(),
        }
    }

    /// Build a result carrying this exchange's response and timing.
    /// Transport failures carry no response time, so they never become latency samples.
    pub fn to_result(
        &self,
        name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        status: crate::models::Verdict,
        request: Request,
    ) -> TestResult {
        let result = TestResult::new(name, expected, actual, status)
            .with_request(request)
            .with_response(self.response().cloned());
        match self.response {
            Ok(_) => result.with_response_time(self.elapsed_ms),
            Err(_) => result,
        }
    }
}

/// Send one probe and time it.
pub async fn exchange(transport: &dyn HttpTransport, request: &Request) -> Exchange {
    let started = Instant::now();
    let response = transport.send(request).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if let Err(e) = &response {
        tracing::warn!(method = %request.method, url = %request.url, error = %e, "probe got no response");
    }
    Exchange {
        response,
        elapsed_ms,
    }
}
