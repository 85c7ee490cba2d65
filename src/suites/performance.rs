// Performance insights for Gauntlet
//
// Works on response times and bodies already collected by the data-driven
// run; the only new traffic is five sequential latency probes to the host.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use super::{run_table, CheckEntry, ProbeHook, Suite};
use crate::engine::HttpTransport;
use crate::models::{Response, TestOptions, TestResult, Verdict};
use crate::mutator::host_and_port;
use crate::response_analysis::{body_size, is_json_response};
use crate::stats::median;

pub const PERFORMANCE_SUITE: &str = "performance";

pub const MEDIAN_PASS_MS: u64 = 500;
pub const MEDIAN_WARN_MS: u64 = 1000;
pub const PING_PROBES: usize = 5;
pub const PING_SLOW_MS: u64 = 100;
pub const PING_SLOW_LIMIT: usize = 3;
pub const SHARE_PASS: f64 = 0.30;
pub const SHARE_WARN: f64 = 0.50;
pub const FAST_TOTAL_MS: u64 = 300;
pub const MAX_JSON_BODY_BYTES: usize = 100 * 1024;

pub static PERFORMANCE_CHECKS: &[CheckEntry<PerformanceContext>] = &[
    CheckEntry { name: "Median response time", run: median_response_time },
    CheckEntry { name: "Ping latency", run: ping_latency },
    CheckEntry { name: "Network share", run: network_share },
    CheckEntry { name: "Response size", run: response_size },
];

/// Verdict for a typical response time.
pub fn latency_verdict(millis: u64) -> Verdict {
    if millis <= MEDIAN_PASS_MS {
        Verdict::Pass
    } else if millis <= MEDIAN_WARN_MS {
        Verdict::Warning
    } else {
        Verdict::Fail
    }
}

/// Verdict for the network share of total latency.
pub fn share_verdict(share: f64, median_ms: u64) -> Verdict {
    if share < SHARE_PASS || median_ms < FAST_TOTAL_MS {
        Verdict::Pass
    } else if share < SHARE_WARN {
        Verdict::Warning
    } else {
        Verdict::Fail
    }
}

pub struct PerformanceInsights {
    transport: Arc<dyn HttpTransport>,
    samples: Vec<u64>,
    responses: Vec<Response>,
}

impl PerformanceInsights {
    pub fn new(transport: Arc<dyn HttpTransport>, samples: Vec<u64>, responses: Vec<Response>) -> Self {
        Self {
            transport,
            samples,
            responses,
        }
    }

    /// Collect samples and captured responses from earlier results.
    pub fn from_results(transport: Arc<dyn HttpTransport>, results: &[TestResult]) -> Self {
        let samples = results.iter().filter_map(|r| r.response_time).collect();
        let responses = results.iter().filter_map(|r| r.response.clone()).collect();
        Self::new(transport, samples, responses)
    }
}

#[async_trait]
impl Suite for PerformanceInsights {
    fn name(&self) -> &'static str {
        PERFORMANCE_SUITE
    }

    fn planned_checks(&self, _options: &TestOptions) -> usize {
        PERFORMANCE_CHECKS.len()
    }

    async fn run(&self, options: &TestOptions, on_probe: &ProbeHook) -> Vec<TestResult> {
        let ctx = PerformanceContext {
            transport: Arc::clone(&self.transport),
            url: options.request.url.clone(),
            samples: self.samples.clone(),
            responses: self.responses.clone(),
            pings: OnceCell::new(),
        };
        let results = run_table(PERFORMANCE_SUITE, PERFORMANCE_CHECKS, &ctx, on_probe).await;
        info!(samples = ctx.samples.len(), "performance insights finished");
        results
    }
}

/// Outcome of the latency probes, shared by the ping and network-share checks.
#[derive(Debug, Clone)]
pub struct PingReport {
    pub hostname: String,
    pub probes: Vec<Result<u64, String>>,
    pub target_error: Option<String>,
}

impl PingReport {
    fn successful(&self) -> Vec<u64> {
        self.probes.iter().filter_map(|p| p.as_ref().ok().copied()).collect()
    }

    /// Probes that failed or exceeded the slow threshold.
    fn slow_count(&self) -> usize {
        self.probes
            .iter()
            .filter(|p| match p {
                Ok(ms) => *ms > PING_SLOW_MS,
                Err(_) => true,
            })
            .count()
    }
}

pub struct PerformanceContext {
    transport: Arc<dyn HttpTransport>,
    url: String,
    samples: Vec<u64>,
    responses: Vec<Response>,
    pings: OnceCell<PingReport>,
}

impl PerformanceContext {
    async fn pings(&self) -> &PingReport {
        self.pings
            .get_or_init(|| async {
                let (host, port) = match host_and_port(&self.url) {
                    Ok(target) => target,
                    Err(e) => {
                        return PingReport {
                            hostname: String::new(),
                            probes: Vec::new(),
                            target_error: Some(e.as_actual()),
                        }
                    }
                };
                let mut probes = Vec::with_capacity(PING_PROBES);
                for _ in 0..PING_PROBES {
                    let probe = self
                        .transport
                        .ping(&host, port)
                        .await
                        .map(|d| d.as_millis() as u64)
                        .map_err(|e| e.to_string());
                    probes.push(probe);
                }
                PingReport {
                    hostname: host,
                    probes,
                    target_error: None,
                }
            })
            .await
    }
}

fn median_response_time(ctx: &PerformanceContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let name = "Median response time";
        let expected = format!("<= {} ms", MEDIAN_PASS_MS);
        let result = match median(&ctx.samples) {
            Some(ms) => TestResult::new(name, expected, format!("{} ms", ms), latency_verdict(ms))
                .with_value(json!({ "median_ms": ms, "samples": ctx.samples.len() })),
            None => TestResult::new(name, expected, "no response-time samples", Verdict::Info),
        };
        vec![result]
    })
}

fn ping_latency(ctx: &PerformanceContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let name = "Ping latency";
        let expected = format!(
            "fewer than {} of {} probes over {} ms",
            PING_SLOW_LIMIT, PING_PROBES, PING_SLOW_MS
        );
        let report = ctx.pings().await;
        if let Some(error) = &report.target_error {
            return vec![TestResult::new(name, expected, error.clone(), Verdict::Fail)];
        }

        let slow = report.slow_count();
        let status = if slow >= PING_SLOW_LIMIT {
            Verdict::Fail
        } else {
            Verdict::Pass
        };
        let samples: Vec<Option<u64>> = report.probes.iter().map(|p| p.as_ref().ok().copied()).collect();
        vec![TestResult::new(
            name,
            expected,
            format!("{}/{} probes over {} ms", slow, report.probes.len(), PING_SLOW_MS),
            status,
        )
        .with_value(json!({ "hostname": report.hostname, "samples_ms": samples }))]
    })
}

fn network_share(ctx: &PerformanceContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let name = "Network share";
        let expected = format!(
            "network < {:.0}% of response time, or median < {} ms",
            SHARE_PASS * 100.0,
            FAST_TOTAL_MS
        );
        let Some(median_ms) = median(&ctx.samples) else {
            return vec![TestResult::new(name, expected, "no response-time samples", Verdict::Info)];
        };

        let report = ctx.pings().await;
        if let Some(error) = &report.target_error {
            return vec![TestResult::new(name, expected, error.clone(), Verdict::Fail)];
        }
        let Some(ping_ms) = median(&report.successful()) else {
            let reason = report
                .probes
                .iter()
                .find_map(|p| p.as_ref().err().cloned())
                .unwrap_or_else(|| "no ping probes".to_string());
            return vec![TestResult::new(
                name,
                expected,
                format!("Unexpected error: {}", reason),
                Verdict::Fail,
            )];
        };

        let share = if median_ms == 0 {
            0.0
        } else {
            ping_ms as f64 / median_ms as f64
        };
        vec![TestResult::new(
            name,
            expected,
            format!("{:.0}% ({} ms of {} ms)", share * 100.0, ping_ms, median_ms),
            share_verdict(share, median_ms),
        )
        .with_value(json!({
            "hostname": report.hostname,
            "ping_ms": ping_ms,
            "median_ms": median_ms,
            "share": share,
        }))]
    })
}

fn response_size(ctx: &PerformanceContext) -> BoxFuture<'_, Vec<TestResult>> {
    Box::pin(async move {
        let name = "Response size";
        let expected = format!("JSON bodies <= {} KB", MAX_JSON_BODY_BYTES / 1024);
        let sizes: Vec<usize> = ctx
            .responses
            .iter()
            .filter(|r| is_json_response(r))
            .map(body_size)
            .collect();
        let Some(largest) = sizes.iter().copied().max() else {
            return vec![TestResult::new(name, expected, "no JSON responses captured", Verdict::Info)];
        };
        let oversized = sizes.iter().filter(|s| **s > MAX_JSON_BODY_BYTES).count();
        let (actual, status) = if oversized > 0 {
            (
                format!("{} response(s) over limit, largest {} bytes", oversized, largest),
                Verdict::Fail,
            )
        } else {
            (format!("largest {} bytes", largest), Verdict::Pass)
        };
        vec![TestResult::new(name, expected, actual, status)
            .with_value(json!({ "largest_bytes": largest, "oversized": oversized }))]
    })
}
