//! Load test runner.
//!
//! Spawns `min(thread_count, request_count)` workers that claim request
//! indices from one shared counter until every index is claimed or the run is
//! aborted. Aborts are cooperative: the flag is checked between requests, so
//! in-flight requests always finish.
//!
//! Early-abort conditions, checked after every completed request:
//! - cumulative 5xx responses reach [`SERVER_ERROR_ABORT`];
//! - with at least `min(10, request_count)` samples, the running p50 exceeds
//!   [`SLOW_P50_ABORT_MS`].

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LoadTestConfig;
use crate::engine::HttpTransport;
use crate::models::{Request, TestResult, Verdict};
use crate::stats::{percentile_sorted, Percentiles};
use crate::suites::latency_verdict;

pub const SERVER_ERROR_ABORT: usize = 5;
pub const SLOW_P50_ABORT_MS: u64 = 5000;
pub const MIN_SAMPLES_FOR_LATENCY_ABORT: usize = 10;

/// `(sent, total)` progress callback. Called only when the integer percentage changes.
pub type LoadProgress = dyn Fn(usize, usize) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbortReason {
    ServerErrors,
    SlowResponses,
    Cancelled,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::ServerErrors => write!(f, "{} server errors", SERVER_ERROR_ABORT),
            AbortReason::SlowResponses => write!(f, "p50 above {} ms", SLOW_P50_ABORT_MS),
            AbortReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadTestReport {
    /// Requests that completed (with a response or a transport error).
    pub sent: usize,
    pub total: usize,
    pub server_errors: usize,
    pub transport_errors: usize,
    pub p50: Option<u64>,
    pub p90: Option<u64>,
    pub p95: Option<u64>,
    pub aborted: Option<AbortReason>,
    pub elapsed_ms: u64,
    pub verdict: Verdict,
}

impl LoadTestReport {
    pub fn to_test_result(&self) -> TestResult {
        let mut actual = format!("{}/{} requests", self.sent, self.total);
        if let Some(p50) = self.p50 {
            actual.push_str(&format!(", p50 {} ms", p50));
        }
        if self.server_errors > 0 {
            actual.push_str(&format!(", {} server errors", self.server_errors));
        }
        if let Some(reason) = self.aborted {
            actual.push_str(&format!(", aborted: {}", reason));
        }
        let mut result = TestResult::new("Load test", "p50 <= 500 ms without server errors", actual, self.verdict);
        if let Ok(value) = serde_json::to_value(self) {
            result = result.with_value(value);
        }
        result
    }
}

/// State shared by all workers of one run.
struct Shared {
    total: usize,
    next_index: AtomicUsize,
    completed: AtomicUsize,
    server_errors: AtomicUsize,
    transport_errors: AtomicUsize,
    last_percent: AtomicUsize,
    abort: AtomicBool,
    abort_reason: OnceLock<AbortReason>,
    /// Kept sorted so the running p50 is a lookup.
    samples: Mutex<Vec<u64>>,
}

impl Shared {
    fn trip(&self, reason: AbortReason) {
        if self.abort_reason.set(reason).is_ok() {
            warn!(%reason, "load test aborting");
        }
        self.abort.store(true, Ordering::SeqCst);
    }

    fn should_stop(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            self.trip(AbortReason::Cancelled);
        }
        self.abort.load(Ordering::SeqCst)
    }
}

pub struct LoadTestRunner {
    transport: Arc<dyn HttpTransport>,
    config: LoadTestConfig,
    progress: Option<Arc<LoadProgress>>,
    cancel: CancellationToken,
}

impl LoadTestRunner {
    pub fn new(transport: Arc<dyn HttpTransport>, config: LoadTestConfig) -> Self {
        Self {
            transport,
            config,
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<LoadProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the run between requests when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self, request: &Request) -> LoadTestReport {
        let total = self.config.request_count;
        let workers = self.config.worker_count();
        let shared = Arc::new(Shared {
            total,
            next_index: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            server_errors: AtomicUsize::new(0),
            transport_errors: AtomicUsize::new(0),
            last_percent: AtomicUsize::new(0),
            abort: AtomicBool::new(false),
            abort_reason: OnceLock::new(),
            samples: Mutex::new(Vec::with_capacity(total)),
        });
        let request = Arc::new(request.clone());

        info!(workers, total, url = %request.url, "load test starting");
        let started = Instant::now();

        let mut set = JoinSet::new();
        for worker in 0..workers {
            set.spawn(worker_loop(
                worker,
                Arc::clone(&self.transport),
                Arc::clone(&request),
                Arc::clone(&shared),
                self.progress.clone(),
                self.cancel.clone(),
            ));
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "load test worker failed");
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let samples = shared.samples.lock().clone();
        let percentiles = Percentiles::from_samples(&samples);
        let aborted = shared.abort_reason.get().copied();
        let server_errors = shared.server_errors.load(Ordering::SeqCst);
        let verdict = match percentiles {
            _ if server_errors >= SERVER_ERROR_ABORT => Verdict::Bug,
            Some(p) => latency_verdict(p.p50),
            None => Verdict::Fail,
        };

        let report = LoadTestReport {
            sent: shared.completed.load(Ordering::SeqCst),
            total,
            server_errors,
            transport_errors: shared.transport_errors.load(Ordering::SeqCst),
            p50: percentiles.map(|p| p.p50),
            p90: percentiles.map(|p| p.p90),
            p95: percentiles.map(|p| p.p95),
            aborted,
            elapsed_ms,
            verdict,
        };
        info!(
            sent = report.sent,
            total,
            server_errors = report.server_errors,
            verdict = %report.verdict,
            elapsed_ms,
            "load test finished"
        );
        report
    }
}

async fn worker_loop(
    worker: usize,
    transport: Arc<dyn HttpTransport>,
    request: Arc<Request>,
    shared: Arc<Shared>,
    progress: Option<Arc<LoadProgress>>,
    cancel: CancellationToken,
) {
    loop {
        if shared.should_stop(&cancel) {
            break;
        }
        let index = shared.next_index.fetch_add(1, Ordering::SeqCst);
        if index >= shared.total {
            break;
        }

        let started = Instant::now();
        let outcome = transport.send(&request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(response) => {
                let running_p50 = {
                    let mut samples = shared.samples.lock();
                    let pos = samples.partition_point(|&s| s <= elapsed_ms);
                    samples.insert(pos, elapsed_ms);
                    let needed = MIN_SAMPLES_FOR_LATENCY_ABORT.min(shared.total);
                    if samples.len() >= needed {
                        percentile_sorted(&samples, 50.0)
                    } else {
                        None
                    }
                };
                if response.is_server_error() {
                    let count = shared.server_errors.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!(worker, index, status = response.status, count, "server error");
                    if count >= SERVER_ERROR_ABORT {
                        shared.trip(AbortReason::ServerErrors);
                    }
                }
                if running_p50.map(|p| p > SLOW_P50_ABORT_MS).unwrap_or(false) {
                    shared.trip(AbortReason::SlowResponses);
                }
            }
            Err(e) => {
                shared.transport_errors.fetch_add(1, Ordering::SeqCst);
                debug!(worker, index, error = %e, "load request failed");
            }
        }

        let sent = shared.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(progress) = &progress {
            let percent = sent * 100 / shared.total;
            if shared.last_percent.fetch_max(percent, Ordering::SeqCst) < percent {
                progress(sent, shared.total);
            }
        }
    }
}
