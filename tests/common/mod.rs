//! Shared helpers for integration tests
//! A scripted in-memory transport so suites run without a network
#![allow(dead_code)]

use async_trait::async_trait;
use gauntlet::engine::HttpTransport;
use gauntlet::error::ProbeError;
use gauntlet::models::{Method, Request, RequestBody, Response};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Responder = dyn Fn(&Request, usize) -> Result<Response, ProbeError> + Send + Sync;
type Pinger = dyn Fn(&str, u16) -> Result<Duration, ProbeError> + Send + Sync;

/// Answers every request with a closure of `(request, call index)`.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    pinger: Box<Pinger>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    sent: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new(
        responder: impl Fn(&Request, usize) -> Result<Response, ProbeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            pinger: Box::new(|_, _| Ok(Duration::from_millis(5))),
            delay: None,
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Same status for every request.
    pub fn status(status: u16) -> Self {
        Self::new(move |_, _| Ok(Response::new(status)))
    }

    /// Every request fails before a response arrives.
    pub fn unreachable() -> Self {
        Self::new(|_, _| Err(ProbeError::Transport("connection refused".to_string())))
            .with_ping(|_, _| Err(ProbeError::Transport("connection refused".to_string())))
    }

    pub fn with_ping(
        mut self,
        pinger: impl Fn(&str, u16) -> Result<Duration, ProbeError> + Send + Sync + 'static,
    ) -> Self {
        self.pinger = Box::new(pinger);
        self
    }

    /// Sleep before answering, so response times are measurable.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &Request) -> Result<Response, ProbeError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(request, index)
    }

    async fn ping(&self, host: &str, port: u16) -> Result<Duration, ProbeError> {
        (self.pinger)(host, port)
    }
}

/// Body text as the server would receive it.
pub fn body_text(request: &Request) -> String {
    match &request.body {
        RequestBody::Empty => String::new(),
        RequestBody::Json(json) => json.to_string(),
        RequestBody::Form(pairs) => gauntlet::parameters::encode_form(pairs),
        RequestBody::Text(text) => text.clone(),
        RequestBody::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// A server that gets every security check right.
pub fn hardened_server(request: &Request, _index: usize) -> Result<Response, ProbeError> {
    if request.header("authorization").is_none() {
        return Ok(Response::new(401));
    }
    match &request.method {
        Method::OPTIONS => return Ok(Response::new(204).with_header("Allow", "GET, POST")),
        Method::Other(_) => return Ok(Response::new(405)),
        _ => {}
    }
    if request.url.contains("/NOT_FOUND") || request.url.ends_with("/USERS") {
        return Ok(Response::new(404));
    }
    if request.body.len() > 1024 * 1024 {
        return Ok(Response::new(413));
    }
    Ok(Response::new(200)
        .with_header("X-Frame-Options", "DENY")
        .with_header("Strict-Transport-Security", "max-age=31536000")
        .with_header("X-Content-Type-Options", "nosniff")
        .with_header("Cache-Control", "no-store")
        .with_header("Content-Type", "application/json")
        .with_body("{\"ok\":true}"))
}
