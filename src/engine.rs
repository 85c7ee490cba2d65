// Async HTTP engine for Gauntlet
// The one capability every suite sends probes through

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ProbeError;
use crate::models::{Request, RequestBody, Response};
use crate::parameters::encode_form;

/// Request/Response capability supplied by the host.
///
/// `send` must accept any method token and must not cap body sizes below 10 MB.
/// `ping` performs one raw latency probe against a host.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, ProbeError>;

    async fn ping(&self, host: &str, port: u16) -> Result<Duration, ProbeError>;
}

/// reqwest-backed transport.
pub struct HttpEngine {
    pub client: Client,
    ping_timeout: Duration,
}

impl HttpEngine {
    pub fn new() -> Result<Self, ProbeError> {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            ping_timeout: config.ping_timeout(),
        })
    }
}

#[async_trait]
impl HttpTransport for HttpEngine {
    async fn send(&self, request: &Request) -> Result<Response, ProbeError> {
        let method_token = request.method.to_string();
        let method = reqwest::Method::from_bytes(method_token.as_bytes())
            .map_err(|_| ProbeError::InvalidMethod(method_token.clone()))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProbeError::Transport(format!("invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ProbeError::Transport(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let mut req = self.client.request(method, &request.url);
        req = match &request.body {
            RequestBody::Empty => req,
            RequestBody::Json(value) => {
                if request.content_type().is_none() {
                    headers.insert(
                        reqwest::header::CONTENT_TYPE,
                        HeaderValue::from_static("application/json"),
                    );
                }
                req.body(serde_json::to_vec(value)?)
            }
            RequestBody::Form(pairs) => {
                if request.content_type().is_none() {
                    headers.insert(
                        reqwest::header::CONTENT_TYPE,
                        HeaderValue::from_static("application/x-www-form-urlencoded"),
                    );
                }
                req.body(encode_form(pairs))
            }
            RequestBody::Text(text) => req.body(text.clone()),
            RequestBody::Bytes(bytes) => req.body(bytes.clone()),
        };

        let started = Instant::now();
        let resp = req.headers(headers).send().await?;
        let status = resp.status();

        let mut response_headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in resp.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            response_headers
                .entry(name.as_str().to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let body = resp.text().await?;
        debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "probe sent"
        );

        Ok(Response {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            headers: response_headers,
            body: Some(body),
        })
    }

    async fn ping(&self, host: &str, port: u16) -> Result<Duration, ProbeError> {
        let started = Instant::now();
        match tokio::time::timeout(self.ping_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(started.elapsed()),
            Ok(Err(e)) => Err(ProbeError::Transport(format!("ping {}:{} failed: {}", host, port, e))),
            Err(_) => Err(ProbeError::Transport(format!(
                "ping {}:{} timed out after {} ms",
                host,
                port,
                self.ping_timeout.as_millis()
            ))),
        }
    }
}
