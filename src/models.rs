// Core data models for Gauntlet
// Requests, responses, field typing and the results every suite produces

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTP method of a request.
///
/// Standard verbs get their own variant; anything else (including empty or
/// garbage tokens) is carried verbatim in `Other` so probes can put it on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    OPTIONS,
    HEAD,
    Other(String),
}

impl Method {
    /// Methods that conventionally carry a request body.
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
    }

    /// Methods whose responses are routinely cached by intermediaries.
    pub fn is_cacheable_read(&self) -> bool {
        matches!(self, Method::GET | Method::HEAD)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::PATCH => write!(f, "PATCH"),
            Method::OPTIONS => write!(f, "OPTIONS"),
            Method::HEAD => write!(f, "HEAD"),
            Method::Other(token) => write!(f, "{}", token),
        }
    }
}

impl FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            "OPTIONS" => Method::OPTIONS,
            "HEAD" => Method::HEAD,
            _ => Method::Other(s.to_string()),
        })
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(Method::Other(raw)))
    }
}

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Text(String),
    Bytes(Vec<u8>),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Text(text) => text.is_empty(),
            RequestBody::Bytes(bytes) => bytes.is_empty(),
            RequestBody::Form(pairs) => pairs.is_empty(),
            RequestBody::Json(_) => false,
        }
    }

    /// Byte length of the body as it would be sent.
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Json(value) => value.to_string().len(),
            RequestBody::Form(pairs) => crate::parameters::encode_form(pairs).len(),
            RequestBody::Text(text) => text.len(),
            RequestBody::Bytes(bytes) => bytes.len(),
        }
    }
}

/// One HTTP request. Never mutated in place by a suite: probes clone the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Insert a header, replacing any existing one that differs only by case.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.into());
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// One HTTP response as observed by a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    /// Header names are stored lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: default_reason(status).to_string(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `"200 OK"` style status line.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }

    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

fn default_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Classification outcome of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
    FailNoResponse,
    Warning,
    Info,
    Manual,
    /// Server-side fault (5xx). Overrides every other verdict.
    Bug,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::FailNoResponse => "FAIL (NO RESPONSE)",
            Verdict::Warning => "WARNING",
            Verdict::Info => "INFO",
            Verdict::Manual => "MANUAL",
            Verdict::Bug => "BUG",
        };
        write!(f, "{}", label)
    }
}

/// Semantic type inferred for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Email,
    Url,
    #[serde(rename = "ftp_url")]
    FtpUrl,
    Phone,
    Number,
    Boolean,
    Currency,
    Date,
    String,
    DoNotTest,
    RandomString,
    RandomInt,
    RandomEmail,
}

impl FieldType {
    /// Whether the field takes part in dataset iteration.
    pub fn is_testable(&self) -> bool {
        !matches!(
            self,
            FieldType::DoNotTest
                | FieldType::RandomString
                | FieldType::RandomInt
                | FieldType::RandomEmail
        )
    }

    /// Textual types eligible for the whitespace normalization probe.
    pub fn is_string_like(&self) -> bool {
        self.is_testable() && !matches!(self, FieldType::Boolean | FieldType::Number)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::FtpUrl => "ftp_url",
            FieldType::Phone => "phone",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Currency => "currency",
            FieldType::Date => "date",
            FieldType::String => "string",
            FieldType::DoNotTest => "doNotTest",
            FieldType::RandomString => "randomString",
            FieldType::RandomInt => "randomInt",
            FieldType::RandomEmail => "randomEmail",
        };
        write!(f, "{}", label)
    }
}

/// A single mutation input; `is_valid` says whether the server should accept it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeValue {
    pub value: Value,
    pub is_valid: bool,
}

/// Ordered `fieldPath -> FieldType` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    entries: Vec<(String, FieldType)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or override the type of a field, keeping its original position.
    pub fn set(&mut self, path: impl Into<String>, field_type: FieldType) {
        let path = path.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some(entry) => entry.1 = field_type,
            None => self.entries.push((path, field_type)),
        }
    }

    pub fn get(&self, path: &str) -> Option<FieldType> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, t)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.entries.iter().map(|(p, t)| (p.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Baseline configuration handed to every suite. Read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOptions {
    pub request: Request,
    pub body_fields: FieldMapping,
    pub query_fields: FieldMapping,
    /// Reference to a binary schema for the body, passed through untouched.
    pub schema: Option<String>,
}

impl TestOptions {
    /// Build options for a baseline request, inferring both field mappings.
    pub fn from_request(request: Request) -> Self {
        let body_fields = crate::parameters::map_fields(&request.body, &request.headers);
        let query_fields = crate::parameters::map_query(&request.url);
        Self {
            request,
            body_fields,
            query_fields,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Canonical unit returned to callers. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub expected: String,
    pub actual: String,
    pub status: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl TestResult {
    pub fn new(
        name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        status: Verdict,
    ) -> Self {
        Self {
            name: name.into(),
            expected: expected.into(),
            actual: actual.into(),
            status,
            request: None,
            response: None,
            response_time: None,
            value: None,
        }
    }

    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_response(mut self, response: Option<Response>) -> Self {
        self.response = response;
        self
    }

    pub fn with_response_time(mut self, millis: u64) -> Self {
        self.response_time = Some(millis);
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}
