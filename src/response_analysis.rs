// Response analysis for Gauntlet
// Heuristics shared by the suites: echo detection, JSON detection, Allow parsing

use crate::models::{Method, Response};

/// Whether the response body contains `needle` verbatim.
pub fn body_echoes(response: &Response, needle: &str) -> bool {
    !needle.is_empty() && response.body_text().contains(needle)
}

/// Whether the response declares (or evidently carries) a JSON body.
pub fn is_json_response(response: &Response) -> bool {
    if let Some(content_type) = response.header("content-type") {
        let ct = content_type.to_ascii_lowercase();
        return ct.contains("application/json") || ct.contains("+json");
    }
    let trimmed = response.body_text().trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

/// Size of the response body in bytes.
pub fn body_size(response: &Response) -> usize {
    response.body.as_ref().map(|b| b.len()).unwrap_or(0)
}

/// Methods advertised by `Allow` or `Access-Control-Allow-Methods`, in order, deduplicated.
pub fn allowed_methods(response: &Response) -> Option<Vec<Method>> {
    let raw = response
        .header("allow")
        .or_else(|| response.header("access-control-allow-methods"))?;

    let mut methods: Vec<Method> = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let method = token.parse::<Method>().unwrap_or_else(|never| match never {});
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    Some(methods)
}
