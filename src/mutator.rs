// Mutation helpers for Gauntlet
// Random fillers per field type, whitespace padding and URL rewrites

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Url;
use serde_json::{json, Value};

use crate::error::ProbeError;
use crate::models::{FieldMapping, FieldType};
use crate::parameters::{
    get_path, query_pairs, set_form_value, set_path, value_as_text, with_query_pairs, StructuredBody,
};

/// Generate a fresh random value of the given type.
///
/// Returns None for `DoNotTest`: such fields keep their baseline value.
pub fn random_filler(field_type: FieldType) -> Option<Value> {
    let mut rng = rand::thread_rng();
    let value = match field_type {
        FieldType::Email | FieldType::RandomEmail => {
            json!(format!("user.{}@example.com", random_token(&mut rng, 8).to_lowercase()))
        }
        FieldType::Url => json!(format!("https://example.com/{}", random_token(&mut rng, 8))),
        FieldType::FtpUrl => json!(format!(
            "ftp://files.example.com/{}.txt",
            random_token(&mut rng, 8)
        )),
        FieldType::Phone => json!(format!("+1 555 {:03} {:04}", rng.gen_range(0..1000), rng.gen_range(0..10000))),
        FieldType::Number | FieldType::RandomInt => json!(rng.gen_range(1..100_000)),
        FieldType::Boolean => json!(rng.gen_bool(0.5)),
        FieldType::Currency => json!(format!("${}.{:02}", rng.gen_range(1..1000), rng.gen_range(0..100))),
        FieldType::Date => json!(format!(
            "20{:02}-{:02}-{:02}",
            rng.gen_range(10..30),
            rng.gen_range(1..=12),
            rng.gen_range(1..=28)
        )),
        FieldType::String | FieldType::RandomString => json!(random_token(&mut rng, 12)),
        FieldType::DoNotTest => return None,
    };
    Some(value)
}

fn random_token<R: Rng>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Surround a value with one extra space on each side.
pub fn pad_whitespace(value: &str) -> String {
    format!(" {} ", value)
}

/// Clone `body`, set `target` to `probe`, and refill every other mapped leaf.
///
/// Containers are never replaced, and `DoNotTest` leaves keep their value.
pub fn mutate_body(
    body: &StructuredBody,
    mapping: &FieldMapping,
    target: Option<&str>,
    probe: Option<&Value>,
) -> StructuredBody {
    let mut mutated = body.clone();
    let leaves = mapping.iter().filter(|(path, _)| !is_container(body, path));

    for (path, field_type) in leaves {
        let replacement = if Some(path) == target {
            probe.cloned()
        } else {
            random_filler(field_type)
        };
        if let Some(value) = replacement {
            let value = keep_string_encoding(body, path, field_type, value);
            set_structured(&mut mutated, path, value);
        }
    }
    mutated
}

/// Numeric and boolean fields that the baseline sends as strings keep that
/// encoding, so the body keeps the baseline's JSON shape. Type-mismatch probes
/// for string fields are left alone.
fn keep_string_encoding(body: &StructuredBody, path: &str, field_type: FieldType, value: Value) -> Value {
    let StructuredBody::Json(json) = body else {
        return value;
    };
    if !matches!(field_type, FieldType::Number | FieldType::RandomInt | FieldType::Boolean) {
        return value;
    }
    match (get_path(json, path), &value) {
        (Some(Value::String(_)), Value::Number(_) | Value::Bool(_)) => Value::String(value_as_text(&value)),
        _ => value,
    }
}

/// Set one field of a structured body in place.
pub fn set_structured(body: &mut StructuredBody, path: &str, value: Value) -> bool {
    match body {
        StructuredBody::Json(json) => set_path(json, path, value),
        StructuredBody::Form(pairs) => set_form_value(pairs, path, &value),
    }
}

/// Clone `url` with `target` set to `probe` and the other query fields refilled.
pub fn mutate_query(
    url: &str,
    mapping: &FieldMapping,
    target: Option<&str>,
    probe: Option<&Value>,
) -> String {
    let mut pairs = query_pairs(url);
    for (key, value) in pairs.iter_mut() {
        let Some(field_type) = mapping.get(key) else {
            continue;
        };
        let replacement = if Some(key.as_str()) == target {
            probe.cloned()
        } else {
            random_filler(field_type)
        };
        if let Some(new_value) = replacement {
            *value = value_as_text(&new_value);
        }
    }
    with_query_pairs(url, &pairs)
}

fn is_container(body: &StructuredBody, path: &str) -> bool {
    match body {
        StructuredBody::Json(json) => crate::parameters::get_path(json, path)
            .map(|v| v.is_object() || v.is_array())
            .unwrap_or(false),
        StructuredBody::Form(_) => false,
    }
}

/// Append a path segment before any query string: `/orders?x=1` -> `/orders/NOT_FOUND?x=1`.
pub fn append_path_segment(url: &str, segment: &str) -> Result<String, ProbeError> {
    let mut parsed = parse_url(url)?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&format!("{}/{}", path, segment));
    Ok(parsed.to_string())
}

/// Upper-case the last non-empty path segment. None when that changes nothing.
pub fn uppercase_last_segment(url: &str) -> Result<Option<String>, ProbeError> {
    let mut parsed = parse_url(url)?;
    let path = parsed.path().to_string();
    let trailing_slash = path.ends_with('/') && path.len() > 1;
    let trimmed = path.trim_end_matches('/');
    let (head, last) = match trimmed.rfind('/') {
        Some(idx) => trimmed.split_at(idx + 1),
        None => ("", trimmed),
    };
    let upper = last.to_uppercase();
    if upper == last {
        return Ok(None);
    }
    let mut new_path = format!("{}{}", head, upper);
    if trailing_slash {
        new_path.push('/');
    }
    parsed.set_path(&new_path);
    Ok(Some(parsed.to_string()))
}

/// Upper-case the host. Returns the rewritten URL string and the `Host` header value.
///
/// URL parsers normalise hosts to lower case, so the host is spliced in at its
/// byte offset and also returned for an explicit `Host` header.
pub fn uppercase_host(url: &str) -> Result<(String, String), ProbeError> {
    let parsed = parse_url(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ProbeError::InvalidUrl(format!("{} has no host", url)))?;
    let upper = host.to_uppercase();
    let start = host_offset(parsed.as_str())
        .ok_or_else(|| ProbeError::InvalidUrl(format!("{} has no authority", url)))?;
    let serialized = parsed.as_str();
    let rewritten = format!("{}{}{}", &serialized[..start], upper, &serialized[start + host.len()..]);
    let header = match parsed.port() {
        Some(port) => format!("{}:{}", upper, port),
        None => upper,
    };
    Ok((rewritten, header))
}

/// Host and effective port of a URL.
pub fn host_and_port(url: &str) -> Result<(String, u16), ProbeError> {
    let parsed = parse_url(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ProbeError::InvalidUrl(format!("{} has no host", url)))?
        .to_string();
    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| ProbeError::InvalidUrl(format!("{} has no known port", url)))?;
    Ok((host, port))
}

/// Byte offset of the host in a serialized URL, past the scheme and any userinfo.
fn host_offset(serialized: &str) -> Option<usize> {
    let authority_start = serialized.find("://")? + 3;
    let authority = &serialized[authority_start..];
    let authority_end = authority.find(['/', '?', '#']).unwrap_or(authority.len());
    let userinfo = authority[..authority_end].rfind('@').map_or(0, |at| at + 1);
    Some(authority_start + userinfo)
}

fn parse_url(url: &str) -> Result<Url, ProbeError> {
    Url::parse(url).map_err(|e| ProbeError::InvalidUrl(format!("{}: {}", url, e)))
}
