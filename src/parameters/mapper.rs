// Field Mapping
//
// Walks a baseline body or query string and produces `fieldPath -> FieldType`
// for every leaf. Containers are recorded as DoNotTest so that only their
// leaves are probed.
//
// Example:
//   Input:  {"user": {"email": "a@b.co", "tags": ["x"]}, "age": 30}
//   Output: user        -> DoNotTest
//           user.email  -> Email
//           user.tags   -> DoNotTest
//           user.tags[0]-> String
//           age         -> Number

use serde_json::Value;
use std::collections::BTreeMap;

use super::classifier::{classify, classify_str};
use super::substitution::{child_index_path, child_key_path, parse_form, query_pairs};
use crate::models::{FieldMapping, FieldType, RequestBody};

/// Body of a request in a form the mapper and mutators can address by path.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

impl StructuredBody {
    /// Interpret a request body. Binary and unparseable text bodies are not structured.
    pub fn from_request(body: &RequestBody, headers: &BTreeMap<String, String>) -> Option<Self> {
        match body {
            RequestBody::Json(value) => Some(StructuredBody::Json(value.clone())),
            RequestBody::Form(pairs) => Some(StructuredBody::Form(pairs.clone())),
            RequestBody::Text(text) if is_form_encoded(headers) => {
                Some(StructuredBody::Form(parse_form(text)))
            }
            RequestBody::Text(text) => serde_json::from_str::<Value>(text)
                .ok()
                .filter(|v| v.is_object() || v.is_array())
                .map(StructuredBody::Json),
            RequestBody::Empty | RequestBody::Bytes(_) => None,
        }
    }

    pub fn into_body(self) -> RequestBody {
        match self {
            StructuredBody::Json(value) => RequestBody::Json(value),
            StructuredBody::Form(pairs) => RequestBody::Form(pairs),
        }
    }
}

fn is_form_encoded(headers: &BTreeMap<String, String>) -> bool {
    headers.iter().any(|(k, v)| {
        k.eq_ignore_ascii_case("content-type")
            && v.to_ascii_lowercase().contains("application/x-www-form-urlencoded")
    })
}

/// Map every leaf field of a request body.
pub fn map_fields(body: &RequestBody, headers: &BTreeMap<String, String>) -> FieldMapping {
    let mut mapping = FieldMapping::new();
    match StructuredBody::from_request(body, headers) {
        Some(StructuredBody::Form(pairs)) => {
            for (key, value) in pairs {
                if mapping.get(&key).is_none() {
                    mapping.set(key, classify_str(&value));
                }
            }
        }
        Some(StructuredBody::Json(value)) => walk_json(&value, "", &mut mapping),
        None => {}
    }
    mapping
}

/// Map the query string of a URL.
pub fn map_query(url: &str) -> FieldMapping {
    let mut mapping = FieldMapping::new();
    for (key, value) in query_pairs(url) {
        if mapping.get(&key).is_none() {
            mapping.set(key, classify_str(&value));
        }
    }
    mapping
}

fn walk_json(value: &Value, path: &str, mapping: &mut FieldMapping) {
    match value {
        Value::Object(map) => {
            if !path.is_empty() {
                mapping.set(path, FieldType::DoNotTest);
            }
            for (key, child) in map {
                walk_json(child, &child_key_path(path, key), mapping);
            }
        }
        Value::Array(items) => {
            if !path.is_empty() {
                mapping.set(path, FieldType::DoNotTest);
            }
            for (index, child) in items.iter().enumerate() {
                walk_json(child, &child_index_path(path, index), mapping);
            }
        }
        scalar => {
            if !path.is_empty() {
                mapping.set(path, classify(scalar));
            }
        }
    }
}
