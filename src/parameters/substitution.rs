// Field Value Substitution
//
// RUNTIME value replacement for request bodies and query strings.
// Fields are addressed by the paths the mapper produces:
//
//   "user.address[0].zip"  -> body["user"]["address"][0]["zip"]
//   "[1].name"             -> body[1]["name"]      (top-level array)
//   "page"                 -> ?page=...            (query / form key)
//
// Every function here works on an owned clone; callers never hand in the baseline.
//
// Used by: suites during probe construction

use reqwest::Url;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Split a dotted/bracketed field path into segments.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut key = String::new();
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut key)));
                }
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut key)));
                }
                let mut index = String::new();
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    index.push(inner);
                }
                match index.parse::<usize>() {
                    Ok(i) => segments.push(PathSegment::Index(i)),
                    Err(_) => segments.push(PathSegment::Key(index)),
                }
            }
            _ => key.push(ch),
        }
    }
    if !key.is_empty() {
        segments.push(PathSegment::Key(key));
    }
    segments
}

/// Join a parent path and an object key.
pub fn child_key_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Join a parent path and an array index.
pub fn child_index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

pub fn get_path<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    parse_path(path)
        .iter()
        .try_fold(json, |current, segment| match segment {
            PathSegment::Key(k) => current.get(k.as_str()),
            PathSegment::Index(i) => current.get(*i),
        })
}

/// Replace the value at `path`. Returns false when the path does not exist.
pub fn set_path(json: &mut Value, path: &str, new_value: Value) -> bool {
    let mut current = json;
    for segment in parse_path(path) {
        let next = match segment {
            PathSegment::Key(k) => current.get_mut(k.as_str()),
            PathSegment::Index(i) => current.get_mut(i),
        };
        match next {
            Some(v) => current = v,
            None => return false,
        }
    }
    *current = new_value;
    true
}

/// Replace every string leaf with `replacement`.
pub fn replace_string_leaves(json: &mut Value, replacement: &str) {
    match json {
        Value::String(s) => *s = replacement.to_string(),
        Value::Object(map) => {
            for v in map.values_mut() {
                replace_string_leaves(v, replacement);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                replace_string_leaves(v, replacement);
            }
        }
        _ => {}
    }
}

/// Render a JSON value the way it appears inside a query string or form body.
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Set the first form pair named `key`. Returns false if absent.
pub fn set_form_value(pairs: &mut [(String, String)], key: &str, value: &Value) -> bool {
    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some(pair) => {
            pair.1 = value_as_text(value);
            true
        }
        None => false,
    }
}

/// Decode an `application/x-www-form-urlencoded` string.
pub fn parse_form(text: &str) -> Vec<(String, String)> {
    let mut scratch = match Url::parse("http://localhost/") {
        Ok(url) => url,
        Err(_) => return Vec::new(),
    };
    scratch.set_query(Some(text));
    scratch.query_pairs().into_owned().collect()
}

/// Encode pairs as `application/x-www-form-urlencoded`.
pub fn encode_form(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let mut scratch = match Url::parse("http://localhost/") {
        Ok(url) => url,
        Err(_) => return String::new(),
    };
    scratch.query_pairs_mut().extend_pairs(pairs.iter());
    scratch.query().unwrap_or("").to_string()
}

/// Query pairs of a URL, in order. Unparseable URLs have none.
pub fn query_pairs(url: &str) -> Vec<(String, String)> {
    Url::parse(url)
        .map(|u| u.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

/// Rebuild `url` with the given query pairs. Returns the input unchanged if it does not parse.
pub fn with_query_pairs(url: &str, pairs: &[(String, String)]) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if pairs.is_empty() {
                parsed.set_query(None);
            } else {
                parsed.query_pairs_mut().clear().extend_pairs(pairs.iter());
            }
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}
