// Value Classification
//
// Infers a semantic FieldType for one scalar value by ordered pattern matching.
// The first matching pattern wins, so the order of CLASSIFIERS is significant:
// a run of digits is a phone number before it is a number, and "true" is only
// a boolean if nothing earlier claimed it.
//
// Example:
//   "alice@example.com" -> Email
//   "12345678"          -> Phone   (phone precedes number)
//   "42"                -> Number
//   "2024-01-31"        -> Date
//   true                -> Boolean (native JSON types short-circuit)
//
// Used by: mapper.rs when building FieldMappings

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::models::FieldType;

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$"
    ).unwrap();

    static ref URL_PATTERN: Regex = Regex::new(
        r"(?i)^https?://[^\s/$.?#][^\s]*$"
    ).unwrap();

    static ref FTP_URL_PATTERN: Regex = Regex::new(
        r"(?i)^ftps?://[^\s/$.?#][^\s]*$"
    ).unwrap();

    // Bare 7-15 digit runs, or a 3-3-4 grouping with optional country code
    static ref PHONE_PATTERN: Regex = Regex::new(
        r"^(\+?[0-9]{7,15}|\+?([0-9]{1,3}[ .-]?)?\(?[0-9]{3}\)?[ .-]?[0-9]{3}[ .-]?[0-9]{4})$"
    ).unwrap();

    static ref NUMBER_PATTERN: Regex = Regex::new(
        r"^-?[0-9]+(\.[0-9]+)?$"
    ).unwrap();

    static ref BOOLEAN_PATTERN: Regex = Regex::new(
        r"(?i)^(true|false)$"
    ).unwrap();

    static ref CURRENCY_PATTERN: Regex = Regex::new(
        r"(?i)^([$€£¥]\s?-?[0-9]+([.,][0-9]{1,2})?|-?[0-9]+([.,][0-9]{1,2})?\s?(usd|eur|gbp|jpy))$"
    ).unwrap();

    static ref DATE_PATTERN: Regex = Regex::new(
        r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$"
    ).unwrap();

    /// Precedence list for string values.
    static ref CLASSIFIERS: Vec<(FieldType, &'static Regex)> = vec![
        (FieldType::Email, &*EMAIL_PATTERN),
        (FieldType::Url, &*URL_PATTERN),
        (FieldType::FtpUrl, &*FTP_URL_PATTERN),
        (FieldType::Phone, &*PHONE_PATTERN),
        (FieldType::Number, &*NUMBER_PATTERN),
        (FieldType::Boolean, &*BOOLEAN_PATTERN),
        (FieldType::Currency, &*CURRENCY_PATTERN),
        (FieldType::Date, &*DATE_PATTERN),
    ];
}

/// Infer the semantic type of a scalar. Total: always returns a type.
pub fn classify(value: &Value) -> FieldType {
    match value {
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(_) => FieldType::Number,
        Value::String(s) => classify_str(s),
        Value::Array(_) | Value::Object(_) => FieldType::DoNotTest,
        Value::Null => FieldType::String,
    }
}

/// Classify a raw string (query values, form fields, JSON strings).
pub fn classify_str(value: &str) -> FieldType {
    let trimmed = value.trim();
    CLASSIFIERS
        .iter()
        .find(|(_, pattern)| pattern.is_match(trimmed))
        .map(|(field_type, _)| *field_type)
        .unwrap_or(FieldType::String)
}
