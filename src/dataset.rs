// Probe datasets for Gauntlet
// Static per-type tables of values the server should accept or reject

use lazy_static::lazy_static;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::models::{FieldType, ProbeValue};

fn valid(value: Value) -> ProbeValue {
    ProbeValue { value, is_valid: true }
}

fn invalid(value: Value) -> ProbeValue {
    ProbeValue { value, is_valid: false }
}

lazy_static! {
    static ref DATASETS: HashMap<FieldType, Vec<ProbeValue>> = {
        let mut m = HashMap::new();
        m.insert(FieldType::Email, vec![
            valid(json!("valid.user@example.com")),
            invalid(json!("plainaddress")),
            invalid(json!("@missing-local.org")),
            invalid(json!("missing-at.example.com")),
            invalid(json!("user@")),
            invalid(json!("user@@example.com")),
            invalid(json!("")),
        ]);
        m.insert(FieldType::Url, vec![
            valid(json!("https://www.example.com/path?x=1")),
            invalid(json!("htp://bad-scheme.example.com")),
            invalid(json!("www.example.com")),
            invalid(json!("https://")),
            invalid(json!("not a url")),
            invalid(json!("")),
        ]);
        m.insert(FieldType::FtpUrl, vec![
            valid(json!("ftp://files.example.com/archive.zip")),
            invalid(json!("ftp//files.example.com")),
            invalid(json!("ftp://")),
            invalid(json!("files.example.com/archive.zip")),
            invalid(json!("")),
        ]);
        m.insert(FieldType::Phone, vec![
            valid(json!("+1 555 010 9999")),
            invalid(json!("12")),
            invalid(json!("phone-number")),
            invalid(json!("+1 555 010 99999999999999")),
            invalid(json!("555-01O-9999")),
            invalid(json!("")),
        ]);
        m.insert(FieldType::Number, vec![
            valid(json!(42)),
            invalid(json!("forty-two")),
            invalid(json!("42abc")),
            invalid(json!(true)),
            invalid(json!("")),
            invalid(Value::Null),
        ]);
        m.insert(FieldType::Boolean, vec![
            valid(json!(true)),
            valid(json!(false)),
            invalid(json!("yes")),
            invalid(json!(2)),
            invalid(json!("")),
            invalid(Value::Null),
        ]);
        m.insert(FieldType::Currency, vec![
            valid(json!("$10.99")),
            invalid(json!("ten dollars")),
            invalid(json!("$10.999")),
            invalid(json!("10,99,99")),
            invalid(json!("")),
        ]);
        m.insert(FieldType::Date, vec![
            valid(json!("2024-01-31")),
            invalid(json!("2024-13-01")),
            invalid(json!("2024-02-30")),
            invalid(json!("31/01/2024")),
            invalid(json!("yesterday")),
            invalid(json!("")),
        ]);
        m.insert(FieldType::String, vec![
            valid(json!("Gauntlet test value")),
            invalid(json!("")),
            invalid(json!("a".repeat(10_000))),
            invalid(Value::Null),
            invalid(json!(12345)),
        ]);
        m
    };
}

/// Probe values for a field type. Untestable types have none.
pub fn dataset_for(field_type: FieldType) -> &'static [ProbeValue] {
    DATASETS
        .get(&field_type)
        .map(|values| values.as_slice())
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::classify;

    #[test]
    fn every_testable_type_has_a_dataset() {
        for ty in [
            FieldType::Email,
            FieldType::Url,
            FieldType::FtpUrl,
            FieldType::Phone,
            FieldType::Number,
            FieldType::Boolean,
            FieldType::Currency,
            FieldType::Date,
            FieldType::String,
        ] {
            let values = dataset_for(ty);
            assert!(!values.is_empty(), "{} has no dataset", ty);
            assert!(values.iter().any(|p| p.is_valid), "{} has no valid entry", ty);
            assert!(values.iter().any(|p| !p.is_valid), "{} has no invalid entry", ty);
        }
    }

    #[test]
    fn untestable_types_are_skipped() {
        assert!(dataset_for(FieldType::DoNotTest).is_empty());
        assert!(dataset_for(FieldType::RandomString).is_empty());
        assert!(dataset_for(FieldType::RandomInt).is_empty());
        assert!(dataset_for(FieldType::RandomEmail).is_empty());
    }

    #[test]
    fn valid_entries_classify_as_their_type() {
        for ty in [FieldType::Email, FieldType::Url, FieldType::Date, FieldType::Currency] {
            for probe in dataset_for(ty).iter().filter(|p| p.is_valid) {
                assert_eq!(classify(&probe.value), ty);
            }
        }
    }
}
