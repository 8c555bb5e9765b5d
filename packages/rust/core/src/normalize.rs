//! Key normalization and field access helpers.
//!
//! Every comparison key (email, name, organization) goes through
//! [`normalize`]: stringify, trim, lower-case. Absent and null values become
//! the empty string, which means "not usable as a key". Nothing here fails.

use serde_json::Value;

use leadmerge_shared::Record;

/// Sub-field holding the organization name when the org field is an object.
const NESTED_NAME_FIELD: &str = "name";

/// Best-effort string form of a field value, untrimmed.
///
/// Null and empty containers render as `""` so they count as blank.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) if items.is_empty() => String::new(),
        Value::Object(map) if map.is_empty() => String::new(),
        other => other.to_string(),
    }
}

/// True when the value has no content after stringification and trimming.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        other => display_value(other).trim().is_empty(),
    }
}

/// Canonical comparison key for a field value. Absent → `""`.
pub fn normalize(value: Option<&Value>) -> String {
    value
        .map(|v| normalize_str(&display_value(v)))
        .unwrap_or_default()
}

/// Canonical comparison key for raw text.
pub fn normalize_str(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalized value of `field` in `record`.
pub fn normalized_field(record: &Record, field: &str) -> String {
    normalize(record.get(field))
}

/// Normalized organization name of a record.
///
/// Tries each field in `org_fields` in order. A flat value is normalized as
/// is; an object is unwrapped through its `name` sub-field. The first
/// non-empty result wins.
pub fn resolve_org_name(record: &Record, org_fields: &[String]) -> String {
    org_fields
        .iter()
        .filter_map(|field| record.get(field))
        .map(|value| match value {
            Value::Object(nested) => normalize(nested.get(NESTED_NAME_FIELD)),
            flat => normalize(Some(flat)),
        })
        .find(|org| !org.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn org_fields() -> Vec<String> {
        vec!["company_name".into(), "org_name".into()]
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize(Some(&json!("  Ann@Example.COM "))), "ann@example.com");
    }

    #[test]
    fn normalize_absent_and_null_are_empty() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some(&Value::Null)), "");
        assert_eq!(normalize(Some(&json!("   "))), "");
    }

    #[test]
    fn normalize_non_strings_degrade_to_text() {
        assert_eq!(normalize(Some(&json!(42))), "42");
        assert_eq!(normalize(Some(&json!(true))), "true");
        assert_eq!(normalize(Some(&json!([]))), "");
        assert_eq!(normalize(Some(&json!({}))), "");
        assert_eq!(normalize(Some(&json!(["A"]))), "[\"a\"]");
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(&json!("")));
        assert!(is_blank(&json!(" \t")));
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!({})));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!(false)));
        assert!(!is_blank(&json!({"name": "Acme"})));
    }

    #[test]
    fn org_prefers_flat_company_name() {
        let r = record(json!({"company_name": " Acme Corp ", "org_name": "Other"}));
        assert_eq!(resolve_org_name(&r, &org_fields()), "acme corp");
    }

    #[test]
    fn org_unwraps_nested_name() {
        let r = record(json!({"org_name": {"name": "Northwind", "domain": "northwind.io"}}));
        assert_eq!(resolve_org_name(&r, &org_fields()), "northwind");
    }

    #[test]
    fn org_falls_through_blank_fields() {
        let r = record(json!({"company_name": "", "org_name": "Initech"}));
        assert_eq!(resolve_org_name(&r, &org_fields()), "initech");

        let r = record(json!({"company_name": {"name": null}, "org_name": {"name": "Hooli"}}));
        assert_eq!(resolve_org_name(&r, &org_fields()), "hooli");
    }

    #[test]
    fn org_missing_everywhere_is_empty() {
        let r = record(json!({"name": "Ann"}));
        assert_eq!(resolve_org_name(&r, &org_fields()), "");
    }
}
