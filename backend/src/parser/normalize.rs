//! Field-value normalizer.
//!
//! Type-sniffs raw strings into numbers, booleans, ISO dates or nulls, and
//! normalizes field names to snake_case.
//!
//! Probes run in a fixed order and the first success wins:
//!
//! 1. number (after stripping `$` and `,`)
//! 2. boolean (`true/false/yes/no/y/n/1/0/on/off`, case-insensitive)
//! 3. date (four literal patterns, reformatted to `YYYY-MM-DD`)
//! 4. trimmed string, with empty and null-like tokens mapped to null

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::FieldValue;

const TRUE_TOKENS: [&str; 5] = ["true", "yes", "y", "1", "on"];
const FALSE_TOKENS: [&str; 5] = ["false", "no", "n", "0", "off"];
const NULL_TOKENS: [&str; 6] = ["null", "none", "n/a", "na", "nil", "undefined"];

/// Parse formats tried in order once a string looks like a date.
const DATE_PARSE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m/%d/%y",
    "%d/%m/%Y",
    "%d-%m-%Y",
];

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}-\d{2}-\d{2}$",
        r"^\d{2}/\d{2}/\d{4}$",
        r"^\d{2}-\d{2}-\d{4}$",
        r"^\d{1,2}/\d{1,2}/\d{4}$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("date pattern is a valid regex"))
    .collect()
});

static NON_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("name pattern is a valid regex"));

static UNDERSCORE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("underscore pattern is a valid regex"));

/// Normalize a field name: lowercase, non-`[a-z0-9_]` → `_`, collapse runs,
/// strip leading and trailing underscores.
///
/// Idempotent.
pub fn normalize_field_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let replaced = NON_NAME_CHARS.replace_all(&lower, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// Normalize a raw JSON value. Containers are normalized recursively.
pub fn normalize_value(value: &Value) -> FieldValue {
    match value {
        Value::String(s) => normalize_str(s),
        Value::Array(items) => FieldValue::Array(items.iter().map(normalize_value).collect()),
        Value::Object(obj) => FieldValue::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), normalize_value(v)))
                .collect(),
        ),
        other => FieldValue::from_json(other),
    }
}

/// Normalize a raw string leaf.
pub fn normalize_str(raw: &str) -> FieldValue {
    let trimmed = raw.trim();

    if let Some(number) = parse_number(trimmed) {
        return number;
    }

    if let Some(flag) = parse_boolean(trimmed) {
        return FieldValue::Bool(flag);
    }

    if looks_like_date(trimmed) {
        if let Some(date) = parse_date(trimmed) {
            return FieldValue::Date(date);
        }
    }

    if trimmed.is_empty() || NULL_TOKENS.contains(&trimmed.to_lowercase().as_str()) {
        return FieldValue::Null;
    }

    FieldValue::Str(trimmed.to_string())
}

/// Parse `"$250,000"`-style numbers. Values without a decimal point become
/// integers when they fit.
pub fn parse_number(value: &str) -> Option<FieldValue> {
    let cleaned = value.replace([',', '$'], "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    let parsed = cleaned.parse::<f64>().ok().filter(|f| f.is_finite())?;

    if !cleaned.contains('.') {
        if let Ok(int) = cleaned.parse::<i64>() {
            return Some(FieldValue::Int(int));
        }
    }
    Some(FieldValue::Float(parsed))
}

pub fn parse_boolean(value: &str) -> Option<bool> {
    let lower = value.to_lowercase();
    if TRUE_TOKENS.contains(&lower.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

pub fn looks_like_date(value: &str) -> bool {
    DATE_PATTERNS.iter().any(|re| re.is_match(value))
}

/// Parse with the first matching format.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_PARSE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> FieldValue {
        FieldValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_normalize_field_name() {
        assert_eq!(normalize_field_name("First Name"), "first_name");
        assert_eq!(normalize_field_name("__Policy--Face  Amount__"), "policy_face_amount");
        assert_eq!(normalize_field_name("DOB (mm/dd)"), "dob_mm_dd");
    }

    #[test]
    fn test_normalize_field_name_is_idempotent() {
        for raw in ["First Name", "a__b", "__x__", "Prämie €", "already_clean", ""] {
            let once = normalize_field_name(raw);
            assert_eq!(normalize_field_name(&once), once);
        }
    }

    #[test]
    fn test_currency_string_becomes_number() {
        assert_eq!(normalize_str("250,000"), FieldValue::Int(250000));
        assert_eq!(normalize_str("$1,234.50"), FieldValue::Float(1234.5));
        assert_eq!(normalize_str(" 42 "), FieldValue::Int(42));
    }

    #[test]
    fn test_numeric_sniffing_runs_before_boolean() {
        assert_eq!(normalize_str("1"), FieldValue::Int(1));
        assert_eq!(normalize_str("0"), FieldValue::Int(0));
        assert_eq!(normalize_str("Yes"), FieldValue::Bool(true));
        assert_eq!(normalize_str("off"), FieldValue::Bool(false));
        assert_eq!(normalize_str("N"), FieldValue::Bool(false));
    }

    #[test]
    fn test_supported_date_formats_become_iso() {
        assert_eq!(normalize_str("1985-06-15"), date(1985, 6, 15));
        assert_eq!(normalize_str("06/15/1985"), date(1985, 6, 15));
        assert_eq!(normalize_str("06-15-1985"), date(1985, 6, 15));
        assert_eq!(normalize_str("6/5/1985"), date(1985, 6, 5));
    }

    #[test]
    fn test_iso_date_renormalizes_to_itself() {
        let first = normalize_str("12/31/1999");
        let rendered = first.to_string();
        assert_eq!(rendered, "1999-12-31");
        assert_eq!(normalize_str(&rendered), first);
    }

    #[test]
    fn test_day_first_fallback_format() {
        // month 31 fails %m/%d/%Y, the day-first format picks it up
        assert_eq!(normalize_str("31/12/1999"), date(1999, 12, 31));
    }

    #[test]
    fn test_date_shaped_but_invalid_stays_string() {
        assert_eq!(normalize_str("2024-13-45"), FieldValue::Str("2024-13-45".into()));
    }

    #[test]
    fn test_null_tokens() {
        for token in ["", "   ", "null", "None", "N/A", "na", "nil", "undefined"] {
            assert_eq!(normalize_str(token), FieldValue::Null, "token {:?}", token);
        }
    }

    #[test]
    fn test_plain_strings_are_trimmed() {
        assert_eq!(normalize_str("  John "), FieldValue::Str("John".into()));
        assert_eq!(normalize_str("nan"), FieldValue::Str("nan".into()));
    }

    #[test]
    fn test_containers_are_normalized_recursively() {
        let value = normalize_value(&json!({"amount": "1,000", "tags": ["yes", "n/a"]}));
        let FieldValue::Object(obj) = value else {
            panic!("expected object");
        };
        assert_eq!(obj["amount"], FieldValue::Int(1000));
        assert_eq!(
            obj["tags"],
            FieldValue::Array(vec![FieldValue::Bool(true), FieldValue::Null])
        );
    }
}
