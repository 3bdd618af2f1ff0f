//! Structural parser for raw FAST UI input.
//!
//! Flattens flat or nested FAST UI objects into a [`CanonicalFieldMap`]:
//!
//! ```text
//! { "applicant": { "first_name": "John" },        applicant_first_name = "John"
//!   "beneficiary": [ { "name": "Ann" } ],   →     beneficiary_1_name   = "Ann"
//!   "Face Amount": "250,000" }                    beneficiary_count    = 1
//!                                                 face_amount          = 250000
//! ```
//!
//! Input files are read as raw bytes; encoding is detected before the JSON
//! is parsed, since FAST UI exports are not always UTF-8.

pub mod normalize;

use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ParsingError, ParsingResult};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{CanonicalField, CanonicalFieldMap, FieldValue, ParsingMetadata};

pub use normalize::{normalize_field_name, normalize_str, normalize_value};

/// Top-level keys that mark a nested FAST UI payload.
const SECTION_KEYS: [&str; 5] = ["applicant", "policy", "coverage", "beneficiary", "sections"];

/// Version recorded in parsing metadata.
pub const PARSER_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Structural Parsing
// =============================================================================

/// Parse a raw FAST UI object into canonical fields.
///
/// Fails only when the input is not a JSON object. An empty object parses to
/// an empty map.
pub fn parse(raw: &Value) -> ParsingResult<CanonicalFieldMap> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ParsingError::NotAnObject(json_type_name(raw)))?;

    log_info("📖 Parsing FAST UI data...");

    let entries = if is_nested_structure(obj) {
        log_info("Detected nested structure");
        flatten_nested(obj)
    } else {
        flatten_flat(obj)
    };

    let mut parsed = CanonicalFieldMap::new();
    for (raw_name, source_path, value) in entries {
        let name = normalize_field_name(&raw_name);
        if name.is_empty() {
            log_warning(format!("Dropping field '{}': name is empty after normalization", raw_name));
            continue;
        }
        let replaced = parsed.insert(CanonicalField {
            name: name.clone(),
            value,
            source_path,
        });
        if let Some(previous) = replaced {
            log_warning(format!(
                "Field '{}' from '{}' overwrites the value from '{}'",
                name,
                parsed.field(&name).map(|f| f.source_path.as_str()).unwrap_or(""),
                previous.source_path
            ));
        }
    }

    parsed.set_metadata(ParsingMetadata {
        parsed_at: Local::now().to_rfc3339(),
        original_fields_count: obj.len(),
        parsed_fields_count: parsed.len(),
        parser_version: PARSER_VERSION.to_string(),
    });

    log_success(format!("Parsed {} fields", parsed.len()));
    Ok(parsed)
}

/// Nested when a known section key or any top-level value is an object.
fn is_nested_structure(obj: &Map<String, Value>) -> bool {
    SECTION_KEYS
        .iter()
        .any(|key| obj.get(*key).is_some_and(Value::is_object))
        || obj.values().any(Value::is_object)
}

/// Flat input: every top-level key is a field.
fn flatten_flat(obj: &Map<String, Value>) -> Vec<(String, String, FieldValue)> {
    obj.iter()
        .map(|(key, value)| (key.clone(), key.clone(), normalize_value(value)))
        .collect()
}

/// Nested input: sections are prefixed, list items are indexed from 1 and
/// counted.
fn flatten_nested(obj: &Map<String, Value>) -> Vec<(String, String, FieldValue)> {
    let mut entries = Vec::new();

    for (section, section_value) in obj {
        match section_value {
            Value::Object(fields) => {
                for (field, value) in fields {
                    entries.push((
                        format!("{}_{}", section, field),
                        format!("{}.{}", section, field),
                        normalize_value(value),
                    ));
                }
            }
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(fields) => {
                            for (field, value) in fields {
                                entries.push((
                                    format!("{}_{}_{}", section, idx + 1, field),
                                    format!("{}[{}].{}", section, idx, field),
                                    normalize_value(value),
                                ));
                            }
                        }
                        other => entries.push((
                            format!("{}_{}", section, idx + 1),
                            format!("{}[{}]", section, idx),
                            normalize_value(other),
                        )),
                    }
                }
                entries.push((
                    format!("{}_count", section),
                    section.clone(),
                    FieldValue::Int(items.len() as i64),
                ));
            }
            other => entries.push((section.clone(), section.clone(), normalize_value(other))),
        }
    }

    entries
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Summary of a parse run.
#[derive(Debug, Clone, Serialize)]
pub struct ParsingStatistics {
    pub original_fields: usize,
    pub parsed_fields: usize,
    pub field_type_distribution: BTreeMap<String, usize>,
    pub nested_sections: usize,
    pub array_sections: usize,
}

/// Compute statistics about a parse of `raw` into `parsed`.
pub fn parsing_statistics(raw: &Value, parsed: &CanonicalFieldMap) -> ParsingStatistics {
    let mut field_type_distribution = BTreeMap::new();
    for field in parsed.iter() {
        *field_type_distribution
            .entry(field.value.type_name().to_string())
            .or_insert(0) += 1;
    }

    let (original_fields, nested_sections, array_sections) = match raw.as_object() {
        Some(obj) => (
            obj.len(),
            obj.values().filter(|v| v.is_object()).count(),
            obj.values().filter(|v| v.is_array()).count(),
        ),
        None => (0, 0, 0),
    };

    ParsingStatistics {
        original_fields,
        parsed_fields: parsed.len(),
        field_type_distribution,
        nested_sections,
        array_sections,
    }
}

// =============================================================================
// Input Decoding
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        // UTF-8 and anything unknown: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Decode raw bytes and parse them as JSON.
pub fn parse_input_bytes(bytes: &[u8]) -> ParsingResult<Value> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    Ok(serde_json::from_str(&content)?)
}

/// Read a FAST UI JSON file with encoding auto-detection.
pub fn read_input_file<P: AsRef<Path>>(path: P) -> ParsingResult<Value> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_input_bytes(&bytes)
}
