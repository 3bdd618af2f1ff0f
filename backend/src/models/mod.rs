//! Domain models for the AIM transformation pipeline.
//!
//! This module contains the core data structures passed between stages:
//!
//! - [`FieldValue`] - Closed tagged union for every canonical value
//! - [`CanonicalField`] / [`CanonicalFieldMap`] - Parser output
//! - [`ValidationLevel`] / [`ValidationResult`] - Validator input and output
//! - [`MappedDocument`] - Mapper output, mutated in place by the Transformer
//! - [`OutputDocument`] - Final sectioned artifact

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// ISO calendar date format used for every normalized date.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Reserved key under which parsing metadata is serialized.
pub const PARSING_METADATA_KEY: &str = "_parsing_metadata";

// =============================================================================
// Field Value
// =============================================================================

/// A single canonical value.
///
/// Dates are kept as [`NaiveDate`] and rendered as `YYYY-MM-DD` strings when
/// serialized.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Str(String),
    Array(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Convert a JSON value without any normalization.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => FieldValue::Str(s.clone()),
            Value::Array(items) => FieldValue::Array(items.iter().map(Self::from_json).collect()),
            Value::Object(obj) => FieldValue::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::Number((*i).into()),
            FieldValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Date(d) => Value::String(d.format(ISO_DATE_FORMAT).to_string()),
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            FieldValue::Object(obj) => {
                let map: Map<String, Value> = obj.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                Value::Object(map)
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Null or empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Truthiness: zero, empty and null values are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Int(i) => *i != 0,
            FieldValue::Float(f) => *f != 0.0,
            FieldValue::Date(_) => true,
            FieldValue::Str(s) => !s.is_empty(),
            FieldValue::Array(items) => !items.is_empty(),
            FieldValue::Object(obj) => !obj.is_empty(),
        }
    }

    /// Numeric view of the value. Strings are parsed, booleans count as 1/0.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Str(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// Date view of the value. Strings must be ISO `YYYY-MM-DD`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Str(s) => NaiveDate::parse_from_str(s.trim(), ISO_DATE_FORMAT).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Equality against a configured JSON value, numbers compared by value
    /// (`1 == 1.0`).
    pub fn matches_json(&self, other: &Value) -> bool {
        match (self.to_json(), other) {
            (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
            (mine, other) => mine == *other,
        }
    }

    /// Short type label used in statistics and messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Date(_) => "date",
            FieldValue::Str(_) => "str",
            FieldValue::Array(_) => "array",
            FieldValue::Object(_) => "object",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) if x.fract() == 0.0 && x.abs() < 1e16 => write!(f, "{:.1}", x),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Date(d) => write!(f, "{}", d.format(ISO_DATE_FORMAT)),
            FieldValue::Str(s) => write!(f, "{}", s),
            FieldValue::Array(_) | FieldValue::Object(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_none(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Int(i) => serializer.serialize_i64(*i),
            FieldValue::Float(x) => serializer.serialize_f64(*x),
            FieldValue::Date(d) => serializer.serialize_str(&d.format(ISO_DATE_FORMAT).to_string()),
            FieldValue::Str(s) => serializer.serialize_str(s),
            FieldValue::Array(items) => items.serialize(serializer),
            FieldValue::Object(obj) => obj.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(FieldValue::from_json(&value))
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

// =============================================================================
// Canonical Fields
// =============================================================================

/// A parsed, type-normalized, flat key/value pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalField {
    /// Normalized snake_case name.
    pub name: String,
    /// Normalized value.
    pub value: FieldValue,
    /// Location in the raw input (`applicant.first_name`, `beneficiary[0].name`).
    pub source_path: String,
}

/// Metadata attached by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsingMetadata {
    pub parsed_at: String,
    pub original_fields_count: usize,
    pub parsed_fields_count: usize,
    pub parser_version: String,
}

/// Flat canonical field map produced by the parser.
///
/// Names are unique. Serializes as a flat object with the parsing metadata
/// under [`PARSING_METADATA_KEY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalFieldMap {
    fields: BTreeMap<String, CanonicalField>,
    metadata: Option<ParsingMetadata>,
}

impl CanonicalFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from already-normalized name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut map = Self::new();
        for (name, value) in pairs {
            let name = name.into();
            map.insert(CanonicalField {
                source_path: name.clone(),
                name,
                value: value.into(),
            });
        }
        map
    }

    /// Insert a field, returning the value it replaced.
    pub fn insert(&mut self, field: CanonicalField) -> Option<CanonicalField> {
        self.fields.insert(field.name.clone(), field)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).map(|f| &f.value)
    }

    pub fn field(&self, name: &str) -> Option<&CanonicalField> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields, metadata excluded.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalField> {
        self.fields.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn metadata(&self) -> Option<&ParsingMetadata> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: ParsingMetadata) {
        self.metadata = Some(metadata);
    }
}

impl Serialize for CanonicalFieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.metadata.is_some());
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        for (name, field) in &self.fields {
            map.serialize_entry(name, &field.value)?;
        }
        if let Some(ref metadata) = self.metadata {
            map.serialize_entry(PARSING_METADATA_KEY, metadata)?;
        }
        map.end()
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Tier of enforced validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Required fields, types, ranges and formats.
    Basic,
    /// Basic plus business rules (age, coverage, product hook).
    #[default]
    Full,
    /// Full plus cross-field dependencies and consistency checks.
    Strict,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::Basic => "basic",
            ValidationLevel::Full => "full",
            ValidationLevel::Strict => "strict",
        }
    }

    pub fn includes_business(&self) -> bool {
        matches!(self, ValidationLevel::Full | ValidationLevel::Strict)
    }

    pub fn includes_strict(&self) -> bool {
        matches!(self, ValidationLevel::Strict)
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(ValidationLevel::Basic),
            "full" => Ok(ValidationLevel::Full),
            "strict" => Ok(ValidationLevel::Strict),
            other => Err(format!(
                "unknown validation level '{}' (expected basic, full or strict)",
                other
            )),
        }
    }
}

/// Outcome of a validation run. `is_valid` holds exactly when `errors` is empty.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub validated_data: CanonicalFieldMap,
}

impl ValidationResult {
    pub fn new(errors: Vec<String>, warnings: Vec<String>, validated_data: CanonicalFieldMap) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            validated_data,
        }
    }

    /// Single synthetic error for an unusable rule set.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(vec![message.into()], Vec::new(), CanonicalFieldMap::new())
    }
}

// =============================================================================
// Mapped and Output Documents
// =============================================================================

/// Calculator target field → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MappedDocument {
    fields: BTreeMap<String, FieldValue>,
}

impl MappedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(field.into(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for MappedDocument {
    fn from_iter<T: IntoIterator<Item = (K, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Section name → field name → value. Final immutable artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputDocument {
    sections: BTreeMap<String, BTreeMap<String, FieldValue>>,
}

impl OutputDocument {
    pub(crate) fn from_sections(sections: BTreeMap<String, BTreeMap<String, FieldValue>>) -> Self {
        Self { sections }
    }

    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, FieldValue>> {
        self.sections.get(name)
    }

    pub fn get(&self, section: &str, field: &str) -> Option<&FieldValue> {
        self.sections.get(section).and_then(|s| s.get(field))
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
