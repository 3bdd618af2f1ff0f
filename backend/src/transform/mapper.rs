//! Field Mapper - canonical fields to calculator target fields
//!
//! Resolution order for each canonical field:
//!
//! 1. explicit rule from `field_mappings.json` (rename or complex rule)
//! 2. exact case-insensitive match on a known target field
//! 3. similarity match on a remaining target field
//! 4. kept under its own name
//!
//! Explicit rules always win a target; fallbacks only claim free targets.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::similarity::{best_matches, exact_match};
use crate::config::{ComplexRule, Condition, ConditionOperator, ConfigStore, DataType, MappingRule};
use crate::error::MappingError;
use crate::logs::{log_info, log_success, log_warning, log_warning_indent};
use crate::models::{CanonicalFieldMap, FieldValue, MappedDocument};

/// How a canonical field reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Explicit,
    Exact,
    Similar,
    Unmapped,
}

/// One line of the match report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatch {
    pub source_field: String,
    pub target_field: String,
    pub method: MatchMethod,
    /// 0-100
    pub confidence: u8,
}

/// Mapped document plus how every canonical field was resolved.
#[derive(Debug, Clone, Serialize)]
pub struct MappingReport {
    pub document: MappedDocument,
    pub matches: Vec<FieldMatch>,
}

impl MappingReport {
    pub fn count(&self, method: MatchMethod) -> usize {
        self.matches.iter().filter(|m| m.method == method).count()
    }
}

pub struct FieldMapper<'a> {
    config: &'a ConfigStore,
}

impl<'a> FieldMapper<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        Self { config }
    }

    /// Map canonical fields for `product`.
    pub fn map_fields(&self, canonical: &CanonicalFieldMap, product: &str) -> Result<MappedDocument, MappingError> {
        Ok(self.map_fields_detailed(canonical, product)?.document)
    }

    /// Map canonical fields and report how each one was resolved.
    pub fn map_fields_detailed(
        &self,
        canonical: &CanonicalFieldMap,
        product: &str,
    ) -> Result<MappingReport, MappingError> {
        log_info(format!("🔗 Mapping {} fields for {}", canonical.len(), product));

        let rules = self.config.get_field_mappings(product)?;
        let mut document = MappedDocument::new();
        let mut matches = Vec::new();
        let mut remaining: Vec<String> = Vec::new();

        // 1. explicit rules
        for field in canonical.iter() {
            let Some(rule) = rules.get(&field.name) else {
                remaining.push(field.name.clone());
                continue;
            };
            let target = rule.target_field().to_string();
            if document.contains(&target) {
                log_warning_indent(format!("Target '{}' mapped twice, keeping '{}'", target, field.name), 1);
            }
            document.insert(target.clone(), apply_rule(&field.value, rule));
            matches.push(FieldMatch {
                source_field: field.name.clone(),
                target_field: target,
                method: MatchMethod::Explicit,
                confidence: 100,
            });
        }

        let known = self.config.known_target_fields(product);

        // 2. exact names
        let mut unmatched = Vec::new();
        for name in remaining {
            let Some(target) = exact_match(&name, &known) else {
                unmatched.push(name);
                continue;
            };
            if document.contains(target) {
                log_warning_indent(format!("'{}' ignored, target '{}' already mapped", name, target), 1);
                continue;
            }
            if let Some(value) = canonical.get(&name) {
                document.insert(target.clone(), value.clone());
            }
            matches.push(FieldMatch {
                source_field: name,
                target_field: target.clone(),
                method: MatchMethod::Exact,
                confidence: 100,
            });
        }

        // 3. similarity over free targets
        let free: Vec<String> = known.iter().filter(|t| !document.contains(t)).cloned().collect();
        let mut claimed = BTreeSet::new();
        for candidate in best_matches(&unmatched, &free) {
            if let Some(value) = canonical.get(&candidate.source) {
                document.insert(candidate.target.clone(), value.clone());
            }
            log_info(format!(
                "   ~ {} → {} ({}%)",
                candidate.source,
                candidate.target,
                candidate.confidence()
            ));
            claimed.insert(candidate.source.clone());
            matches.push(FieldMatch {
                source_field: candidate.source.clone(),
                target_field: candidate.target.clone(),
                method: MatchMethod::Similar,
                confidence: candidate.confidence(),
            });
        }

        // 4. leftovers keep their name
        for name in unmatched.into_iter().filter(|n| !claimed.contains(n)) {
            if document.contains(&name) {
                log_warning_indent(format!("'{}' ignored, name already used by a mapped field", name), 1);
                continue;
            }
            if let Some(value) = canonical.get(&name) {
                document.insert(name.clone(), value.clone());
            }
            matches.push(FieldMatch {
                source_field: name.clone(),
                target_field: name,
                method: MatchMethod::Unmapped,
                confidence: 0,
            });
        }

        let report = MappingReport { document, matches };
        log_success(format!(
            "Mapped {} fields ({} explicit, {} exact, {} similar, {} unmapped)",
            report.document.len(),
            report.count(MatchMethod::Explicit),
            report.count(MatchMethod::Exact),
            report.count(MatchMethod::Similar),
            report.count(MatchMethod::Unmapped)
        ));
        Ok(report)
    }
}

// =============================================================================
// Rule application
// =============================================================================

/// Apply one mapping rule to a value.
pub fn apply_rule(value: &FieldValue, rule: &MappingRule) -> FieldValue {
    match rule {
        MappingRule::SimpleRename(_) => value.clone(),
        MappingRule::ComplexRule(complex) => apply_complex(value, complex),
    }
}

fn apply_complex(value: &FieldValue, rule: &ComplexRule) -> FieldValue {
    let mut mapped = value.clone();

    if let Some(data_type) = &rule.data_type {
        mapped = coerce(mapped, data_type);
    }

    if !rule.value_mapping.is_empty() {
        mapped = translate(mapped, &rule.value_mapping);
    }

    if let Some(factor) = rule.scale_factor {
        mapped = match mapped {
            FieldValue::Int(i) => FieldValue::Float(i as f64 * factor),
            FieldValue::Float(f) => FieldValue::Float(f * factor),
            other => other,
        };
    }

    if !rule.conditions.is_empty() {
        mapped = apply_conditions(mapped, &rule.conditions);
    }

    mapped
}

/// Coerce to `data_type`. Failures log a warning and keep the value.
pub fn coerce(value: FieldValue, data_type: &DataType) -> FieldValue {
    if value.is_null() {
        return value;
    }

    let converted = match data_type {
        DataType::Int => value.as_f64().map(|f| FieldValue::Int(f.trunc() as i64)),
        DataType::Float => value.as_f64().map(FieldValue::Float),
        DataType::Str => Some(FieldValue::Str(value.to_string())),
        DataType::Bool => Some(FieldValue::Bool(match &value {
            FieldValue::Str(s) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "1" | "on"),
            other => other.is_truthy(),
        })),
        DataType::Unknown(name) => {
            log_warning(format!("Unknown data type: {}", name));
            return value;
        }
    };

    converted.unwrap_or_else(|| {
        log_warning(format!(
            "Data type conversion failed: '{}' is not a valid {}",
            value,
            String::from(data_type.clone())
        ));
        value
    })
}

/// Exact-match lookup on the value's text; unknown values pass through.
fn translate(value: FieldValue, table: &BTreeMap<String, String>) -> FieldValue {
    match table.get(&value.to_string()) {
        Some(mapped) => FieldValue::Str(mapped.clone()),
        None => value,
    }
}

/// First matching condition replaces the value.
fn apply_conditions(value: FieldValue, conditions: &[Condition]) -> FieldValue {
    for condition in conditions {
        if condition_holds(&value, condition) {
            return condition.result.clone().unwrap_or(value);
        }
    }
    value
}

fn condition_holds(value: &FieldValue, condition: &Condition) -> bool {
    let expected = &condition.value;
    let numeric = |cmp: fn(f64, f64) -> bool| match (value.as_f64(), json_f64(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    };

    match &condition.operator {
        ConditionOperator::Eq => value.matches_json(expected),
        ConditionOperator::Ne => !value.matches_json(expected),
        ConditionOperator::Gt => numeric(|a, b| a > b),
        ConditionOperator::Gte => numeric(|a, b| a >= b),
        ConditionOperator::Lt => numeric(|a, b| a < b),
        ConditionOperator::Lte => numeric(|a, b| a <= b),
        ConditionOperator::In => membership(value, expected) == Some(true),
        ConditionOperator::NotIn => membership(value, expected) == Some(false),
        ConditionOperator::Unknown(op) => {
            log_warning(format!("Unknown operator: {}", op));
            false
        }
    }
}

fn json_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// List membership, or substring for string haystacks. `None` when the
/// configured value cannot contain anything.
fn membership(value: &FieldValue, haystack: &Value) -> Option<bool> {
    match haystack {
        Value::Array(items) => Some(items.iter().any(|item| value.matches_json(item))),
        Value::String(text) => value.as_str().map(|needle| text.contains(needle)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical(raw: Value) -> CanonicalFieldMap {
        crate::parser::parse(&raw).unwrap()
    }

    fn complex(rule: Value) -> MappingRule {
        serde_json::from_value(rule).unwrap()
    }

    #[test]
    fn test_life_rename() {
        let config = ConfigStore::defaults();
        let mapper = FieldMapper::new(&config);
        let mapped = mapper
            .map_fields(
                &canonical(json!({
                    "applicant_first_name": "John",
                    "applicant_birth_date": "1985-06-15"
                })),
                "life",
            )
            .unwrap();

        assert_eq!(mapped.get("insured_first_name"), Some(&FieldValue::Str("John".into())));
        assert_eq!(mapped.get("insured_birth_date").map(|v| v.to_string()), Some("1985-06-15".into()));
        assert!(!mapped.contains("applicant_first_name"));
    }

    #[test]
    fn test_value_mapping_hits_and_pass_through() {
        let rule = complex(json!({
            "target_field": "insured_gender",
            "value_mapping": { "M": "Male", "F": "Female" }
        }));
        assert_eq!(apply_rule(&"M".into(), &rule), FieldValue::Str("Male".into()));
        assert_eq!(apply_rule(&"X".into(), &rule), FieldValue::Str("X".into()));

        // coercion runs first, the coerced value passes through
        let typed = complex(json!({
            "target_field": "tier",
            "data_type": "int",
            "value_mapping": { "1": "Gold" }
        }));
        assert_eq!(apply_rule(&"1.0".into(), &typed), FieldValue::Str("Gold".into()));
        assert_eq!(apply_rule(&"2.7".into(), &typed), FieldValue::Int(2));
    }

    #[test]
    fn test_coercions() {
        assert_eq!(coerce(FieldValue::Int(250000), &DataType::Float), FieldValue::Float(250000.0));
        assert_eq!(coerce(FieldValue::Float(3.9), &DataType::Int), FieldValue::Int(3));
        assert_eq!(coerce(FieldValue::Int(7), &DataType::Str), FieldValue::Str("7".into()));
        assert_eq!(coerce("Yes".into(), &DataType::Bool), FieldValue::Bool(true));
        assert_eq!(coerce("nope".into(), &DataType::Bool), FieldValue::Bool(false));
        assert_eq!(coerce(FieldValue::Int(0), &DataType::Bool), FieldValue::Bool(false));
        // failures keep the value
        assert_eq!(coerce("abc".into(), &DataType::Float), FieldValue::Str("abc".into()));
        assert_eq!(
            coerce("abc".into(), &DataType::Unknown("decimal".into())),
            FieldValue::Str("abc".into())
        );
        assert_eq!(coerce(FieldValue::Null, &DataType::Str), FieldValue::Null);
    }

    #[test]
    fn test_scale_factor_and_conditions() {
        let rule = complex(json!({
            "target_field": "coverage_thousands",
            "scale_factor": 0.001,
            "conditions": [
                { "operator": "gt", "value": 1000, "result": 1000 },
                { "operator": "lt", "value": 1 }
            ]
        }));
        assert_eq!(apply_rule(&FieldValue::Int(250000), &rule), FieldValue::Float(250.0));
        assert_eq!(apply_rule(&FieldValue::Int(5_000_000), &rule), FieldValue::Int(1000));
        // matching condition without result keeps the value
        assert_eq!(apply_rule(&FieldValue::Int(500), &rule), FieldValue::Float(0.5));
    }

    #[test]
    fn test_membership_operators() {
        let rule = complex(json!({
            "target_field": "state_group",
            "conditions": [
                { "operator": "in", "value": ["NY", "NJ"], "result": "northeast" },
                { "operator": "not_in", "value": ["CA"], "result": "other" }
            ]
        }));
        assert_eq!(apply_rule(&"NJ".into(), &rule), FieldValue::Str("northeast".into()));
        assert_eq!(apply_rule(&"TX".into(), &rule), FieldValue::Str("other".into()));
        assert_eq!(apply_rule(&"CA".into(), &rule), FieldValue::Str("CA".into()));
    }

    #[test]
    fn test_fallback_resolution_order() {
        let config = ConfigStore::defaults();
        let mapper = FieldMapper::new(&config);
        let report = mapper
            .map_fields_detailed(
                &canonical(json!({
                    "applicant_first_name": "John",
                    "Smoker": "no"
                })),
                "life",
            )
            .unwrap();

        let method_of = |source: &str| {
            report
                .matches
                .iter()
                .find(|m| m.source_field == source)
                .map(|m| (m.method, m.target_field.clone()))
        };

        assert_eq!(method_of("applicant_first_name"), Some((MatchMethod::Explicit, "insured_first_name".into())));
        assert_eq!(method_of("smoker"), Some((MatchMethod::Unmapped, "smoker".into())));
        assert_eq!(report.document.get("smoker"), Some(&FieldValue::Bool(false)));
        assert_eq!(report.count(MatchMethod::Similar), 0);
    }

    #[test]
    fn test_exact_target_name_is_matched_without_rule() {
        let config = ConfigStore::defaults();
        let mapper = FieldMapper::new(&config);
        let report = mapper
            .map_fields_detailed(&canonical(json!({ "coverage_amount": "100000" })), "life")
            .unwrap();
        assert_eq!(report.matches[0].method, MatchMethod::Exact);
        assert_eq!(report.matches[0].confidence, 100);
        assert_eq!(report.document.get("coverage_amount"), Some(&FieldValue::Int(100000)));
    }

    #[test]
    fn test_similar_name_claims_free_target() {
        let config = ConfigStore::defaults();
        let mapper = FieldMapper::new(&config);
        let report = mapper
            .map_fields_detailed(&canonical(json!({ "insured_birth_dt": "1985-06-15" })), "life")
            .unwrap();
        assert_eq!(report.matches[0].method, MatchMethod::Similar);
        assert_eq!(report.matches[0].target_field, "insured_birth_date");
        assert!(report.document.contains("insured_birth_date"));
    }

    #[test]
    fn test_explicit_target_is_not_overwritten_by_fallback() {
        let config = ConfigStore::defaults();
        let mapper = FieldMapper::new(&config);
        let mapped = mapper
            .map_fields(
                &canonical(json!({
                    "applicant_first_name": "John",
                    "insured_first_name": "Johnny"
                })),
                "life",
            )
            .unwrap();
        assert_eq!(mapped.get("insured_first_name"), Some(&FieldValue::Str("John".into())));
        assert_eq!(mapped.len(), 1);
    }
}
