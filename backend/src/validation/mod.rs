//! Validator - tiered business rules over canonical fields
//!
//! Three levels, each including the previous one:
//!
//! - `basic`: required fields, types, ranges and formats
//! - `full`: adds business rules (age and coverage bounds, product hook)
//! - `strict`: adds cross-field dependencies and consistency checks
//!
//! Rule violations are collected, never short-circuited. A rule set that
//! cannot be interpreted (bad regex, malformed section) yields a single
//! `Validation error: ...` entry.

use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::{
    AgeRules, BasicRules, ConfigStore, CoverageRules, FieldDependency, ConsistencyCheck, FormatRule,
    RangeRule, StrictRules, ValidationRuleSet,
};
use crate::error::ValidationError;
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{CanonicalFieldMap, FieldValue, ValidationLevel, ValidationResult};

const REQUIRED_IF_PRESENT: &str = "required_if_present";
const DATE_ORDER: &str = "date_order";

/// Collected rule violations.
#[derive(Debug, Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Validates canonical field maps against a product's rule set.
pub struct Validator<'a> {
    config: &'a ConfigStore,
    reference_date: Option<NaiveDate>,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        Self {
            config,
            reference_date: None,
        }
    }

    /// Compute ages against a fixed date instead of today.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Validate `data` for `product` at `level`.
    pub fn validate(&self, data: &CanonicalFieldMap, product: &str, level: ValidationLevel) -> ValidationResult {
        log_info(format!("🔍 Starting {} validation for {}", level, product));

        let rules = match self.config.validation_rule_set(product) {
            Ok(rules) => rules,
            Err(e) => return rule_failure(ValidationError::InvalidRules(e.to_string())),
        };

        match self.check(data, product, level, &rules) {
            Ok(findings) => {
                let result = ValidationResult::new(findings.errors, findings.warnings, data.clone());
                if result.is_valid {
                    log_success(format!(
                        "Validation passed ({} warnings)",
                        result.warnings.len()
                    ));
                } else {
                    log_warning(format!(
                        "Validation failed: {} errors, {} warnings",
                        result.errors.len(),
                        result.warnings.len()
                    ));
                }
                result
            }
            Err(e) => rule_failure(e),
        }
    }

    fn check(
        &self,
        data: &CanonicalFieldMap,
        product: &str,
        level: ValidationLevel,
        rules: &ValidationRuleSet,
    ) -> Result<Findings, ValidationError> {
        let mut findings = Findings::default();

        check_basic(data, &rules.basic, &mut findings)?;

        if level.includes_business() {
            if let Some(age) = &rules.business.age_validations {
                self.check_age(data, age, &mut findings);
            }
            if let Some(coverage) = &rules.business.coverage_validations {
                check_coverage(data, coverage, &mut findings);
            }
            if let Some(block) = rules.business.product_specific.get(product) {
                check_product_specific(product, block);
            }
        }

        if level.includes_strict() {
            check_strict(data, &rules.strict, &mut findings);
        }

        Ok(findings)
    }

    fn check_age(&self, data: &CanonicalFieldMap, rules: &AgeRules, findings: &mut Findings) {
        let Some(value) = data.get(&rules.birth_date_field).filter(|v| !v.is_null()) else {
            return;
        };
        let Some(birth_date) = value.as_date() else {
            findings
                .errors
                .push("Invalid birth date format for age calculation".to_string());
            return;
        };

        let age = (self.today() - birth_date).num_days().div_euclid(365);
        let age_f = age as f64;

        if age_f < rules.min_age {
            findings
                .errors
                .push(format!("Applicant age {} is below minimum age {}", age, rules.min_age));
        } else if age_f > rules.max_age {
            findings
                .errors
                .push(format!("Applicant age {} is above maximum age {}", age, rules.max_age));
        }

        if age_f >= rules.warning_age {
            findings
                .warnings
                .push(format!("Applicant age {} requires special review", age));
        }
    }
}

fn rule_failure(error: ValidationError) -> ValidationResult {
    log_warning(error.to_string());
    ValidationResult::failed(error.to_string())
}

// =============================================================================
// Basic tier
// =============================================================================

fn check_basic(data: &CanonicalFieldMap, rules: &BasicRules, findings: &mut Findings) -> Result<(), ValidationError> {
    for field in &rules.required_fields {
        if data.get(field).map_or(true, FieldValue::is_empty) {
            findings
                .errors
                .push(format!("Required field '{}' is missing or empty", field));
        }
    }

    for (field, expected) in &rules.field_types {
        if let Some(value) = present(data, field) {
            if !matches_type(value, expected) {
                findings
                    .errors
                    .push(format!("Field '{}' has invalid type. Expected: {}", field, expected));
            }
        }
    }

    for (field, range) in &rules.field_ranges {
        if let Some(value) = present(data, field) {
            check_range(field, value, range, findings);
        }
    }

    let patterns = compile_patterns(&rules.field_formats)?;
    for (field, format) in &rules.field_formats {
        if let Some(value) = present(data, field) {
            check_format(field, value, format, patterns.get(field.as_str()), findings);
        }
    }

    Ok(())
}

fn present<'d>(data: &'d CanonicalFieldMap, field: &str) -> Option<&'d FieldValue> {
    data.get(field).filter(|v| !v.is_null())
}

/// Type predicates. Unknown type names always pass.
fn matches_type(value: &FieldValue, expected: &str) -> bool {
    match expected.to_lowercase().as_str() {
        "string" | "str" | "date" => matches!(value, FieldValue::Str(_) | FieldValue::Date(_)),
        "integer" | "int" => matches!(value, FieldValue::Int(_)),
        "float" | "number" => matches!(value, FieldValue::Int(_) | FieldValue::Float(_)),
        "boolean" | "bool" => matches!(value, FieldValue::Bool(_)),
        _ => true,
    }
}

fn check_range(field: &str, value: &FieldValue, range: &RangeRule, findings: &mut Findings) {
    if range.min.is_some() || range.max.is_some() {
        let Some(number) = value.as_f64() else {
            findings
                .errors
                .push(format!("Field '{}' value '{}' cannot be validated for range", field, value));
            return;
        };
        if let Some(min) = range.min {
            if number < min {
                findings
                    .errors
                    .push(format!("Field '{}' value {} is below minimum {}", field, value, min));
            }
        }
        if let Some(max) = range.max {
            if number > max {
                findings
                    .errors
                    .push(format!("Field '{}' value {} is above maximum {}", field, value, max));
            }
        }
    }

    if let Some(allowed) = &range.allowed_values {
        if !allowed.iter().any(|candidate| value.matches_json(candidate)) {
            let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
            findings.errors.push(format!(
                "Field '{}' value '{}' is not in allowed values: [{}]",
                field,
                value,
                listed.join(", ")
            ));
        }
    }
}

/// Anchor every configured regex at the start of the value.
fn compile_patterns(formats: &BTreeMap<String, FormatRule>) -> Result<BTreeMap<&str, Regex>, ValidationError> {
    let mut patterns = BTreeMap::new();
    for (field, format) in formats {
        if let Some(pattern) = &format.regex {
            let regex = Regex::new(&format!("^(?:{})", pattern))
                .map_err(|e| ValidationError::InvalidRules(format!("bad regex for '{}': {}", field, e)))?;
            patterns.insert(field.as_str(), regex);
        }
    }
    Ok(patterns)
}

fn check_format(field: &str, value: &FieldValue, format: &FormatRule, regex: Option<&Regex>, findings: &mut Findings) {
    let rendered = value.to_string();

    if let Some(regex) = regex {
        if !regex.is_match(&rendered) {
            findings
                .errors
                .push(format!("Field '{}' value '{}' does not match required format", field, value));
        }
    }

    if let Some(date_format) = &format.date_format {
        let parses = NaiveDate::parse_from_str(&rendered, date_format).is_ok()
            || NaiveDateTime::parse_from_str(&rendered, date_format).is_ok();
        if !parses {
            findings.errors.push(format!(
                "Field '{}' value '{}' does not match date format {}",
                field, value, date_format
            ));
        }
    }
}

// =============================================================================
// Business tier
// =============================================================================

fn check_coverage(data: &CanonicalFieldMap, rules: &CoverageRules, findings: &mut Findings) {
    let Some(value) = present(data, &rules.amount_field) else {
        return;
    };
    let Some(coverage) = value.as_f64() else {
        findings.errors.push("Invalid coverage amount format".to_string());
        return;
    };

    let shown = FieldValue::Float(coverage);
    if coverage < rules.min_amount {
        findings
            .errors
            .push(format!("Coverage amount {} is below minimum {}", shown, rules.min_amount));
    } else if let Some(max) = rules.max_amount.filter(|max| coverage > *max) {
        findings
            .errors
            .push(format!("Coverage amount {} is above maximum {}", shown, max));
    }
}

/// Product-specific hook. No product defines extra checks yet; blocks are
/// accepted and ignored.
fn check_product_specific(product: &str, block: &Value) {
    if block.as_object().is_some_and(|rules| !rules.is_empty()) {
        log_info(format!("No product-specific checks registered for {}", product));
    }
}

// =============================================================================
// Strict tier
// =============================================================================

fn check_strict(data: &CanonicalFieldMap, rules: &StrictRules, findings: &mut Findings) {
    for dependency in &rules.field_dependencies {
        check_dependency(data, dependency, findings);
    }
    for check in &rules.consistency_checks {
        check_consistency(data, check, findings);
    }
}

/// `required_if_present`: a truthy source needs a non-empty dependent.
fn check_dependency(data: &CanonicalFieldMap, dependency: &FieldDependency, findings: &mut Findings) {
    if dependency.condition != REQUIRED_IF_PRESENT {
        return;
    }

    let source_set = data.get(&dependency.source_field).is_some_and(FieldValue::is_truthy);
    let dependent_set = data
        .get(&dependency.dependent_field)
        .is_some_and(|v| !v.is_empty());

    if source_set && !dependent_set {
        findings.errors.push(format!(
            "Field '{}' is required when '{}' is provided",
            dependency.dependent_field, dependency.source_field
        ));
    }
}

fn check_consistency(data: &CanonicalFieldMap, check: &ConsistencyCheck, findings: &mut Findings) {
    if check.kind != DATE_ORDER {
        return;
    }
    let (Some(earlier_field), Some(later_field)) = (&check.earlier_field, &check.later_field) else {
        return;
    };
    let (Some(earlier), Some(later)) = (present(data, earlier_field), present(data, later_field)) else {
        return;
    };

    match (earlier.as_date(), later.as_date()) {
        (Some(earlier), Some(later)) => {
            if earlier >= later {
                findings
                    .errors
                    .push(format!("Date '{}' must be before '{}'", earlier_field, later_field));
            }
        }
        _ => findings.errors.push(format!(
            "Invalid date format for consistency check: {}, {}",
            earlier_field, later_field
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn store(rules: Value) -> ConfigStore {
        ConfigStore::from_json(json!({}), rules, json!({}), json!({})).unwrap()
    }

    fn fields(pairs: Value) -> CanonicalFieldMap {
        crate::parser::parse(&pairs).unwrap()
    }

    fn validate(config: &ConfigStore, data: Value, level: ValidationLevel) -> ValidationResult {
        Validator::new(config)
            .with_reference_date(reference())
            .validate(&fields(data), "life", level)
    }

    #[test]
    fn test_complete_life_application_passes() {
        let config = ConfigStore::defaults();
        let result = validate(
            &config,
            json!({
                "applicant_first_name": "John",
                "applicant_last_name": "Doe",
                "applicant_birth_date": "1985-06-15",
                "policy_face_amount": "250,000",
                "policy_effective_date": "2025-01-01"
            }),
            ValidationLevel::Strict,
        );
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
        assert_eq!(
            result.validated_data.get("applicant_first_name"),
            Some(&FieldValue::Str("John".into()))
        );
    }

    #[test]
    fn test_missing_required_field() {
        let config = ConfigStore::defaults();
        let result = validate(
            &config,
            json!({ "applicant_first_name": "John", "applicant_last_name": "" }),
            ValidationLevel::Basic,
        );
        assert!(!result.is_valid);
        assert!(result
            .errors
            .contains(&"Required field 'applicant_birth_date' is missing or empty".to_string()));
        assert!(result
            .errors
            .contains(&"Required field 'applicant_last_name' is missing or empty".to_string()));
    }

    #[test]
    fn test_empty_input_names_the_single_required_field() {
        let config = store(json!({
            "base": { "basic": { "required_fields": ["applicant_first_name"] } }
        }));
        let result = validate(&config, json!({}), ValidationLevel::Basic);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("applicant_first_name"));
    }

    #[test]
    fn test_type_range_and_format_rules() {
        let config = store(json!({
            "base": {
                "basic": {
                    "field_types": { "age": "integer", "name": "string" },
                    "field_ranges": {
                        "amount": { "min": 100, "max": 200 },
                        "plan": { "allowed_values": ["gold", "silver"] },
                        "score": { "min": 1 }
                    },
                    "field_formats": { "zip": { "regex": "\\d{5}" } }
                }
            }
        }));
        let result = validate(
            &config,
            json!({
                "age": "40.5",
                "name": "Ann",
                "amount": "50",
                "plan": "bronze",
                "score": "high",
                "zip": "ab123"
            }),
            ValidationLevel::Basic,
        );
        assert_eq!(
            result.errors,
            vec![
                "Field 'age' has invalid type. Expected: integer",
                "Field 'amount' value 50 is below minimum 100",
                "Field 'plan' value 'bronze' is not in allowed values: [\"gold\", \"silver\"]",
                "Field 'score' value 'high' cannot be validated for range",
                "Field 'zip' value 'ab123' does not match required format",
            ]
        );
    }

    #[test]
    fn test_allowed_values_compare_numbers_by_value() {
        let config = store(json!({
            "base": { "basic": { "field_ranges": { "tier": { "allowed_values": [1.0, 2.0] } } } }
        }));
        let result = validate(&config, json!({ "tier": 2 }), ValidationLevel::Basic);
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_invalid_regex_reports_validation_error() {
        let config = store(json!({
            "base": { "basic": { "field_formats": { "zip": { "regex": "(" } } } }
        }));
        let result = validate(&config, json!({ "zip": "12345" }), ValidationLevel::Basic);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Validation error:"));
    }

    #[test]
    fn test_age_bounds_and_warning() {
        let config = store(json!({
            "base": {
                "business": { "age_validations": { "min_age": 18, "max_age": 80, "warning_age": 65 } }
            }
        }));

        let young = validate(&config, json!({ "birth_date": "2010-01-01" }), ValidationLevel::Full);
        assert_eq!(young.errors, vec!["Applicant age 15 is below minimum age 18"]);

        let senior = validate(&config, json!({ "birth_date": "1955-01-01" }), ValidationLevel::Full);
        assert!(senior.is_valid);
        assert_eq!(senior.warnings, vec!["Applicant age 70 requires special review"]);

        let old = validate(&config, json!({ "birth_date": "1930-01-01" }), ValidationLevel::Full);
        assert_eq!(old.errors, vec!["Applicant age 95 is above maximum age 80"]);
        assert_eq!(old.warnings.len(), 1);

        let garbage = validate(&config, json!({ "birth_date": "soon" }), ValidationLevel::Full);
        assert_eq!(garbage.errors, vec!["Invalid birth date format for age calculation"]);
    }

    #[test]
    fn test_business_rules_skipped_at_basic_level() {
        let config = store(json!({
            "base": { "business": { "age_validations": { "min_age": 18 } } }
        }));
        let result = validate(&config, json!({ "birth_date": "2020-01-01" }), ValidationLevel::Basic);
        assert!(result.is_valid);
    }

    #[test]
    fn test_coverage_bounds() {
        let config = store(json!({
            "base": { "business": { "coverage_validations": { "min_amount": 1000, "max_amount": 5000 } } }
        }));
        let low = validate(&config, json!({ "coverage_amount": "500" }), ValidationLevel::Full);
        assert_eq!(low.errors, vec!["Coverage amount 500.0 is below minimum 1000"]);

        let high = validate(&config, json!({ "coverage_amount": 9000 }), ValidationLevel::Full);
        assert_eq!(high.errors, vec!["Coverage amount 9000.0 is above maximum 5000"]);

        let bad = validate(&config, json!({ "coverage_amount": "lots" }), ValidationLevel::Full);
        assert_eq!(bad.errors, vec!["Invalid coverage amount format"]);
    }

    #[test]
    fn test_date_order_fails_when_later_precedes_earlier() {
        let config = store(json!({
            "base": {
                "strict": {
                    "consistency_checks": [
                        { "type": "date_order", "earlier_field": "birth_date", "later_field": "policy_effective_date" }
                    ]
                }
            }
        }));
        let data = json!({ "birth_date": "2024-01-01", "policy_effective_date": "2020-01-01" });

        let strict = validate(&config, data.clone(), ValidationLevel::Strict);
        assert_eq!(strict.errors, vec!["Date 'birth_date' must be before 'policy_effective_date'"]);

        let full = validate(&config, data, ValidationLevel::Full);
        assert!(full.is_valid);
    }

    #[test]
    fn test_date_order_skips_missing_and_flags_unparseable() {
        let config = store(json!({
            "base": {
                "strict": {
                    "consistency_checks": [
                        { "type": "date_order", "earlier_field": "a", "later_field": "b" }
                    ]
                }
            }
        }));
        assert!(validate(&config, json!({ "a": "2020-01-01" }), ValidationLevel::Strict).is_valid);

        let bad = validate(&config, json!({ "a": "2020-01-01", "b": "someday" }), ValidationLevel::Strict);
        assert_eq!(bad.errors, vec!["Invalid date format for consistency check: a, b"]);
    }

    #[test]
    fn test_required_if_present_dependency() {
        let config = store(json!({
            "base": {
                "strict": {
                    "field_dependencies": [
                        {
                            "source_field": "beneficiary_name",
                            "dependent_field": "beneficiary_relationship",
                            "condition": "required_if_present"
                        }
                    ]
                }
            }
        }));

        let missing = validate(&config, json!({ "beneficiary_name": "Jane" }), ValidationLevel::Strict);
        assert_eq!(
            missing.errors,
            vec!["Field 'beneficiary_relationship' is required when 'beneficiary_name' is provided"]
        );

        let complete = validate(
            &config,
            json!({ "beneficiary_name": "Jane", "beneficiary_relationship": "Spouse" }),
            ValidationLevel::Strict,
        );
        assert!(complete.is_valid);

        let no_source = validate(&config, json!({ "beneficiary_name": "" }), ValidationLevel::Strict);
        assert!(no_source.is_valid);
    }
}
