//! Typed product configuration.
//!
//! Every structure here deserializes from the JSON configuration files and
//! serializes back to the same shape, so defaults can be persisted verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::FieldValue;

// =============================================================================
// Field Mappings
// =============================================================================

/// How one canonical field reaches its calculator target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingRule {
    /// Copy the value under a new name.
    SimpleRename(String),
    /// Coerce, translate and adjust the value on the way.
    ComplexRule(ComplexRule),
}

impl MappingRule {
    pub fn target_field(&self) -> &str {
        match self {
            MappingRule::SimpleRename(target) => target,
            MappingRule::ComplexRule(rule) => &rule.target_field,
        }
    }
}

/// Complex mapping rule.
///
/// Steps run in this order: type coercion, value translation, scaling,
/// conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexRule {
    pub target_field: String,

    /// Exact-match value translation table. Unknown values pass through.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub value_mapping: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,

    /// Multiplier applied to numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<f64>,

    /// First matching condition replaces the value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ComplexRule {
    /// Names of the steps this rule applies.
    pub fn steps(&self) -> Vec<String> {
        let mut steps = Vec::new();
        if self.data_type.is_some() {
            steps.push("data_type".to_string());
        }
        if !self.value_mapping.is_empty() {
            steps.push("value_mapping".to_string());
        }
        if self.scale_factor.is_some() {
            steps.push("scale_factor".to_string());
        }
        if !self.conditions.is_empty() {
            steps.push("conditions".to_string());
        }
        steps
    }
}

/// Coercion target of a complex rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    Int,
    Float,
    Str,
    Bool,
    /// Unrecognised type name; coercion is skipped with a warning.
    Unknown(String),
}

impl From<String> for DataType {
    fn from(name: String) -> Self {
        match name.to_lowercase().as_str() {
            "int" | "integer" => DataType::Int,
            "float" | "number" => DataType::Float,
            "str" | "string" => DataType::Str,
            "bool" | "boolean" => DataType::Bool,
            _ => DataType::Unknown(name),
        }
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::Int => "int".to_string(),
            DataType::Float => "float".to_string(),
            DataType::Str => "str".to_string(),
            DataType::Bool => "bool".to_string(),
            DataType::Unknown(name) => name,
        }
    }
}

/// Conditional replacement inside a complex rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
    /// Replacement value. Absent means keep the current value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    #[default]
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Unknown(String),
}

impl From<String> for ConditionOperator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "eq" => ConditionOperator::Eq,
            "ne" => ConditionOperator::Ne,
            "gt" => ConditionOperator::Gt,
            "gte" => ConditionOperator::Gte,
            "lt" => ConditionOperator::Lt,
            "lte" => ConditionOperator::Lte,
            "in" => ConditionOperator::In,
            "not_in" => ConditionOperator::NotIn,
            _ => ConditionOperator::Unknown(name),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(op: ConditionOperator) -> Self {
        match op {
            ConditionOperator::Eq => "eq".into(),
            ConditionOperator::Ne => "ne".into(),
            ConditionOperator::Gt => "gt".into(),
            ConditionOperator::Gte => "gte".into(),
            ConditionOperator::Lt => "lt".into(),
            ConditionOperator::Lte => "lte".into(),
            ConditionOperator::In => "in".into(),
            ConditionOperator::NotIn => "not_in".into(),
            ConditionOperator::Unknown(name) => name,
        }
    }
}

// =============================================================================
// Validation Rules
// =============================================================================

/// Tiered validation rules for one product, `base` already merged in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRuleSet {
    pub basic: BasicRules,
    pub business: BusinessRules,
    pub strict: StrictRules,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicRules {
    pub required_fields: Vec<String>,
    /// Field → expected type (`string`, `integer`, `float`, `number`, `boolean`, `date`).
    pub field_types: BTreeMap<String, String>,
    pub field_ranges: BTreeMap<String, RangeRule>,
    pub field_formats: BTreeMap<String, FormatRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// strftime-style pattern, e.g. `%Y-%m-%d`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_validations: Option<AgeRules>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_validations: Option<CoverageRules>,
    /// Product → product-specific rule block.
    pub product_specific: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeRules {
    #[serde(default)]
    pub min_age: f64,
    #[serde(default = "default_max_age")]
    pub max_age: f64,
    #[serde(default = "default_warning_age")]
    pub warning_age: f64,
    #[serde(default = "default_birth_date_field")]
    pub birth_date_field: String,
}

fn default_max_age() -> f64 {
    120.0
}

fn default_warning_age() -> f64 {
    65.0
}

fn default_birth_date_field() -> String {
    "birth_date".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRules {
    #[serde(default)]
    pub min_amount: f64,
    /// Absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
    #[serde(default = "default_amount_field")]
    pub amount_field: String,
}

fn default_amount_field() -> String {
    "coverage_amount".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictRules {
    pub field_dependencies: Vec<FieldDependency>,
    pub consistency_checks: Vec<ConsistencyCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDependency {
    pub source_field: String,
    pub dependent_field: String,
    /// Only `required_if_present` is enforced.
    #[serde(default)]
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    /// Only `date_order` is enforced.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earlier_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub later_field: Option<String>,
}

// =============================================================================
// Transformations
// =============================================================================

/// Post-mapping transformation, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transformation {
    /// Convert an amount through the static rate table.
    CurrencyConversion {
        field: String,
        #[serde(default = "default_currency")]
        from_currency: String,
        #[serde(default = "default_currency")]
        to_currency: String,
    },

    /// Reformat an ISO date.
    DateFormat {
        field: String,
        #[serde(default = "default_date_format")]
        format: String,
    },

    /// Evaluate an arithmetic formula with `{field}` placeholders.
    Calculation { field: String, formula: String },

    /// Whole years between birth date and effective date.
    Age(AgeSpec),

    /// Policy or contract year since the effective date.
    PolicyYear(PolicyYearSpec),

    /// Annual premium from face amount, age bracket, risk class and state.
    AnnualPremium(AnnualPremiumSpec),

    /// Modal premium from annual premium and payment frequency.
    ModalPremium(ModalPremiumSpec),

    /// Compound-interest account value projection.
    AccountValue(AccountValueSpec),
}

impl Transformation {
    /// Field written by this transformation.
    pub fn target_field(&self) -> &str {
        match self {
            Transformation::CurrencyConversion { field, .. }
            | Transformation::DateFormat { field, .. }
            | Transformation::Calculation { field, .. } => field,
            Transformation::Age(spec) => &spec.field,
            Transformation::PolicyYear(spec) => &spec.field,
            Transformation::AnnualPremium(spec) => &spec.field,
            Transformation::ModalPremium(spec) => &spec.field,
            Transformation::AccountValue(spec) => &spec.field,
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeSpec {
    #[serde(default = "default_age_field")]
    pub field: String,
    #[serde(default = "default_birth_date_field")]
    pub birth_date_field: String,
    #[serde(default = "default_effective_date_field")]
    pub effective_date_field: String,
}

fn default_age_field() -> String {
    "applicant_age".to_string()
}

fn default_effective_date_field() -> String {
    "effective_date".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyYearSpec {
    #[serde(default = "default_policy_year_field")]
    pub field: String,
    #[serde(default = "default_effective_date_field")]
    pub effective_date_field: String,
}

fn default_policy_year_field() -> String {
    "policy_year".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualPremiumSpec {
    #[serde(default = "default_annual_premium_field")]
    pub field: String,
    #[serde(default = "default_face_amount_field")]
    pub face_amount_field: String,
    #[serde(default = "default_age_field")]
    pub age_field: String,
    #[serde(default = "default_risk_class_field")]
    pub risk_class_field: String,
    #[serde(default = "default_state_field")]
    pub state_field: String,
    /// Risk class → rate per 1000 of face amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_rates: Option<BTreeMap<String, f64>>,
    /// `"min-max"` age bracket → factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_factors: Option<BTreeMap<String, f64>>,
    /// State code → factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_factors: Option<BTreeMap<String, f64>>,
}

fn default_annual_premium_field() -> String {
    "annual_premium".to_string()
}

fn default_face_amount_field() -> String {
    "face_amount".to_string()
}

fn default_risk_class_field() -> String {
    "risk_class".to_string()
}

fn default_state_field() -> String {
    "state_issued".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalPremiumSpec {
    #[serde(default = "default_modal_premium_field")]
    pub field: String,
    #[serde(default = "default_annual_premium_field")]
    pub annual_premium_field: String,
    #[serde(default = "default_frequency_field")]
    pub frequency_field: String,
    /// Lower-case frequency → share of the annual premium.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_factors: Option<BTreeMap<String, f64>>,
}

fn default_modal_premium_field() -> String {
    "modal_premium".to_string()
}

fn default_frequency_field() -> String {
    "premium_frequency".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountValueSpec {
    #[serde(default = "default_account_value_field")]
    pub field: String,
    #[serde(default = "default_initial_premium_field")]
    pub initial_premium_field: String,
    #[serde(default = "default_rate_field")]
    pub rate_field: String,
    #[serde(default = "default_guaranteed_rate")]
    pub default_rate: f64,
    #[serde(default = "default_policy_year_field")]
    pub policy_year_field: String,
    #[serde(default = "default_surrender_schedule_field")]
    pub surrender_schedule_field: String,
}

fn default_account_value_field() -> String {
    "account_value".to_string()
}

fn default_initial_premium_field() -> String {
    "initial_premium".to_string()
}

fn default_rate_field() -> String {
    "guaranteed_rate".to_string()
}

fn default_guaranteed_rate() -> f64 {
    0.025
}

fn default_surrender_schedule_field() -> String {
    "surrender_schedule".to_string()
}

// =============================================================================
// Output Templates
// =============================================================================

/// Section name → section layout.
pub type OutputTemplate = BTreeMap<String, TemplateSection>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateSection {
    #[serde(default)]
    pub fields: Vec<String>,
    /// Values used when a field is missing from the mapped document.
    #[serde(default)]
    pub defaults: BTreeMap<String, FieldValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_rule_variants() {
        let simple: MappingRule = serde_json::from_value(json!("insured_first_name")).unwrap();
        assert_eq!(simple, MappingRule::SimpleRename("insured_first_name".into()));

        let complex: MappingRule = serde_json::from_value(json!({
            "target_field": "insured_gender",
            "value_mapping": { "M": "Male" },
            "data_type": "string"
        }))
        .unwrap();
        let MappingRule::ComplexRule(rule) = complex else {
            panic!("expected complex rule");
        };
        assert_eq!(rule.target_field, "insured_gender");
        assert_eq!(rule.data_type, Some(DataType::Str));
        assert_eq!(rule.steps(), vec!["data_type", "value_mapping"]);
    }

    #[test]
    fn test_unknown_data_type_is_kept() {
        let dt: DataType = serde_json::from_value(json!("decimal")).unwrap();
        assert_eq!(dt, DataType::Unknown("decimal".into()));
        assert_eq!(serde_json::to_value(DataType::Float).unwrap(), json!("float"));
    }

    #[test]
    fn test_rule_set_defaults_fill_missing_sections() {
        let rules: ValidationRuleSet = serde_json::from_value(json!({
            "basic": { "required_fields": ["a"] },
            "business": { "age_validations": { "min_age": 18 } }
        }))
        .unwrap();
        assert_eq!(rules.basic.required_fields, vec!["a"]);
        let age = rules.business.age_validations.unwrap();
        assert_eq!(age.max_age, 120.0);
        assert_eq!(age.birth_date_field, "birth_date");
        assert!(rules.strict.consistency_checks.is_empty());
    }

    #[test]
    fn test_transformation_tagging() {
        let t: Transformation = serde_json::from_value(json!({
            "type": "currency_conversion",
            "field": "coverage_amount",
            "to_currency": "EUR"
        }))
        .unwrap();
        assert_eq!(
            t,
            Transformation::CurrencyConversion {
                field: "coverage_amount".into(),
                from_currency: "USD".into(),
                to_currency: "EUR".into(),
            }
        );

        let age: Transformation = serde_json::from_value(json!({ "type": "age" })).unwrap();
        assert_eq!(age.target_field(), "applicant_age");
    }
}
