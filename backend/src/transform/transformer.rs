//! Transformer - post-mapping transformations
//!
//! Runs a product's transformation list, in order, over the mapped document.
//! Later transformations see the fields written by earlier ones.
//!
//! Nothing here fails the pipeline: bad formulas, unparseable dates and
//! missing inputs log a warning and fall back (0.0, pass-through or no
//! output).

use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, NaiveTime};
use std::fmt::Write;

use super::actuarial;
use super::formula;
use crate::config::{
    AccountValueSpec, AgeSpec, AnnualPremiumSpec, ConfigStore, ModalPremiumSpec, PolicyYearSpec, Transformation,
};
use crate::logs::{log_info, log_info_indent, log_warning_indent};
use crate::models::{FieldValue, MappedDocument};

/// Static conversion rates against USD.
const CURRENCY_RATES: [(&str, f64); 3] = [("USD", 1.0), ("EUR", 0.85), ("GBP", 0.73)];

pub const YEARS_SINCE_EFFECTIVE_FIELD: &str = "years_since_effective";
pub const SURRENDER_CHARGE_FIELD: &str = "surrender_charge";
pub const SURRENDER_VALUE_FIELD: &str = "surrender_value";

const DEFAULT_RISK_CLASS: &str = "standard";
const DEFAULT_FREQUENCY: &str = "monthly";

pub struct Transformer<'a> {
    config: &'a ConfigStore,
    reference_date: Option<NaiveDate>,
}

impl<'a> Transformer<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        Self {
            config,
            reference_date: None,
        }
    }

    /// Use a fixed "today" for policy-year calculations.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Apply every transformation configured for `product`.
    pub fn apply_transformations(&self, mapped: &mut MappedDocument, product: &str) {
        let transformations = self.config.get_transformations(product);
        if transformations.is_empty() {
            return;
        }

        log_info(format!(
            "⚙️  Applying {} transformations for {}",
            transformations.len(),
            product
        ));
        for transformation in transformations {
            log_info_indent(format!("→ {}", transformation.target_field()), 1);
            self.apply(mapped, transformation);
        }
    }

    /// Apply a single transformation.
    pub fn apply(&self, doc: &mut MappedDocument, transformation: &Transformation) {
        match transformation {
            Transformation::CurrencyConversion {
                field,
                from_currency,
                to_currency,
            } => convert_currency(doc, field, from_currency, to_currency),
            Transformation::DateFormat { field, format } => format_date(doc, field, format),
            Transformation::Calculation { field, formula } => calculate(doc, field, formula),
            Transformation::Age(spec) => derive_age(doc, spec),
            Transformation::PolicyYear(spec) => self.derive_policy_year(doc, spec),
            Transformation::AnnualPremium(spec) => derive_annual_premium(doc, spec),
            Transformation::ModalPremium(spec) => derive_modal_premium(doc, spec),
            Transformation::AccountValue(spec) => derive_account_value(doc, spec),
        }
    }

    fn derive_policy_year(&self, doc: &mut MappedDocument, spec: &PolicyYearSpec) {
        let Some(effective) = date_input(doc, &spec.field, &spec.effective_date_field) else {
            return;
        };
        let today = self.today();
        let years = actuarial::years_between(effective, today);
        doc.insert(spec.field.clone(), FieldValue::Int(actuarial::policy_year(effective, today)));
        doc.insert(
            YEARS_SINCE_EFFECTIVE_FIELD,
            FieldValue::Float(actuarial::round_cents(years)),
        );
    }
}

// =============================================================================
// Inputs
// =============================================================================

fn number(doc: &MappedDocument, field: &str) -> Option<f64> {
    doc.get(field).and_then(FieldValue::as_f64)
}

fn text(doc: &MappedDocument, field: &str) -> Option<String> {
    doc.get(field).filter(|v| !v.is_empty()).map(ToString::to_string)
}

/// Read a required numeric input, warning when it is missing.
fn number_input(doc: &MappedDocument, target: &str, field: &str) -> Option<f64> {
    let value = number(doc, field);
    if value.is_none() {
        log_warning_indent(format!("Cannot derive '{}': '{}' is missing or not numeric", target, field), 1);
    }
    value
}

/// Read a required date input, warning when it is missing.
fn date_input(doc: &MappedDocument, target: &str, field: &str) -> Option<NaiveDate> {
    let value = doc.get(field).and_then(FieldValue::as_date);
    if value.is_none() {
        log_warning_indent(format!("Cannot derive '{}': '{}' is missing or not a date", target, field), 1);
    }
    value
}

// =============================================================================
// Field transformations
// =============================================================================

fn currency_rate(code: &str) -> f64 {
    CURRENCY_RATES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, rate)| *rate)
        .unwrap_or(1.0)
}

/// Convert through USD. Same-currency conversions leave the value untouched.
fn convert_currency(doc: &mut MappedDocument, field: &str, from: &str, to: &str) {
    if !doc.contains(field) || from.eq_ignore_ascii_case(to) {
        return;
    }
    let Some(amount) = number(doc, field) else {
        log_warning_indent(format!("Cannot convert '{}': value is not numeric", field), 1);
        return;
    };
    let usd = amount / currency_rate(from);
    doc.insert(field, FieldValue::Float(usd * currency_rate(to)));
}

/// Reformat an ISO date. Time fields render as midnight; anything that
/// cannot be rendered passes through.
fn format_date(doc: &mut MappedDocument, field: &str, format: &str) {
    let Some(date) = doc.get(field).and_then(FieldValue::as_date) else {
        return;
    };
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        log_warning_indent(format!("Invalid date format '{}' for '{}'", format, field), 1);
        return;
    }

    // Zone fields have nothing to print on a naive timestamp
    let mut rendered = String::new();
    if write!(rendered, "{}", date.and_time(NaiveTime::MIN).format(format)).is_err() {
        log_warning_indent(format!("Date format '{}' cannot render '{}'", format, field), 1);
        return;
    }
    doc.insert(field, FieldValue::Str(rendered));
}

/// Evaluate a formula into `field`; failures write 0.0.
fn calculate(doc: &mut MappedDocument, field: &str, formula: &str) {
    let result = match formula::evaluate(formula, doc) {
        Ok(value) => value,
        Err(e) => {
            log_warning_indent(format!("Failed to evaluate formula '{}': {}", formula, e), 1);
            0.0
        }
    };
    doc.insert(field, FieldValue::Float(result));
}

// =============================================================================
// Actuarial fields
// =============================================================================

fn derive_age(doc: &mut MappedDocument, spec: &AgeSpec) {
    let birth = date_input(doc, &spec.field, &spec.birth_date_field);
    let effective = date_input(doc, &spec.field, &spec.effective_date_field);
    if let (Some(birth), Some(effective)) = (birth, effective) {
        doc.insert(spec.field.clone(), FieldValue::Int(actuarial::whole_years(birth, effective)));
    }
}

fn derive_annual_premium(doc: &mut MappedDocument, spec: &AnnualPremiumSpec) {
    let face = number_input(doc, &spec.field, &spec.face_amount_field);
    let age = number_input(doc, &spec.field, &spec.age_field);
    let (Some(face), Some(age)) = (face, age) else {
        return;
    };

    let risk_class = text(doc, &spec.risk_class_field).unwrap_or_else(|| DEFAULT_RISK_CLASS.to_string());
    let state_factor = text(doc, &spec.state_field)
        .map(|state| actuarial::state_factor(&state, spec.state_factors.as_ref()))
        .unwrap_or(1.0);

    let premium = actuarial::annual_premium(
        face,
        actuarial::base_rate(&risk_class, spec.base_rates.as_ref()),
        actuarial::age_factor(age.trunc() as i64, spec.age_factors.as_ref()),
        state_factor,
    );
    doc.insert(spec.field.clone(), FieldValue::Float(premium));
}

fn derive_modal_premium(doc: &mut MappedDocument, spec: &ModalPremiumSpec) {
    let Some(annual) = number_input(doc, &spec.field, &spec.annual_premium_field) else {
        return;
    };
    let frequency = text(doc, &spec.frequency_field).unwrap_or_else(|| DEFAULT_FREQUENCY.to_string());
    let factor = actuarial::frequency_factor(&frequency, spec.frequency_factors.as_ref());
    doc.insert(spec.field.clone(), FieldValue::Float(actuarial::round_cents(annual * factor)));
}

/// Account value in the current policy year (year 1 when unknown), with
/// surrender figures when a schedule covers that year.
fn derive_account_value(doc: &mut MappedDocument, spec: &AccountValueSpec) {
    let Some(premium) = number_input(doc, &spec.field, &spec.initial_premium_field) else {
        return;
    };
    let rate = number(doc, &spec.rate_field).unwrap_or(spec.default_rate);
    let year = number(doc, &spec.policy_year_field)
        .map(|y| (y.trunc() as i64).max(1))
        .unwrap_or(1);

    let value = actuarial::project_account_value(premium, rate, year);
    doc.insert(spec.field.clone(), FieldValue::Float(actuarial::round_cents(value)));

    let schedule: Vec<f64> = match doc.get(&spec.surrender_schedule_field) {
        Some(FieldValue::Array(items)) => items.iter().filter_map(FieldValue::as_f64).collect(),
        _ => return,
    };
    if let Some(surrender) = actuarial::surrender(value, &schedule, year) {
        doc.insert(SURRENDER_CHARGE_FIELD, FieldValue::Float(surrender.charge));
        doc.insert(SURRENDER_VALUE_FIELD, FieldValue::Float(surrender.value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn transformation(raw: Value) -> Transformation {
        serde_json::from_value(raw).unwrap()
    }

    fn run(doc: &mut MappedDocument, raw: Value) {
        let config = ConfigStore::from_json(json!({}), json!({}), json!({}), json!({})).unwrap();
        Transformer::new(&config)
            .with_reference_date(date(2025, 1, 1))
            .apply(doc, &transformation(raw));
    }

    #[test]
    fn test_age_from_birth_and_effective_dates() {
        let mut doc: MappedDocument = [
            ("birth_date", FieldValue::Str("1985-01-01".into())),
            ("effective_date", FieldValue::Str("2025-01-01".into())),
        ]
        .into_iter()
        .collect();
        run(&mut doc, json!({ "type": "age" }));
        assert_eq!(doc.get("applicant_age"), Some(&FieldValue::Int(40)));
    }

    #[test]
    fn test_missing_inputs_write_nothing() {
        let mut doc: MappedDocument = [("birth_date", FieldValue::Str("1985-01-01".into()))]
            .into_iter()
            .collect();
        run(&mut doc, json!({ "type": "age" }));
        run(&mut doc, json!({ "type": "modal_premium" }));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_currency_conversion() {
        let mut doc: MappedDocument = [("amount", FieldValue::Int(1000))].into_iter().collect();
        run(&mut doc, json!({ "type": "currency_conversion", "field": "amount" }));
        assert_eq!(doc.get("amount"), Some(&FieldValue::Int(1000)));

        run(
            &mut doc,
            json!({ "type": "currency_conversion", "field": "amount", "from_currency": "EUR", "to_currency": "USD" }),
        );
        let FieldValue::Float(usd) = doc.get("amount").cloned().unwrap() else {
            panic!("expected float");
        };
        assert!((usd - 1176.4705882).abs() < 1e-6);

        // absent field is left alone
        run(&mut doc, json!({ "type": "currency_conversion", "field": "other", "to_currency": "GBP" }));
        assert!(!doc.contains("other"));
    }

    #[test]
    fn test_date_format() {
        let mut doc: MappedDocument = [
            ("start", FieldValue::Date(date(2025, 3, 9))),
            ("note", FieldValue::Str("next week".into())),
        ]
        .into_iter()
        .collect();
        run(&mut doc, json!({ "type": "date_format", "field": "start", "format": "%m/%d/%Y" }));
        run(&mut doc, json!({ "type": "date_format", "field": "note", "format": "%m/%d/%Y" }));
        assert_eq!(doc.get("start"), Some(&FieldValue::Str("03/09/2025".into())));
        assert_eq!(doc.get("note"), Some(&FieldValue::Str("next week".into())));
    }

    #[test]
    fn test_date_format_with_time_fields_renders_midnight() {
        let mut doc: MappedDocument = [("start", FieldValue::Str("2025-03-09".into()))].into_iter().collect();
        run(&mut doc, json!({ "type": "date_format", "field": "start", "format": "%Y-%m-%d %H:%M" }));
        assert_eq!(doc.get("start"), Some(&FieldValue::Str("2025-03-09 00:00".into())));
    }

    #[test]
    fn test_date_format_with_zone_field_passes_through() {
        let mut doc: MappedDocument = [("start", FieldValue::Str("2025-03-09".into()))].into_iter().collect();
        run(&mut doc, json!({ "type": "date_format", "field": "start", "format": "%Y-%m-%d %z" }));
        assert_eq!(doc.get("start"), Some(&FieldValue::Str("2025-03-09".into())));
    }

    #[test]
    fn test_invalid_date_format_passes_through() {
        let mut doc: MappedDocument = [("start", FieldValue::Str("2025-03-09".into()))].into_iter().collect();
        run(&mut doc, json!({ "type": "date_format", "field": "start", "format": "%Q" }));
        assert_eq!(doc.get("start"), Some(&FieldValue::Str("2025-03-09".into())));
    }

    #[test]
    fn test_calculation_always_writes() {
        let mut doc: MappedDocument = [("coverage_amount", FieldValue::Int(250000))].into_iter().collect();
        run(
            &mut doc,
            json!({ "type": "calculation", "field": "units", "formula": "{coverage_amount} / 1000" }),
        );
        assert_eq!(doc.get("units"), Some(&FieldValue::Float(250.0)));

        run(&mut doc, json!({ "type": "calculation", "field": "broken", "formula": "{nope} * 2" }));
        assert_eq!(doc.get("broken"), Some(&FieldValue::Float(0.0)));
    }

    #[test]
    fn test_policy_year_and_years_since_effective() {
        let mut doc: MappedDocument = [("effective_date", FieldValue::Date(date(2022, 1, 1)))]
            .into_iter()
            .collect();
        run(&mut doc, json!({ "type": "policy_year" }));
        assert_eq!(doc.get("policy_year"), Some(&FieldValue::Int(4)));
        assert_eq!(doc.get(YEARS_SINCE_EFFECTIVE_FIELD), Some(&FieldValue::Float(3.0)));
    }

    #[test]
    fn test_premium_chain() {
        let mut doc: MappedDocument = [
            ("face_amount", FieldValue::Float(250000.0)),
            ("applicant_age", FieldValue::Int(40)),
            ("risk_class", FieldValue::Str("Standard".into())),
            ("state_issued", FieldValue::Str("NY".into())),
            ("premium_frequency", FieldValue::Str("Monthly".into())),
        ]
        .into_iter()
        .collect();
        run(&mut doc, json!({ "type": "annual_premium" }));
        run(&mut doc, json!({ "type": "modal_premium" }));
        assert_eq!(doc.get("annual_premium"), Some(&FieldValue::Float(679.22)));
        assert_eq!(doc.get("modal_premium"), Some(&FieldValue::Float(59.43)));
    }

    #[test]
    fn test_account_value_with_surrender_schedule() {
        let mut doc: MappedDocument = [
            ("initial_premium", FieldValue::Int(100000)),
            ("policy_year", FieldValue::Int(3)),
            (
                "surrender_schedule",
                FieldValue::Array(vec![0.07.into(), 0.065.into(), 0.06.into()]),
            ),
        ]
        .into_iter()
        .collect();
        run(&mut doc, json!({ "type": "account_value" }));
        assert_eq!(doc.get("account_value"), Some(&FieldValue::Float(105062.5)));
        assert_eq!(doc.get(SURRENDER_CHARGE_FIELD), Some(&FieldValue::Float(6303.75)));
        assert_eq!(doc.get(SURRENDER_VALUE_FIELD), Some(&FieldValue::Float(98758.75)));
    }

    #[test]
    fn test_product_transformations_run_in_order() {
        let config = ConfigStore::defaults();
        let mut doc: MappedDocument = [
            ("insured_birth_date", FieldValue::Date(date(1985, 1, 1))),
            ("policy_start_date", FieldValue::Date(date(2025, 1, 1))),
            ("coverage_amount", FieldValue::Float(250000.0)),
            ("premium_frequency", FieldValue::Str("Annual".into())),
        ]
        .into_iter()
        .collect();
        Transformer::new(&config)
            .with_reference_date(date(2025, 6, 1))
            .apply_transformations(&mut doc, "life");

        assert_eq!(doc.get("applicant_age"), Some(&FieldValue::Int(40)));
        assert_eq!(doc.get("policy_year"), Some(&FieldValue::Int(1)));
        // standard rate, age 40, no state: 250 × 1.75 × 1.35
        assert_eq!(doc.get("annual_premium"), Some(&FieldValue::Float(590.63)));
        assert_eq!(doc.get("modal_premium"), Some(&FieldValue::Float(590.63)));
    }
}
