//! Actuarial lookup tables and date arithmetic.
//!
//! Year counts are day counts divided by 365.25. Money is rounded to cents.

use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const DAYS_PER_YEAR: f64 = 365.25;

/// Rate per 1000 of face amount for an unknown risk class.
pub const DEFAULT_BASE_RATE: f64 = 1.75;

/// Share of the annual premium for an unknown payment frequency.
pub const DEFAULT_FREQUENCY_FACTOR: f64 = 0.0875;

const BASE_RATES: [(&str, f64); 4] = [
    ("preferred_plus", 0.85),
    ("preferred", 1.25),
    ("standard", 1.75),
    ("table_rated", 2.50),
];

/// Inclusive age brackets.
const AGE_FACTORS: [(i64, i64, f64); 7] = [
    (18, 25, 0.80),
    (26, 35, 1.00),
    (36, 45, 1.35),
    (46, 55, 1.85),
    (56, 65, 2.75),
    (66, 75, 4.50),
    (76, 85, 7.25),
];

const STATE_FACTORS: [(&str, f64); 4] = [("NY", 1.15), ("CA", 1.10), ("TX", 1.05), ("FL", 1.08)];

const FREQUENCY_FACTORS: [(&str, f64); 4] = [
    ("monthly", 0.0875),
    ("quarterly", 0.26),
    ("semi-annual", 0.51),
    ("annual", 1.0),
];

pub fn years_between(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / DAYS_PER_YEAR
}

/// Completed years from `start` to `end`.
pub fn whole_years(start: NaiveDate, end: NaiveDate) -> i64 {
    years_between(start, end).floor() as i64
}

/// 1-based policy year on `as_of`. Never below 1.
pub fn policy_year(effective: NaiveDate, as_of: NaiveDate) -> i64 {
    (whole_years(effective, as_of) + 1).max(1)
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Rate per 1000 for a risk class (`"Preferred Plus"` matches `preferred_plus`).
pub fn base_rate(risk_class: &str, overrides: Option<&BTreeMap<String, f64>>) -> f64 {
    let key = risk_class.trim().to_lowercase().replace([' ', '-'], "_");
    let found = match overrides {
        Some(table) => table.get(&key).copied(),
        None => BASE_RATES.iter().find(|(k, _)| *k == key).map(|(_, rate)| *rate),
    };
    found.unwrap_or(DEFAULT_BASE_RATE)
}

/// Factor for the bracket containing `age`, 1.0 outside every bracket.
///
/// Override keys are `"min-max"`; malformed keys are ignored.
pub fn age_factor(age: i64, overrides: Option<&BTreeMap<String, f64>>) -> f64 {
    let found = match overrides {
        Some(table) => table.iter().find_map(|(bracket, factor)| {
            let (min, max) = bracket.split_once('-')?;
            let (min, max) = (min.trim().parse::<i64>().ok()?, max.trim().parse::<i64>().ok()?);
            (min..=max).contains(&age).then_some(*factor)
        }),
        None => AGE_FACTORS
            .iter()
            .find(|(min, max, _)| (*min..=*max).contains(&age))
            .map(|(_, _, factor)| *factor),
    };
    found.unwrap_or(1.0)
}

pub fn state_factor(state: &str, overrides: Option<&BTreeMap<String, f64>>) -> f64 {
    let key = state.trim().to_uppercase();
    let found = match overrides {
        Some(table) => table.get(&key).copied(),
        None => STATE_FACTORS.iter().find(|(k, _)| *k == key).map(|(_, f)| *f),
    };
    found.unwrap_or(1.0)
}

/// Case-insensitive frequency lookup.
pub fn frequency_factor(frequency: &str, overrides: Option<&BTreeMap<String, f64>>) -> f64 {
    let key = frequency.trim().to_lowercase();
    let found = match overrides {
        Some(table) => table.get(&key).copied(),
        None => FREQUENCY_FACTORS.iter().find(|(k, _)| *k == key).map(|(_, f)| *f),
    };
    found.unwrap_or(DEFAULT_FREQUENCY_FACTOR)
}

/// `face / 1000 × base rate × age factor × state factor`, in cents.
pub fn annual_premium(face_amount: f64, base_rate: f64, age_factor: f64, state_factor: f64) -> f64 {
    round_cents(face_amount / 1000.0 * base_rate * age_factor * state_factor)
}

/// Unrounded compound growth of `premium` at `rate` up to `policy_year`.
pub fn project_account_value(premium: f64, rate: f64, policy_year: i64) -> f64 {
    let years = i32::try_from(policy_year.saturating_sub(1).max(0)).unwrap_or(i32::MAX);
    premium * (1.0 + rate).powi(years)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surrender {
    pub charge: f64,
    pub value: f64,
}

/// Surrender charge and value for `policy_year`, when the schedule covers it.
pub fn surrender(account_value: f64, schedule: &[f64], policy_year: i64) -> Option<Surrender> {
    let idx = usize::try_from(policy_year.saturating_sub(1)).ok()?;
    let rate = schedule.get(idx)?;
    let charge = account_value * rate;
    Some(Surrender {
        charge: round_cents(charge),
        value: round_cents(account_value - charge),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_whole_years() {
        assert_eq!(whole_years(date(1985, 1, 1), date(2025, 1, 1)), 40);
        assert_eq!(whole_years(date(1985, 6, 15), date(2025, 1, 1)), 39);
    }

    #[test]
    fn test_policy_year() {
        assert_eq!(policy_year(date(2025, 1, 1), date(2025, 1, 1)), 1);
        assert_eq!(policy_year(date(2022, 1, 1), date(2025, 6, 1)), 4);
        // future effective date
        assert_eq!(policy_year(date(2030, 1, 1), date(2025, 1, 1)), 1);
    }

    #[test]
    fn test_lookup_tables() {
        assert_eq!(base_rate("Preferred Plus", None), 0.85);
        assert_eq!(base_rate("mystery", None), DEFAULT_BASE_RATE);
        assert_eq!(age_factor(40, None), 1.35);
        assert_eq!(age_factor(17, None), 1.0);
        assert_eq!(state_factor("ny", None), 1.15);
        assert_eq!(state_factor("WA", None), 1.0);
        assert_eq!(frequency_factor("Semi-Annual", None), 0.51);
        assert_eq!(frequency_factor("weekly", None), DEFAULT_FREQUENCY_FACTOR);
    }

    #[test]
    fn test_override_tables() {
        let ages: BTreeMap<String, f64> = [("0-50".to_string(), 2.0), ("bad".to_string(), 9.0)].into();
        assert_eq!(age_factor(40, Some(&ages)), 2.0);
        assert_eq!(age_factor(60, Some(&ages)), 1.0);

        let rates: BTreeMap<String, f64> = [("standard".to_string(), 3.0)].into();
        assert_eq!(base_rate("Standard", Some(&rates)), 3.0);
        assert_eq!(base_rate("preferred", Some(&rates)), DEFAULT_BASE_RATE);
    }

    #[test]
    fn test_annual_premium() {
        let premium = annual_premium(250_000.0, base_rate("standard", None), age_factor(40, None), state_factor("NY", None));
        assert_eq!(premium, 679.22);
    }

    #[test]
    fn test_account_value_and_surrender() {
        let value = project_account_value(100_000.0, 0.025, 3);
        assert_eq!(round_cents(value), 105_062.5);
        assert_eq!(project_account_value(100_000.0, 0.025, 1), 100_000.0);
        // years beyond i32 saturate instead of wrapping to a negative exponent
        assert!(project_account_value(100.0, 0.025, i64::from(i32::MAX) + 10).is_infinite());
        assert_eq!(project_account_value(100.0, 0.025, i64::MIN), 100.0);
        assert_eq!(surrender(100.0, &[0.07], i64::MIN), None);

        let schedule = [0.07, 0.065, 0.06];
        let s = surrender(value, &schedule, 3).unwrap();
        assert_eq!(s.charge, 6303.75);
        assert_eq!(s.value, 98_758.75);
        assert!(surrender(value, &schedule, 4).is_none());
        assert!(surrender(value, &schedule, 0).is_none());
    }
}
