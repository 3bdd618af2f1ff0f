//! Field-name similarity scoring.
//!
//! Used by the mapper for canonical fields without an explicit rule. The
//! score blends the matching-characters ratio (`2 * matches / total length`)
//! with `_`-token overlap and fixed boosts for shared domain words.

use rapidfuzz::fuzz;
use std::collections::BTreeSet;

/// Scores strictly above this are accepted as matches.
pub const MATCH_THRESHOLD: f64 = 0.6;

/// Bonus per shared `_`-separated token.
const TOKEN_OVERLAP_WEIGHT: f64 = 0.2;

/// Bonus when both names mention one of these words.
const BOOSTED_WORDS: [&str; 3] = ["date", "amount", "name"];
const BOOST: f64 = 0.3;

/// A proposed canonical → target pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub source: String,
    pub target: String,
    pub score: f64,
}

impl Candidate {
    /// Score as a 0-100 confidence, capped at 99 so only exact name matches
    /// reach 100.
    pub fn confidence(&self) -> u8 {
        ((self.score * 100.0) as i64).clamp(0, 99) as u8
    }
}

/// Blended similarity between two field names. Case-insensitive.
pub fn similarity(source: &str, target: &str) -> f64 {
    let source = source.to_lowercase();
    let target = target.to_lowercase();

    let mut score = fuzz::ratio(source.chars(), target.chars());

    let source_tokens = tokens(&source);
    let target_tokens = tokens(&target);
    let overlap = source_tokens.intersection(&target_tokens).count();
    score += overlap as f64 * TOKEN_OVERLAP_WEIGHT;

    for word in BOOSTED_WORDS {
        if source.contains(word) && target.contains(word) {
            score += BOOST;
        }
    }

    score
}

fn tokens(name: &str) -> BTreeSet<&str> {
    name.split('_').filter(|t| !t.is_empty()).collect()
}

/// Exact case-insensitive match among `targets`.
pub fn exact_match<'t>(source: &str, targets: &'t [String]) -> Option<&'t String> {
    targets.iter().find(|t| t.eq_ignore_ascii_case(source))
}

/// Pair sources with targets one-to-one, best scores first.
///
/// Every pair scoring above [`MATCH_THRESHOLD`] is a candidate; candidates
/// are taken greedily in descending score order (ties broken by name) so a
/// target is never claimed twice.
pub fn best_matches(sources: &[String], targets: &[String]) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = sources
        .iter()
        .flat_map(|source| {
            targets.iter().map(move |target| Candidate {
                source: source.clone(),
                target: target.clone(),
                score: similarity(source, target),
            })
        })
        .filter(|c| c.score > MATCH_THRESHOLD)
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.target.cmp(&b.target))
    });

    let mut used_sources = BTreeSet::new();
    let mut used_targets = BTreeSet::new();
    let mut accepted = Vec::new();

    for candidate in candidates {
        if used_sources.contains(&candidate.source) || used_targets.contains(&candidate.target) {
            continue;
        }
        used_sources.insert(candidate.source.clone());
        used_targets.insert(candidate.target.clone());
        accepted.push(candidate);
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identical_names_score_high() {
        assert!(similarity("coverage_type", "COVERAGE_TYPE") >= 1.0);
    }

    #[test]
    fn test_boosts_apply_to_shared_words() {
        // "dob" and "birth" share nothing, the date boost carries it
        let plain = similarity("dob", "insured_birth");
        let boosted = similarity("dob_date", "insured_birth_date");
        assert!(boosted > plain + 0.3);
    }

    #[test]
    fn test_unrelated_names_stay_below_threshold() {
        assert!(similarity("smoker", "coverage_amount") <= MATCH_THRESHOLD);
    }

    #[test]
    fn test_shared_prefix_counts_toward_ratio() {
        // 12 of 18 characters match: an edit-distance score would stop at 0.5
        let score = similarity("smoker", "smokerstatus");
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
        assert!(score > MATCH_THRESHOLD);
    }

    #[test]
    fn test_exact_match_ignores_case() {
        let targets = names(&["Insured_Gender", "coverage_amount"]);
        assert_eq!(exact_match("insured_gender", &targets), Some(&targets[0]));
        assert_eq!(exact_match("gender", &targets), None);
    }

    #[test]
    fn test_best_matches_never_reuse_a_target() {
        let sources = names(&["face_amount", "policy_amount"]);
        let targets = names(&["coverage_amount"]);
        let matches = best_matches(&sources, &targets);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].target, "coverage_amount");
    }

    #[test]
    fn test_best_matches_prefer_higher_score() {
        let sources = names(&["state"]);
        let targets = names(&["state_issued", "statement_date"]);
        let matches = best_matches(&sources, &targets);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].target, "state_issued");
        assert!(matches[0].confidence() < 100);
    }
}
