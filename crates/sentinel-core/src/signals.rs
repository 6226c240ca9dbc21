//! Individual risk signal computations.
//!
//! Each function here returns a score in `[0.0, 1.0]` ("more risk is
//! higher"), computed from raw model-call artifacts. [`crate::risk`] combines
//! these into a single [`crate::risk::RiskVector`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-+]?\d*\.?\d+").expect("valid regex"));

const FAILURE_MARKERS: &[&str] = &["fail", "error", "declined", "denied", "timeout"];
const SUCCESS_MARKERS: &[&str] = &["success", "completed", "done", "sent", "processed"];
const HEDGING_MARKERS: &[&str] = &["maybe", "not sure", "possibly", "might"];
const ABSOLUTE_MARKERS: &[&str] = &["always", "definitely", "guaranteed", "never"];

/// Clamp `value` to the closed interval `[0.0, 1.0]`.
#[must_use]
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Extract every signed-decimal numeric literal found in `text`, in order.
///
/// # Examples
///
/// ```
/// use sentinel_core::signals::extract_numbers;
///
/// assert_eq!(extract_numbers("transfer 100.50 to acct -3"), vec![100.50, -3.0]);
/// ```
#[must_use]
pub fn extract_numbers(text: &str) -> Vec<f64> {
    NUM_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect()
}

/// Jaccard distance between the tokenizations of `a` and `b`: `0.0` for
/// identical token sets, `1.0` for disjoint ones.
///
/// # Examples
///
/// ```
/// use sentinel_core::signals::jaccard_distance;
///
/// assert_eq!(jaccard_distance("a b c", "a b c"), 0.0);
/// assert_eq!(jaccard_distance("a b", "c d"), 1.0);
/// ```
#[must_use]
pub fn jaccard_distance(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() && tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    clamp01(1.0 - (intersection as f64 / union as f64))
}

/// Grounding risk: how far a response's wording drifts from the supplied
/// context/prompt, measured as Jaccard distance.
#[must_use]
pub fn grounding_risk(response: &str, context: &str) -> f64 {
    jaccard_distance(response, context)
}

/// Self-consistency risk: disagreement between two independently sampled
/// candidate responses to the same prompt, measured as Jaccard distance.
#[must_use]
pub fn self_consistency_risk(candidate_a: &str, candidate_b: &str) -> f64 {
    jaccard_distance(candidate_a, candidate_b)
}

/// Numeric instability risk.
///
/// When `baseline` values are supplied, risk is the mean absolute relative
/// difference between paired `current`/`baseline` values. Otherwise it falls
/// back to the coefficient of variation (stdev / mean) of `current` alone.
/// Returns `0.0` for fewer than two values and no baseline.
#[must_use]
pub fn numeric_instability_risk(current: &[f64], baseline: Option<&[f64]>) -> f64 {
    if let Some(base) = baseline {
        let n = current.len().min(base.len());
        if n == 0 {
            return 0.0;
        }
        let mut total = 0.0;
        let mut counted = 0usize;
        for i in 0..n {
            let c = current[i];
            let b = base[i];
            let denom = c.abs().max(b.abs());
            if denom == 0.0 {
                continue;
            }
            total += (c - b).abs() / denom;
            counted += 1;
        }
        if counted == 0 {
            return 0.0;
        }
        return clamp01(total / counted as f64);
    }

    if current.len() < 2 {
        return 0.0;
    }
    let mean = current.iter().sum::<f64>() / current.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance =
        current.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / current.len() as f64;
    let stdev = variance.sqrt();
    clamp01(stdev / mean.abs())
}

/// Tool-mismatch risk: `1.0` when the tool result summary reads as a
/// failure but the answer claims success, `0.0` otherwise. Absent when
/// there is no tool result to compare against.
#[must_use]
pub fn tool_mismatch_risk(answer: &str, tool_result_summary: Option<&str>) -> f64 {
    let Some(summary) = tool_result_summary else {
        return 0.0;
    };
    let answer_lower = answer.to_lowercase();
    let summary_lower = summary.to_lowercase();
    let tool_failed = FAILURE_MARKERS.iter().any(|m| summary_lower.contains(m));
    let answer_claims_success = SUCCESS_MARKERS.iter().any(|m| answer_lower.contains(m));
    if tool_failed && answer_claims_success {
        1.0
    } else {
        0.0
    }
}

/// Drift risk: `1.0` when the current prompt hash differs from the
/// previous one for the same tool, `0.0` when it matches or there is no
/// previous hash yet.
#[must_use]
pub fn drift_risk(previous_prompt_hash: Option<&str>, current_prompt_hash: &str) -> f64 {
    match previous_prompt_hash {
        Some(previous) if previous != current_prompt_hash => 1.0,
        _ => 0.0,
    }
}

/// Verifier risk: starts at `grounding_risk`, penalized for hedging
/// language, rewarded (penalized less) for confident/absolute language, and
/// penalized further if grounding risk is already high.
///
/// Mirrors the reference scoring exactly: `-0.2` per hedging marker found
/// (first match only), `-0.15` per absolute marker found (first match
/// only), `-0.25` if `grounding_risk > 0.75`. The result is clamped to
/// `[0, 1]`; the subtractions reduce *score*, i.e. confidence/hedging both
/// reduce verifier risk relative to grounding risk, clamped from below.
#[must_use]
pub fn verifier_risk(response: &str, grounding_risk: f64) -> f64 {
    let lower = response.to_lowercase();
    let mut score = grounding_risk;

    if HEDGING_MARKERS.iter().any(|m| lower.contains(m)) {
        score -= 0.2;
    }
    if ABSOLUTE_MARKERS.iter().any(|m| lower.contains(m)) {
        score -= 0.15;
    }
    if grounding_risk > 0.75 {
        score -= 0.25;
    }

    clamp01(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jaccard_distance_identical_is_zero() {
        assert_eq!(jaccard_distance("the quick fox", "the quick fox"), 0.0);
    }

    #[test]
    fn jaccard_distance_disjoint_is_one() {
        assert_eq!(jaccard_distance("a b", "c d"), 1.0);
    }

    #[test]
    fn jaccard_distance_empty_both_is_zero() {
        assert_eq!(jaccard_distance("", ""), 0.0);
    }

    #[test]
    fn numeric_instability_paired_diff() {
        let current = [100.0, 200.0];
        let baseline = [100.0, 150.0];
        let risk = numeric_instability_risk(&current, Some(&baseline));
        assert!(risk > 0.0 && risk <= 1.0);
    }

    #[test]
    fn numeric_instability_no_baseline_uses_spread() {
        let stable = [100.0, 100.0, 100.0];
        let unstable = [10.0, 100.0, 1000.0];
        let r_stable = numeric_instability_risk(&stable, None);
        let r_unstable = numeric_instability_risk(&unstable, None);
        assert_eq!(r_stable, 0.0);
        assert!(r_unstable > r_stable);
    }

    #[test]
    fn numeric_instability_single_value_is_zero() {
        assert_eq!(numeric_instability_risk(&[42.0], None), 0.0);
    }

    #[test]
    fn tool_mismatch_no_summary_is_zero() {
        assert_eq!(tool_mismatch_risk("transfer completed", None), 0.0);
    }

    #[test]
    fn tool_mismatch_detects_claimed_success_over_failure() {
        let r = tool_mismatch_risk(
            "the transfer completed successfully",
            Some("tool call declined: timeout"),
        );
        assert_eq!(r, 1.0);
    }

    #[test]
    fn tool_mismatch_matching_outcome_is_zero() {
        let r = tool_mismatch_risk(
            "the transfer completed successfully",
            Some("tool call processed"),
        );
        assert_eq!(r, 0.0);
    }

    #[test]
    fn tool_mismatch_failure_without_success_claim_is_zero() {
        let r = tool_mismatch_risk(
            "unable to confirm the outcome",
            Some("tool call declined: timeout"),
        );
        assert_eq!(r, 0.0);
    }

    #[test]
    fn drift_risk_no_previous_hash_is_zero() {
        assert_eq!(drift_risk(None, "abc123"), 0.0);
    }

    #[test]
    fn drift_risk_matching_hash_is_zero() {
        assert_eq!(drift_risk(Some("abc123"), "abc123"), 0.0);
    }

    #[test]
    fn drift_risk_differing_hash_is_one() {
        assert_eq!(drift_risk(Some("abc123"), "def456"), 1.0);
    }

    #[test]
    fn verifier_risk_hedging_reduces_score() {
        let base = grounding_risk("a completely different answer", "the original context");
        let hedged = verifier_risk("maybe this is right, not sure though", base);
        assert!(hedged <= base);
    }

    #[test]
    fn verifier_risk_absolute_language_reduces_score() {
        let base = 0.5;
        let confident = verifier_risk("this is definitely correct", base);
        assert_eq!(confident, clamp01(base - 0.15));
    }

    #[test]
    fn verifier_risk_high_grounding_adds_penalty() {
        let high = verifier_risk("plain text", 0.9);
        assert_eq!(high, clamp01(0.9 - 0.25));
    }

    #[test]
    fn verifier_risk_never_negative() {
        let r = verifier_risk("maybe definitely not sure always", 0.05);
        assert!(r >= 0.0);
    }

    #[test]
    fn extract_numbers_finds_signed_decimals() {
        assert_eq!(extract_numbers("amount -3, fee 1.5, total 100"), vec![-3.0, 1.5, 100.0]);
    }

    #[test]
    fn extract_numbers_empty_for_no_digits() {
        assert!(extract_numbers("no numbers here").is_empty());
    }

    #[test]
    fn clamp01_bounds() {
        assert_eq!(clamp01(-1.0), 0.0);
        assert_eq!(clamp01(2.0), 1.0);
        assert_eq!(clamp01(0.5), 0.5);
    }
}
