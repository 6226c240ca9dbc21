//! Composite instability scoring for proposals.
//!
//! Reuses the same signal primitives as `sentinel-core::signals` (Jaccard
//! distance, numeric extraction) under names that match how the
//! propose/commit protocol talks about them.

use sentinel_core::hashing::prompt_hash;
use sentinel_core::signals::{clamp01, extract_numbers, jaccard_distance};

/// Default weight for output instability in the composite score.
pub const DEFAULT_WEIGHT_OUTPUT_INSTABILITY: f64 = 0.5;
/// Default weight for numeric variance in the composite score.
pub const DEFAULT_WEIGHT_NUMERIC_VARIANCE: f64 = 0.3;
/// Default weight for prompt drift in the composite score.
pub const DEFAULT_WEIGHT_PROMPT_DRIFT: f64 = 0.2;

/// Disagreement between two independently generated candidate responses.
#[must_use]
pub fn output_instability(candidate_a: &str, candidate_b: &str) -> f64 {
    jaccard_distance(candidate_a, candidate_b)
}

/// Instability of numeric values extracted from the two generated
/// candidates. `None` if `candidate_a` carries no numbers at all. When
/// `candidate_b` is absent, falls back to the normalized spread within
/// `candidate_a`'s own numbers.
#[must_use]
pub fn numeric_variance(candidate_a: &str, candidate_b: Option<&str>) -> Option<f64> {
    let numbers_a = extract_numbers(candidate_a);
    if numbers_a.is_empty() {
        return None;
    }

    if let Some(b) = candidate_b {
        let numbers_b = extract_numbers(b);
        let n = numbers_a.len().min(numbers_b.len());
        if n == 0 {
            return Some(1.0);
        }
        let mean_abs_diff: f64 = (0..n)
            .map(|i| (numbers_a[i] - numbers_b[i]).abs() / numbers_a[i].abs().max(1e-9))
            .sum::<f64>()
            / n as f64;
        return Some(clamp01(mean_abs_diff));
    }

    if numbers_a.len() < 2 {
        return Some(0.0);
    }
    let mean = numbers_a.iter().sum::<f64>() / numbers_a.len() as f64;
    let max = numbers_a.iter().cloned().fold(f64::MIN, f64::max);
    let min = numbers_a.iter().cloned().fold(f64::MAX, f64::min);
    Some(clamp01((max - min) / mean.abs().max(1e-9)))
}

/// Drift of the current prompt from the tool's baseline prompt hash.
/// `None` when there is no baseline yet (the tool's first-ever proposal).
#[must_use]
pub fn prompt_drift(prompt: &str, baseline_prompt_hash: Option<&str>) -> Option<f64> {
    let baseline = baseline_prompt_hash?;
    Some(if prompt_hash(prompt) == baseline { 0.0 } else { 1.0 })
}

/// Weighted mean of the three signals above, renormalized over whichever
/// are present, same convention as `sentinel_core::risk::RiskVector`.
#[must_use]
pub fn composite_score(
    output_instability: f64,
    numeric_variance: Option<f64>,
    prompt_drift: Option<f64>,
) -> f64 {
    let mut weighted = output_instability * DEFAULT_WEIGHT_OUTPUT_INSTABILITY;
    let mut weight_sum = DEFAULT_WEIGHT_OUTPUT_INSTABILITY;
    if let Some(variance) = numeric_variance {
        weighted += variance * DEFAULT_WEIGHT_NUMERIC_VARIANCE;
        weight_sum += DEFAULT_WEIGHT_NUMERIC_VARIANCE;
    }
    if let Some(drift) = prompt_drift {
        weighted += drift * DEFAULT_WEIGHT_PROMPT_DRIFT;
        weight_sum += DEFAULT_WEIGHT_PROMPT_DRIFT;
    }
    if weight_sum == 0.0 {
        return 0.0;
    }
    clamp01(weighted / weight_sum)
}

/// A deterministic stand-in for a real model call, used when generating
/// the two candidates a proposal compares.
///
/// Integrators supply a real model client; this exists so the propose/
/// commit protocol's scoring can be exercised and tested without one.
#[must_use]
pub fn model_generate_stub(prompt: &str, variant: &str) -> String {
    format!("{variant}:{}", sentinel_core::hashing::normalize_text(prompt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_instability_identical_candidates_is_zero() {
        assert_eq!(output_instability("same text", "same text"), 0.0);
    }

    #[test]
    fn output_instability_disjoint_candidates_is_one() {
        assert_eq!(output_instability("a b", "c d"), 1.0);
    }

    #[test]
    fn prompt_drift_no_baseline_is_absent() {
        assert_eq!(prompt_drift("transfer $100", None), None);
    }

    #[test]
    fn prompt_drift_matching_hash_is_zero() {
        let hash = sentinel_core::hashing::prompt_hash("transfer $100");
        assert_eq!(prompt_drift("transfer $100", Some(&hash)), Some(0.0));
    }

    #[test]
    fn prompt_drift_differing_hash_is_one() {
        let hash = sentinel_core::hashing::prompt_hash("transfer $100");
        assert_eq!(prompt_drift("transfer $200", Some(&hash)), Some(1.0));
    }

    #[test]
    fn numeric_variance_no_numbers_is_absent() {
        assert_eq!(numeric_variance("no numbers here", None), None);
    }

    #[test]
    fn numeric_variance_diffs_two_candidates() {
        let variance = numeric_variance("amount 100", Some("amount 150"));
        assert_eq!(variance, Some(0.5));
    }

    #[test]
    fn numeric_variance_single_candidate_uses_spread() {
        let stable = numeric_variance("100 100 100", None);
        let unstable = numeric_variance("10 100 1000", None);
        assert_eq!(stable, Some(0.0));
        assert!(unstable.unwrap() > 0.0);
    }

    #[test]
    fn composite_score_without_drift_or_variance_renormalizes() {
        let score = composite_score(1.0, None, None);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn composite_score_with_all_signals() {
        let score = composite_score(0.5, Some(0.5), Some(0.5));
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn model_generate_stub_is_deterministic_per_variant() {
        let a1 = model_generate_stub("Transfer Funds", "a");
        let a2 = model_generate_stub("transfer funds", "a");
        let b = model_generate_stub("transfer funds", "b");
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }
}
