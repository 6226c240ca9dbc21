//! Composite risk vector: combines individual signals into one score and a
//! coarse risk level.

use crate::signals::clamp01;
use serde::{Deserialize, Serialize};

/// Default weight for `grounding_risk` in the composite score.
pub const DEFAULT_WEIGHT_GROUNDING: f64 = 0.30;
/// Default weight for `self_consistency_risk` in the composite score.
pub const DEFAULT_WEIGHT_SELF_CONSISTENCY: f64 = 0.25;
/// Default weight for `verifier_risk` in the composite score.
pub const DEFAULT_WEIGHT_VERIFIER: f64 = 0.25;
/// Default weight for `numeric_instability_risk` in the composite score.
pub const DEFAULT_WEIGHT_NUMERIC_INSTABILITY: f64 = 0.10;
/// Default weight for `tool_mismatch_risk` in the composite score.
pub const DEFAULT_WEIGHT_TOOL_MISMATCH: f64 = 0.10;
/// Default weight for `drift_risk` in the composite score.
pub const DEFAULT_WEIGHT_DRIFT: f64 = 0.10;

/// Coarse risk bucket derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// `composite_risk_score < 0.20`
    Low,
    /// `0.20 <= composite_risk_score < 0.35`
    Medium,
    /// `composite_risk_score >= 0.35`
    High,
}

impl RiskLevel {
    /// Classify a composite score into a [`RiskLevel`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sentinel_core::risk::RiskLevel;
    ///
    /// assert_eq!(RiskLevel::from_score(0.10), RiskLevel::Low);
    /// assert_eq!(RiskLevel::from_score(0.25), RiskLevel::Medium);
    /// assert_eq!(RiskLevel::from_score(0.80), RiskLevel::High);
    /// ```
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score < 0.20 {
            RiskLevel::Low
        } else if score < 0.35 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// One present-or-absent risk signal and the weight it contributes to the
/// composite score.
#[derive(Debug, Clone, Copy)]
struct Component {
    value: Option<f64>,
    weight: f64,
}

/// The full set of individual risk signals for one tool call or model call.
///
/// Any signal may be `None` when its inputs were unavailable (e.g. no
/// baseline prompt yet, a hallucination check disabled in configuration);
/// [`compute_composite`] renormalizes weights over only the signals present.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RiskVector {
    /// How far the response drifts from supplied context.
    pub grounding_risk: Option<f64>,
    /// Disagreement between two independently sampled candidate responses.
    pub self_consistency_risk: Option<f64>,
    /// Hedging/absolute-language-adjusted grounding risk.
    pub verifier_risk: Option<f64>,
    /// Instability of numeric values vs. a baseline or their own spread.
    pub numeric_instability_risk: Option<f64>,
    /// Whether response language signals a tool-call outcome mismatch.
    pub tool_mismatch_risk: Option<f64>,
    /// Drift of the current prompt from a baseline prompt for the same tool.
    pub drift_risk: Option<f64>,
}

impl RiskVector {
    fn components(&self) -> [Component; 6] {
        [
            Component {
                value: self.grounding_risk,
                weight: DEFAULT_WEIGHT_GROUNDING,
            },
            Component {
                value: self.self_consistency_risk,
                weight: DEFAULT_WEIGHT_SELF_CONSISTENCY,
            },
            Component {
                value: self.verifier_risk,
                weight: DEFAULT_WEIGHT_VERIFIER,
            },
            Component {
                value: self.numeric_instability_risk,
                weight: DEFAULT_WEIGHT_NUMERIC_INSTABILITY,
            },
            Component {
                value: self.tool_mismatch_risk,
                weight: DEFAULT_WEIGHT_TOOL_MISMATCH,
            },
            Component {
                value: self.drift_risk,
                weight: DEFAULT_WEIGHT_DRIFT,
            },
        ]
    }

    /// Weighted mean over present components only, with weights renormalized
    /// to sum to `1.0` over just those components. Returns `0.0` if no
    /// component is present.
    ///
    /// # Examples
    ///
    /// ```
    /// use sentinel_core::risk::RiskVector;
    ///
    /// let v = RiskVector { grounding_risk: Some(0.5), ..Default::default() };
    /// assert_eq!(v.composite_risk_score(), 0.5);
    /// ```
    #[must_use]
    pub fn composite_risk_score(&self) -> f64 {
        let components = self.components();
        let weight_sum: f64 = components
            .iter()
            .filter_map(|c| c.value.map(|_| c.weight))
            .sum();
        if weight_sum <= 0.0 {
            return 0.0;
        }
        let weighted: f64 = components
            .iter()
            .filter_map(|c| c.value.map(|v| v * c.weight))
            .sum();
        clamp01(weighted / weight_sum)
    }

    /// Coarse [`RiskLevel`] for [`Self::composite_risk_score`].
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.composite_risk_score())
    }
}
