//! The risk-bound policy engine: maps a tool's criticality and a composite
//! risk score onto an [`crate::types::Decision`].

use crate::types::{Criticality, Decision, PolicyResult};

/// Threshold configuration for [`PolicyEngine::evaluate`].
///
/// Defaults match the reference policy document `risk-bound-exec-v2`.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Identifier of this policy document.
    pub policy_id: String,
    /// Version of this policy document.
    pub policy_version: String,
    /// For [`Criticality::High`] tools: composite score at or above this
    /// value is BLOCKed.
    pub high_block_threshold: f64,
    /// For [`Criticality::High`] tools: composite score at or above this
    /// value (but below `high_block_threshold`) is REVIEWed.
    pub high_review_threshold: f64,
    /// For [`Criticality::Medium`] tools: composite score at or above this
    /// value is REVIEWed.
    pub medium_review_threshold: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            policy_id: "risk-bound-exec-v2".to_string(),
            policy_version: "2.0.0".to_string(),
            high_block_threshold: 0.35,
            high_review_threshold: 0.20,
            medium_review_threshold: 0.50,
        }
    }
}

/// Evaluates a tool call's criticality and composite risk score into a
/// [`PolicyResult`].
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    config: PolicyConfig,
}

impl PolicyEngine {
    /// Build an engine from the given [`PolicyConfig`].
    #[must_use]
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// The [`PolicyConfig`] this engine was built with.
    #[must_use]
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Evaluate `criticality` and `composite_risk_score` into a
    /// [`PolicyResult`].
    ///
    /// - [`Criticality::Low`]: always ALLOW. `threshold_used` is the
    ///   literal `1.0` (no threshold actually gates this branch).
    ///   `require_token` is always `false`.
    /// - [`Criticality::Medium`]: REVIEW at or above
    ///   `medium_review_threshold`, else ALLOW. `threshold_used` is
    ///   `medium_review_threshold` either way. `require_token` is always
    ///   `false`.
    /// - [`Criticality::High`]: BLOCK at or above `high_block_threshold`,
    ///   REVIEW at or above `high_review_threshold`, else ALLOW.
    ///   `threshold_used` is whichever threshold the branch evaluated
    ///   against (the ALLOW branch still reports `high_review_threshold`,
    ///   the threshold it fell under). `require_token` is always `true`.
    #[must_use]
    pub fn evaluate(&self, criticality: Criticality, composite_risk_score: f64) -> PolicyResult {
        let cfg = &self.config;
        let s = composite_risk_score;

        let (decision, reason, threshold_used, require_token) = match criticality {
            Criticality::Low => (Decision::Allow, "low_criticality_allow", 1.0, false),
            Criticality::Medium => {
                if s >= cfg.medium_review_threshold {
                    (
                        Decision::Review,
                        "medium_criticality_review_threshold",
                        cfg.medium_review_threshold,
                        false,
                    )
                } else {
                    (
                        Decision::Allow,
                        "medium_criticality_allow",
                        cfg.medium_review_threshold,
                        false,
                    )
                }
            }
            Criticality::High => {
                if s >= cfg.high_block_threshold {
                    (
                        Decision::Block,
                        "high_criticality_block_threshold",
                        cfg.high_block_threshold,
                        true,
                    )
                } else if s >= cfg.high_review_threshold {
                    (
                        Decision::Review,
                        "high_criticality_review_threshold",
                        cfg.high_review_threshold,
                        true,
                    )
                } else {
                    (
                        Decision::Allow,
                        "high_criticality_allow",
                        cfg.high_review_threshold,
                        true,
                    )
                }
            }
        };

        PolicyResult {
            decision,
            reason: reason.to_string(),
            policy_id: cfg.policy_id.clone(),
            policy_version: cfg.policy_version.clone(),
            composite_risk_score,
            criticality,
            threshold_used,
            require_token,
        }
    }
}
