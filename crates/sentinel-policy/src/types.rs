//! Shared policy types: criticality, decisions, tool profiles, and results.

use serde::{Deserialize, Serialize};

/// How consequential a tool's side effects are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    /// Read-only or fully reversible; risk score barely matters.
    Low,
    /// Reversible but with real-world effect (e.g. sends a notification).
    Medium,
    /// Irreversible or high-value (e.g. transfers funds, deletes data).
    High,
}

/// The policy engine's verdict for a single tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Proceed with the call as normal.
    Allow,
    /// Route through the propose/commit protocol (or a human reviewer)
    /// before proceeding.
    Review,
    /// Refuse the call outright; the fallback router takes over.
    Block,
}

/// Static metadata about one tool, registered ahead of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProfile {
    /// The tool's name, as it appears in a tool call.
    pub tool_name: String,
    /// How consequential this tool's side effects are.
    pub criticality: Criticality,
    /// Coarse blast-radius label (e.g. `"limited"`, `"account"`, `"global"`).
    pub blast_radius: String,
    /// Whether the tool's effect cannot be undone once executed.
    pub irreversible: bool,
    /// Whether the tool touches regulated data or actions.
    pub regulatory: bool,
    /// Optional finer-grained risk tier, when the registry assigns one.
    pub risk_tier: Option<String>,
}

impl ToolProfile {
    /// Build a profile for `tool_name` with the given criticality and the
    /// reference registry's defaults: `blast_radius = "limited"`,
    /// `irreversible = false`, `regulatory = false`, no `risk_tier`.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, criticality: Criticality) -> Self {
        Self {
            tool_name: tool_name.into(),
            criticality,
            blast_radius: "limited".to_string(),
            irreversible: false,
            regulatory: false,
            risk_tier: None,
        }
    }

    /// Override the default `blast_radius` label.
    #[must_use]
    pub fn with_blast_radius(mut self, blast_radius: impl Into<String>) -> Self {
        self.blast_radius = blast_radius.into();
        self
    }

    /// Mark this tool as irreversible (or not).
    #[must_use]
    pub fn with_irreversible(mut self, irreversible: bool) -> Self {
        self.irreversible = irreversible;
        self
    }

    /// Mark this tool as touching regulated data or actions (or not).
    #[must_use]
    pub fn with_regulatory(mut self, regulatory: bool) -> Self {
        self.regulatory = regulatory;
        self
    }

    /// Attach a finer-grained risk tier.
    #[must_use]
    pub fn with_risk_tier(mut self, risk_tier: impl Into<String>) -> Self {
        self.risk_tier = Some(risk_tier.into());
        self
    }
}

/// The outcome of evaluating a [`ToolProfile`] against a composite risk
/// score: the [`Decision`], the thresholds that produced it, and a
/// human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    /// The verdict.
    pub decision: Decision,
    /// Short machine-readable reason code (e.g. `"high_criticality_block_threshold"`).
    pub reason: String,
    /// Identifier of the policy document that produced this result.
    pub policy_id: String,
    /// Version of the policy document that produced this result.
    pub policy_version: String,
    /// The composite risk score that was evaluated.
    pub composite_risk_score: f64,
    /// The tool's criticality at evaluation time.
    pub criticality: Criticality,
    /// The threshold the decision was measured against.
    pub threshold_used: f64,
    /// Whether an allowed call must present a verified execution token.
    /// Always `true` for [`Criticality::High`], `false` otherwise.
    pub require_token: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_profile_uses_reference_defaults() {
        let p = ToolProfile::new("read_file", Criticality::Low);
        assert_eq!(p.blast_radius, "limited");
        assert!(!p.irreversible);
        assert!(!p.regulatory);
        assert_eq!(p.risk_tier, None);
    }

    #[test]
    fn builder_overrides_apply() {
        let p = ToolProfile::new("transfer_funds", Criticality::High)
            .with_blast_radius("account")
            .with_irreversible(true)
            .with_regulatory(true)
            .with_risk_tier("financial");
        assert_eq!(p.blast_radius, "account");
        assert!(p.irreversible);
        assert!(p.regulatory);
        assert_eq!(p.risk_tier.as_deref(), Some("financial"));
    }
}
