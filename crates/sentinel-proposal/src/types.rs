//! Data model for the propose/commit protocol.

use serde::{Deserialize, Serialize};

/// The last-known normalized prompt for a tool, used to measure prompt
/// drift on the next proposal for that tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselinePromptHash {
    /// The tool this baseline belongs to.
    pub tool_name: String,
    /// Hash of the baseline prompt.
    pub baseline_prompt_hash: String,
    /// The baseline prompt itself, kept for drift comparison.
    pub baseline_prompt: String,
    /// Epoch milliseconds when this baseline was last updated.
    pub updated_at_ms: i64,
}

/// A drafted, not-yet-committed tool call, with its risk scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Unique id for this proposal.
    pub proposal_id: String,
    /// The tool this proposal would call.
    pub tool_name: String,
    /// Hash of the tool call arguments.
    pub tool_args_hash: String,
    /// First independently generated candidate response.
    pub candidate_a: String,
    /// Second independently generated candidate response.
    pub candidate_b: String,
    /// Composite instability score in `[0, 1]`.
    pub composite_score: f64,
    /// Whether the composite score was low enough to auto-issue a commit
    /// token, or high enough to require a human-reviewed draft.
    pub outcome: ProposalOutcome,
    /// Epoch milliseconds when this proposal was created.
    pub created_at_ms: i64,
}

/// What a proposal resolves to once scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalOutcome {
    /// `composite_score >= block_threshold`: too unstable to auto-commit,
    /// held as a draft pending human review.
    Draft,
    /// `composite_score < block_threshold`: a commit token was issued.
    ReadyToCommit,
}

/// A recorded attempt to commit a proposal, successful or not.
///
/// Always written, even on failure, so the commit history is a complete
/// audit trail of every attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Unique id for this commit attempt.
    pub commit_id: String,
    /// The proposal this commit attempt targeted.
    pub proposal_id: String,
    /// The commit token id presented, if the token at least decoded.
    pub token_id: Option<String>,
    /// Whether the commit succeeded.
    pub ok: bool,
    /// Reason code: `"ok"` on success, else a verification failure code.
    pub reason: String,
    /// Epoch milliseconds when this commit attempt was recorded.
    pub committed_at_ms: i64,
}
