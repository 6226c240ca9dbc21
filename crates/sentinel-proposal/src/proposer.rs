//! The proposer: generates two candidate responses, scores their
//! instability, and either drafts the proposal for review or issues a
//! commit token.

use crate::commit_token::{CommitTokenManager, IssuedCommitToken};
use crate::scoring::{composite_score, model_generate_stub, numeric_variance, output_instability, prompt_drift};
use crate::store::ProposalStore;
use crate::types::{BaselinePromptHash, Proposal, ProposalOutcome};
use sentinel_core::hashing::{args_hash, prompt_hash};
use std::sync::Arc;
use uuid::Uuid;

/// Composite score at or above this value holds the proposal as a draft
/// instead of auto-issuing a commit token.
pub const DEFAULT_BLOCK_THRESHOLD: f64 = 0.45;

/// What proposing a tool call produces.
#[derive(Debug, Clone)]
pub enum ProposalOutput {
    /// The proposal is held for human review; no commit token was issued.
    Draft(Proposal),
    /// The proposal was auto-approved; commit it with the returned token.
    ReadyToCommit(Proposal, IssuedCommitToken),
}

/// Drafts and scores tool-call proposals.
pub struct ToolProposer {
    store: Arc<dyn ProposalStore>,
    commit_manager: CommitTokenManager,
    block_threshold: f64,
}

impl ToolProposer {
    /// Build a proposer over `store`, issuing commit tokens via
    /// `commit_manager`, with the default block threshold.
    #[must_use]
    pub fn new(store: Arc<dyn ProposalStore>, commit_manager: CommitTokenManager) -> Self {
        Self {
            store,
            commit_manager,
            block_threshold: DEFAULT_BLOCK_THRESHOLD,
        }
    }

    /// Override the default block threshold.
    #[must_use]
    pub fn with_block_threshold(mut self, block_threshold: f64) -> Self {
        self.block_threshold = block_threshold;
        self
    }

    /// Propose a call to `tool_name` with `tool_args` and the given
    /// `prompt`: generates two independent candidate responses, scores
    /// their disagreement, the numbers they each carry, and drift from the
    /// tool's last-known prompt.
    pub async fn propose(
        &self,
        tool_name: &str,
        tool_args: &serde_json::Value,
        prompt: &str,
        now_ms: i64,
    ) -> ProposalOutput {
        let baseline = self.store.get_baseline(tool_name).await;

        let candidate_a = model_generate_stub(prompt, "a");
        let candidate_b = model_generate_stub(prompt, "b");

        let instability = output_instability(&candidate_a, &candidate_b);
        let variance = numeric_variance(&candidate_a, Some(&candidate_b));
        let drift = prompt_drift(
            prompt,
            baseline.as_ref().map(|b| b.baseline_prompt_hash.as_str()),
        );
        let score = composite_score(instability, variance, drift);

        let outcome = if score >= self.block_threshold {
            ProposalOutcome::Draft
        } else {
            ProposalOutcome::ReadyToCommit
        };

        let proposal = Proposal {
            proposal_id: Uuid::new_v4().to_string(),
            tool_name: tool_name.to_string(),
            tool_args_hash: args_hash(tool_args),
            candidate_a,
            candidate_b,
            composite_score: score,
            outcome,
            created_at_ms: now_ms,
        };
        self.store.save_proposal(proposal.clone()).await;

        self.store
            .set_baseline(BaselinePromptHash {
                tool_name: tool_name.to_string(),
                baseline_prompt_hash: prompt_hash(prompt),
                baseline_prompt: prompt.to_string(),
                updated_at_ms: now_ms,
            })
            .await;

        match outcome {
            ProposalOutcome::Draft => ProposalOutput::Draft(proposal),
            ProposalOutcome::ReadyToCommit => {
                let token = self.commit_manager.issue(
                    proposal.proposal_id.clone(),
                    proposal.tool_name.clone(),
                    proposal.tool_args_hash.clone(),
                    proposal.composite_score,
                    now_ms,
                );
                ProposalOutput::ReadyToCommit(proposal, token)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryProposalStore;
    use serde_json::json;

    fn proposer(block_threshold: f64) -> ToolProposer {
        let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
        ToolProposer::new(store, CommitTokenManager::new(b"commit-secret".to_vec(), 60_000))
            .with_block_threshold(block_threshold)
    }

    #[tokio::test]
    async fn low_instability_auto_commits() {
        let proposer = proposer(0.9);
        let output = proposer
            .propose(
                "transfer_funds",
                &json!({"amount": 100}),
                "transfer $100 to acct_1",
                1_000,
            )
            .await;
        assert!(matches!(output, ProposalOutput::ReadyToCommit(_, _)));
    }

    #[tokio::test]
    async fn first_call_has_no_baseline_drift_component() {
        let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
        assert!(store.get_baseline("transfer_funds").await.is_none());
    }

    #[tokio::test]
    async fn proposal_is_persisted() {
        let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
        let proposer = ToolProposer::new(
            Arc::clone(&store),
            CommitTokenManager::new(b"secret".to_vec(), 60_000),
        );
        let output = proposer
            .propose("t", &json!({}), "prompt", 1_000)
            .await;
        let proposal_id = match output {
            ProposalOutput::Draft(p) => p.proposal_id,
            ProposalOutput::ReadyToCommit(p, _) => p.proposal_id,
        };
        assert!(store.get_proposal(&proposal_id).await.is_some());
    }

    #[tokio::test]
    async fn sets_baseline_after_proposing() {
        let store: Arc<dyn ProposalStore> = Arc::new(InMemoryProposalStore::new());
        let proposer = ToolProposer::new(
            Arc::clone(&store),
            CommitTokenManager::new(b"secret".to_vec(), 60_000),
        );
        proposer
            .propose("transfer_funds", &json!({}), "transfer $100", 1_000)
            .await;
        let baseline = store.get_baseline("transfer_funds").await.unwrap();
        assert_eq!(baseline.baseline_prompt, "transfer $100");
    }
}
