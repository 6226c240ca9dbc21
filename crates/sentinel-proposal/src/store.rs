//! The proposal/commit persistence boundary.
//!
//! `ProposalStore` is the trait integrators implement against their actual
//! database; `InMemoryProposalStore` is the ambient, dependency-free
//! reference implementation used in tests and small deployments. A
//! relational implementation (the `tool_prompt_baselines` / `proposals` /
//! `commits` / `nonces` tables described in `DESIGN.md`) is a documented
//! trait-conformance target, not implemented here — it is an external
//! collaborator, same as a real model client.

use crate::types::{BaselinePromptHash, Commit, Proposal};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Persistence boundary for the propose/commit protocol.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Fetch the current baseline prompt for `tool_name`, if any.
    async fn get_baseline(&self, tool_name: &str) -> Option<BaselinePromptHash>;

    /// Replace the baseline prompt for `tool_name`.
    async fn set_baseline(&self, baseline: BaselinePromptHash);

    /// Persist a newly scored proposal.
    async fn save_proposal(&self, proposal: Proposal);

    /// Fetch a previously saved proposal by id.
    async fn get_proposal(&self, proposal_id: &str) -> Option<Proposal>;

    /// Persist a commit attempt (always called, success or failure).
    async fn save_commit(&self, commit: Commit);

    /// Atomically check whether `nonce` has been used, and if not, record
    /// it with `expires_at_ms`. Returns `true` on first use. Expired
    /// entries are purged opportunistically on each call.
    async fn nonce_seen(&self, nonce: &str, expires_at_ms: i64, now_ms: i64) -> bool;
}

/// An in-memory [`ProposalStore`], guarded by a single async mutex per
/// table. Adequate for tests and single-process deployments; not
/// durable across restarts.
#[derive(Default)]
pub struct InMemoryProposalStore {
    baselines: Mutex<HashMap<String, BaselinePromptHash>>,
    proposals: Mutex<HashMap<String, Proposal>>,
    commits: Mutex<Vec<Commit>>,
    nonces: Mutex<HashMap<String, i64>>,
}

impl InMemoryProposalStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProposalStore for InMemoryProposalStore {
    async fn get_baseline(&self, tool_name: &str) -> Option<BaselinePromptHash> {
        self.baselines.lock().await.get(tool_name).cloned()
    }

    async fn set_baseline(&self, baseline: BaselinePromptHash) {
        self.baselines
            .lock()
            .await
            .insert(baseline.tool_name.clone(), baseline);
    }

    async fn save_proposal(&self, proposal: Proposal) {
        self.proposals
            .lock()
            .await
            .insert(proposal.proposal_id.clone(), proposal);
    }

    async fn get_proposal(&self, proposal_id: &str) -> Option<Proposal> {
        self.proposals.lock().await.get(proposal_id).cloned()
    }

    async fn save_commit(&self, commit: Commit) {
        self.commits.lock().await.push(commit);
    }

    async fn nonce_seen(&self, nonce: &str, expires_at_ms: i64, now_ms: i64) -> bool {
        let mut nonces = self.nonces.lock().await;
        nonces.retain(|_, expiry| *expiry > now_ms);
        if nonces.contains_key(nonce) {
            return false;
        }
        nonces.insert(nonce.to_string(), expires_at_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn baseline_roundtrips() {
        let store = InMemoryProposalStore::new();
        assert!(store.get_baseline("transfer_funds").await.is_none());
        store
            .set_baseline(BaselinePromptHash {
                tool_name: "transfer_funds".to_string(),
                baseline_prompt_hash: "hash".to_string(),
                baseline_prompt: "transfer $100".to_string(),
                updated_at_ms: 1_000,
            })
            .await;
        let baseline = store.get_baseline("transfer_funds").await.unwrap();
        assert_eq!(baseline.baseline_prompt, "transfer $100");
    }

    #[tokio::test]
    async fn proposal_roundtrips() {
        let store = InMemoryProposalStore::new();
        let proposal = Proposal {
            proposal_id: "p1".to_string(),
            tool_name: "transfer_funds".to_string(),
            tool_args_hash: "hash".to_string(),
            candidate_a: "a".to_string(),
            candidate_b: "b".to_string(),
            composite_score: 0.1,
            outcome: crate::types::ProposalOutcome::ReadyToCommit,
            created_at_ms: 1_000,
        };
        store.save_proposal(proposal.clone()).await;
        assert_eq!(store.get_proposal("p1").await, Some(proposal));
        assert!(store.get_proposal("missing").await.is_none());
    }

    #[tokio::test]
    async fn nonce_seen_rejects_replay_and_gcs_expired() {
        let store = InMemoryProposalStore::new();
        assert!(store.nonce_seen("n1", 1_100, 1_000).await);
        assert!(!store.nonce_seen("n1", 1_100, 1_050).await);
        // n1 expired by now_ms=2_000, so it is purged and a new nonce
        // can be recorded without collision.
        assert!(store.nonce_seen("n2", 2_100, 2_000).await);
    }
}
