//! Verifies a commit token against its proposal before the proposed tool
//! call is actually executed.

use crate::commit_token::CommitTokenManager;
use crate::store::ProposalStore;
use crate::types::{Commit, ProposalOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Why commit verification succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitVerificationReason {
    /// Verified successfully.
    Ok,
    /// No proposal exists with the given id.
    ProposalNotFound,
    /// The proposal was held as a draft; it was never cleared to commit.
    ProposalNotReady,
    /// The token was malformed or its signature did not match.
    BadToken,
    /// The token's `proposal_id` does not match the proposal being
    /// committed.
    ProposalIdMismatch,
    /// Either the tool name or the argument hash did not match.
    ///
    /// The reference verifier reports a tool-name mismatch under the same
    /// code as an argument-hash mismatch — both indicate "this token does
    /// not authorize this specific call" and the distinction was never
    /// surfaced to callers. Preserved here rather than split into two
    /// codes; see `DESIGN.md`.
    ArgsHashMismatch,
    /// The token's expiry has passed.
    Expired,
    /// The token's nonce has already been consumed.
    NonceReplay,
}

/// The result of [`CommitVerifier::verify_commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommitVerificationResult {
    /// Whether the commit is authorized.
    pub ok: bool,
    /// Why it succeeded or failed.
    pub reason: CommitVerificationReason,
}

/// Verifies commit tokens and records every attempt.
pub struct CommitVerifier {
    store: Arc<dyn ProposalStore>,
    commit_manager: CommitTokenManager,
}

impl CommitVerifier {
    /// Build a verifier over `store`, decoding tokens via `commit_manager`.
    #[must_use]
    pub fn new(store: Arc<dyn ProposalStore>, commit_manager: CommitTokenManager) -> Self {
        Self {
            store,
            commit_manager,
        }
    }

    /// Verify that `token` authorizes committing `proposal_id` as a call
    /// to `tool_name` with argument hash `tool_args_hash`.
    ///
    /// Checks run in this order: the proposal must exist and have been
    /// marked ready to commit; the token must decode and its signature
    /// must check out; the token's `proposal_id` must match; its tool
    /// name and argument hash must match; it must not be expired; and its
    /// nonce must not have been used before. A [`Commit`] row is written
    /// for every attempt, successful or not.
    pub async fn verify_commit(
        &self,
        proposal_id: &str,
        token: &str,
        tool_name: &str,
        tool_args_hash: &str,
        now_ms: i64,
    ) -> CommitVerificationResult {
        let result = self
            .check(proposal_id, token, tool_name, tool_args_hash, now_ms)
            .await;

        let token_id = self.commit_manager.decode(token).map(|p| p.token_id);
        self.store
            .save_commit(Commit {
                commit_id: Uuid::new_v4().to_string(),
                proposal_id: proposal_id.to_string(),
                token_id,
                ok: result.ok,
                reason: format!("{:?}", result.reason).to_lowercase(),
                committed_at_ms: now_ms,
            })
            .await;

        result
    }

    async fn check(
        &self,
        proposal_id: &str,
        token: &str,
        tool_name: &str,
        tool_args_hash: &str,
        now_ms: i64,
    ) -> CommitVerificationResult {
        use CommitVerificationReason::*;

        let Some(proposal) = self.store.get_proposal(proposal_id).await else {
            return CommitVerificationResult {
                ok: false,
                reason: ProposalNotFound,
            };
        };
        if proposal.outcome != ProposalOutcome::ReadyToCommit {
            return CommitVerificationResult {
                ok: false,
                reason: ProposalNotReady,
            };
        }

        let Some(payload) = self.commit_manager.decode(token) else {
            return CommitVerificationResult {
                ok: false,
                reason: BadToken,
            };
        };

        if payload.proposal_id != proposal_id {
            return CommitVerificationResult {
                ok: false,
                reason: ProposalIdMismatch,
            };
        }

        if payload.tool_name != tool_name || payload.tool_args_hash != tool_args_hash {
            return CommitVerificationResult {
                ok: false,
                reason: ArgsHashMismatch,
            };
        }

        if now_ms >= payload.expires_at_ms {
            return CommitVerificationResult {
                ok: false,
                reason: Expired,
            };
        }

        let first_use = self
            .store
            .nonce_seen(&payload.nonce, payload.expires_at_ms, now_ms)
            .await;
        if !first_use {
            return CommitVerificationResult {
                ok: false,
                reason: NonceReplay,
            };
        }

        CommitVerificationResult { ok: true, reason: Ok }
    }
}
