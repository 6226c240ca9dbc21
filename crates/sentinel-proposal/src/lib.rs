// SPDX-License-Identifier: MIT OR Apache-2.0

//! The propose/commit protocol: for tools whose side effects are too
//! consequential to execute on a single pass, a [`proposer::ToolProposer`]
//! drafts two candidate responses, scores their disagreement, and either
//! holds the result for human review or issues a commit token. A
//! [`verifier::CommitVerifier`] checks that token before the call actually
//! runs, at most once per token.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod commit_token;
pub mod proposer;
pub mod scoring;
pub mod store;
pub mod types;
pub mod verifier;

pub use commit_token::{CommitTokenManager, CommitTokenPayload, IssuedCommitToken};
pub use proposer::{ProposalOutput, ToolProposer};
pub use store::{InMemoryProposalStore, ProposalStore};
pub use types::{BaselinePromptHash, Commit, Proposal, ProposalOutcome};
pub use verifier::{CommitVerificationReason, CommitVerificationResult, CommitVerifier};
