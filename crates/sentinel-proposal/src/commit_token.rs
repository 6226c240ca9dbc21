//! Commit tokens: a second, proposal-scoped token family, signed with its
//! own secret, distinct from `sentinel-token`'s execution tokens.

use sentinel_core::hashing::{canonical_json, sha256_hex};
use sentinel_token::codec::{b64_decode, b64_encode, sign, signatures_equal};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The signed claims carried inside a commit token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitTokenPayload {
    /// Unique id for this commit token.
    pub token_id: String,
    /// The proposal this token authorizes committing.
    pub proposal_id: String,
    /// The tool the underlying proposal targets.
    pub tool_name: String,
    /// Hash of the tool call arguments the underlying proposal targets.
    pub tool_args_hash: String,
    /// Epoch milliseconds when the token was issued.
    pub issued_at_ms: i64,
    /// Epoch milliseconds when the token expires.
    pub expires_at_ms: i64,
    /// Single-use nonce.
    pub nonce: String,
    /// The proposal's composite instability score at issuance time.
    pub composite_score: f64,
}

/// A signed, encoded commit token.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedCommitToken {
    /// The encoded token string.
    pub token: String,
    /// The claims that were signed.
    pub payload: CommitTokenPayload,
}

/// Issues and decodes commit tokens.
///
/// Deliberately reuses `sentinel-token`'s base64url/HMAC primitives rather
/// than re-implementing them, but keeps its own secret and payload shape —
/// execution tokens and commit tokens are signed with different secrets in
/// the reference implementation, so a leaked execution-token secret cannot
/// be used to forge commit approvals.
#[derive(Clone)]
pub struct CommitTokenManager {
    secret: Vec<u8>,
    ttl_ms: i64,
}

/// Default commit token lifetime: 60 seconds.
pub const DEFAULT_TTL_MS: i64 = 60_000;

impl CommitTokenManager {
    /// Build a manager with the given secret and token lifetime.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, ttl_ms: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_ms,
        }
    }

    /// Issue a commit token for `proposal_id`.
    #[must_use]
    pub fn issue(
        &self,
        proposal_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_args_hash: impl Into<String>,
        composite_score: f64,
        now_ms: i64,
    ) -> IssuedCommitToken {
        let payload = CommitTokenPayload {
            token_id: Uuid::new_v4().to_string(),
            proposal_id: proposal_id.into(),
            tool_name: tool_name.into(),
            tool_args_hash: tool_args_hash.into(),
            issued_at_ms: now_ms,
            expires_at_ms: now_ms + self.ttl_ms,
            nonce: Uuid::new_v4().to_string(),
            composite_score,
        };
        let payload_json =
            canonical_json(&payload).expect("CommitTokenPayload always serializes to JSON");
        let payload_b64 = b64_encode(payload_json.as_bytes());
        let signature_b64 = b64_encode(&sign(&self.secret, payload_b64.as_bytes()));
        IssuedCommitToken {
            token: format!("{payload_b64}.{signature_b64}"),
            payload,
        }
    }

    /// Decode and signature-check `token`, without checking expiry,
    /// binding, or replay — those are the commit verifier's job since they
    /// need the proposal store.
    ///
    /// Returns `None` if the token is malformed or its signature does not
    /// match.
    #[must_use]
    pub fn decode(&self, token: &str) -> Option<CommitTokenPayload> {
        let (payload_b64, signature_b64) = token.split_once('.')?;
        let signature = b64_decode(signature_b64).ok()?;
        let expected = sign(&self.secret, payload_b64.as_bytes());
        if !signatures_equal(&expected, &signature) {
            return None;
        }
        let payload_bytes = b64_decode(payload_b64).ok()?;
        serde_json::from_slice(&payload_bytes).ok()
    }
}

/// Opaque hash of a commit token, suitable as a store lookup key.
#[must_use]
pub fn commit_token_hash(token: &str) -> String {
    sha256_hex(token)
}
