//! Token payload and verification result types.

use sentinel_policy::Decision;
use serde::{Deserialize, Serialize};

/// The signed claims carried inside an execution token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Unique id for this token.
    pub token_id: String,
    /// The trace this token was issued for.
    pub trace_id: String,
    /// The tool this token authorizes a call to.
    pub tool_name: String,
    /// Hash of the tool call arguments this token authorizes.
    pub tool_args_hash: String,
    /// The policy decision that led to this token being issued.
    pub decision: Decision,
    /// The composite risk score at issuance time.
    pub composite_risk_score: f64,
    /// Epoch milliseconds when the token was issued.
    pub issued_at_ms: i64,
    /// Epoch milliseconds when the token expires.
    pub expires_at_ms: i64,
    /// Single-use nonce, checked against the replay set on verification.
    pub nonce: String,
}

/// A signed, encoded execution token and bookkeeping fields for it.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedToken {
    /// The encoded token string: `base64url(payload).base64url(signature)`.
    pub token: String,
    /// SHA-256 hex digest of `token`, useful as an opaque lookup key that
    /// does not reveal the claims.
    pub token_hash: String,
    /// The claims that were signed, for the issuer's own bookkeeping.
    pub payload: TokenPayload,
}

/// Why token verification failed.
///
/// Matches the reference verifier's reason codes, including the documented
/// ambiguity where a tool-name mismatch inside an otherwise well-formed
/// token is reported the same way as a hash mismatch would be; see the
/// crate-level documentation and `DESIGN.md` for the rationale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    /// Token verified successfully.
    Ok,
    /// The token string was not in `payload.signature` form, or either
    /// half was not valid base64url.
    Malformed,
    /// The payload was not valid JSON once decoded.
    InvalidPayload,
    /// The HMAC signature did not match.
    BadSignature,
    /// `now_ms >= payload.expires_at_ms`.
    Expired,
    /// The token's `tool_name` does not match the call being verified.
    ToolNameMismatch,
    /// The token's `tool_args_hash` does not match the call being
    /// verified.
    ArgsHashMismatch,
    /// The token's nonce has already been consumed.
    NonceReplay,
}

/// The result of verifying an encoded token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    /// Whether verification succeeded.
    pub ok: bool,
    /// Why it succeeded or failed.
    pub reason: VerificationReason,
    /// The decoded payload, present whenever the signature was at least
    /// checked successfully (even if a later check then failed).
    pub payload: Option<TokenPayload>,
}

impl VerificationResult {
    pub(crate) fn failure(reason: VerificationReason) -> Self {
        Self {
            ok: false,
            reason,
            payload: None,
        }
    }

    pub(crate) fn failure_with_payload(reason: VerificationReason, payload: TokenPayload) -> Self {
        Self {
            ok: false,
            reason,
            payload: Some(payload),
        }
    }

    pub(crate) fn success(payload: TokenPayload) -> Self {
        Self {
            ok: true,
            reason: VerificationReason::Ok,
            payload: Some(payload),
        }
    }
}
