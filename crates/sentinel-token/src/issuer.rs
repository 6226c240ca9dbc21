//! Token issuance.

use crate::codec::{b64_encode, sign};
use crate::types::{IssuedToken, TokenPayload};
use sentinel_core::hashing::{canonical_json, sha256_hex};
use sentinel_policy::Decision;
use uuid::Uuid;

/// Issues signed execution tokens for ALLOW decisions.
///
/// Holds the HMAC secret and the default time-to-live; both are configured
/// by the integrator (see `sentinel-config`), never hardcoded here beyond a
/// documented development fallback.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Vec<u8>,
    ttl_ms: i64,
}

impl TokenIssuer {
    /// Build an issuer with the given HMAC secret and token lifetime.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>, ttl_ms: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl_ms,
        }
    }

    /// Issue a token authorizing one call to `tool_name` with the given
    /// argument hash, at the given policy decision and risk score.
    ///
    /// `now_ms` is the caller's current time, so issuance is deterministic
    /// and testable without a wall clock.
    #[must_use]
    pub fn issue(
        &self,
        trace_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_args_hash: impl Into<String>,
        decision: Decision,
        composite_risk_score: f64,
        now_ms: i64,
    ) -> IssuedToken {
        let payload = TokenPayload {
            token_id: Uuid::new_v4().to_string(),
            trace_id: trace_id.into(),
            tool_name: tool_name.into(),
            tool_args_hash: tool_args_hash.into(),
            decision,
            composite_risk_score,
            issued_at_ms: now_ms,
            expires_at_ms: now_ms + self.ttl_ms,
            nonce: Uuid::new_v4().to_string(),
        };
        self.encode(payload)
    }

    fn encode(&self, payload: TokenPayload) -> IssuedToken {
        let payload_json =
            canonical_json(&payload).expect("TokenPayload always serializes to JSON");
        let payload_b64 = b64_encode(payload_json.as_bytes());
        let signature = sign(&self.secret, payload_b64.as_bytes());
        let signature_b64 = b64_encode(&signature);
        let token = format!("{payload_b64}.{signature_b64}");
        let token_hash = sha256_hex(&token);
        IssuedToken {
            token,
            token_hash,
            payload,
        }
    }
}
