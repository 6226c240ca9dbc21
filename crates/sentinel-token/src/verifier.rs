//! Token verification, including replay protection.

use crate::codec::{b64_decode, signatures_equal, sign};
use crate::types::{TokenPayload, VerificationReason, VerificationResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks nonces that have already been consumed, so a captured token
/// cannot be replayed.
///
/// Backed by a synchronous [`Mutex`] — this is pure in-memory bookkeeping,
/// never I/O, so there's no reason to hold an async lock across it (see
/// `sentinel-proposal::store` for the async-guarded counterpart that does
/// I/O).
pub struct ReplaySet {
    seen: Mutex<HashMap<String, i64>>,
}

impl Default for ReplaySet {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplaySet {
    /// An empty replay set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically check whether `nonce` has been seen, and if not, record
    /// it with `expires_at_ms` so it can later be garbage-collected.
    ///
    /// Returns `true` if this is the nonce's first use.
    pub fn check_and_insert(&self, nonce: &str, expires_at_ms: i64, now_ms: i64) -> bool {
        let mut seen = self.seen.lock().expect("replay set mutex poisoned");
        seen.retain(|_, expiry| *expiry > now_ms);
        if seen.contains_key(nonce) {
            return false;
        }
        seen.insert(nonce.to_string(), expires_at_ms);
        true
    }

    /// Number of nonces currently tracked (post garbage-collection is not
    /// forced by this call). Exposed for tests and diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().expect("replay set mutex poisoned").len()
    }

    /// Whether the set is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Verifies encoded tokens issued by a [`crate::issuer::TokenIssuer`] using
/// the same secret.
pub struct TokenVerifier {
    secret: Vec<u8>,
    replay_set: ReplaySet,
}

impl TokenVerifier {
    /// Build a verifier with the given HMAC secret and a fresh replay set.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            replay_set: ReplaySet::new(),
        }
    }

    /// Verify `token` authorizes a call to `tool_name` with argument hash
    /// `tool_args_hash`, at time `now_ms`.
    ///
    /// Checks run in this order, matching the reference verifier: decode
    /// the token's two halves, check the HMAC signature, parse the
    /// payload, check expiry, check tool name, check the argument hash,
    /// then consult the replay set. The first failing check short-circuits
    /// the rest.
    pub fn verify(
        &self,
        token: &str,
        tool_name: &str,
        tool_args_hash: &str,
        now_ms: i64,
    ) -> VerificationResult {
        let Some((payload_b64, signature_b64)) = token.split_once('.') else {
            return VerificationResult::failure(VerificationReason::Malformed);
        };

        let Ok(signature) = b64_decode(signature_b64) else {
            return VerificationResult::failure(VerificationReason::Malformed);
        };
        let expected = sign(&self.secret, payload_b64.as_bytes());
        if !signatures_equal(&expected, &signature) {
            return VerificationResult::failure(VerificationReason::BadSignature);
        }

        let Ok(payload_bytes) = b64_decode(payload_b64) else {
            return VerificationResult::failure(VerificationReason::Malformed);
        };
        let Ok(payload) = serde_json::from_slice::<TokenPayload>(&payload_bytes) else {
            return VerificationResult::failure(VerificationReason::InvalidPayload);
        };

        if now_ms >= payload.expires_at_ms {
            return VerificationResult::failure_with_payload(VerificationReason::Expired, payload);
        }

        if payload.tool_name != tool_name {
            return VerificationResult::failure_with_payload(
                VerificationReason::ToolNameMismatch,
                payload,
            );
        }

        if payload.tool_args_hash != tool_args_hash {
            return VerificationResult::failure_with_payload(
                VerificationReason::ArgsHashMismatch,
                payload,
            );
        }

        let first_use = self
            .replay_set
            .check_and_insert(&payload.nonce, payload.expires_at_ms, now_ms);
        if !first_use {
            return VerificationResult::failure_with_payload(
                VerificationReason::NonceReplay,
                payload,
            );
        }

        VerificationResult::success(payload)
    }
}
