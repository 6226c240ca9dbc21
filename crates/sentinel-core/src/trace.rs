//! Trace context: the per-call record threaded through interception, and
//! the span bookkeeping that produces it.

use crate::risk::RiskVector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Estimates token counts and USD cost for a model call.
///
/// Pricing and tokenization precision are out of scope for this workspace;
/// integrators supply a real implementation. [`NullCostEstimator`] is the
/// zero-cost default so [`TraceContext`]'s cost fields always have a value.
pub trait CostEstimator: Send + Sync {
    /// Estimate `(prompt_tokens, completion_tokens, cost_usd)` for a call.
    fn estimate(&self, prompt: &str, completion: &str) -> (u32, u32, f64);
}

/// A [`CostEstimator`] that always reports zero tokens and zero cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCostEstimator;

impl CostEstimator for NullCostEstimator {
    fn estimate(&self, _prompt: &str, _completion: &str) -> (u32, u32, f64) {
        (0, 0, 0.0)
    }
}

/// The per-call record threaded through interception, finalized and handed
/// to an `Exporter` when the span ends.
///
/// Field set intentionally mirrors the reference implementation's trace
/// context exactly, including the ambient cost/confidence fields that are
/// populated best-effort (see [`CostEstimator`] and the confidence gate in
/// `sentinel-runtime`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceContext {
    /// Logical service name emitting this trace (e.g. `"mcp-sentinel"`).
    pub service: String,
    /// Model identifier, when this trace covers a model call.
    pub model: Option<String>,
    /// Tool name, when this trace covers a tool call.
    pub tool_name: Option<String>,
    /// Unique id for the whole request (shared by a tool call and any
    /// shadow-lane children it spawns).
    pub trace_id: String,
    /// Unique id for this span specifically.
    pub span_id: String,
    /// The span this one was spawned from, if any.
    pub parent_span_id: Option<String>,
    /// Epoch milliseconds when the span started.
    pub start_time_ms: i64,
    /// Epoch milliseconds when the span ended, `None` while in flight.
    pub end_time_ms: Option<i64>,
    /// Tokens consumed by the prompt, if estimated.
    pub prompt_tokens: Option<u32>,
    /// Tokens consumed by the completion, if estimated.
    pub completion_tokens: Option<u32>,
    /// Estimated USD cost of the call, if estimated.
    pub cost_usd: Option<f64>,
    /// Number of retries performed before this span completed.
    pub retries: u32,
    /// Whether the fallback router was invoked for this call.
    pub fallback_used: bool,
    /// Model-reported confidence, if supplied.
    pub confidence: Option<f64>,
    /// Whether `confidence` fell below the configured gate threshold.
    pub gate_blocked: Option<bool>,
    /// The computed risk vector for this call, once available.
    pub risk_vector: Option<RiskVector>,
    /// Whether this is a shadow-lane span.
    pub is_shadow: bool,
    /// The parent trace id, when this is a shadow-lane span.
    pub shadow_parent_trace_id: Option<String>,
    /// The policy engine's decision (`"ALLOW"`/`"REVIEW"`/`"BLOCK"`), once
    /// evaluated. Written by the policy component only.
    pub policy_decision: Option<String>,
    /// Identifier of the policy document that produced `policy_decision`.
    pub policy_id: Option<String>,
    /// Version of the policy document that produced `policy_decision`.
    pub policy_version: Option<String>,
    /// The issued execution token's id, when one was issued. Written by
    /// the token component only.
    pub exec_token_id: Option<String>,
    /// The issued execution token's hash.
    pub exec_token_hash: Option<String>,
    /// The issued execution token's time-to-live in milliseconds.
    pub exec_token_ttl_ms: Option<i64>,
    /// Whether the token presented for this call verified successfully.
    /// `None` when no verification was attempted on this span (e.g. at
    /// issuance time, before the caller presents the token back).
    pub exec_token_verified: Option<bool>,
    /// Hash of the prompt after grouping normalization (UUIDs, timestamps,
    /// and bare numbers collapsed to placeholders), distinct from
    /// `prompt_hash`'s verbatim-modulo-whitespace hash. Used to cluster
    /// calls that differ only in per-call identifiers or values.
    pub normalized_prompt_hash: Option<String>,
}

impl TraceContext {
    /// Start a new top-level span for `service`, generating fresh trace and
    /// span ids.
    #[must_use]
    pub fn start_span(service: impl Into<String>, now_ms: i64) -> Self {
        let trace_id = Uuid::new_v4().to_string();
        let span_id = Uuid::new_v4().to_string();
        Self {
            service: service.into(),
            model: None,
            tool_name: None,
            trace_id,
            span_id,
            parent_span_id: None,
            start_time_ms: now_ms,
            end_time_ms: None,
            prompt_tokens: None,
            completion_tokens: None,
            cost_usd: None,
            retries: 0,
            fallback_used: false,
            confidence: None,
            gate_blocked: None,
            risk_vector: None,
            is_shadow: false,
            shadow_parent_trace_id: None,
            policy_decision: None,
            policy_id: None,
            policy_version: None,
            exec_token_id: None,
            exec_token_hash: None,
            exec_token_ttl_ms: None,
            exec_token_verified: None,
            normalized_prompt_hash: None,
        }
    }

    /// Start a child span sharing `self`'s trace id.
    #[must_use]
    pub fn child_span(&self, now_ms: i64) -> Self {
        let mut child = Self::start_span(self.service.clone(), now_ms);
        child.trace_id = self.trace_id.clone();
        child.parent_span_id = Some(self.span_id.clone());
        child
    }

    /// Start a shadow-lane child span: new trace id, but linked back to the
    /// parent via [`Self::shadow_parent_trace_id`].
    #[must_use]
    pub fn shadow_span(&self, now_ms: i64) -> Self {
        let mut shadow = Self::start_span(self.service.clone(), now_ms);
        shadow.is_shadow = true;
        shadow.shadow_parent_trace_id = Some(self.trace_id.clone());
        shadow.tool_name = self.tool_name.clone();
        shadow.model = self.model.clone();
        shadow
    }

    /// Mark the span as finished at `now_ms`. Idempotent: a second call
    /// does not move an already-set `end_time_ms`.
    pub fn finish(&mut self, now_ms: i64) {
        if self.end_time_ms.is_none() {
            self.end_time_ms = Some(now_ms);
        }
    }

    /// Whether [`Self::finish`] has been called.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.end_time_ms.is_some()
    }

    /// Populate the confidence gate fields.
    pub fn apply_confidence_gate(&mut self, confidence: f64, threshold: f64) {
        self.confidence = Some(confidence);
        self.gate_blocked = Some(confidence < threshold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_span_has_fresh_distinct_ids() {
        let a = TraceContext::start_span("svc", 1000);
        let b = TraceContext::start_span("svc", 1000);
        assert_ne!(a.trace_id, b.trace_id);
        assert_ne!(a.span_id, b.span_id);
        assert!(a.parent_span_id.is_none());
        assert!(!a.is_finished());
    }

    #[test]
    fn child_span_shares_trace_id() {
        let parent = TraceContext::start_span("svc", 1000);
        let child = parent.child_span(1001);
        assert_eq!(child.trace_id, parent.trace_id);
        assert_eq!(child.parent_span_id, Some(parent.span_id.clone()));
        assert_ne!(child.span_id, parent.span_id);
    }

    #[test]
    fn shadow_span_has_own_trace_id_linked_to_parent() {
        let mut parent = TraceContext::start_span("svc", 1000);
        parent.tool_name = Some("transfer_funds".to_string());
        let shadow = parent.shadow_span(1001);
        assert_ne!(shadow.trace_id, parent.trace_id);
        assert!(shadow.is_shadow);
        assert_eq!(shadow.shadow_parent_trace_id, Some(parent.trace_id.clone()));
        assert_eq!(shadow.tool_name, parent.tool_name);
    }

    #[test]
    fn finish_is_idempotent() {
        let mut ctx = TraceContext::start_span("svc", 1000);
        ctx.finish(1100);
        ctx.finish(9999);
        assert_eq!(ctx.end_time_ms, Some(1100));
        assert!(ctx.is_finished());
    }

    #[test]
    fn confidence_gate_blocks_below_threshold() {
        let mut ctx = TraceContext::start_span("svc", 1000);
        ctx.apply_confidence_gate(0.4, 0.5);
        assert_eq!(ctx.gate_blocked, Some(true));

        ctx.apply_confidence_gate(0.6, 0.5);
        assert_eq!(ctx.gate_blocked, Some(false));
    }

    #[test]
    fn null_cost_estimator_is_zero() {
        let est = NullCostEstimator;
        assert_eq!(est.estimate("prompt", "completion"), (0, 0, 0.0));
    }

    #[test]
    fn policy_and_token_fields_start_unset() {
        let ctx = TraceContext::start_span("svc", 1000);
        assert!(ctx.policy_decision.is_none());
        assert!(ctx.policy_id.is_none());
        assert!(ctx.policy_version.is_none());
        assert!(ctx.exec_token_id.is_none());
        assert!(ctx.exec_token_hash.is_none());
        assert!(ctx.exec_token_ttl_ms.is_none());
        assert!(ctx.exec_token_verified.is_none());
        assert!(ctx.normalized_prompt_hash.is_none());
    }
}
