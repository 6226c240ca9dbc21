//! The interceptor: the single orchestration point a server wires a tool
//! call through. Computes the risk vector, asks the policy engine for a
//! decision, issues or verifies execution tokens, routes non-ALLOW calls
//! through the fallback router, schedules the shadow lane for high-risk
//! ALLOWs, and exports the finished trace.

use crate::fallback::{FallbackResponse, FallbackRouter};
use crate::shadow::schedule_shadow_lane;
use sentinel_core::hashing::{args_hash, prompt_hash, sha256_hex};
use sentinel_core::normalize_prompt_for_grouping;
use sentinel_core::risk::{RiskLevel, RiskVector};
use sentinel_core::signals::{
    drift_risk, grounding_risk, numeric_instability_risk, self_consistency_risk, tool_mismatch_risk, verifier_risk,
};
use sentinel_core::trace::{CostEstimator, NullCostEstimator, TraceContext};
use sentinel_policy::{Decision, PolicyEngine, PolicyResult, ToolRegistry};
use sentinel_telemetry::{ExportRow, Exporter};
use sentinel_token::{IssuedToken, TokenIssuer, TokenVerifier, VerificationResult};
use serde_json::Value;
use std::sync::Arc;

/// One observed tool call: its arguments, the prompt that produced it, the
/// candidate response to score, and whatever grounding/consistency/numeric
/// signals are available for that scoring.
#[derive(Debug, Clone)]
pub struct ToolCallObservation {
    /// The tool being called.
    pub tool_name: String,
    /// The call's arguments.
    pub tool_args: Value,
    /// The prompt that produced the response.
    pub prompt: String,
    /// The candidate response text to score.
    pub response: String,
    /// Retrieved context the response is expected to stay grounded in, if
    /// any was fetched for this call.
    pub retrieved_context: Option<String>,
    /// A summary of the underlying tool call's own result, if one was
    /// captured, used to detect the response claiming success over a
    /// reported failure.
    pub tool_result_summary: Option<String>,
    /// A second, independently generated candidate response to the same
    /// prompt, when self-consistency checking runs inline.
    pub secondary_response: Option<String>,
    /// Numeric values extracted from the response (e.g. a transfer amount),
    /// for instability scoring.
    pub numeric_samples: Vec<f64>,
    /// The same numeric values from a trusted prior call, if one exists.
    pub baseline_numeric: Option<Vec<f64>>,
    /// Hash of the previous prompt recorded for this tool, if one has been
    /// recorded, for drift scoring.
    pub previous_prompt_hash: Option<String>,
    /// An independently generated second response for the shadow lane to
    /// compare against, when shadow scheduling is enabled.
    pub shadow_response: Option<String>,
    /// An independently generated second set of numeric samples for the
    /// shadow lane to compare against.
    pub shadow_numeric_samples: Option<Vec<f64>>,
}

/// One observed model call that does not necessarily execute a tool: a
/// v1-compatible path alongside [`ToolCallObservation`] for recording
/// prompt/completion cost, confidence-gate blocking, and the same
/// hallucination/risk fields a tool call gets.
#[derive(Debug, Clone)]
pub struct ModelCallObservation {
    /// The model identifier this call went to.
    pub model: String,
    /// The tool this call is associated with, if any.
    pub tool_name: Option<String>,
    /// The prompt sent to the model.
    pub prompt: String,
    /// The model's response text.
    pub response: String,
    /// Retrieved context the response is expected to stay grounded in.
    pub retrieved_context: Option<String>,
    /// A second, independently generated candidate response, when
    /// self-consistency checking runs inline.
    pub secondary_response: Option<String>,
    /// A summary of an associated tool call's result, if any.
    pub tool_result_summary: Option<String>,
    /// Model-reported confidence in its own response, if supplied.
    pub confidence: Option<f64>,
    /// Number of retries performed before this call completed.
    pub retries: u32,
    /// Whether the fallback router was already invoked for this call.
    pub fallback_used: bool,
}

/// The outcome of running a [`ToolCallObservation`] through the
/// interceptor: the finished trace, the policy verdict, and — depending on
/// the verdict — an issued execution token or a fallback response.
#[derive(Debug, Clone)]
pub struct InterceptedCall {
    /// The finished trace for this call.
    pub trace: TraceContext,
    /// The policy engine's verdict.
    pub policy_result: PolicyResult,
    /// Present when the decision was ALLOW and the tool profile requires a
    /// token.
    pub issued_token: Option<IssuedToken>,
    /// Present when the decision was REVIEW or BLOCK.
    pub fallback: Option<FallbackResponse>,
}

/// Where self-consistency checking runs.
///
/// Mirrors `sentinel_config::SelfConsistencyMode` field-for-field; kept as
/// a local copy rather than a dependency on `sentinel-config` so this crate
/// (like the reference runtime it's modeled on) never depends on the
/// config crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfConsistencyMode {
    /// Computed on the primary path, before the response is returned.
    Inline,
    /// Deferred to the shadow lane; the primary path is not delayed.
    Shadow,
    /// Not computed at all.
    Off,
}

impl Default for SelfConsistencyMode {
    fn default() -> Self {
        SelfConsistencyMode::Inline
    }
}

/// Configuration knobs the interceptor reads at construction time instead
/// of per-call, so call sites never need to pass them through explicitly.
#[derive(Debug, Clone, Copy)]
pub struct InterceptorSettings {
    /// Schedule a shadow-lane re-check for ALLOWed calls whose risk level
    /// is [`RiskLevel::High`].
    pub shadow_for_high_risk: bool,
    /// Enable `grounding_risk`.
    pub grounding_enabled: bool,
    /// Enable `self_consistency_risk`.
    pub self_consistency_enabled: bool,
    /// Where self-consistency checking runs.
    pub self_consistency_mode: SelfConsistencyMode,
    /// Enable `numeric_instability_risk`.
    pub numeric_enabled: bool,
    /// Enable `tool_mismatch_risk`.
    pub tool_mismatch_enabled: bool,
    /// Enable `drift_risk`.
    pub drift_enabled: bool,
    /// Enable `verifier_risk`.
    pub verifier_enabled: bool,
    /// Confidence below which [`Interceptor::intercept_model_call`] marks
    /// the span `gate_blocked`. `None` disables the gate (the span still
    /// records `confidence` when supplied, just never blocks on it).
    pub confidence_gate_threshold: Option<f64>,
}

impl Default for InterceptorSettings {
    fn default() -> Self {
        Self {
            shadow_for_high_risk: true,
            grounding_enabled: true,
            self_consistency_enabled: true,
            self_consistency_mode: SelfConsistencyMode::Inline,
            numeric_enabled: true,
            tool_mismatch_enabled: true,
            drift_enabled: true,
            verifier_enabled: true,
            confidence_gate_threshold: None,
        }
    }
}

/// Wires the tool registry, policy engine, token issuer/verifier, and
/// fallback router into a single per-call entry point.
pub struct Interceptor {
    service: String,
    registry: ToolRegistry,
    policy: PolicyEngine,
    token_issuer: TokenIssuer,
    token_verifier: TokenVerifier,
    fallback: FallbackRouter,
    exporter: Arc<dyn Exporter>,
    settings: InterceptorSettings,
    cost_estimator: Arc<dyn CostEstimator>,
}

impl Interceptor {
    /// Build an interceptor from its component parts, with
    /// [`NullCostEstimator`] backing [`Self::intercept_model_call`]'s
    /// token/cost estimates. Use [`Self::with_cost_estimator`] to supply a
    /// real one.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        registry: ToolRegistry,
        policy: PolicyEngine,
        token_issuer: TokenIssuer,
        token_verifier: TokenVerifier,
        fallback: FallbackRouter,
        exporter: Arc<dyn Exporter>,
        settings: InterceptorSettings,
    ) -> Self {
        Self {
            service: service.into(),
            registry,
            policy,
            token_issuer,
            token_verifier,
            fallback,
            exporter,
            settings,
            cost_estimator: Arc::new(NullCostEstimator),
        }
    }

    /// Override the default [`NullCostEstimator`].
    #[must_use]
    pub fn with_cost_estimator(mut self, cost_estimator: Arc<dyn CostEstimator>) -> Self {
        self.cost_estimator = cost_estimator;
        self
    }

    fn score(&self, observation: &ToolCallObservation) -> RiskVector {
        let settings = &self.settings;

        let grounding = settings.grounding_enabled
            .then(|| observation.retrieved_context.as_deref())
            .flatten()
            .map(|context| grounding_risk(&observation.response, context));

        let self_consistency = (settings.self_consistency_enabled
            && settings.self_consistency_mode == SelfConsistencyMode::Inline)
            .then(|| observation.secondary_response.as_deref())
            .flatten()
            .map(|secondary| self_consistency_risk(&observation.response, secondary));

        let verifier = settings
            .verifier_enabled
            .then(|| verifier_risk(&observation.response, grounding.unwrap_or(0.0)));

        let numeric_instability = settings.numeric_enabled.then(|| {
            numeric_instability_risk(&observation.numeric_samples, observation.baseline_numeric.as_deref())
        });

        let tool_mismatch = settings
            .tool_mismatch_enabled
            .then(|| tool_mismatch_risk(&observation.response, observation.tool_result_summary.as_deref()));

        let drift = settings.drift_enabled.then(|| {
            let current_hash = prompt_hash(&observation.prompt);
            drift_risk(observation.previous_prompt_hash.as_deref(), &current_hash)
        });

        RiskVector {
            grounding_risk: grounding,
            self_consistency_risk: self_consistency,
            verifier_risk: verifier,
            numeric_instability_risk: numeric_instability,
            tool_mismatch_risk: tool_mismatch,
            drift_risk: drift,
        }
    }

    /// Run one observed tool call through scoring, policy evaluation,
    /// token issuance/fallback routing, and export.
    ///
    /// `trace.exec_token_verified` is left `None` here: issuance and
    /// verification are separate calls (the token is handed to the caller,
    /// then presented back on the follow-up tool execution), and a
    /// verification attempt here would consume the single-use nonce before
    /// the real verification ever happens. See [`Self::verify_token`].
    ///
    /// Returns immediately after scheduling (not awaiting) a shadow-lane
    /// re-check, so shadow-lane latency never adds to the caller's response
    /// time.
    pub async fn intercept_tool_call(
        &self,
        observation: ToolCallObservation,
        now_ms: i64,
    ) -> InterceptedCall {
        let mut trace = TraceContext::start_span(self.service.clone(), now_ms);
        trace.tool_name = Some(observation.tool_name.clone());

        let risk_vector = self.score(&observation);
        let composite = risk_vector.composite_risk_score();
        trace.risk_vector = Some(risk_vector);

        let profile = self.registry.get(&observation.tool_name);
        let policy_result = self.policy.evaluate(profile.criticality, composite);
        trace.policy_decision = Some(format!("{:?}", policy_result.decision).to_uppercase());
        trace.policy_id = Some(policy_result.policy_id.clone());
        trace.policy_version = Some(policy_result.policy_version.clone());

        let mut issued_token = None;
        let mut fallback_response = None;

        match policy_result.decision {
            Decision::Allow => {
                if policy_result.require_token {
                    let tool_args_hash = args_hash(&observation.tool_args);
                    let token = self.token_issuer.issue(
                        trace.trace_id.clone(),
                        observation.tool_name.clone(),
                        tool_args_hash,
                        Decision::Allow,
                        composite,
                        now_ms,
                    );
                    trace.exec_token_id = Some(token.payload.token_id.clone());
                    trace.exec_token_hash = Some(token.token_hash.clone());
                    trace.exec_token_ttl_ms = Some(token.payload.expires_at_ms - token.payload.issued_at_ms);
                    issued_token = Some(token);
                }

                if self.settings.shadow_for_high_risk
                    && matches!(RiskLevel::from_score(composite), RiskLevel::High)
                {
                    // fire-and-forget; the shadow lane's own export records
                    // disagreement independently of this call's trace.
                    let shadow_parent = trace.clone();
                    schedule_shadow_lane(
                        shadow_parent,
                        observation.response.clone(),
                        observation.shadow_response.clone().unwrap_or_default(),
                        observation.numeric_samples.clone(),
                        observation.shadow_numeric_samples.clone().unwrap_or_default(),
                        Arc::clone(&self.exporter),
                        now_ms,
                    );
                }
            }
            Decision::Review | Decision::Block => {
                trace.fallback_used = true;
                fallback_response = Some(
                    self.fallback
                        .route(
                            &observation.tool_name,
                            &observation.tool_args,
                            policy_result.decision,
                            &policy_result.reason,
                        )
                        .await,
                );
            }
        }

        trace.finish(now_ms);
        if let Err(err) = self.exporter.export(ExportRow::from(&trace)).await {
            tracing::warn!(trace_id = %trace.trace_id, error = %err, "trace export failed");
        }

        InterceptedCall {
            trace,
            policy_result,
            issued_token,
            fallback: fallback_response,
        }
    }

    /// Verify a previously issued execution token against the call it's
    /// being presented for.
    #[must_use]
    pub fn verify_token(
        &self,
        token: &str,
        tool_name: &str,
        tool_args: &Value,
        now_ms: i64,
    ) -> VerificationResult {
        let tool_args_hash = args_hash(tool_args);
        self.token_verifier
            .verify(token, tool_name, &tool_args_hash, now_ms)
    }

    /// v1-compatible path: record telemetry for a model call that does not
    /// necessarily execute a tool. Computes token/cost estimates, applies
    /// the confidence gate, and populates the same hallucination/risk
    /// fields [`Self::intercept_tool_call`] does, without consulting the
    /// policy engine or issuing a token.
    pub async fn intercept_model_call(
        &self,
        observation: ModelCallObservation,
        now_ms: i64,
    ) -> TraceContext {
        let mut trace = TraceContext::start_span(self.service.clone(), now_ms);
        trace.model = Some(observation.model.clone());
        trace.tool_name = observation.tool_name.clone();
        trace.retries = observation.retries;
        trace.fallback_used = observation.fallback_used;

        let (prompt_tokens, completion_tokens, cost_usd) = self
            .cost_estimator
            .estimate(&observation.prompt, &observation.response);
        trace.prompt_tokens = Some(prompt_tokens);
        trace.completion_tokens = Some(completion_tokens);
        trace.cost_usd = Some(cost_usd);

        if let Some(confidence) = observation.confidence {
            match self.settings.confidence_gate_threshold {
                Some(threshold) => trace.apply_confidence_gate(confidence, threshold),
                None => trace.confidence = Some(confidence),
            }
        }

        trace.normalized_prompt_hash =
            Some(sha256_hex(&normalize_prompt_for_grouping(&observation.prompt)));

        let scoring_observation = ToolCallObservation {
            tool_name: observation.tool_name.clone().unwrap_or_default(),
            tool_args: Value::Null,
            prompt: observation.prompt,
            response: observation.response,
            retrieved_context: observation.retrieved_context,
            tool_result_summary: observation.tool_result_summary,
            secondary_response: observation.secondary_response,
            numeric_samples: Vec::new(),
            baseline_numeric: None,
            previous_prompt_hash: None,
            shadow_response: None,
            shadow_numeric_samples: None,
        };
        trace.risk_vector = Some(self.score(&scoring_observation));

        trace.finish(now_ms);
        if let Err(err) = self.exporter.export(ExportRow::from(&trace)).await {
            tracing::warn!(trace_id = %trace.trace_id, error = %err, "trace export failed");
        }

        trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_policy::{Criticality, PolicyConfig, ToolProfile};
    use sentinel_telemetry::NoopExporter;
    use serde_json::json;

    fn interceptor(settings: InterceptorSettings) -> Interceptor {
        let registry = ToolRegistry::new().with_tool(ToolProfile::new("transfer_funds", Criticality::High));
        Interceptor::new(
            "mcp-sentinel",
            registry,
            PolicyEngine::new(PolicyConfig::default()),
            TokenIssuer::new(b"token-secret".to_vec(), 30_000),
            TokenVerifier::new(b"token-secret".to_vec()),
            FallbackRouter::new(),
            Arc::new(NoopExporter),
            settings,
        )
    }

    fn low_risk_observation() -> ToolCallObservation {
        ToolCallObservation {
            tool_name: "transfer_funds".to_string(),
            tool_args: json!({"amount": 100, "to": "acct_1"}),
            prompt: "transfer 100 dollars to acct_1".to_string(),
            response: "transfer completed successfully to acct_1 for 100 dollars".to_string(),
            retrieved_context: Some("transfer 100 dollars to acct_1".to_string()),
            tool_result_summary: Some("tool call processed".to_string()),
            secondary_response: Some("transfer completed successfully to acct_1 for 100 dollars".to_string()),
            numeric_samples: vec![100.0],
            baseline_numeric: Some(vec![100.0]),
            previous_prompt_hash: Some(prompt_hash("transfer 100 dollars to acct_1")),
            shadow_response: Some("transfer completed successfully to acct_1 for 100 dollars".to_string()),
            shadow_numeric_samples: Some(vec![100.0]),
        }
    }

    fn high_risk_observation() -> ToolCallObservation {
        ToolCallObservation {
            tool_name: "transfer_funds".to_string(),
            tool_args: json!({"amount": 99999, "to": "acct_unknown"}),
            prompt: "transfer 99999 dollars to acct_unknown".to_string(),
            response: "the transfer completed successfully".to_string(),
            retrieved_context: Some("transfer 100 dollars to acct_1".to_string()),
            tool_result_summary: Some("tool call declined: timeout".to_string()),
            secondary_response: Some("unable to confirm whether the transfer went through".to_string()),
            numeric_samples: vec![99999.0],
            baseline_numeric: Some(vec![100.0]),
            previous_prompt_hash: Some(prompt_hash("transfer 100 dollars to acct_1")),
            shadow_response: Some("unable to confirm whether the transfer went through".to_string()),
            shadow_numeric_samples: Some(vec![100.0]),
        }
    }

    #[tokio::test]
    async fn low_risk_allowed_call_issues_token() {
        let interceptor = interceptor(InterceptorSettings { shadow_for_high_risk: false, ..InterceptorSettings::default() });
        let result = interceptor.intercept_tool_call(low_risk_observation(), 1_000).await;
        assert_eq!(result.policy_result.decision, Decision::Allow);
        assert!(result.issued_token.is_some());
        assert!(result.fallback.is_none());
        assert!(result.trace.is_finished());
    }

    #[tokio::test]
    async fn high_risk_call_is_blocked_and_routed_through_fallback() {
        let interceptor = interceptor(InterceptorSettings { shadow_for_high_risk: false, ..InterceptorSettings::default() });
        let result = interceptor.intercept_tool_call(high_risk_observation(), 1_000).await;
        assert_eq!(result.policy_result.decision, Decision::Block);
        assert!(result.issued_token.is_none());
        assert!(result.fallback.is_some());
        assert!(result.trace.fallback_used);
    }

    #[tokio::test]
    async fn issued_token_verifies_against_same_call() {
        let interceptor = interceptor(InterceptorSettings { shadow_for_high_risk: false, ..InterceptorSettings::default() });
        let observation = low_risk_observation();
        let tool_args = observation.tool_args.clone();
        let result = interceptor.intercept_tool_call(observation, 1_000).await;
        let token = result.issued_token.unwrap();
        let verification = interceptor.verify_token(&token.token, "transfer_funds", &tool_args, 1_500);
        assert!(verification.ok);
    }

    #[tokio::test]
    async fn unregistered_low_criticality_tool_always_allows() {
        let interceptor = interceptor(InterceptorSettings { shadow_for_high_risk: false, ..InterceptorSettings::default() });
        let mut observation = low_risk_observation();
        observation.tool_name = "read_file".to_string();
        let result = interceptor.intercept_tool_call(observation, 1_000).await;
        assert_eq!(result.policy_result.decision, Decision::Allow);
        assert!(result.issued_token.is_none());
    }

    #[tokio::test]
    async fn model_call_populates_cost_and_risk_without_policy_evaluation() {
        let interceptor = interceptor(InterceptorSettings::default());
        let trace = interceptor
            .intercept_model_call(
                ModelCallObservation {
                    model: "gpt-stub".to_string(),
                    tool_name: None,
                    prompt: "summarize the quarterly report".to_string(),
                    response: "the quarterly report shows steady growth".to_string(),
                    retrieved_context: Some("the quarterly report shows steady growth".to_string()),
                    secondary_response: Some("the quarterly report shows steady growth".to_string()),
                    tool_result_summary: None,
                    confidence: Some(0.9),
                    retries: 0,
                    fallback_used: false,
                },
                1_000,
            )
            .await;

        assert_eq!(trace.model.as_deref(), Some("gpt-stub"));
        assert!(trace.is_finished());
        assert!(trace.normalized_prompt_hash.is_some());
        assert_eq!(trace.confidence, Some(0.9));
        assert!(trace.gate_blocked.is_none());
        assert!(trace.risk_vector.is_some());
        assert!(trace.policy_decision.is_none());
    }

    #[tokio::test]
    async fn model_call_applies_confidence_gate_when_configured() {
        let interceptor = interceptor(InterceptorSettings {
            confidence_gate_threshold: Some(0.5),
            ..InterceptorSettings::default()
        });
        let trace = interceptor
            .intercept_model_call(
                ModelCallObservation {
                    model: "gpt-stub".to_string(),
                    tool_name: None,
                    prompt: "summarize the quarterly report".to_string(),
                    response: "not sure, maybe growth".to_string(),
                    retrieved_context: None,
                    secondary_response: None,
                    tool_result_summary: None,
                    confidence: Some(0.2),
                    retries: 0,
                    fallback_used: false,
                },
                1_000,
            )
            .await;

        assert_eq!(trace.gate_blocked, Some(true));
    }
}
