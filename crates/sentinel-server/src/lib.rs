// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-RPC 2.0 request dispatch for the MCP Sentinel server.
//!
//! The binary (`src/main.rs`) reads newline-delimited JSON-RPC requests
//! from stdin and writes responses to stdout; this module holds the
//! dispatch logic so it can be driven directly in tests without any actual
//! I/O. Three methods are served: `tools/call` (score and route one
//! observed tool call), `tools/propose` (draft a two-candidate proposal),
//! and `tools/commit` (verify a commit token against a drafted proposal).

#![deny(unsafe_code)]
#![warn(missing_docs)]

use sentinel_core::hashing::args_hash;
use sentinel_policy::{Decision, PolicyEngine, ToolRegistry};
use sentinel_proposal::{CommitTokenManager, CommitVerifier, InMemoryProposalStore, ProposalOutput, ProposalStore, ToolProposer};
use sentinel_runtime::{FallbackRouter, Interceptor, InterceptorSettings, SelfConsistencyMode, ToolCallObservation};
use sentinel_telemetry::Exporter;
use sentinel_token::{TokenIssuer, TokenVerifier};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// A JSON-RPC 2.0 request, as read from one line of stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    /// Always `"2.0"`; not otherwise validated.
    #[serde(default)]
    pub jsonrpc: String,
    /// Echoed back on the response. Absent for notifications, which this
    /// server still answers — every method here has a meaningful result.
    #[serde(default)]
    pub id: Option<Value>,
    /// One of `tools/call`, `tools/propose`, `tools/commit`.
    pub method: String,
    /// Method-specific parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 response, written as one line of stdout.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    code: i64,
    message: String,
}

const INVALID_PARAMS: i64 = -32602;
const METHOD_NOT_FOUND: i64 = -32601;
const INTERNAL_ERROR: i64 = -32603;

impl RpcResponse {
    fn ok(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Option<Value>, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    tool_name: String,
    tool_args: Value,
    prompt: String,
    response: String,
    #[serde(default)]
    retrieved_context: Option<String>,
    #[serde(default)]
    tool_result_summary: Option<String>,
    #[serde(default)]
    secondary_response: Option<String>,
    #[serde(default)]
    numeric_samples: Vec<f64>,
    #[serde(default)]
    baseline_numeric: Option<Vec<f64>>,
    #[serde(default)]
    previous_prompt_hash: Option<String>,
    #[serde(default)]
    shadow_response: Option<String>,
    #[serde(default)]
    shadow_numeric_samples: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct ProposeParams {
    tool_name: String,
    tool_args: Value,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct CommitParams {
    proposal_id: String,
    token: String,
    tool_name: String,
    tool_args: Value,
}

/// Everything the server needs to answer a request, built once at startup
/// from [`sentinel_config::SentinelConfig`].
pub struct SentinelServer {
    interceptor: Interceptor,
    proposer: ToolProposer,
    commit_verifier: CommitVerifier,
}

impl SentinelServer {
    /// Assemble a server from its fully constructed dependencies.
    ///
    /// Kept as plain field assignment rather than reading
    /// [`sentinel_config::SentinelConfig`] directly, so tests can wire up
    /// fakes (an in-memory store, a no-op exporter) without a config file.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        registry: ToolRegistry,
        policy: PolicyEngine,
        token_issuer: TokenIssuer,
        token_verifier: TokenVerifier,
        fallback: FallbackRouter,
        exporter: Arc<dyn Exporter>,
        interceptor_settings: InterceptorSettings,
        proposal_store: Arc<dyn ProposalStore>,
        commit_manager: CommitTokenManager,
        block_threshold: f64,
    ) -> Self {
        let interceptor = Interceptor::new(
            service,
            registry,
            policy,
            token_issuer,
            token_verifier,
            fallback,
            exporter,
            interceptor_settings,
        );
        let proposer = ToolProposer::new(Arc::clone(&proposal_store), commit_manager.clone())
            .with_block_threshold(block_threshold);
        let commit_verifier = CommitVerifier::new(proposal_store, commit_manager);

        Self {
            interceptor,
            proposer,
            commit_verifier,
        }
    }

    /// Build a server with an in-memory proposal store and no-op telemetry,
    /// for local development and tests. Reads thresholds and secrets from
    /// `config`.
    #[must_use]
    pub fn from_config(config: &sentinel_config::SentinelConfig) -> Self {
        let registry = ToolRegistry::new();
        let policy = PolicyEngine::new(sentinel_policy::PolicyConfig {
            policy_id: config.policy.policy_id.clone(),
            policy_version: config.policy.policy_version.clone(),
            high_block_threshold: config.policy.high_block_threshold,
            high_review_threshold: config.policy.high_review_threshold,
            medium_review_threshold: config.policy.medium_review_threshold,
        });
        let token_issuer = TokenIssuer::new(
            config.token_issuer.secret.clone().into_bytes(),
            config.token_issuer.ttl_ms,
        );
        let token_verifier = TokenVerifier::new(config.token_issuer.secret.clone().into_bytes());
        let commit_manager = CommitTokenManager::new(
            config.commit_token_manager.secret.clone().into_bytes(),
            config.commit_token_manager.ttl_seconds * 1_000,
        );

        Self::new(
            "mcp-sentinel",
            registry,
            policy,
            token_issuer,
            token_verifier,
            FallbackRouter::new(),
            Arc::new(sentinel_telemetry::TracingExporter),
            InterceptorSettings {
                shadow_for_high_risk: config.v2.shadow_for_high_risk,
                grounding_enabled: config.hallucination.grounding_enabled,
                self_consistency_enabled: config.hallucination.self_consistency_enabled,
                self_consistency_mode: match config.hallucination.self_consistency_mode {
                    sentinel_config::SelfConsistencyMode::Inline => SelfConsistencyMode::Inline,
                    sentinel_config::SelfConsistencyMode::Shadow => SelfConsistencyMode::Shadow,
                    sentinel_config::SelfConsistencyMode::Off => SelfConsistencyMode::Off,
                },
                numeric_enabled: config.hallucination.numeric_enabled,
                tool_mismatch_enabled: config.hallucination.tool_mismatch_enabled,
                drift_enabled: config.hallucination.drift_enabled,
                verifier_enabled: config.hallucination.verifier_enabled,
                ..InterceptorSettings::default()
            },
            Arc::new(InMemoryProposalStore::new()),
            commit_manager,
            config.proposal.block_threshold,
        )
    }

    /// Dispatch one [`RpcRequest`], producing its [`RpcResponse`].
    ///
    /// `now_ms` is threaded through explicitly (rather than read from the
    /// wall clock here) so dispatch stays deterministic and testable; the
    /// binary supplies the real current time.
    pub async fn dispatch(&self, request: RpcRequest, now_ms: i64) -> RpcResponse {
        match request.method.as_str() {
            "tools/call" => self.handle_tool_call(request, now_ms).await,
            "tools/propose" => self.handle_propose(request, now_ms).await,
            "tools/commit" => self.handle_commit(request, now_ms).await,
            other => RpcResponse::err(request.id, METHOD_NOT_FOUND, format!("unknown method: {other}")),
        }
    }

    async fn handle_tool_call(&self, request: RpcRequest, now_ms: i64) -> RpcResponse {
        let params: ToolCallParams = match parse_params(&request) {
            Ok(p) => p,
            Err(response) => return response,
        };

        let observation = ToolCallObservation {
            tool_name: params.tool_name,
            tool_args: params.tool_args,
            prompt: params.prompt,
            response: params.response,
            retrieved_context: params.retrieved_context,
            tool_result_summary: params.tool_result_summary,
            secondary_response: params.secondary_response,
            numeric_samples: params.numeric_samples,
            baseline_numeric: params.baseline_numeric,
            previous_prompt_hash: params.previous_prompt_hash,
            shadow_response: params.shadow_response,
            shadow_numeric_samples: params.shadow_numeric_samples,
        };

        let intercepted = self.interceptor.intercept_tool_call(observation, now_ms).await;

        let decision_str = match intercepted.policy_result.decision {
            Decision::Allow => "allow",
            Decision::Review => "review",
            Decision::Block => "block",
        };

        let token_json = intercepted.issued_token.as_ref().map(|issued| {
            json!({
                "token": issued.token,
                "expires_at_ms": issued.payload.expires_at_ms,
            })
        });
        let fallback_json = intercepted.fallback.as_ref().map(|fb| {
            json!({
                "source": match fb.source {
                    sentinel_runtime::FallbackSource::SafeTool => "safe_tool",
                    sentinel_runtime::FallbackSource::Template => "template",
                },
                "body": fb.body,
            })
        });

        RpcResponse::ok(
            request.id,
            json!({
                "trace_id": intercepted.trace.trace_id,
                "decision": decision_str,
                "policy_id": intercepted.policy_result.policy_id,
                "policy_version": intercepted.policy_result.policy_version,
                "composite_risk_score": intercepted.policy_result.composite_risk_score,
                "reason": intercepted.policy_result.reason,
                "token": token_json,
                "fallback": fallback_json,
            }),
        )
    }

    async fn handle_propose(&self, request: RpcRequest, now_ms: i64) -> RpcResponse {
        let params: ProposeParams = match parse_params(&request) {
            Ok(p) => p,
            Err(response) => return response,
        };

        let output = self
            .proposer
            .propose(&params.tool_name, &params.tool_args, &params.prompt, now_ms)
            .await;

        let result = match output {
            ProposalOutput::Draft(proposal) => json!({
                "proposal_id": proposal.proposal_id,
                "outcome": "draft",
                "composite_score": proposal.composite_score,
                "commit_token": null,
            }),
            ProposalOutput::ReadyToCommit(proposal, token) => json!({
                "proposal_id": proposal.proposal_id,
                "outcome": "ready_to_commit",
                "composite_score": proposal.composite_score,
                "commit_token": {
                    "token": token.token,
                    "expires_at_ms": token.payload.expires_at_ms,
                },
            }),
        };

        RpcResponse::ok(request.id, result)
    }

    async fn handle_commit(&self, request: RpcRequest, now_ms: i64) -> RpcResponse {
        let params: CommitParams = match parse_params(&request) {
            Ok(p) => p,
            Err(response) => return response,
        };

        let tool_args_hash = args_hash(&params.tool_args);
        let result = self
            .commit_verifier
            .verify_commit(
                &params.proposal_id,
                &params.token,
                &params.tool_name,
                &tool_args_hash,
                now_ms,
            )
            .await;

        RpcResponse::ok(
            request.id,
            json!({
                "ok": result.ok,
                "reason": format!("{:?}", result.reason).to_lowercase(),
            }),
        )
    }
}

fn parse_params<T: for<'de> Deserialize<'de>>(request: &RpcRequest) -> Result<T, RpcResponse> {
    let Some(params) = request.params.clone() else {
        return Err(RpcResponse::err(
            request.id.clone(),
            INVALID_PARAMS,
            "missing params",
        ));
    };
    serde_json::from_value(params).map_err(|err| {
        RpcResponse::err(request.id.clone(), INVALID_PARAMS, format!("invalid params: {err}"))
    })
}

/// Parse one line of input as an [`RpcRequest`], returning a malformed-request
/// [`RpcResponse`] (id `null`, since a request that doesn't parse has no
/// usable id) instead of an error type — a bad line is an expected client
/// mistake, not a server fault.
#[must_use]
pub fn parse_request_line(line: &str) -> Result<RpcRequest, RpcResponse> {
    serde_json::from_str(line)
        .map_err(|err| RpcResponse::err(None, INVALID_PARAMS, format!("malformed request: {err}")))
}

/// Serialize an [`RpcResponse`] to a single output line (no trailing
/// newline; the caller appends one).
#[must_use]
pub fn response_line(response: &RpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|err| {
        format!(
            r#"{{"jsonrpc":"2.0","id":null,"error":{{"code":{INTERNAL_ERROR},"message":"failed to serialize response: {err}"}}}}"#
        )
    })
}
