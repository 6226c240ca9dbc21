// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trace export.
//!
//! A finished [`sentinel_core::trace::TraceContext`] is flattened into an
//! [`ExportRow`] and handed to an [`Exporter`]. The column set is exactly
//! the trace-context field set — no derived or renamed fields — so an
//! exporter never needs to know more about the interceptor than the shape
//! of the context it just finished.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use sentinel_core::risk::RiskVector;
use sentinel_core::trace::TraceContext;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// The flattened, export-ready form of a finished [`TraceContext`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRow {
    /// See [`TraceContext::service`].
    pub service: String,
    /// See [`TraceContext::model`].
    pub model: Option<String>,
    /// See [`TraceContext::tool_name`].
    pub tool_name: Option<String>,
    /// See [`TraceContext::trace_id`].
    pub trace_id: String,
    /// See [`TraceContext::span_id`].
    pub span_id: String,
    /// See [`TraceContext::parent_span_id`].
    pub parent_span_id: Option<String>,
    /// See [`TraceContext::start_time_ms`].
    pub start_time_ms: i64,
    /// See [`TraceContext::end_time_ms`].
    pub end_time_ms: Option<i64>,
    /// See [`TraceContext::prompt_tokens`].
    pub prompt_tokens: Option<u32>,
    /// See [`TraceContext::completion_tokens`].
    pub completion_tokens: Option<u32>,
    /// See [`TraceContext::cost_usd`].
    pub cost_usd: Option<f64>,
    /// See [`TraceContext::retries`].
    pub retries: u32,
    /// See [`TraceContext::fallback_used`].
    pub fallback_used: bool,
    /// See [`TraceContext::confidence`].
    pub confidence: Option<f64>,
    /// See [`TraceContext::gate_blocked`].
    pub gate_blocked: Option<bool>,
    /// See [`TraceContext::risk_vector`].
    pub risk_vector: Option<RiskVector>,
    /// See [`TraceContext::is_shadow`].
    pub is_shadow: bool,
    /// See [`TraceContext::shadow_parent_trace_id`].
    pub shadow_parent_trace_id: Option<String>,
    /// See [`TraceContext::policy_decision`].
    pub policy_decision: Option<String>,
    /// See [`TraceContext::policy_id`].
    pub policy_id: Option<String>,
    /// See [`TraceContext::policy_version`].
    pub policy_version: Option<String>,
    /// See [`TraceContext::exec_token_id`].
    pub exec_token_id: Option<String>,
    /// See [`TraceContext::exec_token_hash`].
    pub exec_token_hash: Option<String>,
    /// See [`TraceContext::exec_token_ttl_ms`].
    pub exec_token_ttl_ms: Option<i64>,
    /// See [`TraceContext::exec_token_verified`].
    pub exec_token_verified: Option<bool>,
    /// See [`TraceContext::normalized_prompt_hash`].
    pub normalized_prompt_hash: Option<String>,
}

impl From<&TraceContext> for ExportRow {
    fn from(ctx: &TraceContext) -> Self {
        Self {
            service: ctx.service.clone(),
            model: ctx.model.clone(),
            tool_name: ctx.tool_name.clone(),
            trace_id: ctx.trace_id.clone(),
            span_id: ctx.span_id.clone(),
            parent_span_id: ctx.parent_span_id.clone(),
            start_time_ms: ctx.start_time_ms,
            end_time_ms: ctx.end_time_ms,
            prompt_tokens: ctx.prompt_tokens,
            completion_tokens: ctx.completion_tokens,
            cost_usd: ctx.cost_usd,
            retries: ctx.retries,
            fallback_used: ctx.fallback_used,
            confidence: ctx.confidence,
            gate_blocked: ctx.gate_blocked,
            risk_vector: ctx.risk_vector,
            is_shadow: ctx.is_shadow,
            shadow_parent_trace_id: ctx.shadow_parent_trace_id.clone(),
            policy_decision: ctx.policy_decision.clone(),
            policy_id: ctx.policy_id.clone(),
            policy_version: ctx.policy_version.clone(),
            exec_token_id: ctx.exec_token_id.clone(),
            exec_token_hash: ctx.exec_token_hash.clone(),
            exec_token_ttl_ms: ctx.exec_token_ttl_ms,
            exec_token_verified: ctx.exec_token_verified,
            normalized_prompt_hash: ctx.normalized_prompt_hash.clone(),
        }
    }
}

/// Sink for finished trace rows.
///
/// Exporter failures are logged and swallowed by callers, never
/// propagated — a broken telemetry backend must not take down the
/// interceptor.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Export one row. Errors are represented as a string rather than a
    /// typed error, since callers only ever log them.
    async fn export(&self, row: ExportRow) -> Result<(), String>;

    /// Flush and release any resources. Default no-op.
    async fn close(&self) -> Result<(), String> {
        Ok(())
    }
}

/// An [`Exporter`] that discards every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExporter;

#[async_trait]
impl Exporter for NoopExporter {
    async fn export(&self, _row: ExportRow) -> Result<(), String> {
        Ok(())
    }
}

/// An [`Exporter`] that logs one structured `tracing` event per row.
///
/// This is the ambient, dependency-free stand-in for a real sink (e.g. the
/// relational `mcp_traces` table); good enough for local development and
/// for tests that just want to see export activity in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingExporter;

#[async_trait]
impl Exporter for TracingExporter {
    async fn export(&self, row: ExportRow) -> Result<(), String> {
        match serde_json::to_string(&row) {
            Ok(json) => {
                info!(trace_id = %row.trace_id, tool_name = ?row.tool_name, row = %json, "trace exported");
                Ok(())
            }
            Err(err) => {
                warn!(trace_id = %row.trace_id, error = %err, "failed to serialize trace row");
                Err(err.to_string())
            }
        }
    }
}
