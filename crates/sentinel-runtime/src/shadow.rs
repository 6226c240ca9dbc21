//! Shadow lane: an independent re-check of a high-risk call that runs
//! after the primary response has already been returned.
//!
//! The shadow lane never blocks or influences the primary call; it exists
//! purely to observe disagreement and numeric variance for calls the
//! policy engine already let through, so operators can catch drift before
//! it shows up as a user-visible incident.

use sentinel_core::risk::RiskVector;
use sentinel_core::signals::{jaccard_distance, numeric_instability_risk};
use sentinel_core::trace::TraceContext;
use sentinel_telemetry::{ExportRow, Exporter};
use std::sync::Arc;
use tracing::warn;

/// Disagreement between the primary response and a shadow re-sample,
/// `0.0` for identical text, `1.0` for disjoint text.
#[must_use]
pub fn disagreement_score(primary: &str, shadow: &str) -> f64 {
    jaccard_distance(primary, shadow)
}

/// Numeric instability between the primary call's numeric values and a
/// shadow re-sample's.
#[must_use]
pub fn shadow_numeric_variance(primary: &[f64], shadow: &[f64]) -> f64 {
    numeric_instability_risk(shadow, Some(primary))
}

/// Run one shadow-lane pass: build the child span, compute disagreement
/// and numeric variance against the primary call, populate its risk
/// vector, finish it, and export it.
///
/// Exporter failures are logged at `warn` and otherwise ignored — a broken
/// telemetry sink must never be visible to (or block) the caller that
/// triggered this shadow lane.
pub async fn run_shadow_lane(
    parent: &TraceContext,
    primary_response: &str,
    shadow_response: &str,
    primary_numeric: &[f64],
    shadow_numeric: &[f64],
    exporter: Arc<dyn Exporter>,
    now_ms: i64,
) -> TraceContext {
    let mut shadow = parent.shadow_span(now_ms);

    let disagreement = disagreement_score(primary_response, shadow_response);
    let variance = shadow_numeric_variance(primary_numeric, shadow_numeric);
    shadow.risk_vector = Some(RiskVector {
        self_consistency_risk: Some(disagreement),
        numeric_instability_risk: Some(variance),
        ..Default::default()
    });

    shadow.finish(now_ms);

    if let Err(err) = exporter.export(ExportRow::from(&shadow)).await {
        warn!(trace_id = %shadow.trace_id, error = %err, "shadow lane export failed");
    }

    shadow
}

/// Schedule [`run_shadow_lane`] on its own task, detached from the caller.
///
/// The caller's primary response path never awaits the returned
/// [`tokio::task::JoinHandle`]; it exists only so tests (and a graceful
/// shutdown path, if one is added later) can wait on it deliberately.
pub fn schedule_shadow_lane(
    parent: TraceContext,
    primary_response: String,
    shadow_response: String,
    primary_numeric: Vec<f64>,
    shadow_numeric: Vec<f64>,
    exporter: Arc<dyn Exporter>,
    now_ms: i64,
) -> tokio::task::JoinHandle<TraceContext> {
    tokio::spawn(async move {
        run_shadow_lane(
            &parent,
            &primary_response,
            &shadow_response,
            &primary_numeric,
            &shadow_numeric,
            exporter,
            now_ms,
        )
        .await
    })
}
