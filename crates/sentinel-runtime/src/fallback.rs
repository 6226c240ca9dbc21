//! Fallback routing: what to return instead of a tool's real output when
//! the policy engine didn't ALLOW the call outright.

use async_trait::async_trait;
use sentinel_policy::Decision;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A safe, pre-approved alternative to a blocked or reviewed tool call.
///
/// Registered per tool name; e.g. `transfer_funds` might route to a
/// `request_manual_transfer` handler that just creates a ticket instead of
/// moving money.
#[async_trait]
pub trait SafeToolHandler: Send + Sync {
    /// Produce the substitute response for the given call.
    async fn handle(&self, tool_args: &Value) -> Value;
}

/// Which path produced a [`FallbackResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackSource {
    /// A registered [`SafeToolHandler`] ran instead of the real tool.
    SafeTool,
    /// No safe handler was registered; a block/review template was used.
    Template,
}

/// What the fallback router produced for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResponse {
    /// Which path produced this response.
    pub source: FallbackSource,
    /// The response body to return to the caller in place of the tool's
    /// real output.
    pub body: Value,
}

/// The block-response shape: what callers receive when the policy engine
/// returned `BLOCK`.
#[must_use]
pub fn block_response_template(tool_name: &str, reason: &str) -> Value {
    json!({
        "status": "blocked",
        "tool_name": tool_name,
        "reason": reason,
    })
}

/// The review-response shape: what callers receive when the policy engine
/// returned `REVIEW`.
#[must_use]
pub fn review_response_template(tool_name: &str, reason: &str) -> Value {
    json!({
        "status": "review_required",
        "tool_name": tool_name,
        "reason": reason,
    })
}

/// Routes REVIEW/BLOCK decisions to a registered safe alternative, or to
/// the matching response template when none is registered.
#[derive(Default)]
pub struct FallbackRouter {
    handlers: HashMap<String, Arc<dyn SafeToolHandler>>,
}

impl FallbackRouter {
    /// An empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a safe alternative for `tool_name`.
    pub fn register(&mut self, tool_name: impl Into<String>, handler: Arc<dyn SafeToolHandler>) {
        self.handlers.insert(tool_name.into(), handler);
    }

    /// Route a non-ALLOW decision for `tool_name` to a safe handler if one
    /// is registered, otherwise to the decision's response template.
    ///
    /// # Panics
    ///
    /// Panics if called with [`Decision::Allow`] — routing only applies to
    /// REVIEW/BLOCK; an ALLOWed call should simply run the real tool.
    pub async fn route(
        &self,
        tool_name: &str,
        tool_args: &Value,
        decision: Decision,
        reason: &str,
    ) -> FallbackResponse {
        assert_ne!(decision, Decision::Allow, "fallback routing is only for REVIEW/BLOCK");

        if let Some(handler) = self.handlers.get(tool_name) {
            return FallbackResponse {
                source: FallbackSource::SafeTool,
                body: handler.handle(tool_args).await,
            };
        }

        let body = match decision {
            Decision::Block => block_response_template(tool_name, reason),
            Decision::Review => review_response_template(tool_name, reason),
            Decision::Allow => unreachable!("checked above"),
        };
        FallbackResponse {
            source: FallbackSource::Template,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SafeTransfer;

    #[async_trait]
    impl SafeToolHandler for SafeTransfer {
        async fn handle(&self, _tool_args: &Value) -> Value {
            json!({"status": "queued_for_manual_review"})
        }
    }

    #[tokio::test]
    async fn unregistered_tool_uses_block_template() {
        let router = FallbackRouter::new();
        let response = router
            .route("transfer_funds", &json!({}), Decision::Block, "high_block_threshold")
            .await;
        assert_eq!(response.source, FallbackSource::Template);
        assert_eq!(response.body["status"], "blocked");
    }

    #[tokio::test]
    async fn unregistered_tool_uses_review_template() {
        let router = FallbackRouter::new();
        let response = router
            .route("send_email", &json!({}), Decision::Review, "medium_review_threshold")
            .await;
        assert_eq!(response.body["status"], "review_required");
    }

    #[tokio::test]
    async fn registered_tool_uses_safe_handler() {
        let mut router = FallbackRouter::new();
        router.register("transfer_funds", Arc::new(SafeTransfer));
        let response = router
            .route("transfer_funds", &json!({}), Decision::Block, "high_block_threshold")
            .await;
        assert_eq!(response.source, FallbackSource::SafeTool);
        assert_eq!(response.body["status"], "queued_for_manual_review");
    }

    #[tokio::test]
    #[should_panic(expected = "fallback routing is only for REVIEW/BLOCK")]
    async fn routing_an_allow_decision_panics() {
        let router = FallbackRouter::new();
        router.route("tool", &json!({}), Decision::Allow, "n/a").await;
    }
}
