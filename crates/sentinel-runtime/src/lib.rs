// SPDX-License-Identifier: MIT OR Apache-2.0

//! The interceptor state machine: wires the policy engine, execution
//! tokens, fallback routing, and the shadow lane into one per-call entry
//! point a server can drive.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fallback;
pub mod interceptor;
pub mod shadow;

pub use fallback::{FallbackResponse, FallbackRouter, FallbackSource, SafeToolHandler};
pub use interceptor::{
    InterceptedCall, Interceptor, InterceptorSettings, ModelCallObservation, SelfConsistencyMode,
    ToolCallObservation,
};
pub use shadow::{disagreement_score, run_shadow_lane, schedule_shadow_lane, shadow_numeric_variance};
