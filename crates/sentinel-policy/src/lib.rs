// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool registry and risk-bound policy engine.
//!
//! Tools opt in to interception by registering a [`types::ToolProfile`]
//! with a [`registry::ToolRegistry`]. The [`engine::PolicyEngine`] then maps
//! a tool's criticality and a computed composite risk score onto a
//! [`types::Decision`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod registry;
pub mod types;

pub use engine::{PolicyConfig, PolicyEngine};
pub use registry::ToolRegistry;
pub use types::{Criticality, Decision, PolicyResult, ToolProfile};
