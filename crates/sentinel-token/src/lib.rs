// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC-signed, TTL-bounded execution tokens.
//!
//! An [`issuer::TokenIssuer`] issues a token when the policy engine ALLOWs a
//! call; a [`verifier::TokenVerifier`] checks that token (signature,
//! expiry, tool binding, argument binding, and single use) before the call
//! is actually executed. Verification failures are never raised as Rust
//! errors — they are returned as a [`types::VerificationResult`] with a
//! [`types::VerificationReason`], since a rejected token is an expected,
//! routine outcome, not a bug.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod issuer;
pub mod types;
pub mod verifier;

pub use issuer::TokenIssuer;
pub use types::{IssuedToken, TokenPayload, VerificationReason, VerificationResult};
pub use verifier::{ReplaySet, TokenVerifier};
