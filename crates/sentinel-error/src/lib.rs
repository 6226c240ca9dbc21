//! Unified error taxonomy with stable error codes for MCP Sentinel.
//!
//! Every Sentinel error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, an optional cause chain, and
//! arbitrary key-value context. Use the builder returned by
//! [`SentinelError::new`] to construct errors fluently.
//!
//! This crate only models failures that are raised as Rust errors —
//! configuration, storage, and interceptor invariant violations. Token and
//! policy *decisions* (e.g. `nonce_replay`, `high_criticality_block_threshold`)
//! are never exceptions; they are typed reason strings returned as data. See
//! `sentinel-token` and `sentinel-policy` for those.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration loading/validation errors.
    Config,
    /// Proposal/commit store errors.
    Store,
    /// Policy engine configuration errors.
    Policy,
    /// Token issuance/verification plumbing errors (not verification reasons).
    Token,
    /// Interceptor state-machine invariant violations.
    Interceptor,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Store => "store",
            Self::Policy => "policy",
            Self::Token => "token",
            Self::Interceptor => "interceptor",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Config --
    /// Configuration file or value is invalid.
    ConfigInvalid,
    /// The requested configuration file was not found.
    ConfigNotFound,

    // -- Store --
    /// A proposal lookup failed for a reason other than "not found".
    StoreUnavailable,
    /// A nonce or proposal row already exists where uniqueness was required.
    StoreConflict,

    // -- Policy --
    /// Policy threshold configuration is out of the `[0, 1]` range.
    PolicyConfigInvalid,

    // -- Token --
    /// The configured HMAC secret is missing or empty.
    TokenSecretMissing,

    // -- Interceptor --
    /// A trace-context field was written by more than one component.
    InterceptorInvariantViolation,
    /// The interceptor was asked to act on an unknown state transition.
    InterceptorInvalidTransition,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigInvalid | Self::ConfigNotFound => ErrorCategory::Config,
            Self::StoreUnavailable | Self::StoreConflict => ErrorCategory::Store,
            Self::PolicyConfigInvalid => ErrorCategory::Policy,
            Self::TokenSecretMissing => ErrorCategory::Token,
            Self::InterceptorInvariantViolation | Self::InterceptorInvalidTransition => {
                ErrorCategory::Interceptor
            }
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"CONFIG_INVALID"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::ConfigNotFound => "CONFIG_NOT_FOUND",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::StoreConflict => "STORE_CONFLICT",
            Self::PolicyConfigInvalid => "POLICY_CONFIG_INVALID",
            Self::TokenSecretMissing => "TOKEN_SECRET_MISSING",
            Self::InterceptorInvariantViolation => "INTERCEPTOR_INVARIANT_VIOLATION",
            Self::InterceptorInvalidTransition => "INTERCEPTOR_INVALID_TRANSITION",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SentinelError
// ---------------------------------------------------------------------------

/// Unified Sentinel error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use sentinel_error::{SentinelError, ErrorCode};
///
/// let err = SentinelError::new(ErrorCode::StoreUnavailable, "lock poisoned")
///     .with_context("proposal_id", "b6b2...")
///     .with_context("retries", 3);
/// ```
pub struct SentinelError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl SentinelError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for SentinelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SentinelError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for SentinelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for SentinelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::ConfigInvalid,
        ErrorCode::ConfigNotFound,
        ErrorCode::StoreUnavailable,
        ErrorCode::StoreConflict,
        ErrorCode::PolicyConfigInvalid,
        ErrorCode::TokenSecretMissing,
        ErrorCode::InterceptorInvariantViolation,
        ErrorCode::InterceptorInvalidTransition,
        ErrorCode::Internal,
    ];

    #[test]
    fn basic_construction() {
        let err = SentinelError::new(ErrorCode::Internal, "boom");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = SentinelError::new(ErrorCode::StoreUnavailable, "lock poisoned");
        assert_eq!(err.to_string(), "[STORE_UNAVAILABLE] lock poisoned");
    }

    #[test]
    fn display_with_context() {
        let err = SentinelError::new(ErrorCode::StoreConflict, "duplicate nonce")
            .with_context("nonce", "abc123");
        let s = err.to_string();
        assert!(s.starts_with("[STORE_CONFLICT] duplicate nonce"));
        assert!(s.contains("nonce"));
    }

    #[test]
    fn builder_with_source() {
        let src = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = SentinelError::new(ErrorCode::ConfigInvalid, "denied").with_source(src);
        assert!(err.source.is_some());
        assert_eq!(err.source.as_ref().unwrap().to_string(), "access denied");
        let chained = std::error::Error::source(&err).unwrap();
        assert_eq!(chained.to_string(), "access denied");
    }

    #[test]
    fn category_shorthand() {
        let err = SentinelError::new(ErrorCode::TokenSecretMissing, "no secret");
        assert_eq!(err.category(), ErrorCategory::Token);
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()), "duplicate as_str: {code:?}");
        }
        assert_eq!(seen.len(), ALL_CODES.len());
    }

    #[test]
    fn all_codes_display_matches_as_str() {
        for code in ALL_CODES {
            assert_eq!(code.to_string(), code.as_str());
        }
    }

    #[test]
    fn all_codes_serialize_to_as_str() {
        for code in ALL_CODES {
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!(r#""{}""#, code.as_str()));
        }
    }

    #[test]
    fn error_category_display() {
        assert_eq!(ErrorCategory::Config.to_string(), "config");
        assert_eq!(ErrorCategory::Internal.to_string(), "internal");
    }
}
