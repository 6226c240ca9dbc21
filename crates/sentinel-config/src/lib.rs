// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime configuration loading and validation.
//!
//! [`SentinelConfig`] holds every knob described for the MCP Sentinel
//! runtime: token lifetimes and secrets, policy thresholds, the shadow-lane
//! toggle, hallucination-signal enable flags, and the propose/commit block
//! threshold. [`SentinelConfig::load`] reads a TOML file, falling back to
//! [`SentinelConfig::default`] when none is given, and returns advisory
//! [`ConfigWarning`]s alongside the parsed config rather than failing on
//! anything short of structurally invalid TOML.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

/// Advisory-level issues that do not prevent operation but deserve
/// attention.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// A token TTL is unusually short for production use.
    ShortTtl {
        /// Which knob this warning is about.
        field: String,
        /// The configured value, in milliseconds.
        ttl_ms: i64,
    },
    /// A policy threshold falls outside `[0.0, 1.0]`.
    ThresholdOutOfRange {
        /// Which knob this warning is about.
        field: String,
        /// The configured value.
        value: f64,
    },
    /// A secret is using the documented insecure development default.
    InsecureDefaultSecret {
        /// Which knob this warning is about.
        field: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::ShortTtl { field, ttl_ms } => {
                write!(f, "'{field}' is set to a very short TTL ({ttl_ms}ms)")
            }
            ConfigWarning::ThresholdOutOfRange { field, value } => {
                write!(f, "'{field}' is {value}, outside the expected [0, 1] range")
            }
            ConfigWarning::InsecureDefaultSecret { field } => {
                write!(f, "'{field}' is using the insecure built-in default secret")
            }
        }
    }
}

/// Execution-token issuer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenIssuerConfig {
    /// Token lifetime in milliseconds.
    pub ttl_ms: i64,
    /// HMAC secret. Read from `MCP_SENTINEL_TOKEN_SECRET` when loading via
    /// [`SentinelConfig::load`]; this field holds whatever value won.
    pub secret: String,
    /// Whether the verifier enforces single-use nonces.
    pub replay_protection: bool,
}

impl Default for TokenIssuerConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 30_000,
            secret: "dev-secret".to_string(),
            replay_protection: true,
        }
    }
}

/// Commit-token manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitTokenConfig {
    /// Token lifetime in seconds.
    pub ttl_seconds: i64,
    /// HMAC secret. Read from `MCP_SENTINEL_COMMIT_SECRET` when loading
    /// via [`SentinelConfig::load`].
    pub secret: String,
}

impl Default for CommitTokenConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 60,
            secret: "dev-commit-secret".to_string(),
        }
    }
}

/// Policy engine thresholds and identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfigSettings {
    /// Identifier of the active policy document.
    pub policy_id: String,
    /// Version of the active policy document.
    pub policy_version: String,
    /// See `sentinel_policy::PolicyConfig::high_block_threshold`.
    pub high_block_threshold: f64,
    /// See `sentinel_policy::PolicyConfig::high_review_threshold`.
    pub high_review_threshold: f64,
    /// See `sentinel_policy::PolicyConfig::medium_review_threshold`.
    pub medium_review_threshold: f64,
}

impl Default for PolicyConfigSettings {
    fn default() -> Self {
        Self {
            policy_id: "risk-bound-exec-v2".to_string(),
            policy_version: "2.0.0".to_string(),
            high_block_threshold: 0.35,
            high_review_threshold: 0.20,
            medium_review_threshold: 0.50,
        }
    }
}

/// Toggles for behavior introduced after the original v1 interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct V2Config {
    /// Whether a shadow-lane span is scheduled for high-risk calls.
    pub shadow_for_high_risk: bool,
}

impl Default for V2Config {
    fn default() -> Self {
        Self {
            shadow_for_high_risk: true,
        }
    }
}

/// Where self-consistency checking runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
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

/// Enable flags for individual hallucination/risk signals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HallucinationConfig {
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
}

impl Default for HallucinationConfig {
    fn default() -> Self {
        Self {
            grounding_enabled: true,
            self_consistency_enabled: true,
            self_consistency_mode: SelfConsistencyMode::Inline,
            numeric_enabled: true,
            tool_mismatch_enabled: true,
            drift_enabled: true,
            verifier_enabled: true,
        }
    }
}

/// Propose/commit protocol settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalConfig {
    /// See `sentinel_proposal::proposer::DEFAULT_BLOCK_THRESHOLD`.
    pub block_threshold: f64,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            block_threshold: 0.45,
        }
    }
}

/// Top-level runtime configuration for MCP Sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SentinelConfig {
    /// Execution-token issuer settings.
    pub token_issuer: TokenIssuerConfig,
    /// Commit-token manager settings.
    pub commit_token_manager: CommitTokenConfig,
    /// Policy engine thresholds and identity.
    pub policy: PolicyConfigSettings,
    /// Post-v1 behavior toggles.
    pub v2: V2Config,
    /// Hallucination/risk signal enable flags.
    pub hallucination: HallucinationConfig,
    /// Propose/commit protocol settings.
    pub proposal: ProposalConfig,
}

impl SentinelConfig {
    /// Load configuration from a TOML file at `path`, overlaying the
    /// `MCP_SENTINEL_TOKEN_SECRET` and `MCP_SENTINEL_COMMIT_SECRET`
    /// environment variables onto the respective secret fields when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if `path` does not exist, or
    /// [`ConfigError::ParseError`] if it is not valid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let mut config: SentinelConfig =
            toml::from_str(&text).map_err(|e| ConfigError::ParseError {
                reason: e.to_string(),
            })?;
        config.apply_env_overrides();
        let warnings = config.validate();
        Ok((config, warnings))
    }

    /// The default configuration, with environment-variable secret
    /// overrides applied.
    #[must_use]
    pub fn load_default_with_env() -> (Self, Vec<ConfigWarning>) {
        let mut config = Self::default();
        config.apply_env_overrides();
        let warnings = config.validate();
        (config, warnings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("MCP_SENTINEL_TOKEN_SECRET") {
            self.token_issuer.secret = secret;
        }
        if let Ok(secret) = std::env::var("MCP_SENTINEL_COMMIT_SECRET") {
            self.commit_token_manager.secret = secret;
        }
    }

    /// Validate semantic constraints, returning advisory warnings. Never
    /// fails on its own — out-of-range thresholds and insecure defaults are
    /// reported, not rejected, since a reviewer may be deliberately testing
    /// an edge configuration.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.token_issuer.ttl_ms < 1_000 {
            warnings.push(ConfigWarning::ShortTtl {
                field: "token_issuer.ttl_ms".to_string(),
                ttl_ms: self.token_issuer.ttl_ms,
            });
        }
        if self.token_issuer.secret == TokenIssuerConfig::default().secret {
            warnings.push(ConfigWarning::InsecureDefaultSecret {
                field: "token_issuer.secret".to_string(),
            });
        }
        if self.commit_token_manager.secret == CommitTokenConfig::default().secret {
            warnings.push(ConfigWarning::InsecureDefaultSecret {
                field: "commit_token_manager.secret".to_string(),
            });
        }

        for (field, value) in [
            ("policy.high_block_threshold", self.policy.high_block_threshold),
            ("policy.high_review_threshold", self.policy.high_review_threshold),
            ("policy.medium_review_threshold", self.policy.medium_review_threshold),
            ("proposal.block_threshold", self.proposal.block_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                warnings.push(ConfigWarning::ThresholdOutOfRange {
                    field: field.to_string(),
                    value,
                });
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_documented_defaults() {
        let config = SentinelConfig::default();
        assert_eq!(config.token_issuer.ttl_ms, 30_000);
        assert_eq!(config.commit_token_manager.ttl_seconds, 60);
        assert_eq!(config.policy.policy_id, "risk-bound-exec-v2");
        assert!(config.v2.shadow_for_high_risk);
        assert_eq!(config.proposal.block_threshold, 0.45);
    }

    #[test]
    fn default_config_warns_about_insecure_secrets() {
        let warnings = SentinelConfig::default().validate();
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ConfigWarning::InsecureDefaultSecret { field } if field == "token_issuer.secret")));
    }

    #[test]
    fn out_of_range_threshold_warns() {
        let config = SentinelConfig {
            policy: PolicyConfigSettings {
                high_block_threshold: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| matches!(
            w,
            ConfigWarning::ThresholdOutOfRange { field, .. } if field == "policy.high_block_threshold"
        )));
    }

    #[test]
    fn load_missing_file_errors() {
        let result = SentinelConfig::load("/nonexistent/path/sentinel.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn load_parses_partial_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[policy]\nhigh_block_threshold = 0.5").unwrap();
        let (config, _warnings) = SentinelConfig::load(file.path()).unwrap();
        assert_eq!(config.policy.high_block_threshold, 0.5);
        // Unspecified fields keep their defaults.
        assert_eq!(config.policy.policy_id, "risk-bound-exec-v2");
        assert_eq!(config.token_issuer.ttl_ms, 30_000);
    }

    #[test]
    fn env_override_replaces_token_secret() {
        std::env::set_var("MCP_SENTINEL_TOKEN_SECRET", "test-secret-value");
        let (config, _) = SentinelConfig::load_default_with_env();
        std::env::remove_var("MCP_SENTINEL_TOKEN_SECRET");
        assert_eq!(config.token_issuer.secret, "test-secret-value");
    }
}
