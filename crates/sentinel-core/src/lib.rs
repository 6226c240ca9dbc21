// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hashing, risk signals, risk vector, and trace-context types shared
//! across the MCP Sentinel workspace.
//!
//! This crate has no knowledge of policy decisions, tokens, or storage — it
//! only computes numbers and normalizes text. `sentinel-policy`,
//! `sentinel-token`, and `sentinel-proposal` build on top of it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod hashing;
pub mod risk;
pub mod signals;
pub mod trace;

use once_cell::sync::Lazy;
use regex::Regex;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid regex")
});
static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?")
        .expect("valid regex")
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(\.\d+)?").expect("valid regex"));

/// Normalize a prompt for cross-call grouping: replace UUIDs, timestamps,
/// and bare numbers with placeholders, then lowercase and collapse
/// whitespace.
///
/// This is deliberately stricter than [`hashing::normalize_text`], which
/// backs hash stability; this one backs clustering prompts that differ only
/// in per-call identifiers or values (e.g. the same `transfer_funds` prompt
/// issued for two different account ids and amounts should group together).
///
/// # Examples
///
/// ```
/// use sentinel_core::normalize_prompt_for_grouping;
///
/// let a = normalize_prompt_for_grouping(
///     "Transfer 100 dollars to account 6ba7b810-9dad-11d1-80b4-00c04fd430c8",
/// );
/// let b = normalize_prompt_for_grouping(
///     "transfer 250 dollars to account 6ba7b812-9dad-11d1-80b4-00c04fd430c9",
/// );
/// assert_eq!(a, b);
/// ```
#[must_use]
pub fn normalize_prompt_for_grouping(prompt: &str) -> String {
    let step1 = UUID_RE.replace_all(prompt, "<uuid>");
    let step2 = TIMESTAMP_RE.replace_all(&step1, "<timestamp>");
    let step3 = NUMBER_RE.replace_all(&step2, "<number>");
    hashing::normalize_text(&step3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_prompt_for_grouping_replaces_uuid_timestamp_number() {
        let out = normalize_prompt_for_grouping(
            "Transfer 100.50 to acct 6ba7b810-9dad-11d1-80b4-00c04fd430c8 at 2026-01-01T00:00:00Z",
        );
        assert!(out.contains("<uuid>"));
        assert!(out.contains("<timestamp>"));
        assert!(out.contains("<number>"));
        assert!(!out.contains("100.50"));
    }

    #[test]
    fn normalize_prompt_for_grouping_groups_equivalent_prompts() {
        let a = normalize_prompt_for_grouping("Send 10 to user 42");
        let b = normalize_prompt_for_grouping("send 999 to user 7");
        assert_eq!(a, b);
    }
}
