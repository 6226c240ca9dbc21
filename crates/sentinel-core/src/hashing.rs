//! Stable hashing and text normalization.
//!
//! These functions back every hash-based invariant in the system: the same
//! tool-argument object, modulo key order, always hashes the same; the same
//! prompt, modulo whitespace and case, always hashes the same.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Return the lowercase hex SHA-256 digest of `text`.
///
/// # Examples
///
/// ```
/// use sentinel_core::hashing::sha256_hex;
///
/// let h = sha256_hex("hello");
/// assert_eq!(h.len(), 64);
/// assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Trim, lowercase, and collapse runs of whitespace to a single space.
///
/// # Examples
///
/// ```
/// use sentinel_core::hashing::normalize_text;
///
/// assert_eq!(normalize_text("  Hello   World  "), "hello world");
/// ```
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        }
    }
    out
}

/// Serialize `value` as canonical JSON: object keys sorted, compact
/// separators, non-ASCII preserved.
///
/// Key ordering is made stable by round-tripping through a [`BTreeMap`] at
/// every object level via `serde_json::Value`, so a permutation of an
/// object's keys never changes the output.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn canonical_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let v = serde_json::to_value(value)?;
    Ok(canonical_value_string(&v))
}

fn canonical_value_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: BTreeMap<&String, &serde_json::Value> = map.iter().collect();
            let mut out = String::from("{");
            for (i, (k, v)) in sorted.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(k).expect("string keys always serialize"));
                out.push(':');
                out.push_str(&canonical_value_string(v));
            }
            out.push('}');
            out
        }
        serde_json::Value::Array(items) => {
            let mut out = String::from("[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&canonical_value_string(item));
            }
            out.push(']');
            out
        }
        other => serde_json::to_string(other).expect("scalar JSON values always serialize"),
    }
}

/// Stable SHA-256 hash of `tool_args`' canonical-JSON, normalized form.
///
/// A permutation of `tool_args`' keys never changes the result.
///
/// # Examples
///
/// ```
/// use sentinel_core::hashing::args_hash;
/// use serde_json::json;
///
/// let a = args_hash(&json!({"amount": 100, "to": "acct_123"}));
/// let b = args_hash(&json!({"to": "acct_123", "amount": 100}));
/// assert_eq!(a, b);
/// ```
#[must_use]
pub fn args_hash(tool_args: &serde_json::Value) -> String {
    let canonical = canonical_value_string(tool_args);
    sha256_hex(&normalize_text(&canonical))
}

/// Stable SHA-256 hash of a normalized prompt.
///
/// Insignificant whitespace and case differences never change the result.
///
/// # Examples
///
/// ```
/// use sentinel_core::hashing::prompt_hash;
///
/// assert_eq!(prompt_hash("Hello  World"), prompt_hash("hello world"));
/// ```
#[must_use]
pub fn prompt_hash(prompt: &str) -> String {
    sha256_hex(&normalize_text(prompt))
}
