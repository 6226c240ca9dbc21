//! Tool registry: where tools opt in to interception by registering a
//! [`ToolProfile`] ahead of time.

use crate::types::{Criticality, ToolProfile};
use std::collections::HashMap;

/// A lookup table from tool name to [`ToolProfile`].
///
/// Unregistered tools are treated as [`Criticality::Low`] with reference
/// defaults, matching the reference registry's `get()` fallback — an
/// unknown tool is not an error, it is simply assumed harmless until an
/// integrator registers it.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    profiles: HashMap<String, ToolProfile>,
}

impl ToolRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Register `profile`, replacing any existing profile for the same
    /// tool name.
    pub fn register(&mut self, profile: ToolProfile) {
        self.profiles.insert(profile.tool_name.clone(), profile);
    }

    /// Builder-style variant of [`Self::register`].
    #[must_use]
    pub fn with_tool(mut self, profile: ToolProfile) -> Self {
        self.register(profile);
        self
    }

    /// Look up `tool_name`'s profile, defaulting to
    /// [`Criticality::Low`]/no-token-required when unregistered.
    #[must_use]
    pub fn get(&self, tool_name: &str) -> ToolProfile {
        self.profiles
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| ToolProfile::new(tool_name, Criticality::Low))
    }

    /// Whether `tool_name` has an explicit profile registered.
    #[must_use]
    pub fn is_registered(&self, tool_name: &str) -> bool {
        self.profiles.contains_key(tool_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_tool_defaults_to_low_with_reference_defaults() {
        let registry = ToolRegistry::new();
        let profile = registry.get("mystery_tool");
        assert_eq!(profile.criticality, Criticality::Low);
        assert_eq!(profile.blast_radius, "limited");
        assert!(!profile.irreversible);
        assert!(!registry.is_registered("mystery_tool"));
    }

    #[test]
    fn registered_tool_is_returned_as_is() {
        let registry = ToolRegistry::new().with_tool(
            ToolProfile::new("transfer_funds", Criticality::High).with_irreversible(true),
        );
        let profile = registry.get("transfer_funds");
        assert_eq!(profile.criticality, Criticality::High);
        assert!(profile.irreversible);
        assert!(registry.is_registered("transfer_funds"));
    }

    #[test]
    fn register_overwrites_existing() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolProfile::new("t", Criticality::Low));
        registry.register(ToolProfile::new("t", Criticality::High));
        assert_eq!(registry.get("t").criticality, Criticality::High);
    }
}
