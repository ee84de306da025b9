//! Capabilities published by enabled addons

use std::collections::HashMap;

use addonkit_api::CapabilitySpec;

/// Registry of every capability contributed by an enabled addon
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    /// `(kind, name)` -> registration
    entries: HashMap<(String, String), RegisteredCapability>,
}

/// A capability and the addon that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCapability {
    pub addon: String,
    pub spec: CapabilitySpec,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, addon: &str, specs: Vec<CapabilitySpec>) {
        for spec in specs {
            self.entries.insert(
                (spec.kind.clone(), spec.name.clone()),
                RegisteredCapability {
                    addon: addon.to_string(),
                    spec,
                },
            );
        }
    }

    /// Owner of a conflicting registration held by a different addon
    pub fn check_conflict(&self, addon: &str, spec: &CapabilitySpec) -> Option<&str> {
        self.entries
            .get(&(spec.kind.clone(), spec.name.clone()))
            .filter(|c| c.addon != addon)
            .map(|c| c.addon.as_str())
    }

    /// Remove everything `addon` registered
    pub fn unregister(&mut self, addon: &str) {
        self.entries.retain(|_, c| c.addon != addon);
    }

    pub fn find(&self, kind: &str, name: &str) -> Option<&RegisteredCapability> {
        self.entries.get(&(kind.to_string(), name.to_string()))
    }

    /// Capabilities of one addon, sorted by key
    pub fn by_addon(&self, addon: &str) -> Vec<&RegisteredCapability> {
        let mut found: Vec<_> = self.entries.values().filter(|c| c.addon == addon).collect();
        found.sort_by_key(|c| c.spec.key());
        found
    }

    /// Every registration, sorted by key
    pub fn all(&self) -> Vec<&RegisteredCapability> {
        let mut all: Vec<_> = self.entries.values().collect();
        all.sort_by_key(|c| c.spec.key());
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
