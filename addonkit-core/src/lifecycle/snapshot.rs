//! Point-in-time view of the installed addons, handed to addon code

use std::collections::HashMap;

use addonkit_api::AddonLookup;

use super::record::AddonRecord;
use crate::version;

/// Identifier to `(version, enabled)` as it stood when captured
#[derive(Debug, Clone, Default)]
pub struct AddonSnapshot {
    addons: HashMap<String, (String, bool)>,
}

impl AddonSnapshot {
    pub fn capture(records: &[AddonRecord]) -> Self {
        let addons = records
            .iter()
            .map(|r| {
                (
                    r.identifier().to_string(),
                    (r.manifest().version.clone(), r.is_enabled()),
                )
            })
            .collect();
        Self { addons }
    }
}

impl AddonLookup for AddonSnapshot {
    fn is_installed(&self, identifier: &str) -> bool {
        self.addons.contains_key(identifier)
    }

    fn is_available(&self, identifier: &str) -> bool {
        self.addons.get(identifier).is_some_and(|(_, enabled)| *enabled)
    }

    fn is_available_in_range(&self, identifier: &str, range: &str) -> bool {
        self.addons
            .get(identifier)
            .is_some_and(|(v, enabled)| *enabled && version::satisfies(v, Some(range)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, &str, bool)]) -> AddonSnapshot {
        AddonSnapshot {
            addons: entries
                .iter()
                .map(|(id, v, on)| (id.to_string(), (v.to_string(), *on)))
                .collect(),
        }
    }

    #[test]
    fn test_disabled_addon_is_installed_but_unavailable() {
        let s = snapshot(&[("spell", "1.2.0", false)]);
        assert!(s.is_installed("spell"));
        assert!(!s.is_available("spell"));
        assert!(!s.is_available_in_range("spell", "*"));
    }

    #[test]
    fn test_range_check_uses_installed_version() {
        let s = snapshot(&[("spell", "1.2.0", true)]);
        assert!(s.is_available_in_range("spell", "^1.0"));
        assert!(!s.is_available_in_range("spell", ">=2.0.0"));
        assert!(!s.is_installed("theme"));
    }
}
