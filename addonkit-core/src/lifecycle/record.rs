//! One installed or built-in addon and its runtime state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use addonkit_api::{Addon, AddonManifest, Dependency};
use serde::Serialize;

use crate::graph::GraphNode;
use crate::isolation::IsolationContext;
use crate::loading_error::LoadingError;

/// Lifecycle state. `Installed` doubles as the "any state" filter in queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonState {
    Installed,
    Enabled,
    Disabled,
}

impl AddonState {
    /// Does a record in state `self` match the query `filter`?
    pub fn matches(self, filter: AddonState) -> bool {
        filter == AddonState::Installed || self == filter
    }
}

impl std::fmt::Display for AddonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Installed => "installed",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        })
    }
}

/// An addon known to the manager.
///
/// Field order matters: the instance is dropped before the isolation context
/// that keeps its module loaded.
pub struct AddonRecord {
    pub(crate) addon: Box<dyn Addon>,
    pub(crate) manifest: AddonManifest,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) state: AddonState,
    pub(crate) module_path: Option<PathBuf>,
    pub(crate) errors: Vec<LoadingError>,
    pub(crate) needs_restart: bool,
    pub(crate) builtin: bool,
    pub(crate) context: Option<Arc<IsolationContext>>,
}

impl AddonRecord {
    /// Metadata and dependencies are read once here and never again
    pub(crate) fn new(
        addon: Box<dyn Addon>,
        manifest: AddonManifest,
        dependencies: Vec<Dependency>,
        module_path: Option<PathBuf>,
        context: Option<Arc<IsolationContext>>,
    ) -> Self {
        Self {
            addon,
            manifest,
            dependencies,
            state: AddonState::Installed,
            module_path,
            errors: Vec::new(),
            needs_restart: false,
            builtin: false,
            context,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.manifest.identifier
    }

    pub fn name(&self) -> &str {
        if self.manifest.name.is_empty() {
            &self.manifest.identifier
        } else {
            &self.manifest.name
        }
    }

    pub fn manifest(&self) -> &AddonManifest {
        &self.manifest
    }

    pub fn state(&self) -> AddonState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == AddonState::Enabled
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub fn needs_restart(&self) -> bool {
        self.needs_restart
    }

    pub fn module_path(&self) -> Option<&Path> {
        self.module_path.as_deref()
    }

    /// The addon's private directory, if it has one
    pub fn addon_dir(&self) -> Option<&Path> {
        self.context.as_deref().map(IsolationContext::dir)
    }

    pub fn errors(&self) -> &[LoadingError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_critical_errors(&self) -> bool {
        self.errors.iter().any(LoadingError::is_critical)
    }

    /// Append one phase's errors in a single step
    pub(crate) fn push_errors(&mut self, phase: Vec<LoadingError>) {
        if !phase.is_empty() {
            let mut errors = std::mem::take(&mut self.errors);
            errors.extend(phase);
            self.errors = errors;
        }
    }

    /// Drop the instance, then release the isolation context
    pub(crate) fn teardown(self) {
        let Self { addon, context, .. } = self;
        drop(addon);
        if let Some(context) = context {
            context.unload();
        }
    }

    pub fn summary(&self) -> AddonSummary {
        AddonSummary {
            identifier: self.identifier().to_string(),
            name: self.name().to_string(),
            version: self.manifest.version.clone(),
            description: self.manifest.description.clone(),
            state: self.state,
            builtin: self.builtin,
            needs_restart: self.needs_restart,
            module_path: self.module_path.clone(),
            errors: self.errors.iter().map(ToString::to_string).collect(),
            has_critical_errors: self.has_critical_errors(),
        }
    }
}

impl GraphNode for AddonRecord {
    fn identifier(&self) -> &str {
        &self.manifest.identifier
    }

    fn version(&self) -> &str {
        &self.manifest.version
    }

    fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }
}

impl std::fmt::Debug for AddonRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonRecord")
            .field("identifier", &self.manifest.identifier)
            .field("state", &self.state)
            .field("builtin", &self.builtin)
            .field("errors", &self.errors)
            .finish()
    }
}

/// Read-only snapshot of a record for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddonSummary {
    pub identifier: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub state: AddonState,
    pub builtin: bool,
    pub needs_restart: bool,
    pub module_path: Option<PathBuf>,
    pub errors: Vec<String>,
    pub has_critical_errors: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAddon;

    fn record(id: &str) -> AddonRecord {
        let addon = MockAddon::new(id, "1.0.0");
        let manifest = addon.manifest();
        AddonRecord::new(Box::new(addon), manifest, Vec::new(), None, None)
    }

    #[test]
    fn test_installed_filter_matches_everything() {
        assert!(AddonState::Enabled.matches(AddonState::Installed));
        assert!(AddonState::Disabled.matches(AddonState::Installed));
        assert!(AddonState::Enabled.matches(AddonState::Enabled));
        assert!(!AddonState::Disabled.matches(AddonState::Enabled));
    }

    #[test]
    fn test_push_errors_appends_phase() {
        let mut record = record("a");
        record.push_errors(vec![LoadingError::RestartRequired { name: "a".into() }]);
        assert!(record.has_errors());
        assert!(!record.has_critical_errors());

        record.push_errors(vec![LoadingError::load_exception("boom")]);
        assert_eq!(record.errors().len(), 2);
        assert!(record.has_critical_errors());
    }

    #[test]
    fn test_summary_renders_errors() {
        let mut record = record("a");
        record.push_errors(vec![LoadingError::MissingDependency {
            identifier: "b".into(),
        }]);

        let summary = record.summary();
        assert_eq!(summary.identifier, "a");
        assert_eq!(summary.state, AddonState::Installed);
        assert_eq!(
            summary.errors,
            vec!["The addon requires the addon 'b' to be loaded."]
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["state"], "installed");
    }

    #[test]
    fn test_name_falls_back_to_identifier() {
        let record = record("plain");
        assert_eq!(record.name(), "plain");
    }
}
