//! AddonContext - an addon's interface to the host while it is being enabled

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AddonError;
use crate::types::CapabilitySpec;

/// Finds and loads modules by name on behalf of one addon.
///
/// Lookup order is the shared cache, the addon's own directory, sibling
/// addons' directories, then the host.
pub trait ModuleResolver: Send + Sync {
    /// Path of the loaded module, or `None` when no addon provides it and
    /// the host's own resolution applies
    fn resolve_module(&self, name: &str) -> Result<Option<PathBuf>, AddonError>;
}

/// Read-only view of the installed addons
pub trait AddonLookup: Send + Sync {
    fn is_installed(&self, identifier: &str) -> bool;

    /// Installed and enabled
    fn is_available(&self, identifier: &str) -> bool;

    /// Installed, enabled and at a version inside `range`
    fn is_available_in_range(&self, identifier: &str, range: &str) -> bool;
}

/// Handed to an addon during its enable callbacks.
///
/// Capabilities registered here stay pending until the host accepts the
/// enable; a failed enable discards them. Addon queries answer for the
/// moment the enable attempt started.
pub struct AddonContext {
    identifier: String,
    addon_dir: PathBuf,
    host_version: String,
    pending_capabilities: Vec<CapabilitySpec>,
    resolver: Option<Arc<dyn ModuleResolver>>,
    addons: Option<Arc<dyn AddonLookup>>,
}

impl AddonContext {
    /// Create a new context for one enable attempt
    pub fn new(
        identifier: impl Into<String>,
        addon_dir: impl Into<PathBuf>,
        host_version: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            addon_dir: addon_dir.into(),
            host_version: host_version.into(),
            pending_capabilities: Vec::new(),
            resolver: None,
            addons: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_addons(mut self, addons: Arc<dyn AddonLookup>) -> Self {
        self.addons = Some(addons);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The addon's private directory. Empty for the built-in addon.
    pub fn addon_dir(&self) -> &Path {
        &self.addon_dir
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    /// Register a capability to be published once the addon is enabled
    pub fn register_capability(&mut self, spec: CapabilitySpec) -> Result<(), AddonError> {
        if self
            .pending_capabilities
            .iter()
            .any(|c| c.kind == spec.kind && c.name == spec.name)
        {
            return Err(AddonError::DuplicateCapability(spec.key()));
        }
        self.pending_capabilities.push(spec);
        Ok(())
    }

    pub fn pending_capabilities(&self) -> &[CapabilitySpec] {
        &self.pending_capabilities
    }

    /// Take ownership of pending capabilities (called by the host)
    pub fn take_pending_capabilities(&mut self) -> Vec<CapabilitySpec> {
        std::mem::take(&mut self.pending_capabilities)
    }

    /// Load a module by name.
    ///
    /// `Ok(None)` means no addon ships it; fall back to the system loader.
    pub fn load_module(&self, name: &str) -> Result<Option<PathBuf>, AddonError> {
        match &self.resolver {
            Some(resolver) => resolver.resolve_module(name),
            None => Ok(None),
        }
    }

    pub fn is_addon_installed(&self, identifier: &str) -> bool {
        self.addons.as_ref().is_some_and(|a| a.is_installed(identifier))
    }

    /// Whether an addon is enabled, for degrading gracefully without an
    /// optional dependency
    pub fn is_addon_available(&self, identifier: &str) -> bool {
        self.addons.as_ref().is_some_and(|a| a.is_available(identifier))
    }

    pub fn is_addon_available_in_range(&self, identifier: &str, range: &str) -> bool {
        self.addons
            .as_ref()
            .is_some_and(|a| a.is_available_in_range(identifier, range))
    }

    pub fn log_info(&self, message: &str) {
        tracing::info!(addon = %self.identifier, "{}", message);
    }

    pub fn log_warn(&self, message: &str) {
        tracing::warn!(addon = %self.identifier, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        tracing::error!(addon = %self.identifier, "{}", message);
    }

    pub fn log_debug(&self, message: &str) {
        tracing::debug!(addon = %self.identifier, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_accessors() {
        let dir = TempDir::new().unwrap();
        let ctx = AddonContext::new("hello", dir.path(), "2.1.0");
        assert_eq!(ctx.identifier(), "hello");
        assert_eq!(ctx.addon_dir(), dir.path());
        assert_eq!(ctx.host_version(), "2.1.0");
    }

    #[test]
    fn test_register_capability_rejects_duplicates() {
        let mut ctx = AddonContext::new("hello", "", "1.0");
        ctx.register_capability(CapabilitySpec::new("command", "greet", "Say hi"))
            .unwrap();

        let err = ctx
            .register_capability(CapabilitySpec::new("command", "greet", "Again"))
            .unwrap_err();
        assert!(matches!(err, AddonError::DuplicateCapability(_)));

        // Same name in a different family is fine
        ctx.register_capability(CapabilitySpec::new("language", "greet", "Greeting files"))
            .unwrap();
        assert_eq!(ctx.pending_capabilities().len(), 2);
    }

    struct Fixed;

    impl ModuleResolver for Fixed {
        fn resolve_module(&self, name: &str) -> Result<Option<PathBuf>, AddonError> {
            Ok((name == "zlib").then(|| PathBuf::from("/addons/net/zlib.so")))
        }
    }

    impl AddonLookup for Fixed {
        fn is_installed(&self, identifier: &str) -> bool {
            identifier == "spell" || identifier == "theme"
        }

        fn is_available(&self, identifier: &str) -> bool {
            identifier == "spell"
        }

        fn is_available_in_range(&self, identifier: &str, range: &str) -> bool {
            identifier == "spell" && range == "^1.0"
        }
    }

    #[test]
    fn test_queries_without_host_views() {
        let ctx = AddonContext::new("hello", "", "1.0");
        assert_eq!(ctx.load_module("zlib").unwrap(), None);
        assert!(!ctx.is_addon_installed("spell"));
        assert!(!ctx.is_addon_available("spell"));
        assert!(!ctx.is_addon_available_in_range("spell", "*"));
    }

    #[test]
    fn test_queries_delegate_to_host_views() {
        let ctx = AddonContext::new("hello", "", "1.0")
            .with_resolver(Arc::new(Fixed))
            .with_addons(Arc::new(Fixed));

        assert_eq!(
            ctx.load_module("zlib").unwrap(),
            Some(PathBuf::from("/addons/net/zlib.so"))
        );
        assert_eq!(ctx.load_module("libc").unwrap(), None);
        assert!(ctx.is_addon_installed("theme"));
        assert!(!ctx.is_addon_available("theme"));
        assert!(ctx.is_addon_available_in_range("spell", "^1.0"));
        assert!(!ctx.is_addon_available_in_range("spell", "^2.0"));
    }

    #[test]
    fn test_take_pending_capabilities_drains() {
        let mut ctx = AddonContext::new("hello", "", "1.0");
        ctx.register_capability(CapabilitySpec::new("command", "greet", ""))
            .unwrap();

        let taken = ctx.take_pending_capabilities();
        assert_eq!(taken.len(), 1);
        assert!(ctx.pending_capabilities().is_empty());
    }
}
