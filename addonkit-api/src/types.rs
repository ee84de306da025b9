//! Addon metadata and dependency declarations

use serde::{Deserialize, Serialize};

/// Addon manifest containing metadata about the addon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddonManifest {
    /// Unique identifier, also used as the key in the meta store
    pub identifier: String,
    /// Human-readable name shown in prompts and listings
    pub name: String,
    /// Addon version (`major.minor.build.revision`, trailing parts optional)
    pub version: String,
    /// API version this addon was built against
    pub api_version: u32,
    /// Human-readable description
    pub description: String,
    /// Addon author
    pub author: String,
    /// Lowest host version this addon runs on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_host_version: Option<String>,
    /// Highest host version this addon runs on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_host_version: Option<String>,
}

impl Default for AddonManifest {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            name: String::new(),
            version: "0.0.1".to_string(),
            api_version: crate::API_VERSION,
            description: String::new(),
            author: String::new(),
            min_host_version: None,
            max_host_version: None,
        }
    }
}

/// A dependency declared by an addon. Read-only once the addon is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dependency {
    /// Another addon that must be loaded (and enabled) alongside this one
    Addon {
        /// Identifier of the target addon
        identifier: String,
        /// Optional range such as `^1.2.0` or `>=1.0 <2.0`
        version_range: Option<String>,
        /// Whether absence or incompatibility blocks enabling
        required: bool,
    },
    /// A published package that must materialize as a module file in the
    /// addon's directory
    Package {
        /// Package identifier in the registry
        package_id: String,
        /// Local module name (file stem) the package provides
        module_name: String,
        /// Exact version to fetch, or minimum version to accept locally
        version: Option<String>,
        /// Whether a failure blocks enabling
        required: bool,
    },
}

impl Dependency {
    /// Required dependency on another addon, any version
    pub fn addon(identifier: impl Into<String>) -> Self {
        Self::Addon {
            identifier: identifier.into(),
            version_range: None,
            required: true,
        }
    }

    /// Required dependency on a published package, latest version
    pub fn package(package_id: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self::Package {
            package_id: package_id.into(),
            module_name: module_name.into(),
            version: None,
            required: true,
        }
    }

    /// Constrain the version: a range for addon dependencies, an exact or
    /// minimum version for package dependencies
    pub fn with_version(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            Self::Addon { version_range, .. } => *version_range = Some(value.into()),
            Self::Package { version, .. } => *version = Some(value.into()),
        }
        self
    }

    /// Mark the dependency optional
    pub fn optional(mut self) -> Self {
        match &mut self {
            Self::Addon { required, .. } | Self::Package { required, .. } => *required = false,
        }
        self
    }

    pub fn is_required(&self) -> bool {
        match self {
            Self::Addon { required, .. } | Self::Package { required, .. } => *required,
        }
    }

    /// Target identifier if this is an addon dependency
    pub fn addon_identifier(&self) -> Option<&str> {
        match self {
            Self::Addon { identifier, .. } => Some(identifier),
            Self::Package { .. } => None,
        }
    }
}

/// Something an addon contributes to the host while enabled
/// (a command, a file type handler, a settings page, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilitySpec {
    /// Capability family, e.g. `command` or `language`
    pub kind: String,
    /// Name unique within the family
    pub name: String,
    /// Short description for listings
    pub description: String,
}

impl CapabilitySpec {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// `kind:name`, the key used for conflict detection
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_default_version() {
        let manifest = AddonManifest::default();
        assert_eq!(manifest.version, "0.0.1");
        assert!(manifest.min_host_version.is_none());
    }

    #[test]
    fn test_dependency_builders() {
        let dep = Dependency::addon("core-lib").with_version("^1.0").optional();
        assert_eq!(
            dep,
            Dependency::Addon {
                identifier: "core-lib".into(),
                version_range: Some("^1.0".into()),
                required: false,
            }
        );
        assert_eq!(dep.addon_identifier(), Some("core-lib"));

        let dep = Dependency::package("Serde.Json", "serde_json").with_version("1.2.0");
        assert!(dep.is_required());
        assert_eq!(dep.addon_identifier(), None);
    }

    #[test]
    fn test_dependency_serializes_tagged() {
        let dep = Dependency::package("Acme.Zip", "acme_zip");
        let json = serde_json::to_value(&dep).unwrap();
        assert_eq!(json["type"], "package");
        assert_eq!(json["module_name"], "acme_zip");
    }

    #[test]
    fn test_capability_key() {
        let spec = CapabilitySpec::new("command", "format", "Format the document");
        assert_eq!(spec.key(), "command:format");
    }
}
