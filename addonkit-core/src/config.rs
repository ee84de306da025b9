//! Addon host configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::packages::DEFAULT_PACKAGE_SOURCE;

/// Default meta store file name inside the addons root
pub const DEFAULT_META_FILE: &str = "meta.json";

/// Default timeout for registry requests
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Configuration for [`AddonManager`](crate::AddonManager)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddonHostConfig {
    /// Addons root: one subdirectory per addon
    #[serde(default = "addonkit_paths::addons_dir")]
    pub addons_dir: PathBuf,

    /// Meta store file name, relative to `addons_dir`
    #[serde(default = "default_meta_file")]
    pub meta_file: String,

    #[serde(default)]
    pub packages: PackageSourceConfig,
}

/// Where package dependencies come from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageSourceConfig {
    /// Flat-container base URL
    #[serde(default = "default_package_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Archive folders to probe for module files, most specific first.
    /// `None` uses the platform ladder.
    #[serde(default)]
    pub search_dirs: Option<Vec<String>>,
}

fn default_meta_file() -> String {
    DEFAULT_META_FILE.to_string()
}

fn default_package_url() -> String {
    DEFAULT_PACKAGE_SOURCE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for PackageSourceConfig {
    fn default() -> Self {
        Self {
            url: default_package_url(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            search_dirs: None,
        }
    }
}

impl PackageSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AddonHostConfig {
    fn default() -> Self {
        Self::with_addons_dir(addonkit_paths::addons_dir())
    }
}

impl AddonHostConfig {
    /// Defaults with a custom addons root
    pub fn with_addons_dir(addons_dir: impl Into<PathBuf>) -> Self {
        Self {
            addons_dir: addons_dir.into(),
            meta_file: default_meta_file(),
            packages: PackageSourceConfig::default(),
        }
    }

    pub fn addons_dir(&self) -> &Path {
        &self.addons_dir
    }

    pub fn meta_path(&self) -> PathBuf {
        self.addons_dir.join(&self.meta_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AddonHostConfig::with_addons_dir("/tmp/addons");
        assert_eq!(config.meta_path(), PathBuf::from("/tmp/addons/meta.json"));
        assert_eq!(config.packages.url, DEFAULT_PACKAGE_SOURCE);
        assert_eq!(config.packages.timeout(), Duration::from_secs(60));
        assert!(config.packages.search_dirs.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AddonHostConfig = toml::from_str(
            r#"
            addons_dir = "/srv/addons"

            [packages]
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.addons_dir, PathBuf::from("/srv/addons"));
        assert_eq!(config.meta_file, DEFAULT_META_FILE);
        assert_eq!(config.packages.timeout_secs, 5);
        assert_eq!(config.packages.url, DEFAULT_PACKAGE_SOURCE);
    }

    #[test]
    fn test_empty_toml_uses_xdg_addons_dir() {
        let config: AddonHostConfig = toml::from_str("").unwrap();
        assert!(config.addons_dir.ends_with("addons"));
    }
}
