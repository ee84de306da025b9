use addonkit_core::AddonHostConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration as stored in TOML files (optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCliConfig {
    /// Version the headless host reports to addons
    pub host_version: Option<String>,

    #[serde(default)]
    pub addons: RawAddonsConfig,

    #[serde(default)]
    pub packages: RawPackagesConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAddonsConfig {
    /// Addons root
    pub dir: Option<PathBuf>,

    /// Meta store file name inside the addons root
    pub meta_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPackagesConfig {
    /// Package registry base URL
    pub url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Archive folders searched for module files
    pub search_dirs: Option<Vec<String>>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CliConfig {
    pub host_version: String,

    /// Passed to the addon manager as-is
    pub host: AddonHostConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            host_version: env!("CARGO_PKG_VERSION").to_string(),
            host: AddonHostConfig::default(),
        }
    }
}
