//! Installed-package receipt - which package version produced each module
//! file in an addon directory

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::PackageError;
use crate::version::Version;

/// Receipt file name inside an addon directory
pub const RECEIPT_FILE: &str = "packages.toml";

/// Stored as TOML next to the module files it describes
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageReceipt {
    #[serde(default)]
    pub modules: BTreeMap<String, ReceiptEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptEntry {
    pub package: String,
    pub version: String,
}

impl PackageReceipt {
    /// Load the receipt of an addon directory.
    ///
    /// Returns an empty receipt if the file doesn't exist.
    pub fn load(dir: &Path) -> Result<Self, PackageError> {
        let path = dir.join(RECEIPT_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PackageError::Receipt(e.to_string()))
    }

    pub fn save(&self, dir: &Path) -> Result<(), PackageError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PackageError::Receipt(e.to_string()))?;
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(RECEIPT_FILE), content)?;
        Ok(())
    }

    pub fn record(&mut self, module: &str, package: &str, version: &str) {
        self.modules.insert(
            module.to_string(),
            ReceiptEntry {
                package: package.to_string(),
                version: version.to_string(),
            },
        );
    }

    pub fn installed_version(&self, module: &str) -> Option<&str> {
        self.modules.get(module).map(|e| e.version.as_str())
    }
}

/// Whether an installed module satisfies a requested version.
///
/// No request accepts anything. Otherwise the installed version must be
/// known, parse, and be at least the requested one.
pub fn accepts_installed(installed: Option<&str>, requested: Option<&str>) -> bool {
    let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
        return true;
    };
    match (installed.map(Version::parse), Version::parse(requested)) {
        (Some(Ok(installed)), Ok(requested)) => installed >= requested,
        _ => false,
    }
}
