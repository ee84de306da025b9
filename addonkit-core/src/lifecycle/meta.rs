//! Meta store - which addons were enabled last session

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ManagerError;

/// Flat JSON object `{ "identifier": true | false }` in the addons root
#[derive(Debug)]
pub struct MetaStore {
    path: PathBuf,
    entries: BTreeMap<String, bool>,
}

impl MetaStore {
    /// Read the store.
    ///
    /// A missing or unreadable file is treated as empty and immediately
    /// rewritten as empty.
    pub fn load(path: &Path) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<BTreeMap<String, bool>>(&content).map_err(|e| e.to_string())
            });

        match parsed {
            Ok(entries) => Self {
                path: path.to_path_buf(),
                entries,
            },
            Err(reason) => {
                if path.exists() {
                    tracing::warn!(
                        path = %path.display(),
                        %reason,
                        "Unreadable meta store, starting empty"
                    );
                }
                let store = Self {
                    path: path.to_path_buf(),
                    entries: BTreeMap::new(),
                };
                if let Err(e) = store.save() {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "Failed to write meta store"
                    );
                }
                store
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Preference recorded for `identifier`, if any
    pub fn get(&self, identifier: &str) -> Option<bool> {
        self.entries.get(identifier).copied()
    }

    /// Only an explicit `false` keeps an addon disabled
    pub fn is_disabled(&self, identifier: &str) -> bool {
        self.get(identifier) == Some(false)
    }

    pub fn set(&mut self, identifier: &str, enabled: bool) {
        self.entries.insert(identifier.to_string(), enabled);
    }

    pub fn remove(&mut self, identifier: &str) {
        self.entries.remove(identifier);
    }

    pub fn entries(&self) -> &BTreeMap<String, bool> {
        &self.entries
    }

    pub fn save(&self) -> Result<(), ManagerError> {
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| ManagerError::Meta(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
