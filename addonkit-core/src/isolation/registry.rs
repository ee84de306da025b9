//! Shared registry of isolation contexts and loaded modules

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::ModuleHandle;

/// Registry shared by every isolation context of one host.
///
/// A single lock guards both maps. It is only held for lookups and
/// mutations, never while a module is opened or an addon callback runs.
#[derive(Default)]
pub struct ModuleRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    /// Context identifier -> private directory
    contexts: HashMap<String, PathBuf>,
    /// Module identity -> loaded module
    modules: HashMap<String, RegisteredModule>,
}

struct RegisteredModule {
    owner: String,
    handle: Arc<dyn ModuleHandle>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // A panic while holding the lock leaves the maps consistent: every
        // mutation is a single insert or retain.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn register_context(&self, identifier: &str, dir: PathBuf) {
        let mut state = self.lock();
        if state.contexts.insert(identifier.to_string(), dir).is_some() {
            tracing::warn!(addon = %identifier, "Isolation context registered twice");
        }
    }

    /// Remove a context and every module it loaded.
    ///
    /// Returns the handles so the caller can drop them outside the lock.
    pub(crate) fn unregister_context(&self, identifier: &str) -> Vec<Arc<dyn ModuleHandle>> {
        let mut state = self.lock();
        state.contexts.remove(identifier);

        let owned: Vec<String> = state
            .modules
            .iter()
            .filter(|(_, m)| m.owner == identifier)
            .map(|(name, _)| name.clone())
            .collect();
        owned
            .into_iter()
            .filter_map(|name| state.modules.remove(&name))
            .map(|m| m.handle)
            .collect()
    }

    /// Record a module loaded by `owner`.
    ///
    /// When another context won a race for the same identity, its instance
    /// is returned and the new one is discarded.
    pub(crate) fn insert_module(
        &self,
        owner: &str,
        handle: Arc<dyn ModuleHandle>,
    ) -> Arc<dyn ModuleHandle> {
        let mut state = self.lock();
        let entry = state
            .modules
            .entry(handle.name().to_string())
            .or_insert_with(|| RegisteredModule {
                owner: owner.to_string(),
                handle: handle.clone(),
            });
        entry.handle.clone()
    }

    /// A module already loaded by any context
    pub fn cached(&self, name: &str) -> Option<Arc<dyn ModuleHandle>> {
        self.lock().modules.get(name).map(|m| m.handle.clone())
    }

    /// Private directories of every registered context except `except`,
    /// ordered by identifier
    pub fn sibling_dirs(&self, except: &str) -> Vec<(String, PathBuf)> {
        let state = self.lock();
        let mut siblings: Vec<(String, PathBuf)> = state
            .contexts
            .iter()
            .filter(|(id, _)| id.as_str() != except)
            .map(|(id, dir)| (id.clone(), dir.clone()))
            .collect();
        siblings.sort_by(|a, b| a.0.cmp(&b.0));
        siblings
    }

    pub fn is_registered(&self, identifier: &str) -> bool {
        self.lock().contexts.contains_key(identifier)
    }

    /// Context that loaded the module `name`
    pub fn owner_of(&self, name: &str) -> Option<String> {
        self.lock().modules.get(name).map(|m| m.owner.clone())
    }

    pub fn context_count(&self) -> usize {
        self.lock().contexts.len()
    }

    pub fn module_count(&self) -> usize {
        self.lock().modules.len()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ModuleRegistry")
            .field("contexts", &state.contexts.len())
            .field("modules", &state.modules.len())
            .finish()
    }
}
