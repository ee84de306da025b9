//! IsolationContext - one addon's module resolution boundary

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use addonkit_api::{AddonError, ModuleResolver};

use super::{ModuleHandle, ModuleLoader, ModuleRegistry, find_module_file, module_name};
use crate::error::IsolationError;

/// Where a module request would be satisfied
pub enum Resolution {
    /// Already loaded by some context
    Cached(Arc<dyn ModuleHandle>),
    /// File in the requesting addon's own directory
    Own(PathBuf),
    /// File found next to a sibling addon
    Sibling { owner: String, path: PathBuf },
    /// Nothing addon-specific; the host's own resolution applies
    Host,
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cached(handle) => write!(f, "Cached({})", handle.name()),
            Self::Own(path) => write!(f, "Own({})", path.display()),
            Self::Sibling { owner, path } => write!(f, "Sibling({owner}, {})", path.display()),
            Self::Host => f.write_str("Host"),
        }
    }
}

/// Loading boundary owned by exactly one addon.
///
/// Registered in the shared registry on creation and unregistered on
/// [`IsolationContext::unload`] or drop, whichever comes first.
pub struct IsolationContext {
    identifier: String,
    main_module: PathBuf,
    dir: PathBuf,
    registry: Arc<ModuleRegistry>,
    loader: Arc<dyn ModuleLoader>,
    /// Modules this context keeps alive, its own and borrowed cached ones
    held: Mutex<Vec<Arc<dyn ModuleHandle>>>,
    unloaded: AtomicBool,
}

impl IsolationContext {
    pub fn new(
        identifier: impl Into<String>,
        main_module: impl Into<PathBuf>,
        registry: Arc<ModuleRegistry>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        let identifier = identifier.into();
        let main_module = main_module.into();
        let dir = main_module
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        registry.register_context(&identifier, dir.clone());

        Self {
            identifier,
            main_module,
            dir,
            registry,
            loader,
            held: Mutex::new(Vec::new()),
            unloaded: AtomicBool::new(false),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The addon's private directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn main_module(&self) -> &Path {
        &self.main_module
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::Acquire)
    }

    /// Decide where a request for module `name` would be satisfied:
    /// shared cache, own directory, a sibling's directory, then the host.
    pub fn resolve(&self, name: &str) -> Resolution {
        if let Some(handle) = self.registry.cached(name) {
            return Resolution::Cached(handle);
        }

        if let Some(path) = find_module_file(&self.dir, name) {
            return Resolution::Own(path);
        }

        for (owner, dir) in self.registry.sibling_dirs(&self.identifier) {
            if let Some(path) = find_module_file(&dir, name) {
                return Resolution::Sibling { owner, path };
            }
        }

        Resolution::Host
    }

    /// Load module `name` following [`IsolationContext::resolve`].
    ///
    /// `Ok(None)` means the host's own resolution should handle it.
    pub fn load(&self, name: &str) -> Result<Option<Arc<dyn ModuleHandle>>, IsolationError> {
        self.ensure_live()?;
        match self.resolve(name) {
            Resolution::Cached(handle) => Ok(Some(self.hold(handle))),
            Resolution::Own(path) => self.open_and_register(&path).map(Some),
            Resolution::Sibling { owner, path } => {
                tracing::debug!(
                    addon = %self.identifier,
                    sibling = %owner,
                    module = %name,
                    "Resolved module from sibling addon"
                );
                self.open_and_register(&path).map(Some)
            }
            Resolution::Host => Ok(None),
        }
    }

    /// Load a specific file, reusing a cached module with the same identity
    pub fn load_file(&self, path: &Path) -> Result<Arc<dyn ModuleHandle>, IsolationError> {
        self.ensure_live()?;
        if let Some(handle) = self.registry.cached(&module_name(path)) {
            return Ok(self.hold(handle));
        }
        self.open_and_register(path)
    }

    /// Load the addon's own module file
    pub fn load_main(&self) -> Result<Arc<dyn ModuleHandle>, IsolationError> {
        let path = self.main_module.clone();
        self.load_file(&path)
    }

    /// Tear the context down: unregister it, drop the modules it loaded from
    /// the shared cache and release its own references. Idempotent.
    pub fn unload(&self) {
        if self.unloaded.swap(true, Ordering::AcqRel) {
            return;
        }

        let released = self.registry.unregister_context(&self.identifier);
        let held = match self.held.lock() {
            Ok(mut held) => std::mem::take(&mut *held),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        tracing::debug!(
            addon = %self.identifier,
            released = released.len(),
            held = held.len(),
            "Isolation context unloaded"
        );
        drop(released);
        drop(held);
    }

    fn ensure_live(&self) -> Result<(), IsolationError> {
        if self.is_unloaded() {
            return Err(IsolationError::Unloaded {
                identifier: self.identifier.clone(),
            });
        }
        Ok(())
    }

    fn open_and_register(&self, path: &Path) -> Result<Arc<dyn ModuleHandle>, IsolationError> {
        // Opened without the registry lock; a concurrent load of the same
        // identity resolves to whichever insert lands first.
        let opened = self.loader.open(path)?;
        let handle = self.registry.insert_module(&self.identifier, opened);
        Ok(self.hold(handle))
    }

    fn hold(&self, handle: Arc<dyn ModuleHandle>) -> Arc<dyn ModuleHandle> {
        let mut held = self.held.lock().unwrap_or_else(|p| p.into_inner());
        if !held.iter().any(|h| Arc::ptr_eq(h, &handle)) {
            held.push(handle.clone());
        }
        handle
    }
}

impl Drop for IsolationContext {
    fn drop(&mut self) {
        self.unload();
    }
}

impl std::fmt::Debug for IsolationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolationContext")
            .field("identifier", &self.identifier)
            .field("main_module", &self.main_module)
            .field("unloaded", &self.is_unloaded())
            .finish()
    }
}

impl ModuleResolver for IsolationContext {
    fn resolve_module(&self, name: &str) -> Result<Option<PathBuf>, AddonError> {
        self.load(name)
            .map(|handle| handle.map(|h| h.path().to_path_buf()))
            .map_err(|e| AddonError::Unavailable(e.to_string()))
    }
}
