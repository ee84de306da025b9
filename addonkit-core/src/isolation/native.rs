//! Native module loading using libloading

use std::path::{Path, PathBuf};
use std::sync::Arc;

use addonkit_api::{API_VERSION, API_VERSION_SYMBOL, Addon, CREATE_SYMBOL};
use libloading::{Library, Symbol};

use super::{ModuleHandle, ModuleLoader, module_name};
use crate::error::IsolationError;

/// Opens modules as shared libraries
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeModuleLoader;

impl ModuleLoader for NativeModuleLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn ModuleHandle>, IsolationError> {
        if !path.is_file() {
            return Err(IsolationError::ModuleNotFound {
                path: path.to_path_buf(),
            });
        }

        // SAFETY: the module sits in the addons root the user installed it to.
        // Isolation here is about lifecycle, not about containing hostile code.
        let library = unsafe { Library::new(path)? };
        tracing::debug!(path = %path.display(), "Opened module");

        Ok(Arc::new(NativeModule {
            name: module_name(path),
            path: path.to_path_buf(),
            library,
        }))
    }
}

struct NativeModule {
    name: String,
    path: PathBuf,
    library: Library,
}

impl ModuleHandle for NativeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn instantiate(&self) -> Result<Vec<Box<dyn Addon>>, IsolationError> {
        // SAFETY: symbol lookup only; a module without the entry points is a
        // plain library.
        let api_version: Symbol<extern "C" fn() -> u32> =
            match unsafe { self.library.get(API_VERSION_SYMBOL) } {
                Ok(symbol) => symbol,
                Err(_) => return Ok(Vec::new()),
            };

        let found = api_version();
        if found != API_VERSION {
            return Err(IsolationError::ApiVersionMismatch {
                expected: API_VERSION,
                found,
            });
        }

        // SAFETY: modules exporting the version symbol are built with
        // `export_addon!`, which defines the factory with this signature.
        let create: Symbol<extern "C" fn() -> *mut dyn Addon> =
            unsafe { self.library.get(CREATE_SYMBOL)? };

        let raw = create();
        if raw.is_null() {
            return Err(IsolationError::NullInstance {
                path: self.path.clone(),
            });
        }

        // SAFETY: the pointer came from `Box::into_raw` in the factory. The
        // handle must outlive the box; the addon record drops its instance
        // before its isolation context.
        Ok(vec![unsafe { Box::from_raw(raw) }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = NativeModuleLoader.open(&dir.path().join("missing.so"));
        assert!(matches!(result, Err(IsolationError::ModuleNotFound { .. })));
    }

    #[test]
    fn test_open_non_library_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(super::super::module_file_name("junk"));
        std::fs::write(&path, b"definitely not a shared object").unwrap();

        let result = NativeModuleLoader.open(&path);
        assert!(matches!(result, Err(IsolationError::LibraryLoad(_))));
    }
}
