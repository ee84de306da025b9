//! Per-addon loading boundaries.
//!
//! Every addon gets an [`IsolationContext`] that resolves its own module file
//! and the library files in its private directory. Contexts register in a
//! shared [`ModuleRegistry`] so a module loaded once is reused everywhere and
//! so an addon can find a library that ships alongside a sibling addon.
//! Tearing a context down releases everything it loaded without touching the
//! other contexts.

mod context;
mod native;
mod registry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use addonkit_api::Addon;

use crate::error::IsolationError;

pub use context::{IsolationContext, Resolution};
pub use native::NativeModuleLoader;
pub use registry::ModuleRegistry;

/// A loaded module. Dropping the last handle releases the module.
pub trait ModuleHandle: Send + Sync {
    /// Module identity: the file stem
    fn name(&self) -> &str;

    fn path(&self) -> &Path;

    /// Create the addon instances the module exports.
    ///
    /// A plain library exports none.
    fn instantiate(&self) -> Result<Vec<Box<dyn Addon>>, IsolationError>;
}

/// Opens module files
pub trait ModuleLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Arc<dyn ModuleHandle>, IsolationError>;
}

/// Shared library extension for the current platform
pub fn platform_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

/// `<name>.<ext>` for the current platform
pub fn module_file_name(name: &str) -> String {
    format!("{}.{}", name, platform_extension())
}

/// Locate a module named `name` inside `dir`.
///
/// Also accepts `lib<name>.<ext>`, the name cargo gives `cdylib` output on
/// unix.
pub fn find_module_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(module_file_name(name));
    if exact.is_file() {
        return Some(exact);
    }
    let prefixed = dir.join(format!("lib{}", module_file_name(name)));
    prefixed.is_file().then_some(prefixed)
}

/// Module identity of a path: its file stem
pub fn module_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}
