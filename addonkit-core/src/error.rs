//! Error types for the addon host

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while opening addon modules and resolving module files
#[derive(Error, Debug)]
pub enum IsolationError {
    /// Failed to open a dynamic library
    #[error("Failed to load module library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// Module was built against a different addon API
    #[error("API version mismatch: host expects {expected}, module has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// Factory returned a null instance
    #[error("Module {path} returned a null addon instance")]
    NullInstance { path: PathBuf },

    /// Module file does not exist
    #[error("Module file not found: {path}")]
    ModuleNotFound { path: PathBuf },

    /// Context was already torn down
    #[error("Isolation context for '{identifier}' has been unloaded")]
    Unloaded { identifier: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while materializing a package dependency
#[derive(Error, Debug)]
pub enum PackageError {
    /// Transport or HTTP status failure talking to the registry
    #[error("Package registry request failed: {0}")]
    Registry(#[from] reqwest::Error),

    /// Registry does not know the package
    #[error("Package '{package}' not found in registry")]
    PackageNotFound { package: String },

    /// Requested version is not published
    #[error("Version {version} of package '{package}' is not available")]
    VersionNotAvailable { package: String, version: String },

    /// Requested version string does not parse
    #[error("Invalid version '{version}' requested for package '{package}'")]
    InvalidVersion { package: String, version: String },

    /// Archive could not be read
    #[error("Invalid package archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// No candidate path in the archive carried the module file
    #[error("Module '{file}' not found in package '{package}'")]
    ModuleNotInArchive { package: String, file: String },

    /// Installed-version receipt could not be read or written
    #[error("Package receipt error: {0}")]
    Receipt(String),

    /// Loading the extracted module failed
    #[error("Failed to load package module: {0}")]
    Load(#[from] IsolationError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by the addon manager's operations
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Addon identifier not known
    #[error("Addon '{identifier}' not found")]
    NotFound { identifier: String },

    /// The built-in addon cannot be disabled or deleted
    #[error("The built-in addon '{identifier}' cannot be {action}")]
    BuiltinProtected {
        identifier: String,
        action: &'static str,
    },

    /// `start` was called twice
    #[error("Addon manager already started")]
    AlreadyStarted,

    /// Package source could not be set up
    #[error(transparent)]
    Package(#[from] PackageError),

    /// Meta store could not be read or written
    #[error("Meta store error: {0}")]
    Meta(String),

    /// Directory does not contain a loadable addon
    #[error("No addon module found in {dir}")]
    NoModule { dir: PathBuf },

    /// Module was rejected during discovery
    #[error("Failed to load addon from {path}: {reason}")]
    Discovery { path: PathBuf, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_mismatch_display() {
        let err = IsolationError::ApiVersionMismatch {
            expected: 1,
            found: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("expects 1"));
        assert!(msg.contains("has 2"));
    }

    #[test]
    fn test_version_not_available_display() {
        let err = PackageError::VersionNotAvailable {
            package: "Acme.Zip".into(),
            version: "9.9.9".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Acme.Zip"));
        assert!(msg.contains("9.9.9"));
    }

    #[test]
    fn test_builtin_protected_display() {
        let err = ManagerError::BuiltinProtected {
            identifier: "core".into(),
            action: "deleted",
        };
        assert_eq!(err.to_string(), "The built-in addon 'core' cannot be deleted");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ManagerError = io_err.into();
        assert!(matches!(err, ManagerError::Io(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PackageError = io_err.into();
        assert!(matches!(err, PackageError::Io(_)));
    }

    #[test]
    fn test_isolation_error_wraps_into_package_error() {
        let err: PackageError = IsolationError::ModuleNotFound {
            path: PathBuf::from("/addons/a/dep.so"),
        }
        .into();
        assert!(err.to_string().contains("/addons/a/dep.so"));
    }
}
