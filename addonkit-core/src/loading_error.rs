//! Why an addon failed to load or enable.
//!
//! Errors accumulate on an addon's record. Any critical error keeps the addon
//! from being enabled until the cause is fixed.

use thiserror::Error;

/// A recorded reason an addon could not be loaded or enabled
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadingError {
    /// Host is older than the addon's minimum host version
    #[error("The addon requires a newer version of the host ({required} and you have {current}).")]
    OutdatedHost { required: String, current: String },

    /// Host is newer than the addon's maximum host version
    #[error("The addon requires a newer version of itself ({maximum} and you have {current}).")]
    OutdatedAddon { maximum: String, current: String },

    /// An addon callback returned an error or panicked
    #[error("An exception occurred while loading the addon: {message}")]
    LoadException { message: String },

    /// A required addon dependency is not installed
    #[error("The addon requires the addon '{identifier}' to be loaded.")]
    MissingDependency { identifier: String },

    /// A required addon dependency is installed but not enabled
    #[error("The addon requires '{identifier}' to be enabled, but it is currently disabled.")]
    DependencyNotEnabled { identifier: String },

    /// A required addon dependency is installed at a version outside the declared range
    #[error("The addon requires '{identifier}' version {required}, but version {found} is installed.")]
    IncompatibleAddonVersion {
        identifier: String,
        required: String,
        found: String,
    },

    /// A package module on disk is older than the requested version
    #[error(
        "The addon requires the dependency '{package}' to be at least version {required}, but you have version {found}."
    )]
    IncompatiblePackageVersion {
        package: String,
        required: String,
        found: String,
    },

    /// A required package dependency could not be fetched, extracted or loaded
    #[error("Failed to load the dependency '{package}': {message}")]
    FailedPackageFetch { package: String, message: String },

    /// The addon takes part in a dependency cycle
    #[error("Circular dependency detected: {}", render_cycle(.cycle))]
    CircularDependency { cycle: Vec<String> },

    /// Enabling was deferred until the next process start
    #[error("The addon '{name}' needs a restart to be enabled correctly.")]
    RestartRequired { name: String },
}

impl LoadingError {
    /// Critical errors block enabling
    pub fn is_critical(&self) -> bool {
        !matches!(self, Self::RestartRequired { .. })
    }

    pub fn load_exception(message: impl Into<String>) -> Self {
        Self::LoadException {
            message: message.into(),
        }
    }
}

fn render_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {}", cycle.join(" -> "), first),
        None => String::new(),
    }
}
