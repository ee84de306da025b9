//! addonkit-api - write addons for an addonkit host
//!
//! Addons are native Rust dynamic libraries. Each one lives in its own
//! directory under the host's addons root, declares its dependencies on other
//! addons and on published packages, and is enabled and disabled by the host.
//!
//! # Example
//!
//! ```ignore
//! use addonkit_api::{
//!     Addon, AddonContext, AddonError, AddonManifest, CapabilitySpec, Dependency, export_addon,
//! };
//!
//! #[derive(Default)]
//! pub struct Formatter;
//!
//! impl Addon for Formatter {
//!     fn manifest(&self) -> AddonManifest {
//!         AddonManifest {
//!             identifier: "formatter".to_string(),
//!             name: "Formatter".to_string(),
//!             version: "1.0.0".to_string(),
//!             ..Default::default()
//!         }
//!     }
//!
//!     fn dependencies(&self) -> Vec<Dependency> {
//!         vec![Dependency::addon("syntax-core").with_version("^2.0")]
//!     }
//!
//!     fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
//!         ctx.register_capability(CapabilitySpec::new("command", "format", "Format file"))?;
//!         Ok(())
//!     }
//!
//!     fn on_disable(&mut self) -> Result<(), AddonError> {
//!         Ok(())
//!     }
//! }
//!
//! export_addon!(Formatter);
//! ```

pub mod context;
pub mod error;
pub mod types;

pub use async_trait::async_trait;
pub use context::{AddonContext, AddonLookup, ModuleResolver};
pub use error::AddonError;
pub use types::*;

/// Current addon API version. Addons must match this exactly.
pub const API_VERSION: u32 = 1;

/// Symbol returning the API version an addon module was built against
pub const API_VERSION_SYMBOL: &[u8] = b"_addonkit_api_version";

/// Symbol creating the module's addon instance
pub const CREATE_SYMBOL: &[u8] = b"_addonkit_create";

/// The addon trait - implement this and export it with [`export_addon!`].
///
/// Enabling runs [`Addon::on_enable`] and then [`Addon::on_enable_async`],
/// each awaited to completion before the host marks the addon enabled.
#[async_trait]
pub trait Addon: Send + Sync {
    /// Return addon metadata
    fn manifest(&self) -> AddonManifest;

    /// Dependencies on other addons and on published packages
    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }

    /// Synchronous part of enabling. Register capabilities here.
    fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError>;

    /// Asynchronous part of enabling, for work that waits on I/O
    async fn on_enable_async(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
        Ok(())
    }

    /// Called when the addon is disabled or deleted
    fn on_disable(&mut self) -> Result<(), AddonError>;
}

/// Export an addon type for dynamic loading.
///
/// Generates the two C ABI entry points the host looks up:
///
/// - `_addonkit_create()`: creates the addon instance
/// - `_addonkit_api_version()`: returns the API version
///
/// A module without these symbols is treated as a plain library.
#[macro_export]
macro_rules! export_addon {
    ($addon_type:ty) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _addonkit_create() -> *mut dyn $crate::Addon {
            let addon: Box<dyn $crate::Addon> = Box::new(<$addon_type>::default());
            Box::into_raw(addon)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _addonkit_api_version() -> u32 {
            $crate::API_VERSION
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Minimal {
        enabled: bool,
    }

    impl Addon for Minimal {
        fn manifest(&self) -> AddonManifest {
            AddonManifest {
                identifier: "minimal".into(),
                ..Default::default()
            }
        }

        fn on_enable(&mut self, _ctx: &mut AddonContext) -> Result<(), AddonError> {
            self.enabled = true;
            Ok(())
        }

        fn on_disable(&mut self) -> Result<(), AddonError> {
            self.enabled = false;
            Ok(())
        }
    }

    #[test]
    fn test_api_version_is_set() {
        assert_eq!(API_VERSION, 1);
    }

    #[test]
    fn test_addon_trait_is_object_safe() {
        fn _takes_boxed_addon(_: Box<dyn Addon>) {}
    }

    #[test]
    fn test_default_dependencies_are_empty() {
        assert!(Minimal::default().dependencies().is_empty());
    }

    #[tokio::test]
    async fn test_default_async_enable_succeeds() {
        let mut addon = Minimal::default();
        let mut ctx = AddonContext::new("minimal", "", "1.0");
        addon.on_enable(&mut ctx).unwrap();
        addon.on_enable_async(&mut ctx).await.unwrap();
        assert!(addon.enabled);
    }
}
