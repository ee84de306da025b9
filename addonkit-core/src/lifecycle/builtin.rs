//! The host's own addon

use addonkit_api::{Addon, AddonContext, AddonError, AddonManifest, CapabilitySpec};

/// Identifier of [`CoreAddon`]
pub const CORE_ADDON_ID: &str = "core";

/// Built-in addon standing for the host application itself.
///
/// Enabled before any installed addon, so installed addons can depend on it
/// with a version range to target a host version.
#[derive(Debug, Clone)]
pub struct CoreAddon {
    version: String,
}

impl CoreAddon {
    pub fn new(host_version: impl Into<String>) -> Self {
        Self {
            version: host_version.into(),
        }
    }
}

impl Default for CoreAddon {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

impl Addon for CoreAddon {
    fn manifest(&self) -> AddonManifest {
        AddonManifest {
            identifier: CORE_ADDON_ID.to_string(),
            name: "Core".to_string(),
            version: self.version.clone(),
            description: "Built-in capabilities of the host".to_string(),
            ..Default::default()
        }
    }

    fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        ctx.register_capability(CapabilitySpec::new(
            "command",
            "addons",
            "Manage installed addons",
        ))?;
        Ok(())
    }

    fn on_disable(&mut self) -> Result<(), AddonError> {
        Ok(())
    }
}
