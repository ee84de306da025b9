//! Hello Addon - A simple example addon for addonkit
//!
//! This addon demonstrates:
//! - Basic addon structure with the `export_addon!` macro
//! - Declaring an addon dependency and an optional package dependency
//! - Registering capabilities while enabling
//! - The async half of enabling (`on_enable_async`)
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p hello
//! cp target/release/libhello_addon.so hello/hello.so
//! addonkit addon install ./hello
//! ```

use addonkit_api::{
    Addon, AddonContext, AddonError, AddonManifest, CapabilitySpec, Dependency, async_trait,
    export_addon,
};

/// Greets on enable and counts how often it was enabled in this process.
#[derive(Default)]
pub struct HelloAddon {
    enable_count: u32,
}

#[async_trait]
impl Addon for HelloAddon {
    fn manifest(&self) -> AddonManifest {
        AddonManifest {
            identifier: "hello".to_string(),
            name: "Hello".to_string(),
            version: "0.1.0".to_string(),
            description: "A simple example addon that registers a greeting command".to_string(),
            author: "addonkit-team".to_string(),
            min_host_version: Some("0.1.0".to_string()),
            ..Default::default()
        }
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![
            // The host's built-in addon, any version
            Dependency::addon("core"),
            Dependency::package("Humanizer.Native", "humanizer").optional(),
        ]
    }

    fn on_enable(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        self.enable_count += 1;
        ctx.register_capability(CapabilitySpec::new(
            "command",
            "hello.greet",
            "Print a greeting",
        ))?;
        ctx.log_info(&format!(
            "Hello addon enabled (host {}, time #{})",
            ctx.host_version(),
            self.enable_count
        ));
        Ok(())
    }

    async fn on_enable_async(&mut self, ctx: &mut AddonContext) -> Result<(), AddonError> {
        let greeting = ctx.addon_dir().join("greeting.txt");
        if greeting.is_file() {
            ctx.log_debug(&format!("Custom greeting at {}", greeting.display()));
        }
        Ok(())
    }

    fn on_disable(&mut self) -> Result<(), AddonError> {
        Ok(())
    }
}

// This macro generates the C ABI entry points for dynamic loading
export_addon!(HelloAddon);
