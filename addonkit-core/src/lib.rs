//! addonkit-core: addon host for desktop applications
//!
//! This crate provides the lifecycle engine behind an addon system:
//!
//! - **Version ranges** - [`version::satisfies`] for caret, tilde, wildcard and comparison ranges
//! - **Dependency graph** - [`DependencyGraph`] for cycle detection and load order
//! - **Isolation** - [`IsolationContext`] gives every addon its own unloadable module boundary
//! - **Packages** - [`PackageManager`] fetches, caches and loads published package dependencies
//! - **Lifecycle** - [`AddonManager`] drives discovery and the enable/disable/delete state machine
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use addonkit_core::testing::RecordingHost;
//! use addonkit_core::{AddonHostConfig, AddonManager, CoreAddon};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Arc::new(RecordingHost::new("1.0.0"));
//!     let mut manager = AddonManager::builder(
//!         AddonHostConfig::default(),
//!         host,
//!         Box::new(CoreAddon::new("1.0.0")),
//!     )
//!     .build()?;
//!
//!     let report = manager.start().await?;
//!     println!("{} addons enabled", report.enabled);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    AddonManager                      │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │ Dependency   │  │  Package     │  │ Capability │  │
//! │  │ Graph        │  │  Manager     │  │ Registry   │  │
//! │  └──────────────┘  └──────┬───────┘  └────────────┘  │
//! │  ┌────────────────────────┴──────────────────────┐   │
//! │  │   IsolationContext (one per addon)            │   │
//! │  │         └── ModuleRegistry (shared)           │   │
//! │  └───────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod invoke;
pub mod isolation;
pub mod lifecycle;
pub mod loading_error;
pub mod packages;
pub mod testing;
pub mod version;

// Re-export key types for convenience
pub use config::{AddonHostConfig, PackageSourceConfig};
pub use error::{IsolationError, ManagerError, PackageError};
pub use graph::{DependencyCycle, DependencyGraph, GraphNode};
pub use isolation::{
    IsolationContext, ModuleHandle, ModuleLoader, ModuleRegistry, NativeModuleLoader,
};
pub use lifecycle::{
    AddonManager, AddonManagerBuilder, AddonRecord, AddonSnapshot, AddonState, AddonSummary,
    CORE_ADDON_ID, CapabilityRegistry, ConfirmPrompt, CoreAddon, DialogChoice, DisableOutcome,
    HostServices, MetaStore, StartupReport,
};
pub use loading_error::LoadingError;
pub use packages::{HttpPackageSource, PackageManager, PackageSource};
pub use version::Version;

// Addon authors and hosts share these
pub use addonkit_api::{Addon, AddonContext, AddonError, AddonManifest, CapabilitySpec, Dependency};
