//! Addon lifecycle: records, the meta store, capabilities and the manager
//! that ties them to isolation and package loading.

mod builtin;
mod capabilities;
mod host;
mod manager;
mod meta;
mod record;
mod snapshot;

pub use builtin::{CORE_ADDON_ID, CoreAddon};
pub use capabilities::{CapabilityRegistry, RegisteredCapability};
pub use host::{ConfirmPrompt, DialogChoice, HostServices};
pub use manager::{AddonManager, AddonManagerBuilder, DisableOutcome, StartupReport};
pub use meta::MetaStore;
pub use record::{AddonRecord, AddonState, AddonSummary};
pub use snapshot::AddonSnapshot;
