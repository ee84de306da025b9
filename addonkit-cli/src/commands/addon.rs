//! Addon management commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use addonkit_core::{
    AddonManager, AddonRecord, AddonState, AddonSummary, CoreAddon, Dependency, DisableOutcome,
    GraphNode,
};
use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};

use crate::config::{CliConfig, ConfigLoader};
use crate::host::HeadlessHost;

/// Addon management arguments
#[derive(Args)]
pub struct AddonArgs {
    #[command(subcommand)]
    pub command: AddonCommands,

    /// Addons root (overrides the configured one)
    #[arg(long, global = true)]
    pub addons_dir: Option<PathBuf>,
}

/// Addon subcommands
#[derive(Subcommand)]
pub enum AddonCommands {
    /// List installed addons
    List {
        /// Only addons in this state (enabled or disabled)
        #[arg(long)]
        state: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show addon details
    Info {
        /// Addon identifier
        identifier: String,
    },
    /// Enable an addon
    Enable {
        /// Addon identifier
        identifier: String,
    },
    /// Disable an addon
    Disable {
        /// Addon identifier
        identifier: String,
        /// Also disable enabled addons that require it
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete an addon and its module file
    Delete {
        /// Addon identifier
        identifier: String,
        /// Confirm the deletion
        #[arg(short, long)]
        yes: bool,
    },
    /// Install an addon from a directory
    Install {
        /// Directory holding the addon module
        path: PathBuf,
    },
    /// Show package version conflicts between enabled addons
    Conflicts,
}

/// Run addon command
pub async fn run(args: AddonArgs) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    if let Some(dir) = args.addons_dir {
        config.host.addons_dir = dir;
    }

    let assume_yes = matches!(
        args.command,
        AddonCommands::Disable { yes: true, .. } | AddonCommands::Delete { yes: true, .. }
    );
    let mut manager = open_manager(&config, assume_yes).await?;

    match args.command {
        AddonCommands::List { state, json } => list_addons(&manager, state.as_deref(), json),
        AddonCommands::Info { identifier } => show_addon_info(&manager, &identifier),
        AddonCommands::Enable { identifier } => enable_addon(&mut manager, &identifier).await,
        AddonCommands::Disable { identifier, .. } => {
            disable_addon(&mut manager, &identifier).await
        }
        AddonCommands::Delete { identifier, yes } => {
            delete_addon(&mut manager, &identifier, yes).await
        }
        AddonCommands::Install { path } => install_addon(&mut manager, &path).await,
        AddonCommands::Conflicts => show_conflicts(&manager),
    }
}

async fn open_manager(config: &CliConfig, assume_yes: bool) -> Result<AddonManager> {
    let host = Arc::new(HeadlessHost::new(config.host_version.clone(), assume_yes));
    let mut manager = AddonManager::builder(
        config.host.clone(),
        host,
        Box::new(CoreAddon::new(config.host_version.clone())),
    )
    .build()?;

    let report = manager.start().await?;
    tracing::debug!(
        loaded = report.loaded,
        enabled = report.enabled,
        with_errors = report.addons_with_errors,
        "Addons loaded"
    );
    Ok(manager)
}

fn parse_state(state: Option<&str>) -> Result<AddonState> {
    match state.map(str::to_ascii_lowercase).as_deref() {
        None | Some("all") | Some("installed") => Ok(AddonState::Installed),
        Some("enabled") => Ok(AddonState::Enabled),
        Some("disabled") => Ok(AddonState::Disabled),
        Some(other) => bail!("Unknown state '{}' (expected enabled, disabled or all)", other),
    }
}

fn status_symbol(summary: &AddonSummary) -> &'static str {
    match summary.state {
        AddonState::Enabled => "✓",
        _ if summary.has_critical_errors => "✗",
        _ => "○",
    }
}

fn format_line(summary: &AddonSummary) -> String {
    let description = if summary.description.is_empty() {
        "No description"
    } else {
        &summary.description
    };
    let mut line = format!(
        "{} {} v{}    {}",
        status_symbol(summary),
        summary.identifier,
        summary.version,
        description
    );
    if summary.builtin {
        line.push_str("    (built-in)");
    }
    if summary.needs_restart {
        line.push_str("    (restart required)");
    }
    line
}

fn list_addons(manager: &AddonManager, state: Option<&str>, json: bool) -> Result<()> {
    let filter = parse_state(state)?;
    let summaries: Vec<AddonSummary> = manager
        .addons(filter)
        .into_iter()
        .map(AddonRecord::summary)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.iter().all(|s| s.builtin) {
        println!("No addons installed");
        println!();
        println!("Addons directory: {}", manager.config().addons_dir().display());
        println!();
        println!("To install an addon:");
        println!("  addonkit addon install ./path/to/my-addon");
        return Ok(());
    }

    for summary in &summaries {
        println!("{}", format_line(summary));
        for error in &summary.errors {
            println!("      {}", error);
        }
    }

    Ok(())
}

fn describe_dependency(dependency: &Dependency) -> String {
    match dependency {
        Dependency::Addon {
            identifier,
            version_range,
            required,
        } => format!(
            "addon {} {}{}",
            identifier,
            version_range.as_deref().unwrap_or("*"),
            if *required { "" } else { " (optional)" }
        ),
        Dependency::Package {
            package_id,
            module_name,
            version,
            required,
        } => format!(
            "package {} {} -> {}{}",
            package_id,
            version.as_deref().unwrap_or("latest"),
            module_name,
            if *required { "" } else { " (optional)" }
        ),
    }
}

fn show_addon_info(manager: &AddonManager, identifier: &str) -> Result<()> {
    let Some(record) = manager.addon(identifier) else {
        println!("Addon '{}' not found", identifier);
        println!();
        println!("Run 'addonkit addon list' to see installed addons.");
        return Ok(());
    };

    let m = record.manifest();
    println!("Identifier:  {}", m.identifier);
    println!("Name:        {}", record.name());
    println!("Version:     {}", m.version);
    println!(
        "Author:      {}",
        if m.author.is_empty() { "Unknown" } else { &m.author }
    );
    println!(
        "Description: {}",
        if m.description.is_empty() {
            "No description"
        } else {
            &m.description
        }
    );
    if m.min_host_version.is_some() || m.max_host_version.is_some() {
        println!(
            "Host:        {} - {}",
            m.min_host_version.as_deref().unwrap_or("any"),
            m.max_host_version.as_deref().unwrap_or("any")
        );
    }
    if let Some(path) = record.module_path() {
        println!("Module:      {}", path.display());
    }
    println!();

    match record.state() {
        AddonState::Enabled => println!("Status:      Enabled"),
        state if record.needs_restart() => println!("Status:      {} (restart required)", state),
        state => println!("Status:      {}", state),
    }

    let dependencies = GraphNode::dependencies(record);
    if !dependencies.is_empty() {
        println!();
        println!("Dependencies:");
        for dependency in dependencies {
            println!("  {}", describe_dependency(dependency));
        }
    }

    let capabilities = manager.capabilities().by_addon(identifier);
    if !capabilities.is_empty() {
        println!();
        println!("Capabilities:");
        for capability in capabilities {
            println!("  {}    {}", capability.spec.key(), capability.spec.description);
        }
    }

    if record.has_errors() {
        println!();
        println!("Errors:");
        for error in record.errors() {
            let marker = if error.is_critical() { "✗" } else { "!" };
            println!("  {} {}", marker, error);
        }
    }

    Ok(())
}

async fn enable_addon(manager: &mut AddonManager, identifier: &str) -> Result<()> {
    if manager.enable(identifier).await? {
        println!("Enabled addon: {}", identifier);
        return Ok(());
    }

    println!("Could not enable addon: {}", identifier);
    if let Some(record) = manager.addon(identifier) {
        for error in record.errors() {
            println!("  {}", error);
        }
    }
    bail!("Addon '{}' failed to enable", identifier)
}

async fn disable_addon(manager: &mut AddonManager, identifier: &str) -> Result<()> {
    let dependents = manager.dependents_requiring_confirmation(identifier);
    match manager.disable(identifier).await? {
        DisableOutcome::Disabled => {
            for dependent in &dependents {
                println!("Disabled dependent addon: {}", dependent);
            }
            println!("Disabled addon: {}", identifier);
        }
        DisableOutcome::AlreadyDisabled => println!("Addon '{}' is already disabled", identifier),
        DisableOutcome::Cancelled => {
            println!(
                "Not disabled: {} still required by {}",
                identifier,
                dependents.join(", ")
            );
            println!("Re-run with --yes to disable them as well.");
        }
    }
    Ok(())
}

async fn delete_addon(manager: &mut AddonManager, identifier: &str, yes: bool) -> Result<()> {
    if manager.addon(identifier).is_none() {
        bail!("Addon '{}' not found", identifier);
    }
    if !yes {
        println!("This removes '{}' and its module file.", identifier);
        println!("Re-run with --yes to confirm.");
        return Ok(());
    }

    manager.delete(identifier).await?;
    println!("Deleted addon: {}", identifier);
    Ok(())
}

async fn install_addon(manager: &mut AddonManager, path: &Path) -> Result<()> {
    let source = path
        .canonicalize()
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let Some(name) = source.file_name() else {
        bail!("{} is not an addon directory", path.display());
    };

    let target = manager.config().addons_dir().join(name);
    if target.exists() {
        bail!(
            "{} already exists; delete the installed addon first",
            target.display()
        );
    }
    copy_dir(&source, &target)?;

    match manager.install_from_directory(&target).await {
        Ok(identifier) => {
            let record = manager.addon(&identifier);
            let state = record.map(AddonRecord::state).unwrap_or(AddonState::Disabled);
            println!("Installed addon: {} ({})", identifier, state);
            if let Some(record) = record {
                for error in record.errors() {
                    println!("  {}", error);
                }
            }
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_dir_all(&target) {
                tracing::warn!(path = %target.display(), error = %cleanup, "Failed to clean up");
            }
            Err(e.into())
        }
    }
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

fn show_conflicts(manager: &AddonManager) -> Result<()> {
    let conflicts = manager.version_conflicts();
    if conflicts.is_empty() {
        println!("No package version conflicts");
    }
    for conflict in conflicts {
        println!("{}", conflict);
    }
    Ok(())
}
