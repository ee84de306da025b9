use std::path::{Path, PathBuf};

use crate::config::{CliConfig, ConfigLoader};
use addonkit_core::packages::default_search_dirs;
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective host configuration after layering
    Show {
        /// Emit JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
    /// List the config layers and the files the addon host uses
    Paths,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show { json } => show_config(json),
        ConfigCommands::Paths => show_paths(),
    }
}

fn show_config(json: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

fn show_paths() -> Result<()> {
    let config = ConfigLoader::load()?;
    let user = ConfigLoader::user_config_path();
    let project = ConfigLoader::project_config_path();

    for (label, path) in host_locations(&config, &user, &project) {
        let marker = if path.exists() { "" } else { "  (missing)" };
        println!("{label:<15} {}{marker}", path.display());
    }

    let (search_dirs, origin) = match &config.host.packages.search_dirs {
        Some(dirs) => (dirs.clone(), "configured"),
        None => (default_search_dirs(), "platform default"),
    };
    println!("Package folders ({origin}):");
    for dir in search_dirs {
        println!("  {dir}");
    }
    Ok(())
}

/// Every file or directory the host reads, in lookup order
fn host_locations(
    config: &CliConfig,
    user: &Path,
    project: &Path,
) -> Vec<(&'static str, PathBuf)> {
    vec![
        ("User config", user.to_path_buf()),
        ("Project config", project.to_path_buf()),
        ("Addons root", config.host.addons_dir().to_path_buf()),
        ("Meta store", config.host.meta_path()),
    ]
}
