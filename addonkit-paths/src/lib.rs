//! XDG Base Directory paths for addonkit.
//!
//! The host follows XDG locations on every platform instead of the
//! platform-native application folders, so a user can find the addons root
//! in the same place everywhere.

use std::path::PathBuf;

const APP_DIR: &str = "addonkit";

/// Get the addonkit config directory.
///
/// Returns `$XDG_CONFIG_HOME/addonkit` if set, otherwise `~/.config/addonkit`.
///
/// # Examples
///
/// ```
/// use addonkit_paths::config_dir;
///
/// let config_file = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the addonkit data directory.
///
/// Returns `$XDG_DATA_HOME/addonkit` if set, otherwise `~/.local/share/addonkit`.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Default addons root: one subdirectory per installed addon plus `meta.json`.
///
/// # Examples
///
/// ```
/// use addonkit_paths::addons_dir;
///
/// assert!(addons_dir().ends_with("addons"));
/// ```
pub fn addons_dir() -> PathBuf {
    data_dir().join("addons")
}

fn xdg_dir(var: &str, home_relative: &str) -> PathBuf {
    match std::env::var(var) {
        Ok(base) if !base.is_empty() => PathBuf::from(base).join(APP_DIR),
        _ => match dirs::home_dir() {
            Some(home) => home.join(home_relative).join(APP_DIR),
            None => PathBuf::from(home_relative).join(APP_DIR),
        },
    }
}
