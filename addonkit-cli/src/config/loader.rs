use super::types::{CliConfig, RawAddonsConfig, RawCliConfig, RawPackagesConfig};
use addonkit_core::{AddonHostConfig, PackageSourceConfig};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<CliConfig> {
        let layers = [Self::user_config_path(), Self::project_config_path()];
        Self::load_layers(layers.iter().map(PathBuf::as_path))
    }

    /// Merge every existing file in order, later files winning
    pub fn load_layers<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<CliConfig> {
        let mut raw = RawCliConfig::default();
        for path in paths {
            if !path.exists() {
                continue;
            }
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let layer: RawCliConfig = toml::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            tracing::debug!(path = %path.display(), "Loaded config layer");
            raw = Self::merge_raw(raw, layer);
        }
        Ok(Self::finalize(raw))
    }

    /// User config path (`$XDG_CONFIG_HOME/addonkit/config.toml`)
    pub fn user_config_path() -> PathBuf {
        addonkit_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with ADDONKIT_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        match std::env::var("ADDONKIT_PROJECT_CONFIG_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join("config.toml"),
            _ => PathBuf::from(".addonkit/config.toml"),
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawCliConfig, overlay: RawCliConfig) -> RawCliConfig {
        RawCliConfig {
            host_version: overlay.host_version.or(base.host_version),
            addons: RawAddonsConfig {
                dir: overlay.addons.dir.or(base.addons.dir),
                meta_file: overlay.addons.meta_file.or(base.addons.meta_file),
            },
            packages: RawPackagesConfig {
                url: overlay.packages.url.or(base.packages.url),
                timeout_secs: overlay.packages.timeout_secs.or(base.packages.timeout_secs),
                search_dirs: overlay.packages.search_dirs.or(base.packages.search_dirs),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawCliConfig) -> CliConfig {
        let defaults = CliConfig::default();
        let mut host = match raw.addons.dir {
            Some(dir) => AddonHostConfig::with_addons_dir(dir),
            None => defaults.host,
        };
        if let Some(meta_file) = raw.addons.meta_file {
            host.meta_file = meta_file;
        }

        let package_defaults = PackageSourceConfig::default();
        host.packages = PackageSourceConfig {
            url: raw.packages.url.unwrap_or(package_defaults.url),
            timeout_secs: raw
                .packages
                .timeout_secs
                .unwrap_or(package_defaults.timeout_secs),
            search_dirs: raw.packages.search_dirs,
        };

        CliConfig {
            host_version: raw.host_version.unwrap_or(defaults.host_version),
            host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", contents).unwrap();
        path
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigLoader::load_layers([path.as_path()]).unwrap();

        assert_eq!(config, CliConfig::default());
        assert!(config.host.addons_dir().ends_with("addons"));
        assert_eq!(config.host.meta_file, "meta.json");
    }

    #[test]
    fn test_load_from_valid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(
            &temp_dir,
            "config.toml",
            r#"
host_version = "2.4.0"

[addons]
dir = "/srv/addons"

[packages]
url = "https://packages.example.com/v3"
timeout_secs = 5
"#,
        );

        let config = ConfigLoader::load_layers([path.as_path()]).unwrap();

        assert_eq!(config.host_version, "2.4.0");
        assert_eq!(config.host.addons_dir(), Path::new("/srv/addons"));
        assert_eq!(config.host.packages.url, "https://packages.example.com/v3");
        assert_eq!(config.host.packages.timeout_secs, 5);
        assert_eq!(config.host.packages.search_dirs, None);
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(&temp_dir, "invalid.toml", "this is not valid toml {{{{");

        let result = ConfigLoader::load_layers([path.as_path()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let temp_dir = TempDir::new().unwrap();
        let user = write(
            &temp_dir,
            "user.toml",
            r#"
host_version = "1.0.0"

[addons]
dir = "/home/me/addons"
meta_file = "state.json"
"#,
        );
        let project = write(
            &temp_dir,
            "project.toml",
            r#"
[addons]
dir = "./addons"

[packages]
search_dirs = ["lib"]
"#,
        );

        let config = ConfigLoader::load_layers([user.as_path(), project.as_path()]).unwrap();

        // overlay wins where set, base survives where not
        assert_eq!(config.host.addons_dir(), Path::new("./addons"));
        assert_eq!(config.host.meta_file, "state.json");
        assert_eq!(config.host_version, "1.0.0");
        assert_eq!(config.host.packages.search_dirs, Some(vec!["lib".to_string()]));
    }

    #[test]
    fn test_merge_raw_none_preserves_base() {
        let base = RawCliConfig {
            host_version: Some("3.0.0".to_string()),
            addons: RawAddonsConfig {
                dir: Some(PathBuf::from("/base")),
                meta_file: None,
            },
            packages: RawPackagesConfig {
                url: None,
                timeout_secs: Some(10),
                search_dirs: None,
            },
        };

        let merged = ConfigLoader::merge_raw(base, RawCliConfig::default());

        assert_eq!(merged.host_version, Some("3.0.0".to_string()));
        assert_eq!(merged.addons.dir, Some(PathBuf::from("/base")));
        assert_eq!(merged.packages.timeout_secs, Some(10));
    }

    #[test]
    fn test_user_config_path() {
        let path = ConfigLoader::user_config_path();
        assert!(path.to_string_lossy().contains("addonkit"));
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_project_config_path_ends_with_config_toml() {
        assert!(ConfigLoader::project_config_path().ends_with("config.toml"));
    }
}
