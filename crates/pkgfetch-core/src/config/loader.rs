//! Hierarchical configuration loader
//!
//! Precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. User config (`~/.pkgfetch/config.yaml`)
//! 3. Environment variables (`PKGFETCH_*` prefix)
//! 4. CLI flags (handled by caller)

use crate::config::settings::PkgfetchConfig;
use crate::error::{Error, Result};
use crate::utils::get_home_dir;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const EMBEDDED_DEFAULTS: &str = include_str!("../../embedded/config-defaults.yaml");

/// Name of the user configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Configuration loader with precedence
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a loader reading from `~/.pkgfetch`
    pub fn new() -> Result<Self> {
        let config_dir = get_home_dir()?.join(format!(".{}", crate::TOOL_NAME));
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Load the full configuration
    pub fn load(&self) -> Result<PkgfetchConfig> {
        let mut config: PkgfetchConfig = serde_yaml_ng::from_str(EMBEDDED_DEFAULTS)
            .map_err(|e| Error::invalid_config(format!("Failed to parse embedded defaults: {}", e)))?;

        let config_path = self.config_path();
        if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "Loading user configuration");
            config = Self::load_yaml_file(&config_path)?;
        }

        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Path of the user configuration file
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn load_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content).map_err(|e| {
            Error::invalid_config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn apply_env_overrides(config: &mut PkgfetchConfig) -> Result<()> {
        // Executable download
        if let Some(val) = env_parse::<bool>("PKGFETCH_DOWNLOAD_ENABLED")? {
            config.download.enabled = val;
        }
        if let Some(val) = env_string("PKGFETCH_EXE_VERSION") {
            config.download.exe_version = val;
        }
        if let Some(val) = env_string("PKGFETCH_DOWNLOAD_URI_FORMAT") {
            config.download.download_uri_format = Some(val);
        }
        if let Some(val) = env_string("PKGFETCH_VERSION_INDEX_URL") {
            config.download.version_index_url = val;
        }
        if let Some(val) = env_parse::<bool>("PKGFETCH_UPDATE_ENABLED")? {
            config.download.update_enabled = val;
        }
        if let Some(val) = env_parse::<bool>("PKGFETCH_FORCE")? {
            config.download.force = val;
        }

        // Subprocess strategy
        if let Some(val) = env_string("PKGFETCH_NUGET_EXE") {
            config.cli.exe_path = Some(PathBuf::from(val));
        }
        if let Some(val) = env_parse::<bool>("PKGFETCH_ADAPTIVE_PREFIX")? {
            config.cli.adaptive_prefix_enabled = val;
        }
        if let Some(val) = env_parse::<usize>("PKGFETCH_MISMATCH_ABORT_THRESHOLD")? {
            config.cli.mismatch_abort_threshold = val;
        }
        if let Some(val) = env_parse::<u64>("PKGFETCH_LIST_TIMEOUT_SECS")? {
            config.cli.list_timeout_secs = val;
        }

        // Shared by both strategies
        if let Some(val) = env_string("PKGFETCH_SOURCE") {
            config.cli.source_name = Some(val.clone());
            config.packages.source_name = Some(val);
        }
        if let Some(val) = env_string("PKGFETCH_CONFIG_FILE") {
            config.cli.config_file = Some(PathBuf::from(&val));
            config.packages.config_file = Some(PathBuf::from(val));
        }

        // Installs
        if let Some(val) = env_parse::<bool>("PKGFETCH_ALLOW_PRERELEASE")? {
            config.packages.allow_prerelease = val;
        }
        if let Some(val) = env_parse::<bool>("PKGFETCH_USE_CLI")? {
            config.packages.use_cli = val;
        }
        if let Some(val) = env_string("PKGFETCH_TEMP_DIR") {
            config.packages.temp_directory = Some(PathBuf::from(val));
        }

        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env_string(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::invalid_config(format!("{} has an invalid value: {}", name, value))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn create_temp_loader() -> (ConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        (loader, temp_dir)
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        let (loader, _temp) = create_temp_loader();
        let config = loader.load().unwrap();
        assert_eq!(config, PkgfetchConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let (loader, _temp) = create_temp_loader();

        let config_content = r#"
download:
  exe-version: "6.9.1"
  update-enabled: true
cli:
  source-name: "internal"
  mismatch-abort-threshold: 20
packages:
  use-cli: true
"#;
        fs::write(loader.config_path(), config_content).unwrap();

        let config = loader.load().unwrap();
        assert_eq!(config.download.exe_version, "6.9.1");
        assert!(config.download.update_enabled);
        assert!(config.download.enabled);
        assert_eq!(config.cli.source_name.as_deref(), Some("internal"));
        assert_eq!(config.cli.mismatch_abort_threshold, 20);
        assert!(config.packages.use_cli);
    }

    #[test]
    #[serial]
    fn test_invalid_file_is_config_error() {
        let (loader, _temp) = create_temp_loader();
        fs::write(loader.config_path(), "download: [not, a, map]").unwrap();

        let err = loader.load().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("PKGFETCH_EXE_VERSION", "5.4.0");
        env::set_var("PKGFETCH_ADAPTIVE_PREFIX", "true");
        env::set_var("PKGFETCH_SOURCE", "nuget.org");
        env::set_var("PKGFETCH_LIST_TIMEOUT_SECS", "90");

        let config = loader.load().unwrap();

        env::remove_var("PKGFETCH_EXE_VERSION");
        env::remove_var("PKGFETCH_ADAPTIVE_PREFIX");
        env::remove_var("PKGFETCH_SOURCE");
        env::remove_var("PKGFETCH_LIST_TIMEOUT_SECS");

        assert_eq!(config.download.exe_version, "5.4.0");
        assert!(config.cli.adaptive_prefix_enabled);
        assert_eq!(config.cli.source_name.as_deref(), Some("nuget.org"));
        assert_eq!(config.packages.source_name.as_deref(), Some("nuget.org"));
        assert_eq!(config.cli.list_timeout_secs, 90);
    }

    #[test]
    #[serial]
    fn test_invalid_env_value() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("PKGFETCH_MISMATCH_ABORT_THRESHOLD", "lots");
        let result = loader.load();
        env::remove_var("PKGFETCH_MISMATCH_ABORT_THRESHOLD");

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}
