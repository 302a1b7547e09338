//! CLI command implementations

pub mod download;
pub mod list;
pub mod nuget;

use anyhow::{Context, Result};
use pkgfetch_core::{ConfigLoader, PkgfetchConfig};

/// Load settings from defaults, `~/.pkgfetch/config.yaml` and the environment
pub(crate) fn load_config() -> Result<PkgfetchConfig> {
    let loader = ConfigLoader::new().context("Failed to locate the pkgfetch configuration directory")?;
    loader
        .load()
        .with_context(|| format!("Failed to load {}", loader.config_path().display()))
}
