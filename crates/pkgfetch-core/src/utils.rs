//! Shared directory helpers for pkgfetch crates

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the package cache root
pub const PACKAGES_DIR_ENV: &str = "PKGFETCH_PACKAGES_DIR";

/// Environment variable overriding the executable download directory
pub const TOOLS_DIR_ENV: &str = "PKGFETCH_TOOLS_DIR";

/// Get the user's home directory
///
/// Prefers the HOME environment variable over dirs::home_dir() so that
/// containerized setups overriding HOME are respected.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    dirs::home_dir().ok_or_else(|| Error::missing_directory("home"))
}

/// Per-user local application data directory for pkgfetch
///
/// `%LOCALAPPDATA%\pkgfetch` on Windows, `~/.local/share/pkgfetch` on Linux,
/// `~/Library/Application Support/pkgfetch` on macOS.
pub fn local_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(crate::TOOL_NAME))
}

/// Resolve a directory from an explicit value, then an environment
/// variable, then a fallback under the local data directory.
pub fn resolve_directory(
    explicit: Option<&Path>,
    env_var: &str,
    fallback_segments: &[&str],
) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(dir.to_path_buf());
    }

    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value));
        }
    }

    local_data_dir().map(|base| {
        fallback_segments
            .iter()
            .fold(base, |path, segment| path.join(segment))
    })
}

/// Default package cache root: `$PKGFETCH_PACKAGES_DIR` or `<local data>/packages`
pub fn packages_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    resolve_directory(explicit, PACKAGES_DIR_ENV, &["packages"])
}

/// Default executable download directory for a version:
/// `$PKGFETCH_TOOLS_DIR` or `<local data>/tools/nuget/<version>`
pub fn tools_dir(explicit: Option<&Path>, version: &str) -> Option<PathBuf> {
    resolve_directory(explicit, TOOLS_DIR_ENV, &["tools", "nuget", version])
}
