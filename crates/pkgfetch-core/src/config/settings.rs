//! Settings value objects
//!
//! These are plain serde structs with per-field defaults so that partial
//! YAML documents and environment overrides compose cleanly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default download URI template for the package-management executable
pub const DEFAULT_EXE_DOWNLOAD_URI_FORMAT: &str =
    "https://dist.nuget.org/win-x86-commandline/{0}/nuget.exe";

/// Default remote index listing executable releases
pub const DEFAULT_VERSION_INDEX_URL: &str = "https://dist.nuget.org/index.json";

/// Version keyword resolved by the distribution endpoint to the newest release
pub const LATEST_EXE_VERSION: &str = "latest";

/// Complete pkgfetch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PkgfetchConfig {
    /// Executable download settings
    #[serde(default)]
    pub download: DownloadSettings,

    /// Subprocess strategy settings
    #[serde(default)]
    pub cli: CliSettings,

    /// Package install settings
    #[serde(default)]
    pub packages: PackageSettings,
}

/// Settings controlling download of the package-management executable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DownloadSettings {
    /// Whether downloading is allowed at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Version to download, substituted into the URI template
    #[serde(default = "default_exe_version")]
    pub exe_version: String,

    /// URI template; `{0}` is replaced with `exe_version` when present
    #[serde(default = "default_uri_format")]
    pub download_uri_format: Option<String>,

    /// Explicit download directory
    #[serde(default)]
    pub download_directory: Option<PathBuf>,

    /// Check the remote index for a newer release
    #[serde(default)]
    pub update_enabled: bool,

    /// Download even when the executable already exists
    #[serde(default)]
    pub force: bool,

    /// Remote version index used by the update check
    #[serde(default = "default_version_index_url")]
    pub version_index_url: String,

    /// File name of the executable inside the download directory
    #[serde(default = "default_exe_name")]
    pub exe_name: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            exe_version: default_exe_version(),
            download_uri_format: default_uri_format(),
            download_directory: None,
            update_enabled: false,
            force: false,
            version_index_url: default_version_index_url(),
            exe_name: default_exe_name(),
        }
    }
}

impl DownloadSettings {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_exe_version(mut self, version: impl Into<String>) -> Self {
        self.exe_version = version.into();
        self
    }

    pub fn with_download_uri_format(mut self, format: Option<String>) -> Self {
        self.download_uri_format = format;
        self
    }

    pub fn with_download_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.download_directory = Some(directory.into());
        self
    }

    pub fn with_update_enabled(mut self, enabled: bool) -> Self {
        self.update_enabled = enabled;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_version_index_url(mut self, url: impl Into<String>) -> Self {
        self.version_index_url = url.into();
        self
    }
}

/// Settings for the subprocess-based strategy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CliSettings {
    /// Existing executable to use instead of downloading one
    #[serde(default)]
    pub exe_path: Option<PathBuf>,

    /// Source name passed to the executable
    #[serde(default)]
    pub source_name: Option<String>,

    /// Config file passed to the executable
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// Enable the adaptive search-prefix heuristic
    #[serde(default)]
    pub adaptive_prefix_enabled: bool,

    /// Listing is aborted once more than this many output lines were seen
    /// and at least one belongs to another package
    #[serde(default = "default_mismatch_abort_threshold")]
    pub mismatch_abort_threshold: usize,

    /// Timeout for a version listing in seconds
    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            exe_path: None,
            source_name: None,
            config_file: None,
            adaptive_prefix_enabled: false,
            mismatch_abort_threshold: default_mismatch_abort_threshold(),
            list_timeout_secs: default_list_timeout(),
        }
    }
}

impl CliSettings {
    pub fn with_exe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.exe_path = Some(path.into());
        self
    }

    pub fn with_source_name(mut self, source: impl Into<String>) -> Self {
        self.source_name = Some(source.into());
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_adaptive_prefix(mut self, enabled: bool) -> Self {
        self.adaptive_prefix_enabled = enabled;
        self
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

/// Settings for a single package install
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct PackageSettings {
    /// Consider pre-release versions
    #[serde(default)]
    pub allow_prerelease: bool,

    /// Restrict to the source with this name
    #[serde(default)]
    pub source_name: Option<String>,

    /// Source configuration file
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// Base directory for temporary working directories
    #[serde(default)]
    pub temp_directory: Option<PathBuf>,

    /// Install through the package-management executable instead of HTTP
    #[serde(default)]
    pub use_cli: bool,

    /// Extract the downloaded archive (HTTP strategy)
    #[serde(default)]
    pub extract: bool,
}

impl PackageSettings {
    pub fn with_prerelease(mut self, allow: bool) -> Self {
        self.allow_prerelease = allow;
        self
    }

    pub fn with_source_name(mut self, source: impl Into<String>) -> Self {
        self.source_name = Some(source.into());
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_temp_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_directory = Some(path.into());
        self
    }

    pub fn with_cli(mut self, use_cli: bool) -> Self {
        self.use_cli = use_cli;
        self
    }

    pub fn with_extract(mut self, extract: bool) -> Self {
        self.extract = extract;
        self
    }
}

fn default_true() -> bool {
    true
}
fn default_exe_version() -> String {
    LATEST_EXE_VERSION.to_string()
}
fn default_uri_format() -> Option<String> {
    Some(DEFAULT_EXE_DOWNLOAD_URI_FORMAT.to_string())
}
fn default_version_index_url() -> String {
    DEFAULT_VERSION_INDEX_URL.to_string()
}
fn default_exe_name() -> String {
    "nuget.exe".to_string()
}
fn default_mismatch_abort_threshold() -> usize {
    5
}
fn default_list_timeout() -> u64 {
    30
}
