//! # pkgfetch-core
//!
//! Core library for pkgfetch providing:
//! - Package identity and version selector types
//! - Install result type shared by the install engine and the CLI
//! - Settings value objects for executable download, CLI listing and installs
//! - Hierarchical configuration loading (defaults, config file, environment)

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::{CliSettings, ConfigLoader, DownloadSettings, PackageSettings, PkgfetchConfig};
pub use error::{Error, Result};
pub use types::{
    normalized_version, parse_version, same_version, InstallResult, PackageId, PackageReference,
    PackageVersion,
};
pub use utils::{get_home_dir, local_data_dir};

/// Name used for per-user data directories
pub const TOOL_NAME: &str = "pkgfetch";

/// File extension of package archives
pub const ARCHIVE_EXTENSION: &str = "nupkg";
