//! Outcome of ensuring the executable is available

use std::fmt;
use std::path::{Path, PathBuf};

/// Closed set of outcomes of [`crate::ExeDownloadClient::ensure_executable`]
#[derive(Debug)]
pub enum DownloadResult {
    /// Downloading is disabled in settings
    Disabled,

    /// No download URI template is configured
    MissingUriFormat,

    /// No executable version is configured
    MissingVersion,

    /// No download directory could be determined
    MissingDirectory,

    /// The rendered URI is not an absolute http(s) URI
    InvalidUri(String),

    /// The download ran but did not produce a usable file
    DownloadFailed(String),

    /// The executable is available at this path
    Success(PathBuf),

    /// An I/O or network error was caught
    Exception(String),
}

impl DownloadResult {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Path of the executable when successful
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Success(path) => Some(path),
            _ => None,
        }
    }

    pub(crate) fn exception(err: impl fmt::Display) -> Self {
        Self::Exception(err.to_string())
    }
}

impl fmt::Display for DownloadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("download is disabled"),
            Self::MissingUriFormat => f.write_str("no download URI format configured"),
            Self::MissingVersion => f.write_str("no executable version configured"),
            Self::MissingDirectory => f.write_str("no download directory available"),
            Self::InvalidUri(uri) => write!(f, "invalid download URI '{}'", uri),
            Self::DownloadFailed(reason) => write!(f, "download failed: {}", reason),
            Self::Success(path) => write!(f, "{}", path.display()),
            Self::Exception(cause) => write!(f, "download error: {}", cause),
        }
    }
}
