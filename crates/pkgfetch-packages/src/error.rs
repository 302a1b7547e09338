//! Error types for pkgfetch-packages

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by package sources and feeds
#[derive(Error, Debug)]
pub enum FeedError {
    /// Explicitly configured source file is missing
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Configuration file could not be understood
    #[error("Invalid configuration file {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// Feed URL could not be built
    #[error("Invalid feed URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Feed answered with an unexpected status
    #[error("Feed request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// Feed document was not what was expected
    #[error("Unexpected response from {url}: {message}")]
    Protocol { url: String, message: String },

    /// Requested version is not available from the feed
    #[error("Package {id} {version} was not found in {source_name}")]
    NotFound {
        id: String,
        version: String,
        source_name: String,
    },

    /// Operation was cancelled
    #[error("Operation was cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    pub fn status(url: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::Status {
            url: url.into(),
            status: status.as_u16(),
        }
    }

    pub fn protocol(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

/// Host failures that stop an install before it can report a result
#[derive(Error, Debug)]
pub enum InstallError {
    /// No cache root could be determined
    #[error("Could not determine the package cache directory")]
    MissingCacheRoot,

    /// The cache root or package directory could not be created
    #[error("Could not create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for feed operations
pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Errors reading or extracting a package archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Invalid package archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
