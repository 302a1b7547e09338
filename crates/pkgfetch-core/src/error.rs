//! Error types for pkgfetch-core

use thiserror::Error;

/// Result type alias using pkgfetch-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for pkgfetch
#[derive(Error, Debug)]
pub enum Error {
    /// Package id was empty or whitespace
    #[error("Package id must not be empty")]
    EmptyPackageId,

    /// Version selector could not be parsed
    #[error("Invalid version format: {version}")]
    InvalidVersion { version: String },

    /// Invalid configuration format
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// No usable directory could be determined
    #[error("Could not determine {purpose} directory")]
    MissingDirectory { purpose: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid version error
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a missing directory error
    pub fn missing_directory(purpose: impl Into<String>) -> Self {
        Self::MissingDirectory {
            purpose: purpose.into(),
        }
    }
}
