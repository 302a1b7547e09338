//! Package identity, version selectors and install results

use crate::error::{Error, Result};
use crate::types::version::{normalized_version, parse_version};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::str::FromStr;

/// Case-insensitive package identifier
///
/// The original casing is kept for display and file names; comparison and
/// hashing ignore ASCII case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId(String);

impl PackageId {
    /// Create a package id, rejecting empty or whitespace-only values
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptyPackageId);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The id as originally cased
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased id, as used in feed URLs
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// Case-insensitive comparison against a raw string
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PackageId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PackageId> for String {
    fn from(id: PackageId) -> Self {
        id.0
    }
}

/// Which version of a package to install
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PackageVersion {
    /// A concrete semantic version
    Exact(Version),

    /// Resolve the newest version from the configured sources
    #[default]
    LatestAvailable,

    /// Newest version already present in the local cache; never touches the network
    LatestDownloaded,
}

impl PackageVersion {
    /// Keyword selecting [`PackageVersion::LatestAvailable`]
    pub const LATEST_AVAILABLE: &'static str = "latest-available";

    /// Keyword selecting [`PackageVersion::LatestDownloaded`]
    pub const LATEST_DOWNLOADED: &'static str = "latest-downloaded";

    /// The concrete version, if this selector names one
    pub fn exact(&self) -> Option<&Version> {
        match self {
            Self::Exact(version) => Some(version),
            _ => None,
        }
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if value.eq_ignore_ascii_case(Self::LATEST_AVAILABLE) || value.eq_ignore_ascii_case("latest")
        {
            return Ok(Self::LatestAvailable);
        }
        if value.eq_ignore_ascii_case(Self::LATEST_DOWNLOADED) {
            return Ok(Self::LatestDownloaded);
        }
        parse_version(value)
            .map(Self::Exact)
            .ok_or_else(|| Error::invalid_version(value))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(version) => f.write_str(&normalized_version(version)),
            Self::LatestAvailable => write!(f, "[{}]", Self::LATEST_AVAILABLE),
            Self::LatestDownloaded => write!(f, "[{}]", Self::LATEST_DOWNLOADED),
        }
    }
}

/// A package id paired with the version to install
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageReference {
    pub id: PackageId,
    pub version: PackageVersion,
}

impl PackageReference {
    pub fn new(id: PackageId, version: PackageVersion) -> Self {
        Self { id, version }
    }

    /// Reference to the newest available version of a package
    pub fn latest(id: PackageId) -> Self {
        Self::new(id, PackageVersion::LatestAvailable)
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// Outcome of an install call
///
/// A missing version and directory means the install failed; the reason has
/// already been logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallResult {
    pub package_id: PackageId,
    pub version: Option<Version>,
    pub directory: Option<PathBuf>,
}

impl InstallResult {
    pub fn installed(package_id: PackageId, version: Version, directory: PathBuf) -> Self {
        Self {
            package_id,
            version: Some(version),
            directory: Some(directory),
        }
    }

    pub fn failed(package_id: PackageId) -> Self {
        Self {
            package_id,
            version: None,
            directory: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.version.is_some() && self.directory.is_some()
    }
}

impl fmt::Display for InstallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.version, &self.directory) {
            (Some(version), Some(directory)) => write!(
                f,
                "{} {} in {}",
                self.package_id,
                normalized_version(version),
                directory.display()
            ),
            _ => write!(f, "{} (not installed)", self.package_id),
        }
    }
}
