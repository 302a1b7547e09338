//! Semantic version helpers

use semver::{BuildMetadata, Version};

/// Parse a version string, returning `None` when it is not a valid semantic version
pub fn parse_version(value: &str) -> Option<Version> {
    Version::parse(value.trim()).ok()
}

/// Normalized string form of a version, without build metadata
///
/// Two versions differing only in build metadata share the same normalized
/// form, which is also the name of their cache directory.
pub fn normalized_version(version: &Version) -> String {
    if version.build.is_empty() {
        return version.to_string();
    }

    let mut stripped = version.clone();
    stripped.build = BuildMetadata::EMPTY;
    stripped.to_string()
}

/// Version equality ignoring build metadata
pub fn same_version(a: &Version, b: &Version) -> bool {
    a.cmp_precedence(b).is_eq()
}
