//! Local cache directory scanner
//!
//! A version is cached when `{root}/{id}/{version}/` exists, its name parses
//! as a semantic version and an archive file lives somewhere beneath it.
//! Directories left behind by an interrupted copy hold no archive and are
//! therefore treated as absent.

use pkgfetch_core::{parse_version, same_version, ARCHIVE_EXTENSION};
use semver::Version;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A version found in a package's cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPackage {
    pub directory: PathBuf,
    pub version: Version,
}

/// Enumerate cached versions under `package_dir`, in no particular order
pub fn scan_cache(package_dir: &Path, allow_prerelease: bool) -> Vec<CachedPackage> {
    let Ok(entries) = std::fs::read_dir(package_dir) else {
        return Vec::new();
    };

    if !allow_prerelease {
        debug!(directory = %package_dir.display(), "Filtering out pre-release versions in package directory");
    }

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|directory| {
            let name = directory.file_name()?.to_string_lossy().into_owned();
            let version = parse_version(&name)?;
            Some(CachedPackage { directory, version })
        })
        .filter(|entry| contains_archive(&entry.directory))
        .filter(|entry| allow_prerelease || entry.version.pre.is_empty())
        .collect()
}

/// The highest cached version
pub fn latest_cached(entries: &[CachedPackage]) -> Option<&CachedPackage> {
    entries.iter().max_by(|a, b| a.version.cmp(&b.version))
}

/// The cached entry for `version`, if present; build metadata is ignored
pub fn find_cached<'a>(entries: &'a [CachedPackage], version: &Version) -> Option<&'a CachedPackage> {
    entries.iter().find(|entry| same_version(&entry.version, version))
}

/// Whether an archive file exists anywhere beneath `dir`
pub fn contains_archive(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .any(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
        })
}
