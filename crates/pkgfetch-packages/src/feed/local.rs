//! Local folder feeds
//!
//! Supports the flat layout (`{root}/{id}.{version}.nupkg`) and the
//! hierarchical layout (`{root}/{id}/{version}/{id}.{version}.nupkg`).

use super::FindPackageById;
use crate::error::{FeedError, FeedResult};
use crate::sources::PackageSource;
use async_trait::async_trait;
use pkgfetch_core::{parse_version, same_version, PackageId, ARCHIVE_EXTENSION};
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};

/// Feed backed by a directory
pub struct LocalFeed {
    source: PackageSource,
    root: PathBuf,
}

impl LocalFeed {
    pub fn new(source: PackageSource, root: PathBuf) -> Self {
        Self { source, root }
    }

    /// Every (version string, archive path) pair found for `id`
    fn archives(&self, id: &PackageId) -> Vec<(String, PathBuf)> {
        let mut found = self.flat_archives(id);
        found.extend(self.hierarchical_archives(id));
        found
    }

    fn flat_archives(&self, id: &PackageId) -> Vec<(String, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                archive_version(id, &name).map(|version| (version, entry.path()))
            })
            .collect()
    }

    fn hierarchical_archives(&self, id: &PackageId) -> Vec<(String, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let Some(package_dir) = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|path| {
                path.is_dir()
                    && path
                        .file_name()
                        .is_some_and(|name| id.matches(&name.to_string_lossy()))
            })
        else {
            return Vec::new();
        };

        let Ok(versions) = fs::read_dir(&package_dir) else {
            return Vec::new();
        };

        versions
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let version = entry.file_name().to_string_lossy().into_owned();
                let archive = fs::read_dir(entry.path())
                    .ok()?
                    .filter_map(|file| file.ok())
                    .map(|file| file.path())
                    .find(|path| {
                        path.file_name()
                            .and_then(|name| archive_version(id, &name.to_string_lossy()))
                            .is_some_and(|found| found.eq_ignore_ascii_case(&version))
                    })?;
                Some((version, archive))
            })
            .collect()
    }
}

/// Version part of `{id}.{version}.nupkg`, ignoring symbol packages
fn archive_version(id: &PackageId, file_name: &str) -> Option<String> {
    let lower = file_name.to_ascii_lowercase();
    let suffix = format!(".{}", ARCHIVE_EXTENSION);
    if !lower.ends_with(&suffix) || lower.ends_with(&format!(".symbols{}", suffix)) {
        return None;
    }

    let stem = file_name.get(..file_name.len() - suffix.len())?;
    let id_len = id.as_str().len();
    if !id.matches(stem.get(..id_len)?) {
        return None;
    }

    let version = stem.get(id_len..)?.strip_prefix('.')?;
    if version.is_empty() {
        return None;
    }
    Some(version.to_string())
}

#[async_trait]
impl FindPackageById for LocalFeed {
    fn source(&self) -> &PackageSource {
        &self.source
    }

    async fn all_versions(&self, id: &PackageId) -> FeedResult<Vec<String>> {
        if !self.root.is_dir() {
            return Err(FeedError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("local source {} does not exist", self.root.display()),
            )));
        }
        Ok(self.archives(id).into_iter().map(|(version, _)| version).collect())
    }

    async fn download_to(&self, id: &PackageId, version: &Version, destination: &Path) -> FeedResult<()> {
        let archive = self
            .archives(id)
            .into_iter()
            .find(|(found, _)| {
                parse_version(found).is_some_and(|found| same_version(&found, version))
            })
            .map(|(_, path)| path)
            .ok_or_else(|| FeedError::NotFound {
                id: id.to_string(),
                version: version.to_string(),
                source_name: self.source.name.clone(),
            })?;

        tokio::fs::copy(&archive, destination).await?;
        Ok(())
    }
}
