//! Reading and extracting package archives

use crate::error::ArchiveError;
use pkgfetch_core::parse_version;
use regex::Regex;
use semver::Version;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use zip::ZipArchive;

static NUSPEC_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<version>\s*([^<\s]+)\s*</version>").expect("valid nuspec version regex")
});

/// Version declared by the manifest at the root of an archive
pub fn nuspec_version(archive: &Path) -> Result<Option<Version>, ArchiveError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().replace('\\', "/");
        if entry.is_dir() || name.contains('/') || !name.to_ascii_lowercase().ends_with(".nuspec") {
            continue;
        }

        let mut xml = String::new();
        entry.read_to_string(&mut xml)?;
        return Ok(NUSPEC_VERSION_RE
            .captures(&xml)
            .and_then(|caps| parse_version(&caps[1])));
    }

    Ok(None)
}

/// Extract every entry of `archive` below `destination`
///
/// Entries whose names would escape `destination` are skipped. Returns the
/// number of files written.
pub fn extract(archive: &Path, destination: &Path) -> Result<usize, ArchiveError> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    fs::create_dir_all(destination)?;
    let mut written = 0;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = %entry.name(), "Skipping archive entry with unsafe path");
            continue;
        };
        let target = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    debug!(archive = %archive.display(), destination = %destination.display(), files = written, "Extracted archive");
    Ok(written)
}

/// [`extract`] on the blocking pool
pub async fn extract_async(archive: PathBuf, destination: PathBuf) -> Result<usize, ArchiveError> {
    tokio::task::spawn_blocking(move || extract(&archive, &destination)).await?
}

/// Copy a directory tree, returning the number of files copied
pub fn copy_dir_recursive(source: &Path, target: &Path) -> io::Result<usize> {
    fs::create_dir_all(target)?;
    let mut copied = 0;

    for entry in walkdir::WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &destination)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Copy a directory tree into `target` through a sibling staging directory
///
/// The tree is copied into `.{name}-XXXX` next to `target` and renamed into
/// place once complete, so `target` never holds a partial copy. The staging
/// directory is removed when the copy or the rename fails.
pub fn install_dir_atomically(source: &Path, target: &Path) -> io::Result<usize> {
    let parent = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent directory"))?;
    let name = target
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no file name"))?;
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}-", name.to_string_lossy()))
        .tempdir_in(parent)?;
    let copied = copy_dir_recursive(source, staging.path())?;

    let staged = staging.keep();
    if let Err(err) = fs::rename(&staged, target) {
        if let Err(cleanup) = fs::remove_dir_all(&staged) {
            warn!(directory = %staged.display(), error = %cleanup, "Could not remove staging directory");
        }
        return Err(err);
    }

    Ok(copied)
}
