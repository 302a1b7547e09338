//! Package install engine
//!
//! An install first consults the local cache and only acquires the package
//! when the requested version is not there. Acquisition uses one of two
//! strategies with different cache layouts:
//!
//! - HTTP (default): the archive is streamed from the feed that published the
//!   version into `{root}/{id}.nupkg`, optionally extracted to `{root}/{id}/`.
//! - Subprocess: the package-management executable installs into a scoped
//!   temp directory whose package folder is copied to `{root}/{id}/{version}/`.
//!
//! Not-found and download failures are logged and reported through
//! [`InstallResult::failed`]; only host failures surface as errors.

use crate::archive::{extract_async, install_dir_atomically, nuspec_version};
use crate::cache::{find_cached, latest_cached, scan_cache};
use crate::error::InstallError;
use crate::output::{LineLevel, OutputLog};
use crate::resolver::{ResolveOptions, ResolveStrategy, VersionResolver};
use crate::temp_dir::ScopedTempDir;
use pkgfetch_bootstrap::run_process;
use pkgfetch_core::utils::packages_dir;
use pkgfetch_core::{
    normalized_version, parse_version, same_version, InstallResult, PackageId, PackageReference,
    PackageSettings, PackageVersion, PkgfetchConfig, ARCHIVE_EXTENSION,
};
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};

/// Installs packages into a local cache
#[derive(Clone)]
pub struct PackageInstaller {
    resolver: VersionResolver,
    defaults: PackageSettings,
}

impl PackageInstaller {
    pub fn new(config: &PkgfetchConfig) -> Self {
        Self {
            resolver: VersionResolver::new(config),
            defaults: config.packages.clone(),
        }
    }

    pub fn with_resolver(mut self, resolver: VersionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    /// Install `reference` below `install_base`, or the default cache root
    pub async fn install(
        &self,
        reference: &PackageReference,
        settings: Option<&PackageSettings>,
        install_base: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<InstallResult, InstallError> {
        let settings = settings.unwrap_or(&self.defaults);
        let id = &reference.id;
        debug!(package = %reference, settings = ?settings, "Installing package");

        let root = packages_dir(install_base).ok_or(InstallError::MissingCacheRoot)?;
        create_directory(&root)?;
        debug!(directory = %root.display(), "Using package cache root");

        let package_dir = root.join(id.as_str());
        create_directory(&package_dir)?;

        let cached = scan_cache(&package_dir, settings.allow_prerelease);

        match &reference.version {
            PackageVersion::LatestDownloaded => {
                if let Some(latest) = latest_cached(&cached) {
                    debug!(package_id = %id, version = %normalized_version(&latest.version), "Found downloaded version");
                    return Ok(InstallResult::installed(
                        id.clone(),
                        latest.version.clone(),
                        latest.directory.clone(),
                    ));
                }
                warn!(package_id = %id, directory = %package_dir.display(), "Found no downloaded versions");
                remove_if_empty(&package_dir);
                return Ok(InstallResult::failed(id.clone()));
            }
            PackageVersion::Exact(version) => {
                if let Some(found) = find_cached(&cached, version) {
                    debug!(package_id = %id, version = %normalized_version(version), "Found cached version");
                    return Ok(InstallResult::installed(
                        id.clone(),
                        found.version.clone(),
                        found.directory.clone(),
                    ));
                }
            }
            PackageVersion::LatestAvailable => {}
        }

        if settings.use_cli {
            self.install_with_cli(reference, settings, &package_dir, cancel)
                .await
        } else {
            self.install_with_http(reference, settings, &root, &package_dir, cancel)
                .await
        }
    }

    async fn install_with_http(
        &self,
        reference: &PackageReference,
        settings: &PackageSettings,
        root: &Path,
        package_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<InstallResult, InstallError> {
        let id = &reference.id;
        let flat_archive = root.join(format!("{}.{}", id.as_str(), ARCHIVE_EXTENSION));
        let directory = if settings.extract { package_dir } else { root };

        let already_downloaded = reference
            .version
            .exact()
            .filter(|version| {
                flat_archive_version(&flat_archive).is_some_and(|found| same_version(&found, version))
            });

        let result = match already_downloaded {
            Some(version) => {
                debug!(package_id = %id, archive = %flat_archive.display(), "Archive already downloaded");
                Ok(Some(version.clone()))
            }
            None => {
                self.download_from_feed(reference, settings, &flat_archive, package_dir, cancel)
                    .await
            }
        };
        remove_if_empty(package_dir);

        Ok(match result? {
            Some(version) => {
                info!(package_id = %id, version = %normalized_version(&version), directory = %directory.display(), "Installed package");
                InstallResult::installed(id.clone(), version, directory.to_path_buf())
            }
            None => InstallResult::failed(id.clone()),
        })
    }

    /// Resolve, download and place the archive; `None` after logging a failure
    async fn download_from_feed(
        &self,
        reference: &PackageReference,
        settings: &PackageSettings,
        flat_archive: &Path,
        package_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<Version>, InstallError> {
        let id = &reference.id;
        let requested = reference.version.exact();

        let mut options = ResolveOptions::default()
            .with_strategy(ResolveStrategy::Http)
            .with_prerelease(settings.allow_prerelease || requested.is_some_and(|v| !v.pre.is_empty()));
        options.source_name = settings.source_name.clone();
        options.config_file = settings.config_file.clone();

        let found = self.resolver.resolve_with_feeds(id, &options, cancel).await;
        let selected = match requested {
            Some(version) => found
                .into_iter()
                .find(|found| same_version(&found.version, version)),
            None => found.into_iter().next(),
        };

        let Some(selected) = selected else {
            error!(package = %reference, "Could not find the package in any source");
            return Ok(None);
        };
        let version = selected.version;

        let temp = ScopedTempDir::create(settings.temp_directory.as_deref()).map_err(|source| {
            InstallError::CreateDirectory {
                path: settings
                    .temp_directory
                    .clone()
                    .unwrap_or_else(std::env::temp_dir),
                source,
            }
        })?;
        let temp_archive = temp
            .path()
            .join(format!("{}.{}", id.as_str(), ARCHIVE_EXTENSION));

        debug!(package_id = %id, version = %normalized_version(&version), source = %selected.feed.source().name, "Downloading package");

        let download = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(package_id = %id, "Package download was cancelled");
                return Ok(None);
            }
            result = selected.feed.download_to(id, &version, &temp_archive) => result,
        };

        if let Err(err) = download {
            error!(package_id = %id, version = %normalized_version(&version), error = %err, "Could not download package");
            return Ok(None);
        }

        if let Err(err) = tokio::fs::copy(&temp_archive, flat_archive).await {
            error!(archive = %flat_archive.display(), error = %err, "Could not copy package into the cache");
            return Ok(None);
        }

        if settings.extract {
            if let Err(err) = extract_async(flat_archive.to_path_buf(), package_dir.to_path_buf()).await {
                error!(archive = %flat_archive.display(), directory = %package_dir.display(), error = %err, "Could not extract package");
                return Ok(None);
            }
        }

        Ok(Some(version))
    }

    async fn install_with_cli(
        &self,
        reference: &PackageReference,
        settings: &PackageSettings,
        package_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<InstallResult, InstallError> {
        let id = &reference.id;

        if let Some(config) = &settings.config_file {
            if !config.is_file() {
                error!(config_file = %config.display(), "The specified config file does not exist");
                return Ok(InstallResult::failed(id.clone()));
            }
        }

        let Some(exe) = self.resolver.executable().locate(cancel).await else {
            return Ok(InstallResult::failed(id.clone()));
        };

        let temp = ScopedTempDir::create(settings.temp_directory.as_deref()).map_err(|source| {
            InstallError::CreateDirectory {
                path: settings
                    .temp_directory
                    .clone()
                    .unwrap_or_else(std::env::temp_dir),
                source,
            }
        })?;

        let args = install_arguments(
            reference,
            settings,
            tracing::enabled!(Level::DEBUG),
            temp.path(),
        );
        debug!(program = %exe.display(), args = ?args, "Installing package");

        let mut log = OutputLog::new(exe.display().to_string(), LineLevel::Info);
        let result = run_process(&exe, &args, None, cancel, |stream, line| log.line(stream, line)).await;
        log.finish();

        match result {
            Ok(Some(0)) => {}
            Ok(code) => {
                error!(program = %exe.display(), args = ?args, exit_code = ?code, "Package install failed");
                return Ok(InstallResult::failed(id.clone()));
            }
            Err(err) => {
                error!(program = %exe.display(), error = %err, "Package install failed");
                return Ok(InstallResult::failed(id.clone()));
            }
        }

        let Some((work_dir, version)) = locate_installed_package(id, temp.path()) else {
            return Ok(InstallResult::failed(id.clone()));
        };

        if let Some(existing) = find_cached(&scan_cache(package_dir, true), &version) {
            debug!(package_id = %id, directory = %existing.directory.display(), "Returning existing package");
            return Ok(InstallResult::installed(
                id.clone(),
                existing.version.clone(),
                existing.directory.clone(),
            ));
        }

        let target = package_dir.join(normalized_version(&version));
        let copy_target = target.clone();
        let copied =
            tokio::task::spawn_blocking(move || install_dir_atomically(&work_dir, &copy_target)).await;

        match copied {
            Ok(Ok(files)) => {
                info!(package_id = %id, version = %normalized_version(&version), directory = %target.display(), files, "Installed package");
                Ok(InstallResult::installed(id.clone(), version, target))
            }
            Ok(Err(err)) => {
                if let Some(existing) = find_cached(&scan_cache(package_dir, true), &version) {
                    debug!(package_id = %id, directory = %existing.directory.display(), "Package was installed concurrently");
                    return Ok(InstallResult::installed(
                        id.clone(),
                        existing.version.clone(),
                        existing.directory.clone(),
                    ));
                }
                error!(directory = %target.display(), error = %err, "Could not copy package into the cache");
                Ok(InstallResult::failed(id.clone()))
            }
            Err(err) => {
                error!(directory = %target.display(), error = %err, "Package copy task failed");
                Ok(InstallResult::failed(id.clone()))
            }
        }
    }
}

/// Arguments of the `install` command
pub fn install_arguments(
    reference: &PackageReference,
    settings: &PackageSettings,
    detailed: bool,
    output_directory: &Path,
) -> Vec<String> {
    let mut args = vec!["install".to_string(), reference.id.as_str().to_string()];

    if let Some(config) = &settings.config_file {
        args.push("-ConfigFile".to_string());
        args.push(config.display().to_string());
    }
    if let Some(source) = settings.source_name.as_deref().filter(|s| !s.trim().is_empty()) {
        args.push("-Source".to_string());
        args.push(source.to_string());
    }
    if let Some(version) = reference.version.exact() {
        args.push("-Version".to_string());
        args.push(normalized_version(version));
    }
    if settings.allow_prerelease {
        args.push("-PreRelease".to_string());
    }
    if detailed {
        args.push("-verbosity".to_string());
        args.push("detailed".to_string());
    }
    args.push("-OutputDirectory".to_string());
    args.push(output_directory.display().to_string());

    args
}

/// The single `{id}.*` directory and the version of its single archive
fn locate_installed_package(id: &PackageId, output: &Path) -> Option<(PathBuf, Version)> {
    let dir_prefix = format!("{}.", id.to_lowercase());
    let directories = matching_entries(output, |path, name| {
        path.is_dir() && name.to_ascii_lowercase().starts_with(&dir_prefix)
    });

    let package_dir = match directories.as_slice() {
        [single] => single.clone(),
        [] => {
            error!(package_id = %id, directory = %output.display(), "The expected package directory does not exist");
            return None;
        }
        many => {
            error!(package_id = %id, directory = %output.display(), found = many.len(), "Expected exactly one package directory");
            return None;
        }
    };

    let suffix = format!(".{}", ARCHIVE_EXTENSION);
    let archives = matching_entries(&package_dir, |path, name| {
        let lower = name.to_ascii_lowercase();
        path.is_file() && lower.starts_with(&dir_prefix) && lower.ends_with(&suffix)
    });

    let archive = match archives.as_slice() {
        [single] => single.clone(),
        [] => {
            error!(package_id = %id, directory = %package_dir.display(), "Could not find the expected package archive");
            return None;
        }
        many => {
            error!(package_id = %id, directory = %package_dir.display(), found = many.len(), "Expected exactly one package archive");
            return None;
        }
    };

    let stem = archive.file_stem()?.to_string_lossy().into_owned();
    let raw = stem.get(dir_prefix.len()..).unwrap_or_default();
    match parse_version(raw) {
        Some(version) => Some((package_dir, version)),
        None => {
            error!(archive = %archive.display(), "The downloaded file is not a semantic version package");
            None
        }
    }
}

fn matching_entries<F>(dir: &Path, keep: F) -> Vec<PathBuf>
where
    F: Fn(&Path, &str) -> bool,
{
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| keep(path, &name.to_string_lossy()))
        })
        .collect()
}

/// Version of an existing flat archive, if readable
fn flat_archive_version(archive: &Path) -> Option<Version> {
    if !archive.is_file() {
        return None;
    }
    match nuspec_version(archive) {
        Ok(version) => version,
        Err(err) => {
            debug!(archive = %archive.display(), error = %err, "Could not read cached archive");
            None
        }
    }
}

fn create_directory(path: &Path) -> Result<(), InstallError> {
    fs::create_dir_all(path).map_err(|source| InstallError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_if_empty(dir: &Path) {
    let is_empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if is_empty {
        if let Err(err) = fs::remove_dir(dir) {
            debug!(directory = %dir.display(), error = %err, "Could not remove empty package directory");
        }
    }
}
