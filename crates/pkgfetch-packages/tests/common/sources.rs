//! Fixed source providers and engine builders

use pkgfetch_bootstrap::ExeDownloadClient;
use pkgfetch_core::{CliSettings, DownloadSettings, PkgfetchConfig};
use pkgfetch_packages::{
    ExecutableLocator, FeedResult, PackageInstaller, PackageSource, SourceProvider, VersionResolver,
};
use std::path::Path;
use std::sync::Arc;

/// Source provider returning a fixed list
pub struct StaticSources(pub Vec<PackageSource>);

impl SourceProvider for StaticSources {
    fn enabled_sources(&self, _config_file: Option<&Path>) -> FeedResult<Vec<PackageSource>> {
        Ok(self.0.clone())
    }
}

/// Configuration with downloads disabled so no test reaches the real distribution endpoint
pub fn offline_config() -> PkgfetchConfig {
    PkgfetchConfig {
        download: DownloadSettings::default().with_enabled(false),
        ..PkgfetchConfig::default()
    }
}

/// Resolver over `sources`
pub fn resolver_for(sources: Vec<PackageSource>) -> VersionResolver {
    VersionResolver::new(&offline_config()).with_sources(Arc::new(StaticSources(sources)))
}

/// Resolver running the executable at `exe`
pub fn cli_resolver(exe: &Path, adaptive: bool) -> VersionResolver {
    let mut config = offline_config();
    config.cli = CliSettings::default()
        .with_exe_path(exe)
        .with_adaptive_prefix(adaptive);

    VersionResolver::new(&config)
        .with_sources(Arc::new(StaticSources(Vec::new())))
        .with_executable(ExecutableLocator::new(
            &config.cli,
            config.download.clone(),
            ExeDownloadClient::new(),
        ))
}

/// Installer over `sources`
pub fn installer_for(sources: Vec<PackageSource>) -> PackageInstaller {
    PackageInstaller::new(&offline_config()).with_resolver(resolver_for(sources))
}

/// Installer running the executable at `exe`
pub fn cli_installer(exe: &Path) -> PackageInstaller {
    PackageInstaller::new(&offline_config()).with_resolver(cli_resolver(exe, false))
}
