//! Version resolution engine
//!
//! Versions are resolved either through the package sources' HTTP protocols
//! (the default) or by running the package-management executable's `list`
//! command. The subprocess path carries an adaptive prefix: when a search
//! index answers an unprefixed query with unrelated packages the listing is
//! aborted and retried with [`DEFAULT_PREFIX`], and when a prefixed query
//! finds nothing it is retried without one. The prefix that worked is
//! remembered per (config file, source).

use crate::executable::ExecutableLocator;
use crate::feed::{open_feed, FindPackageById};
use crate::output::{LineLevel, OutputLog};
use crate::prefix_cache::{PrefixCache, SourceKey, DEFAULT_PREFIX};
use crate::sources::{NuGetConfigSources, SourceProvider};
use pkgfetch_bootstrap::{run_process, ExeDownloadClient, OutputStream};
use pkgfetch_core::{normalized_version, parse_version, CliSettings, PackageId, PkgfetchConfig};
use semver::Version;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Output lines that never describe a package
pub const IGNORED_OUTPUT: &[&str] = &["Using credentials", "No packages found", "MSBuild auto-detection"];

/// How versions are looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveStrategy {
    /// Query package sources over their wire protocol
    #[default]
    Http,
    /// Run the package-management executable's `list` command
    Cli,
}

/// Options for a single resolution
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Only query the source with this name
    pub source_name: Option<String>,
    /// Source configuration file; the default chain when unset
    pub config_file: Option<PathBuf>,
    pub allow_prerelease: bool,
    /// Keep at most this many of the newest versions
    pub max_rows: Option<usize>,
    pub strategy: ResolveStrategy,
    /// Search prefix for the subprocess strategy; adaptive when unset
    pub prefix: Option<String>,
    /// Per-call opt-out of the adaptive prefix
    pub adaptive: Option<bool>,
    /// Overall time limit; the configured list timeout when unset
    pub timeout: Option<Duration>,
}

impl ResolveOptions {
    pub fn with_source_name(mut self, source: impl Into<String>) -> Self {
        self.source_name = Some(source.into());
        self
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn with_prerelease(mut self, allow: bool) -> Self {
        self.allow_prerelease = allow;
        self
    }

    pub fn with_max_rows(mut self, rows: usize) -> Self {
        self.max_rows = Some(rows);
        self
    }

    pub fn with_strategy(mut self, strategy: ResolveStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = Some(adaptive);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A version together with the feed that published it
#[derive(Clone)]
pub(crate) struct FeedVersion {
    pub version: Version,
    pub feed: Arc<dyn FindPackageById>,
}

/// Outcome of one `list` invocation
#[derive(Debug)]
enum ListOutcome {
    Versions(Vec<Version>),
    /// Aborted because the output named other packages
    Mismatch,
    Failed,
}

/// Resolves the available versions of packages
#[derive(Clone)]
pub struct VersionResolver {
    client: reqwest::Client,
    sources: Arc<dyn SourceProvider>,
    cli: CliSettings,
    executable: ExecutableLocator,
    prefixes: Arc<PrefixCache>,
}

impl VersionResolver {
    /// Resolver using the default source chain and a fresh prefix cache
    pub fn new(config: &PkgfetchConfig) -> Self {
        let client = reqwest::Client::new();
        Self {
            executable: ExecutableLocator::new(
                &config.cli,
                config.download.clone(),
                ExeDownloadClient::with_client(client.clone()),
            ),
            client,
            sources: Arc::new(NuGetConfigSources::new()),
            cli: config.cli.clone(),
            prefixes: Arc::new(PrefixCache::new()),
        }
    }

    /// Use a caller-supplied HTTP client for feed requests
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_sources(mut self, sources: Arc<dyn SourceProvider>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_executable(mut self, executable: ExecutableLocator) -> Self {
        self.executable = executable;
        self
    }

    /// Share a prefix cache with other resolvers
    pub fn with_prefix_cache(mut self, prefixes: Arc<PrefixCache>) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn prefix_cache(&self) -> &Arc<PrefixCache> {
        &self.prefixes
    }

    pub(crate) fn executable(&self) -> &ExecutableLocator {
        &self.executable
    }

    /// All versions of `id`, newest first
    ///
    /// Failures are logged and produce an empty list.
    pub async fn resolve_all_versions(
        &self,
        id: &PackageId,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Vec<Version> {
        match options.strategy {
            ResolveStrategy::Http => self
                .resolve_with_feeds(id, options, cancel)
                .await
                .into_iter()
                .map(|found| found.version)
                .collect(),
            ResolveStrategy::Cli => {
                let versions = self.list_with_cli(id, options, cancel).await;
                order_versions(versions, |version| version, options.allow_prerelease, options.max_rows)
            }
        }
    }

    /// The newest version of `id`, if any
    pub async fn latest_version(
        &self,
        id: &PackageId,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Option<Version> {
        self.resolve_all_versions(id, options, cancel)
            .await
            .into_iter()
            .max()
    }

    /// HTTP resolution keeping the feed of each version for later download
    pub(crate) async fn resolve_with_feeds(
        &self,
        id: &PackageId,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Vec<FeedVersion> {
        let timeout = options.timeout.unwrap_or_else(|| self.cli.list_timeout());

        let found = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(package_id = %id, "Version resolution was cancelled");
                return Vec::new();
            }
            _ = tokio::time::sleep(timeout) => {
                warn!(package_id = %id, timeout = ?timeout, "Version resolution timed out");
                return Vec::new();
            }
            found = self.query_sources(id, options) => found,
        };

        order_versions(found, |found| &found.version, options.allow_prerelease, options.max_rows)
    }

    async fn query_sources(&self, id: &PackageId, options: &ResolveOptions) -> Vec<FeedVersion> {
        let sources = match self.sources.enabled_sources(options.config_file.as_deref()) {
            Ok(sources) => sources,
            Err(err) => {
                warn!(package_id = %id, error = %err, "Could not load package sources");
                return Vec::new();
            }
        };

        let mut found = Vec::new();

        for source in sources {
            if let Some(wanted) = options.source_name.as_deref().filter(|name| !name.trim().is_empty()) {
                if !source.name.eq_ignore_ascii_case(wanted) {
                    continue;
                }
            }

            let feed = match open_feed(&self.client, &source).await {
                Ok(feed) => feed,
                Err(err) => {
                    warn!(source = %source.name, error = %err, "Could not open package source");
                    continue;
                }
            };

            let raw = match feed.all_versions(id).await {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(source = %source.name, package_id = %id, error = %err, "Could not list package versions");
                    continue;
                }
            };

            debug!(source = %source.name, package_id = %id, count = raw.len(), "Listed package versions");

            for value in raw {
                match parse_version(&value) {
                    Some(version) => found.push(FeedVersion {
                        version,
                        feed: Arc::clone(&feed),
                    }),
                    None => trace!(source = %source.name, version = %value, "Skipping non-semantic version"),
                }
            }
        }

        found
    }

    async fn list_with_cli(
        &self,
        id: &PackageId,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Vec<Version> {
        let Some(exe) = self.executable.locate(cancel).await else {
            return Vec::new();
        };

        let key = SourceKey::new(options.config_file.as_deref(), options.source_name.as_deref());
        let adaptive = self.cli.adaptive_prefix_enabled && options.adaptive.unwrap_or(true);

        let prefix = match &options.prefix {
            Some(prefix) => prefix.clone(),
            None if adaptive => self.prefixes.get(&key).unwrap_or_default(),
            None => String::new(),
        };

        info!(package_id = %id, "Getting available versions");

        match self.list_once(&exe, id, &prefix, options, adaptive, cancel).await {
            ListOutcome::Mismatch if adaptive && prefix.trim().is_empty() => {
                info!(package_id = %id, prefix = DEFAULT_PREFIX, "Retrying version listing with prefix");
                match self.list_once(&exe, id, DEFAULT_PREFIX, options, adaptive, cancel).await {
                    ListOutcome::Versions(versions) if !versions.is_empty() => {
                        self.prefixes.remember(key, DEFAULT_PREFIX);
                        versions
                    }
                    _ => Vec::new(),
                }
            }
            ListOutcome::Versions(versions) if versions.is_empty() && adaptive && !prefix.trim().is_empty() => {
                debug!(package_id = %id, prefix = %prefix, "No versions found with prefix, retrying without");
                match self.list_once(&exe, id, "", options, adaptive, cancel).await {
                    ListOutcome::Versions(versions) => {
                        if !versions.is_empty() {
                            debug!(package_id = %id, count = versions.len(), "Found versions without prefix");
                            self.prefixes.remember(key, "");
                        }
                        versions
                    }
                    _ => Vec::new(),
                }
            }
            ListOutcome::Versions(versions) => versions,
            ListOutcome::Mismatch | ListOutcome::Failed => Vec::new(),
        }
    }

    async fn list_once(
        &self,
        exe: &Path,
        id: &PackageId,
        prefix: &str,
        options: &ResolveOptions,
        adaptive: bool,
        cancel: &CancellationToken,
    ) -> ListOutcome {
        let args = list_arguments(id, prefix, options);
        let timeout = options.timeout.unwrap_or_else(|| self.cli.list_timeout());
        let attempt = cancel.child_token();

        let mut lines = Vec::new();
        let mut detector = MismatchDetector::new(id, self.cli.mismatch_abort_threshold);
        let mut log = OutputLog::new(exe.display().to_string(), LineLevel::Trace);

        let result = run_process(exe, &args, Some(timeout), &attempt, |stream, line| {
            log.line(stream, line);
            if stream != OutputStream::Stdout {
                return;
            }
            if adaptive && detector.observe(line) && !attempt.is_cancelled() {
                warn!(package_id = %id, "Got packages with other ids, aborting version listing");
                attempt.cancel();
            }
            lines.push(line.to_string());
        })
        .await;
        log.finish();

        match result {
            Ok(Some(0)) => {
                let versions = parse_listing(id, &lines);
                for version in &versions {
                    debug!(package_id = %id, version = %normalized_version(version), "Found package version");
                }
                ListOutcome::Versions(versions)
            }
            Ok(code) => {
                warn!(package_id = %id, exit_code = ?code, "Package listing failed");
                ListOutcome::Failed
            }
            Err(err) if err.is_cancelled() && detector.mismatched() => ListOutcome::Mismatch,
            Err(err) => {
                warn!(package_id = %id, error = %err, "Could not get package versions");
                ListOutcome::Failed
            }
        }
    }
}

/// Arguments of the `list` command
pub fn list_arguments(id: &PackageId, prefix: &str, options: &ResolveOptions) -> Vec<String> {
    let mut args = vec![
        "list".to_string(),
        format!("{}{}", prefix, id.as_str()),
        "-AllVersions".to_string(),
    ];

    if let Some(source) = options.source_name.as_deref().filter(|s| !s.trim().is_empty()) {
        args.push("-source".to_string());
        args.push(source.to_string());
    }
    if let Some(config) = &options.config_file {
        args.push("-ConfigFile".to_string());
        args.push(config.display().to_string());
    }
    if options.allow_prerelease {
        args.push("-Prerelease".to_string());
    }

    args
}

fn is_ignored(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    IGNORED_OUTPUT
        .iter()
        .any(|ignored| lower.contains(&ignored.to_ascii_lowercase()))
}

/// Tracks whether a listing is returning packages other than the requested one
#[derive(Debug)]
pub struct MismatchDetector {
    id: String,
    threshold: usize,
    package_lines: usize,
    mismatch_seen: bool,
}

impl MismatchDetector {
    pub fn new(id: &PackageId, threshold: usize) -> Self {
        Self {
            id: id.to_lowercase(),
            threshold,
            package_lines: 0,
            mismatch_seen: false,
        }
    }

    /// Record a line; true once the listing should be aborted
    pub fn observe(&mut self, line: &str) -> bool {
        if is_ignored(line) {
            return self.mismatched();
        }

        self.package_lines += 1;
        if !line.to_ascii_lowercase().starts_with(&self.id) {
            self.mismatch_seen = true;
        }
        self.mismatched()
    }

    pub fn mismatched(&self) -> bool {
        self.package_lines > self.threshold && self.mismatch_seen
    }
}

/// Versions of `id` named in `list` output, newest first
///
/// Each relevant line is `{id} {version}`; other ids and unparseable
/// versions are skipped.
pub fn parse_listing(id: &PackageId, lines: &[String]) -> Vec<Version> {
    let mut versions: Vec<Version> = lines
        .iter()
        .filter(|line| !is_ignored(line))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let package = parts.next()?;
            let raw = parts.last()?;

            let Some(version) = parse_version(raw) else {
                trace!(package = %package, version = %raw, "Skipping unparseable version");
                return None;
            };
            if !id.matches(package) {
                trace!(package = %package, requested = %id, "Skipping other package");
                return None;
            }
            Some(version)
        })
        .collect();

    versions.sort_by(|a, b| b.cmp(a));
    versions
}

/// Deduplicate by normalized version, drop pre-releases unless allowed,
/// order newest first and cap the count
fn order_versions<T, F>(items: Vec<T>, version_of: F, allow_prerelease: bool, max_rows: Option<usize>) -> Vec<T>
where
    F: Fn(&T) -> &Version,
{
    let mut seen = HashSet::new();
    let mut items: Vec<T> = items
        .into_iter()
        .filter(|item| allow_prerelease || version_of(item).pre.is_empty())
        .filter(|item| seen.insert(normalized_version(version_of(item))))
        .collect();

    items.sort_by(|a, b| version_of(b).cmp(version_of(a)));
    if let Some(rows) = max_rows {
        items.truncate(rows);
    }
    items
}
