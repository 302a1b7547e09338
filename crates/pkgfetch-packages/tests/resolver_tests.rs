//! Integration tests for the version resolution engine
//!
//! Tests cover:
//! - Ordering, pre-release filtering and row caps over a JSON feed
//! - Source-name filtering and Basic auth retry
//! - OData paging and local folder sources
//! - Subprocess listing with the adaptive prefix and its memoization

mod common;

use common::*;
use pkgfetch_core::PackageId;
use pkgfetch_packages::{
    NuGetConfigSources, PackageSource, ResolveOptions, ResolveStrategy, SourceKey, VersionResolver,
    DEFAULT_PREFIX,
};
use semver::Version;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

fn foo() -> PackageId {
    PackageId::new("Foo").unwrap()
}

fn versions(values: &[&str]) -> Vec<Version> {
    values.iter().map(|v| Version::parse(v).unwrap()).collect()
}

async fn v3_server(listed: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    mock_v3_index(&server).await;
    mock_v3_versions(&server, "Foo", listed).await;
    server
}

fn v3_source(server: &MockServer) -> PackageSource {
    PackageSource::new("test", v3_index_url(server)).with_protocol_version(3)
}

#[tokio::test]
async fn test_versions_are_sorted_descending() {
    let server = v3_server(&["1.0.0", "2.0.0-beta", "1.5.0", "not.a.version"]).await;
    let resolver = resolver_for(vec![v3_source(&server)]);

    let options = ResolveOptions::default().with_prerelease(true);
    let found = resolver
        .resolve_all_versions(&foo(), &options, &CancellationToken::new())
        .await;

    assert_eq!(found, versions(&["2.0.0-beta", "1.5.0", "1.0.0"]));
}

#[tokio::test]
async fn test_prerelease_filtered_and_rows_capped() {
    let server = v3_server(&["1.0.0", "1.1.0", "1.2.0", "1.3.0-rc.1", "1.3.0", "0.9.0"]).await;
    let resolver = resolver_for(vec![v3_source(&server)]);

    let options = ResolveOptions::default().with_max_rows(2);
    let found = resolver
        .resolve_all_versions(&foo(), &options, &CancellationToken::new())
        .await;
    assert_eq!(found, versions(&["1.3.0", "1.2.0"]));

    let latest = resolver
        .latest_version(&foo(), &ResolveOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(latest, Some(Version::new(1, 3, 0)));
}

#[tokio::test]
async fn test_duplicate_versions_across_sources_are_merged() {
    let first = v3_server(&["1.0.0", "2.0.0"]).await;
    let second = v3_server(&["2.0.0", "3.0.0"]).await;
    let resolver = resolver_for(vec![
        PackageSource::new("first", v3_index_url(&first)).with_protocol_version(3),
        PackageSource::new("second", v3_index_url(&second)).with_protocol_version(3),
    ]);

    let found = resolver
        .resolve_all_versions(&foo(), &ResolveOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(found, versions(&["3.0.0", "2.0.0", "1.0.0"]));
}

#[tokio::test]
async fn test_source_name_filter() {
    let wanted = v3_server(&["1.0.0"]).await;
    let other = MockServer::start().await;
    expect_no_requests(&other).await;

    let resolver = resolver_for(vec![
        PackageSource::new("other", v3_index_url(&other)).with_protocol_version(3),
        PackageSource::new("Wanted", v3_index_url(&wanted)).with_protocol_version(3),
    ]);

    let options = ResolveOptions::default().with_source_name("wanted");
    let found = resolver
        .resolve_all_versions(&foo(), &options, &CancellationToken::new())
        .await;
    assert_eq!(found, versions(&["1.0.0"]));
}

#[tokio::test]
async fn test_unknown_package_yields_empty() {
    let server = MockServer::start().await;
    mock_v3_index(&server).await;
    let resolver = resolver_for(vec![v3_source(&server)]);

    let found = resolver
        .resolve_all_versions(&foo(), &ResolveOptions::default(), &CancellationToken::new())
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_unauthorized_request_retried_with_credentials() {
    let server = MockServer::start().await;
    mock_v3_index_with_auth(&server).await;
    mock_v3_versions(&server, "Foo", &["4.0.0"]).await;

    let source = v3_source(&server).with_credentials("user", "pass");
    let resolver = resolver_for(vec![source]);

    let found = resolver
        .resolve_all_versions(&foo(), &ResolveOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(found, versions(&["4.0.0"]));
}

#[tokio::test]
async fn test_odata_feed_follows_next_page() {
    let server = MockServer::start().await;
    mock_v2_paged(&server, "Foo", &["1.0.0", "1.1.0"], &["2.0.0"]).await;

    let resolver = resolver_for(vec![PackageSource::new("legacy", v2_url(&server))]);
    let found = resolver
        .resolve_all_versions(&foo(), &ResolveOptions::default(), &CancellationToken::new())
        .await;
    assert_eq!(found, versions(&["2.0.0", "1.1.0", "1.0.0"]));
}

#[tokio::test]
async fn test_local_source_from_config_file() {
    let temp = TempDir::new().unwrap();
    let feed = temp.path().join("feed");
    fs::create_dir_all(&feed).unwrap();
    fs::write(feed.join("Foo.1.0.0.nupkg"), build_nupkg("Foo", "1.0.0")).unwrap();
    fs::write(feed.join("Foo.1.2.0.nupkg"), build_nupkg("Foo", "1.2.0")).unwrap();

    let config = temp.path().join("nuget.config");
    fs::write(
        &config,
        r#"<?xml version="1.0" encoding="utf-8"?>
<configuration>
  <packageSources>
    <clear />
    <add key="local" value="feed" />
  </packageSources>
</configuration>"#,
    )
    .unwrap();

    let resolver = VersionResolver::new(&offline_config()).with_sources(Arc::new(
        NuGetConfigSources::new()
            .with_start_dir(temp.path())
            .with_user_config(None),
    ));

    let options = ResolveOptions::default().with_config_file(&config);
    let found = resolver
        .resolve_all_versions(&foo(), &options, &CancellationToken::new())
        .await;
    assert_eq!(found, versions(&["1.2.0", "1.0.0"]));
}

#[tokio::test]
async fn test_missing_config_file_yields_empty() {
    let temp = TempDir::new().unwrap();
    let resolver = VersionResolver::new(&offline_config())
        .with_sources(Arc::new(NuGetConfigSources::new().with_user_config(None)));

    let options = ResolveOptions::default().with_config_file(temp.path().join("missing.config"));
    let found = resolver
        .resolve_all_versions(&foo(), &options, &CancellationToken::new())
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_cancelled_resolution_yields_empty() {
    let server = v3_server(&["1.0.0"]).await;
    let resolver = resolver_for(vec![v3_source(&server)]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let found = resolver
        .resolve_all_versions(&foo(), &ResolveOptions::default(), &cancel)
        .await;
    assert!(found.is_empty());
}

#[cfg(unix)]
mod cli {
    use super::*;

    fn cli_options() -> ResolveOptions {
        ResolveOptions::default().with_strategy(ResolveStrategy::Cli)
    }

    #[tokio::test]
    async fn test_mismatch_retries_with_prefix_and_memoizes() {
        let temp = TempDir::new().unwrap();
        let exe = create_fake_cli(temp.path(), LIST_NEEDS_PREFIX);
        let resolver = cli_resolver(&exe, true);

        let first = resolver
            .resolve_all_versions(&foo(), &cli_options(), &CancellationToken::new())
            .await;
        assert_eq!(first, versions(&["1.1.0", "1.0.0"]));
        assert_eq!(
            invocations(&exe),
            vec!["list Foo -AllVersions", "list packageid:Foo -AllVersions"]
        );
        assert_eq!(
            resolver.prefix_cache().get(&SourceKey::new(None, None)).as_deref(),
            Some(DEFAULT_PREFIX)
        );

        let second = resolver
            .resolve_all_versions(&foo(), &cli_options(), &CancellationToken::new())
            .await;
        assert_eq!(second, first);
        assert_eq!(invocations(&exe).len(), 3);
        assert_eq!(invocations(&exe)[2], "list packageid:Foo -AllVersions");
    }

    #[tokio::test]
    async fn test_empty_prefixed_listing_retries_without_prefix() {
        let temp = TempDir::new().unwrap();
        let exe = create_fake_cli(temp.path(), LIST_REJECTS_PREFIX);
        let resolver = cli_resolver(&exe, true);

        let options = cli_options().with_prerelease(true).with_source_name("internal");
        let found = resolver
            .resolve_all_versions(&foo(), &options.clone().with_prefix(DEFAULT_PREFIX), &CancellationToken::new())
            .await;
        assert_eq!(found, versions(&["2.1.0-beta", "2.0.0"]));
        assert_eq!(
            resolver
                .prefix_cache()
                .get(&SourceKey::new(None, Some("internal")))
                .as_deref(),
            Some("")
        );

        let again = resolver
            .resolve_all_versions(&foo(), &options, &CancellationToken::new())
            .await;
        assert_eq!(again, found);
        assert_eq!(
            invocations(&exe),
            vec![
                "list packageid:Foo -AllVersions -source internal -Prerelease",
                "list Foo -AllVersions -source internal -Prerelease",
                "list Foo -AllVersions -source internal -Prerelease",
            ]
        );
    }

    #[tokio::test]
    async fn test_prefix_retry_fires_at_most_once() {
        let temp = TempDir::new().unwrap();
        let exe = create_fake_cli(temp.path(), LIST_MIXED);
        let resolver = cli_resolver(&exe, true);

        let found = resolver
            .resolve_all_versions(&foo(), &cli_options(), &CancellationToken::new())
            .await;
        assert!(found.is_empty());
        assert_eq!(invocations(&exe).len(), 2);
        assert!(resolver.prefix_cache().is_empty());
    }

    #[tokio::test]
    async fn test_without_adaptive_prefix_output_is_filtered() {
        let temp = TempDir::new().unwrap();
        let exe = create_fake_cli(temp.path(), LIST_MIXED);
        let resolver = cli_resolver(&exe, false);

        let found = resolver
            .resolve_all_versions(&foo(), &cli_options(), &CancellationToken::new())
            .await;
        assert_eq!(found, versions(&["2.0.0"]));
        assert_eq!(invocations(&exe), vec!["list Foo -AllVersions"]);
    }

    #[tokio::test]
    async fn test_per_call_adaptive_opt_out() {
        let temp = TempDir::new().unwrap();
        let exe = create_fake_cli(temp.path(), LIST_MIXED);
        let resolver = cli_resolver(&exe, true);

        let found = resolver
            .resolve_all_versions(&foo(), &cli_options().with_adaptive(false), &CancellationToken::new())
            .await;
        assert_eq!(found, versions(&["2.0.0"]));
        assert_eq!(invocations(&exe).len(), 1);
    }

    #[tokio::test]
    async fn test_failing_listing_yields_empty() {
        let temp = TempDir::new().unwrap();
        let exe = create_fake_cli(temp.path(), FAILING);
        let resolver = cli_resolver(&exe, true);

        let found = resolver
            .resolve_all_versions(&foo(), &cli_options(), &CancellationToken::new())
            .await;
        assert!(found.is_empty());
        assert_eq!(invocations(&exe).len(), 1);
    }

    #[tokio::test]
    async fn test_listing_times_out() {
        let temp = TempDir::new().unwrap();
        let exe = create_fake_cli(temp.path(), "sleep 5\necho \"Foo 1.0.0\"\nexit 0\n");
        let resolver = cli_resolver(&exe, false);

        let options = cli_options().with_timeout(std::time::Duration::from_millis(200));
        let found = resolver
            .resolve_all_versions(&foo(), &options, &CancellationToken::new())
            .await;
        assert!(found.is_empty());
    }
}
