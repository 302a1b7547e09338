//! List command

use crate::cli::ListArgs;
use crate::output;
use anyhow::{bail, Context, Result};
use pkgfetch_core::{normalized_version, PackageId};
use pkgfetch_packages::{ResolveOptions, ResolveStrategy, VersionResolver};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub async fn run(args: ListArgs) -> Result<()> {
    let config = super::load_config()?;
    let id = PackageId::new(&args.package_id).context("Invalid package id")?;

    let mut options = ResolveOptions::default()
        .with_prerelease(args.sources.prerelease || config.packages.allow_prerelease)
        .with_strategy(if args.sources.use_cli || config.packages.use_cli {
            ResolveStrategy::Cli
        } else {
            ResolveStrategy::Http
        });
    options.source_name = args.sources.source.clone().or(config.cli.source_name.clone());
    options.config_file = args.sources.config.clone().or(config.cli.config_file.clone());
    options.max_rows = args.take;

    debug!(package = %id, strategy = ?options.strategy, "Listing versions");
    let resolver = VersionResolver::new(&config);
    let pb = output::spinner(&format!("Resolving versions of {}", id));
    let versions = resolver
        .resolve_all_versions(&id, &options, &CancellationToken::new())
        .await;
    pb.finish_and_clear();

    if versions.is_empty() {
        bail!("No versions of {} were found", id);
    }

    let normalized: Vec<String> = versions.iter().map(normalized_version).collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&normalized)?);
    } else {
        output::kv("package", id.as_str());
        for version in &normalized {
            println!("{}", version);
        }
    }

    Ok(())
}
