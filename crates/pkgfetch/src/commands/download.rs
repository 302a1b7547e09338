//! Download command

use crate::cli::DownloadArgs;
use crate::output;
use anyhow::{bail, Context, Result};
use pkgfetch_core::{normalized_version, PackageId, PackageReference};
use pkgfetch_packages::PackageInstaller;
use tokio_util::sync::CancellationToken;

pub async fn run(args: DownloadArgs) -> Result<()> {
    let config = super::load_config()?;
    let id = PackageId::new(&args.package_id).context("Invalid package id")?;
    let reference = PackageReference::new(id, args.version);

    let mut settings = config.packages.clone();
    settings.allow_prerelease |= args.sources.prerelease;
    settings.use_cli |= args.sources.use_cli;
    settings.extract |= args.extract;
    if args.sources.source.is_some() {
        settings.source_name = args.sources.source.clone();
    }
    if args.sources.config.is_some() {
        settings.config_file = args.sources.config.clone();
    }

    let installer = PackageInstaller::new(&config);
    let pb = output::spinner(&format!("Installing {}", reference));
    let result = installer
        .install(
            &reference,
            Some(&settings),
            args.output_directory.as_deref(),
            &CancellationToken::new(),
        )
        .await;
    pb.finish_and_clear();
    let result = result.with_context(|| format!("Failed to install {}", reference))?;

    match (&result.version, &result.directory) {
        (Some(version), Some(directory)) => {
            output::success(&format!("Installed {} {}", result.package_id, normalized_version(version)));
            output::kv("directory", &directory.display().to_string());
            Ok(())
        }
        _ => {
            output::error(&format!("Could not install {}", reference));
            bail!("Package {} was not installed", reference.id)
        }
    }
}
