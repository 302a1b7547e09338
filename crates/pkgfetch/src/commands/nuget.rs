//! Executable download command

use crate::cli::NugetArgs;
use crate::output;
use anyhow::{bail, Result};
use pkgfetch_bootstrap::ExeDownloadClient;
use pkgfetch_core::DownloadSettings;
use tokio_util::sync::CancellationToken;

pub async fn run(args: NugetArgs) -> Result<()> {
    let config = super::load_config()?;
    let settings = apply_args(config.download, &args);

    let client = ExeDownloadClient::new().with_progress(output::interactive());
    let result = client
        .ensure_executable(&settings, &CancellationToken::new())
        .await;

    match result.path() {
        Some(path) => {
            output::success("Executable is available");
            output::kv("path", &path.display().to_string());
            Ok(())
        }
        None => {
            output::error(&format!("Could not download the executable: {}", result));
            bail!("Executable download failed: {}", result)
        }
    }
}

fn apply_args(mut settings: DownloadSettings, args: &NugetArgs) -> DownloadSettings {
    if !args.output_directory.eq_ignore_ascii_case("default") {
        settings = settings.with_download_directory(&args.output_directory);
    }
    if let Some(version) = &args.exe_version {
        settings = settings.with_exe_version(version);
    }
    if args.force {
        settings = settings.with_force(true);
    }
    if args.update {
        settings = settings.with_update_enabled(true);
    }
    settings
}
