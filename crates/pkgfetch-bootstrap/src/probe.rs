//! Installed executable version probe

use crate::process::{run_process, OutputStream};
use semver::Version;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Label preceding the version in the executable's banner
pub const VERSION_LABEL: &str = "NuGet Version:";

/// Parse the version out of a banner line such as `NuGet Version: 6.10.0.107`
///
/// Only the first three dot-separated components are used.
pub fn parse_version_line(line: &str) -> Option<Version> {
    let line = line.trim();
    if !line.starts_with(VERSION_LABEL) {
        return None;
    }

    let value = line.rsplit(':').next()?.trim();
    let parts: Vec<&str> = value.split('.').take(3).collect();
    if parts.len() < 3 {
        return None;
    }

    pkgfetch_core::parse_version(&parts.join("."))
}

/// Run the executable without arguments and read its version from the banner
///
/// Returns `None` (after logging a warning) when the process fails or the
/// banner cannot be parsed.
pub async fn installed_version(
    exe_path: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Option<Version> {
    let mut banner = None;
    let result = run_process(exe_path, &[], Some(timeout), cancel, |stream, line| {
        if stream == OutputStream::Stdout && banner.is_none() && line.trim().starts_with(VERSION_LABEL) {
            banner = Some(line.to_string());
        }
    })
    .await;

    match result {
        Ok(Some(0)) => {}
        Ok(code) => {
            warn!(path = %exe_path.display(), exit_code = ?code, "Version probe exited unsuccessfully");
            return None;
        }
        Err(err) => {
            warn!(path = %exe_path.display(), error = %err, "Could not run version probe");
            return None;
        }
    }

    let Some(line) = banner else {
        warn!(path = %exe_path.display(), "Could not find current executable version in output");
        return None;
    };

    let version = parse_version_line(&line);
    match &version {
        Some(version) => debug!(version = %version, "Found installed executable version"),
        None => warn!(line = %line, "Could not parse executable version"),
    }
    version
}
