//! Executable download client
//!
//! Makes sure the package-management executable exists on disk:
//! - Short-circuits on an existing file unless forced
//! - Streams the download to a uniquely named temp file next to the target
//! - Rejects truncated downloads below a minimum plausible size
//! - Optionally probes the installed version and upgrades from the remote index

use crate::index::fetch_available_versions;
use crate::probe::installed_version;
use crate::result::DownloadResult;
use crate::uri::render_download_uri;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use pkgfetch_core::config::DownloadSettings;
use pkgfetch_core::utils::tools_dir;
use reqwest::header::CONTENT_LENGTH;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Downloads smaller than this are treated as truncated
pub const MIN_EXECUTABLE_SIZE: u64 = 1024 * 1024;

/// Pause before overwriting an executable that already exists
pub const DEFAULT_REPLACE_DELAY: Duration = Duration::from_secs(2);

/// Upper bound for running the executable to read its version
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
enum FetchError {
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download was cancelled")]
    Cancelled,
}

/// Client ensuring the executable is available locally
pub struct ExeDownloadClient {
    client: reqwest::Client,
    replace_delay: Duration,
    probe_timeout: Duration,
    show_progress: bool,
}

impl Default for ExeDownloadClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ExeDownloadClient {
    /// Create a client with its own HTTP client
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a client reusing a caller-supplied HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            replace_delay: DEFAULT_REPLACE_DELAY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            show_progress: false,
        }
    }

    /// Set the pause before replacing an existing executable
    pub fn with_replace_delay(mut self, delay: Duration) -> Self {
        self.replace_delay = delay;
        self
    }

    /// Set the timeout for the version probe
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Enable or disable progress bars
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Make sure the executable exists, downloading it when needed
    pub async fn ensure_executable(
        &self,
        settings: &DownloadSettings,
        cancel: &CancellationToken,
    ) -> DownloadResult {
        if !settings.enabled {
            return DownloadResult::Disabled;
        }

        let Some(uri_format) = settings
            .download_uri_format
            .as_deref()
            .filter(|format| !format.trim().is_empty())
        else {
            return DownloadResult::MissingUriFormat;
        };

        let version = settings.exe_version.trim();
        if version.is_empty() {
            return DownloadResult::MissingVersion;
        }

        let Some(directory) = tools_dir(settings.download_directory.as_deref(), version) else {
            return DownloadResult::MissingDirectory;
        };

        if let Err(err) = tokio::fs::create_dir_all(&directory).await {
            warn!(directory = %directory.display(), error = %err, "Could not create download directory");
            return DownloadResult::exception(err);
        }

        let target = directory.join(&settings.exe_name);

        if target.exists() && !settings.force {
            debug!(path = %target.display(), "Found existing executable, skipping download");

            if settings.update_enabled {
                if let Some(updated) = self.ensure_latest(&target, settings, cancel).await {
                    return updated;
                }
            }

            return DownloadResult::Success(target);
        }

        let uri = match render_download_uri(uri_format, version) {
            Ok(uri) => uri,
            Err(rendered) => return DownloadResult::InvalidUri(rendered),
        };

        let result = self.download(&uri, &target, cancel).await;

        if result.succeeded() && settings.update_enabled {
            if let Some(updated) = self.ensure_latest(&target, settings, cancel).await {
                return updated;
            }
        }

        result
    }

    async fn download(&self, uri: &Url, target: &Path, cancel: &CancellationToken) -> DownloadResult {
        let temp_path = temp_path_for(target);
        debug!(uri = %uri, temp_file = %temp_path.display(), "Downloading executable");

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.fetch_to_file(uri, &temp_path) => result,
        };

        let size = match fetched {
            Ok(size) => size,
            Err(err) => {
                remove_temp(&temp_path).await;
                warn!(uri = %uri, error = %err, "Executable download failed");
                return match err {
                    FetchError::Status(status) => DownloadResult::DownloadFailed(status.to_string()),
                    other => DownloadResult::exception(other),
                };
            }
        };

        if size < MIN_EXECUTABLE_SIZE {
            remove_temp(&temp_path).await;
            warn!(uri = %uri, size, "Downloaded executable is too small, treating as truncated");
            return DownloadResult::DownloadFailed(format!(
                "downloaded file is {} bytes, expected at least {}",
                size, MIN_EXECUTABLE_SIZE
            ));
        }

        if target.exists() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    remove_temp(&temp_path).await;
                    return DownloadResult::exception(FetchError::Cancelled);
                }
                _ = tokio::time::sleep(self.replace_delay) => {}
            }
        }

        debug!(temp_file = %temp_path.display(), target = %target.display(), "Copying temp file to target");
        if let Err(err) = tokio::fs::copy(&temp_path, target).await {
            remove_temp(&temp_path).await;
            warn!(target = %target.display(), error = %err, "Could not replace executable");
            return DownloadResult::exception(err);
        }
        remove_temp(&temp_path).await;

        info!(path = %target.display(), size, "Downloaded executable");
        DownloadResult::Success(target.to_path_buf())
    }

    async fn fetch_to_file(&self, uri: &Url, temp_path: &Path) -> Result<u64, FetchError> {
        let response = self.client.get(uri.clone()).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let total_size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse::<u64>().ok())
            .unwrap_or(0);

        let progress = self.show_progress.then(|| {
            let pb = ProgressBar::new(total_size);
            if let Ok(style) = ProgressStyle::default_bar().template(
                "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
            ) {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb.set_message(format!("Downloading {}", uri));
            pb
        });

        let mut file = tokio::fs::File::create(temp_path).await?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(pb) = &progress {
                pb.set_position(downloaded);
            }
        }
        file.flush().await?;

        if let Some(pb) = progress {
            pb.finish_with_message("Download complete");
        }

        Ok(downloaded)
    }

    /// Best-effort upgrade of an existing executable to the newest stable release
    async fn ensure_latest(
        &self,
        target: &Path,
        settings: &DownloadSettings,
        cancel: &CancellationToken,
    ) -> Option<DownloadResult> {
        if !target.exists() {
            warn!(path = %target.display(), "Executable does not exist, skipping latest check");
            return None;
        }

        let current = installed_version(target, self.probe_timeout, cancel).await?;
        let newest = fetch_available_versions(&self.client, &settings.version_index_url, cancel)
            .await
            .into_iter()
            .next()?;

        if newest.version <= current {
            debug!(
                newest = %newest.version,
                installed = %current,
                "Newest available executable is not greater than the installed version"
            );
            return None;
        }

        info!(
            newest = %newest.version,
            installed = %current,
            "Downloading newer executable"
        );
        let result = self.download(&newest.download_url, target, cancel).await;
        if result.succeeded() {
            Some(result)
        } else {
            warn!(version = %newest.version, result = %result, "Could not download newest executable");
            None
        }
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let stamp = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "executable".to_string());
    target.with_file_name(format!("{}-{}.tmp", name, stamp))
}

async fn remove_temp(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %err, "Could not delete temp file");
        }
    }
}
