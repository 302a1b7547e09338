//! Locating the package-management executable for the subprocess strategies

use pkgfetch_bootstrap::ExeDownloadClient;
use pkgfetch_core::{CliSettings, DownloadSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Finds a configured executable or downloads one on demand
#[derive(Clone)]
pub struct ExecutableLocator {
    explicit_path: Option<PathBuf>,
    download: DownloadSettings,
    downloader: Arc<ExeDownloadClient>,
}

impl ExecutableLocator {
    pub fn new(cli: &CliSettings, download: DownloadSettings, downloader: ExeDownloadClient) -> Self {
        Self {
            explicit_path: cli.exe_path.clone(),
            download,
            downloader: Arc::new(downloader),
        }
    }

    /// Path of a usable executable, or `None` after logging why there is none
    ///
    /// A configured path that exists is used as-is unless downloads are forced.
    pub async fn locate(&self, cancel: &CancellationToken) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            if path.is_file() && !self.download.force {
                return Some(path.clone());
            }
            debug!(path = %path.display(), "Configured executable is not usable, downloading");
        }

        let result = self.downloader.ensure_executable(&self.download, cancel).await;
        match result.path() {
            Some(path) => Some(path.to_path_buf()),
            None => {
                error!(result = %result, "Could not obtain the package-management executable");
                None
            }
        }
    }
}
