//! Remote index of executable releases

use semver::Version;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Artifact name of the command-line executable in the index
pub const ARTIFACT_NAME: &str = "win-x86-commandline";

/// Display name of the executable in the index
pub const EXECUTABLE_DISPLAY_NAME: &str = "nuget.exe";

/// Index document
#[derive(Debug, Clone, Deserialize)]
pub struct VersionIndex {
    #[serde(default)]
    pub artifacts: Vec<IndexArtifact>,
}

/// Artifact entry of the index
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexArtifact {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub versions: Vec<IndexVersion>,
}

/// Single release of an artifact
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexVersion {
    #[serde(default)]
    pub display_name: String,
    pub version: String,
    pub url: String,
    #[serde(default, rename = "releasedate")]
    pub release_date: Option<String>,
}

/// A downloadable release of the executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableExecutable {
    pub version: Version,
    pub download_url: Url,
}

impl VersionIndex {
    /// Stable releases of the executable, newest first
    pub fn available_versions(&self) -> Vec<AvailableExecutable> {
        let Some(artifact) = self
            .artifacts
            .iter()
            .find(|artifact| artifact.name.eq_ignore_ascii_case(ARTIFACT_NAME))
        else {
            return Vec::new();
        };

        let mut versions: Vec<AvailableExecutable> = artifact
            .versions
            .iter()
            .filter(|entry| entry.display_name.eq_ignore_ascii_case(EXECUTABLE_DISPLAY_NAME))
            .filter_map(|entry| {
                let version = pkgfetch_core::parse_version(&entry.version);
                let url = Url::parse(&entry.url).ok();
                match (version, url) {
                    (Some(version), Some(download_url)) => Some(AvailableExecutable {
                        version,
                        download_url,
                    }),
                    _ => {
                        debug!(version = %entry.version, url = %entry.url, "Skipping unparseable index entry");
                        None
                    }
                }
            })
            .filter(|available| available.version.pre.is_empty())
            .collect();

        versions.sort_by(|a, b| b.version.cmp(&a.version));
        versions
    }
}

/// Fetch available releases from the index
///
/// Failures are logged as warnings and yield an empty list.
pub async fn fetch_available_versions(
    client: &reqwest::Client,
    index_url: &str,
    cancel: &CancellationToken,
) -> Vec<AvailableExecutable> {
    let fetch = async {
        let response = client.get(index_url).send().await?;
        if !response.status().is_success() {
            warn!(
                status = %response.status(),
                url = %index_url,
                "Could not get available executable versions"
            );
            return Ok(None);
        }
        response.json::<VersionIndex>().await.map(Some)
    };

    let result = tokio::select! {
        _ = cancel.cancelled() => {
            debug!(url = %index_url, "Version index fetch cancelled");
            return Vec::new();
        }
        result = fetch => result,
    };

    match result {
        Ok(Some(index)) => {
            let versions = index.available_versions();
            debug!(count = versions.len(), "Found available executable versions");
            versions
        }
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!(error = %err, url = %index_url, "Could not get available executable versions");
            Vec::new()
        }
    }
}
