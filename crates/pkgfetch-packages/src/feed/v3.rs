//! Structured JSON feeds (service index + flat container)

use super::http::FeedHttp;
use super::FindPackageById;
use crate::error::{FeedError, FeedResult};
use crate::sources::PackageSource;
use async_trait::async_trait;
use pkgfetch_core::{normalized_version, PackageId};
use semver::Version;
use serde::Deserialize;
use std::path::Path;
use tokio::sync::OnceCell;
use url::Url;

/// Resource type of the flat container in the service index
pub const PACKAGE_BASE_ADDRESS: &str = "PackageBaseAddress/3.0.0";

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    #[serde(default)]
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type", default)]
    kind: serde_json::Value,
}

impl ServiceResource {
    fn has_type(&self, wanted: &str) -> bool {
        match &self.kind {
            serde_json::Value::String(kind) => kind == wanted,
            serde_json::Value::Array(kinds) => kinds.iter().any(|kind| kind.as_str() == Some(wanted)),
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VersionList {
    #[serde(default)]
    versions: Vec<String>,
}

/// Feed speaking the JSON service-index protocol
pub struct V3Feed {
    source: PackageSource,
    http: FeedHttp,
    index_url: Url,
    base_address: OnceCell<Url>,
}

impl V3Feed {
    pub fn new(source: PackageSource, http: FeedHttp) -> FeedResult<Self> {
        let index_url = Url::parse(&source.location)
            .map_err(|e| FeedError::invalid_url(&source.location, e))?;
        Ok(Self {
            source,
            http,
            index_url,
            base_address: OnceCell::new(),
        })
    }

    async fn base_address(&self) -> FeedResult<&Url> {
        self.base_address
            .get_or_try_init(|| async {
                let index: ServiceIndex = self
                    .http
                    .get_json(&self.index_url)
                    .await?
                    .ok_or_else(|| FeedError::protocol(self.index_url.as_str(), "service index not found"))?;

                let resource = index
                    .resources
                    .iter()
                    .find(|resource| resource.has_type(PACKAGE_BASE_ADDRESS))
                    .ok_or_else(|| {
                        FeedError::protocol(self.index_url.as_str(), "no PackageBaseAddress resource")
                    })?;

                let mut address = resource.id.clone();
                if !address.ends_with('/') {
                    address.push('/');
                }
                Url::parse(&address).map_err(|e| FeedError::invalid_url(address, e))
            })
            .await
    }

    async fn package_url(&self, relative: &str) -> FeedResult<Url> {
        let base = self.base_address().await?;
        base.join(relative)
            .map_err(|e| FeedError::invalid_url(format!("{}{}", base, relative), e))
    }
}

#[async_trait]
impl FindPackageById for V3Feed {
    fn source(&self) -> &PackageSource {
        &self.source
    }

    async fn all_versions(&self, id: &PackageId) -> FeedResult<Vec<String>> {
        let url = self
            .package_url(&format!("{}/index.json", id.to_lowercase()))
            .await?;
        let list: Option<VersionList> = self.http.get_json(&url).await?;
        Ok(list.map(|list| list.versions).unwrap_or_default())
    }

    async fn download_to(&self, id: &PackageId, version: &Version, destination: &Path) -> FeedResult<()> {
        let lower_id = id.to_lowercase();
        let lower_version = normalized_version(version).to_lowercase();
        let url = self
            .package_url(&format!(
                "{0}/{1}/{0}.{1}.nupkg",
                lower_id, lower_version
            ))
            .await?;
        self.http.download_to(&url, destination).await?;
        Ok(())
    }
}
