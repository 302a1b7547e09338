//! Find-package-by-id capabilities for each kind of package source

mod http;
mod local;
mod v2;
mod v3;

pub use http::FeedHttp;
pub use local::LocalFeed;
pub use v2::V2Feed;
pub use v3::{V3Feed, PACKAGE_BASE_ADDRESS};

use crate::error::FeedResult;
use crate::sources::PackageSource;
use async_trait::async_trait;
use pkgfetch_core::PackageId;
use reqwest::Method;
use semver::Version;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Lists versions of a package and streams its archive
///
/// Futures returned by these methods abort their in-flight requests when
/// dropped, so callers cancel by racing them against a token.
#[async_trait]
pub trait FindPackageById: Send + Sync {
    /// Source this capability was opened for
    fn source(&self) -> &PackageSource;

    /// Raw version strings published for `id`; empty when the id is unknown
    async fn all_versions(&self, id: &PackageId) -> FeedResult<Vec<String>>;

    /// Write the archive of `id` at `version` to `destination`
    async fn download_to(&self, id: &PackageId, version: &Version, destination: &Path) -> FeedResult<()>;
}

/// Wire protocol spoken by a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedProtocol {
    /// JSON service index
    V3,
    /// OData/Atom
    V2,
    /// Folder on disk
    Local,
}

impl fmt::Display for FeedProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V3 => write!(f, "v3"),
            Self::V2 => write!(f, "v2"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Work out which protocol a source speaks
///
/// An explicit protocol version wins. Otherwise the source is probed with
/// HEAD, then GET, and a JSON content type means v3. A source answering
/// neither probe is treated as v2.
pub async fn detect_protocol(http: &FeedHttp, source: &PackageSource) -> FeedProtocol {
    if !source.is_http() {
        return FeedProtocol::Local;
    }
    if source.protocol_version == Some(3) {
        return FeedProtocol::V3;
    }

    let Ok(url) = Url::parse(&source.location) else {
        return FeedProtocol::V2;
    };

    let content_type = match http.content_type(Method::HEAD, &url).await {
        Some(content_type) => Some(content_type),
        None => http.content_type(Method::GET, &url).await,
    };

    let protocol = match content_type {
        Some(content_type) if content_type.to_ascii_lowercase().contains("json") => FeedProtocol::V3,
        _ => FeedProtocol::V2,
    };
    debug!(source = %source.name, protocol = %protocol, "Detected feed protocol");
    protocol
}

/// Open the find-package-by-id capability of a source
pub async fn open_feed(
    client: &reqwest::Client,
    source: &PackageSource,
) -> FeedResult<Arc<dyn FindPackageById>> {
    let http = FeedHttp::new(client.clone(), source.credentials.clone());

    let feed: Arc<dyn FindPackageById> = match detect_protocol(&http, source).await {
        FeedProtocol::V3 => Arc::new(V3Feed::new(source.clone(), http)?),
        FeedProtocol::V2 => Arc::new(V2Feed::new(source.clone(), http)),
        FeedProtocol::Local => {
            let root = source
                .local_path()
                .unwrap_or_else(|| Path::new(&source.location).to_path_buf());
            Arc::new(LocalFeed::new(source.clone(), root))
        }
    };
    Ok(feed)
}
