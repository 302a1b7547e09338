//! Legacy OData/Atom feeds

use super::http::FeedHttp;
use super::FindPackageById;
use crate::error::{FeedError, FeedResult};
use crate::sources::PackageSource;
use async_trait::async_trait;
use pkgfetch_core::{normalized_version, PackageId};
use regex::Regex;
use semver::Version;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

/// Upper bound on followed `next` links
const MAX_PAGES: usize = 200;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<d:Version(?:\s[^>]*)?>([^<]+)</d:Version>").expect("valid version regex")
});
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<link\b[^>]*>").expect("valid link regex"));
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href\s*=\s*"([^"]+)""#).expect("valid href regex"));
static REL_NEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"rel\s*=\s*"next""#).expect("valid rel regex"));

/// Feed speaking the OData protocol
pub struct V2Feed {
    source: PackageSource,
    http: FeedHttp,
    base: String,
}

impl V2Feed {
    pub fn new(source: PackageSource, http: FeedHttp) -> Self {
        let base = source.location.trim_end_matches('/').to_string();
        Self { source, http, base }
    }

    fn find_by_id_url(&self, id: &PackageId) -> FeedResult<Url> {
        let raw = format!("{}/FindPackagesById()", self.base);
        let mut url = Url::parse(&raw).map_err(|e| FeedError::invalid_url(&raw, e))?;
        url.query_pairs_mut()
            .append_pair("id", &format!("'{}'", id.as_str()));
        Ok(url)
    }
}

/// Versions listed in one Atom page
fn page_versions(xml: &str) -> Vec<String> {
    VERSION_RE
        .captures_iter(xml)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Target of the `rel="next"` link of an Atom page
fn next_link(xml: &str) -> Option<String> {
    LINK_RE
        .find_iter(xml)
        .map(|link| link.as_str())
        .filter(|link| REL_NEXT_RE.is_match(link))
        .find_map(|link| HREF_RE.captures(link).map(|caps| caps[1].replace("&amp;", "&")))
}

#[async_trait]
impl FindPackageById for V2Feed {
    fn source(&self) -> &PackageSource {
        &self.source
    }

    async fn all_versions(&self, id: &PackageId) -> FeedResult<Vec<String>> {
        let mut url = self.find_by_id_url(id)?;
        let mut versions = Vec::new();
        let mut visited = HashSet::new();

        for _ in 0..MAX_PAGES {
            if !visited.insert(url.to_string()) {
                break;
            }

            let Some(page) = self.http.get_text(&url).await? else {
                break;
            };
            versions.extend(page_versions(&page));

            let Some(next) = next_link(&page) else {
                return Ok(versions);
            };
            url = url
                .join(&next)
                .map_err(|e| FeedError::invalid_url(&next, e))?;
            debug!(url = %url, "Following next page");
        }

        if visited.len() >= MAX_PAGES {
            warn!(source = %self.source.name, package_id = %id, "Stopped following feed pages");
        }
        Ok(versions)
    }

    async fn download_to(&self, id: &PackageId, version: &Version, destination: &Path) -> FeedResult<()> {
        let raw = format!(
            "{}/package/{}/{}",
            self.base,
            id.as_str(),
            normalized_version(version)
        );
        let url = Url::parse(&raw).map_err(|e| FeedError::invalid_url(&raw, e))?;
        self.http.download_to(&url, destination).await?;
        Ok(())
    }
}
