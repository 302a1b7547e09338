//! Package resolution and installation
//!
//! Provides:
//! - Package source discovery from `nuget.config` files
//! - Find-package-by-id capabilities for JSON, OData and local folder feeds
//! - Version resolution over HTTP or through the package-management executable
//! - Installation into a local cache, with cache scanning and scoped temp dirs

pub mod archive;
pub mod cache;
pub mod error;
pub mod executable;
pub mod feed;
pub mod installer;
pub mod output;
pub mod prefix_cache;
pub mod resolver;
pub mod sources;
pub mod temp_dir;

pub use cache::{scan_cache, CachedPackage};
pub use error::{ArchiveError, FeedError, FeedResult, InstallError};
pub use executable::ExecutableLocator;
pub use feed::{detect_protocol, open_feed, FeedProtocol, FindPackageById};
pub use installer::PackageInstaller;
pub use prefix_cache::{PrefixCache, SourceKey, DEFAULT_PREFIX};
pub use resolver::{ResolveOptions, ResolveStrategy, VersionResolver};
pub use sources::{NuGetConfigSources, PackageSource, SourceProvider};
pub use temp_dir::ScopedTempDir;
