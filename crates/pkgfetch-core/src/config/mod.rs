//! Configuration: settings value objects and the hierarchical loader

mod loader;
mod settings;

pub use loader::{ConfigLoader, CONFIG_FILE_NAME};
pub use settings::{
    CliSettings, DownloadSettings, PackageSettings, PkgfetchConfig,
    DEFAULT_EXE_DOWNLOAD_URI_FORMAT, DEFAULT_VERSION_INDEX_URL, LATEST_EXE_VERSION,
};
