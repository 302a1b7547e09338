//! Bootstrapping of the package-management executable
//!
//! Provides:
//! - Download of the executable from a templated URI
//! - Version probe of an installed executable
//! - Self-update against the remote release index
//! - Subprocess runner shared with the package crate

pub mod download;
pub mod index;
pub mod probe;
pub mod process;
pub mod result;
pub mod uri;

pub use download::{ExeDownloadClient, MIN_EXECUTABLE_SIZE};
pub use index::{AvailableExecutable, VersionIndex};
pub use process::{run_process, OutputStream, ProcessError};
pub use result::DownloadResult;
pub use uri::render_download_uri;
