//! Shared data model

mod package;
mod version;

pub use package::{InstallResult, PackageId, PackageReference, PackageVersion};
pub use version::{normalized_version, parse_version, same_version};
