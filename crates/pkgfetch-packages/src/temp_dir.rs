//! Scoped working directories removed on drop

use std::io;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Temporary directory deleted when the value goes out of scope
///
/// Deletion failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct ScopedTempDir {
    inner: Option<TempDir>,
}

impl ScopedTempDir {
    /// Create a directory under `parent`, or under the system temp dir
    pub fn create(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pkgfetch-");

        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        debug!(directory = %dir.path().display(), "Created temp directory");
        Ok(Self { inner: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        match &self.inner {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }
}

impl Drop for ScopedTempDir {
    fn drop(&mut self) {
        let Some(dir) = self.inner.take() else {
            return;
        };

        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!(directory = %path.display(), "Removed temp directory"),
            Err(err) => warn!(directory = %path.display(), error = %err, "Could not remove temp directory"),
        }
    }
}
