//! Fake executables for version probe tests

use std::fs;
use std::io::Write;
use std::path::Path;

/// Write an executable script printing a version banner
#[cfg(unix)]
pub fn create_banner_script(path: &Path, banner_version: &str) -> std::io::Result<()> {
    let script = format!(
        r#"#!/bin/bash
echo "NuGet Version: {}"
echo "usage: NuGet <command> [args] [options]"
exit 0
"#,
        banner_version
    );

    let mut file = fs::File::create(path)?;
    file.write_all(script.as_bytes())?;

    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;

    Ok(())
}

/// Write a plain file standing in for an existing executable
pub fn create_existing_exe(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)
}
