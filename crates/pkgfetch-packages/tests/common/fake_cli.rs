//! Fake package-management executables
//!
//! Every script appends its arguments to an invocation log next to itself
//! so tests can assert how often, and with what, it was run.

use std::fs;
use std::path::{Path, PathBuf};

/// Listing whose unprefixed search floods the output with other packages
pub const LIST_NEEDS_PREFIX: &str = r#"
if [ "$1" = "list" ]; then
  case "$2" in
    packageid:*)
      echo "Foo 1.0.0"
      echo "Foo 1.1.0"
      exit 0
      ;;
    *)
      for i in $(seq 1 1000); do
        echo "Unrelated.Package$i 1.0.0"
        sleep 0.01
      done
      exit 0
      ;;
  esac
fi
exit 1
"#;

/// Listing that rejects the prefix syntax
pub const LIST_REJECTS_PREFIX: &str = r#"
if [ "$1" = "list" ]; then
  case "$2" in
    packageid:*)
      echo "No packages found."
      exit 0
      ;;
    *)
      echo "Using credentials from config. UserName: user"
      echo "Foo 2.0.0"
      echo "Foo 2.1.0-beta"
      exit 0
      ;;
  esac
fi
exit 1
"#;

/// Listing of unrelated packages followed by one match
pub const LIST_MIXED: &str = r#"
for i in $(seq 1 8); do
  echo "Bar.Extension$i 3.0.0"
done
echo "Foo 2.0.0"
exit 0
"#;

/// Any invocation fails
pub const FAILING: &str = r#"
echo "Unable to load the service index" >&2
exit 1
"#;

/// `install` writing `Foo.2.0.0/` into the output directory
pub const INSTALL_FOO_2: &str = r#"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-OutputDirectory" ]; then
    out="$2"
  fi
  shift
done
mkdir -p "$out/Foo.2.0.0/lib"
echo "package content" > "$out/Foo.2.0.0/lib/readme.txt"
echo "archive" > "$out/Foo.2.0.0/Foo.2.0.0.nupkg"
echo "Successfully installed 'Foo 2.0.0' to $out"
exit 0
"#;

/// `install` whose output holds a dangling link, so copying it fails
pub const INSTALL_DANGLING_LINK: &str = r#"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-OutputDirectory" ]; then
    out="$2"
  fi
  shift
done
mkdir -p "$out/Foo.2.0.0/lib"
echo "archive" > "$out/Foo.2.0.0/Foo.2.0.0.nupkg"
ln -s "$out/does-not-exist" "$out/Foo.2.0.0/lib/x.dll"
exit 0
"#;

/// `install` producing two candidate package directories
pub const INSTALL_AMBIGUOUS: &str = r#"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-OutputDirectory" ]; then
    out="$2"
  fi
  shift
done
mkdir -p "$out/Foo.1.0.0" "$out/Foo.2.0.0"
echo "archive" > "$out/Foo.1.0.0/Foo.1.0.0.nupkg"
echo "archive" > "$out/Foo.2.0.0/Foo.2.0.0.nupkg"
exit 0
"#;

/// Write an executable script with `body` into `dir`
#[cfg(unix)]
pub fn create_fake_cli(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("nuget.exe");
    let log = invocation_log(&path);
    let script = format!("#!/bin/bash\necho \"$@\" >> \"{}\"\n{}", log.display(), body);

    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Log file the script at `exe` appends to
pub fn invocation_log(exe: &Path) -> PathBuf {
    exe.with_extension("log")
}

/// Recorded argument lines, oldest first
pub fn invocations(exe: &Path) -> Vec<String> {
    fs::read_to_string(invocation_log(exe))
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
