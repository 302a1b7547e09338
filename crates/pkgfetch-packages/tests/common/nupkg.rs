//! Package archive fixtures

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// Build a package archive with a manifest and one content file
pub fn build_nupkg(id: &str, version: &str) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(format!("{}.nuspec", id), opts).unwrap();
    write!(
        zip,
        r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd">
  <metadata>
    <id>{}</id>
    <version>{}</version>
    <authors>tests</authors>
  </metadata>
</package>"#,
        id, version
    )
    .unwrap();

    zip.start_file("content/readme.txt", opts).unwrap();
    zip.write_all(b"package content").unwrap();

    zip.finish().unwrap().into_inner()
}
