//! Shared test constants

/// Executable file name used by default settings
pub const EXE_NAME: &str = "nuget.exe";

/// URI template path served by the mock server
pub const EXE_PATH_TEMPLATE: &str = "/dist/{0}/nuget.exe";

/// Version used for templated downloads
pub const EXE_VERSION: &str = "6.10.0";

/// Path of the remote version index on the mock server
pub const INDEX_PATH: &str = "/index.json";

/// A payload comfortably above the minimum executable size
pub fn large_payload() -> Vec<u8> {
    vec![0x4d; 1024 * 1024 + 4096]
}

/// A payload below the minimum executable size
pub const SMALL_PAYLOAD: &[u8] = b"<html>not found</html>";
