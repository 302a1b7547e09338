//! Common test infrastructure for pkgfetch-bootstrap tests
//!
//! - `constants`: Versions, paths and payload sizes
//! - `mock_server`: Wiremock setup helpers for executable downloads
//! - `fake_exe`: Fake executables answering the version probe

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod constants;
pub mod fake_exe;
pub mod mock_server;

pub use constants::*;
pub use fake_exe::*;
pub use mock_server::*;
