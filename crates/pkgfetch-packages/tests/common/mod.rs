//! Common test infrastructure for pkgfetch-packages tests
//!
//! - `feeds`: Wiremock setup for JSON and OData feeds
//! - `nupkg`: In-memory package archive builder
//! - `fake_cli`: Fake package-management executables
//! - `sources`: Fixed source providers and resolver/installer builders

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_cli;
pub mod feeds;
pub mod nupkg;
pub mod sources;

pub use fake_cli::*;
pub use feeds::*;
pub use nupkg::*;
pub use sources::*;
