//! CLI argument parsing with clap

use clap::{Args, Parser, Subcommand};
use pkgfetch_core::PackageVersion;
use std::path::PathBuf;

/// pkgfetch - resolve, download and cache NuGet packages
#[derive(Parser, Debug)]
#[command(name = "pkgfetch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available versions of a package, newest first
    List(ListArgs),

    /// Download a package into the local cache
    Download(DownloadArgs),

    /// Download the package-management executable
    Nuget(NugetArgs),
}

/// Options shared by commands that talk to package sources
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Only use the package source with this name
    #[arg(short, long)]
    pub source: Option<String>,

    /// nuget.config file declaring the package sources
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Include pre-release versions
    #[arg(long)]
    pub prerelease: bool,

    /// Use the package-management executable instead of the HTTP protocol
    #[arg(long)]
    pub use_cli: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Package id
    #[arg(short, long)]
    pub package_id: String,

    /// Show at most this many versions
    #[arg(short, long)]
    pub take: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Args, Debug)]
#[command(disable_version_flag = true)]
pub struct DownloadArgs {
    /// Package id
    #[arg(short, long)]
    pub package_id: String,

    /// Version, `latest-available` or `latest-downloaded`
    #[arg(long, default_value = PackageVersion::LATEST_AVAILABLE)]
    pub version: PackageVersion,

    /// Cache root; defaults to the per-user package directory
    #[arg(short, long)]
    pub output_directory: Option<PathBuf>,

    /// Extract the package after downloading it
    #[arg(long)]
    pub extract: bool,

    #[command(flatten)]
    pub sources: SourceArgs,
}

#[derive(Args, Debug)]
pub struct NugetArgs {
    /// Download directory, or `default` for the per-user tools directory
    #[arg(short, long, default_value = "default")]
    pub output_directory: String,

    /// Executable version to download
    #[arg(long)]
    pub exe_version: Option<String>,

    /// Download even when the executable already exists
    #[arg(short, long)]
    pub force: bool,

    /// Check for and install a newer release
    #[arg(short, long)]
    pub update: bool,
}
