//! Package source discovery
//!
//! Sources come from `nuget.config` style XML files. Without an explicit file,
//! every config file from the working directory up to the filesystem root is
//! layered over the user-level config, nearest file winning. A `<clear />`
//! drops everything declared by files further away.

use crate::error::{FeedError, FeedResult};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Name of the public feed used when nothing is configured
pub const DEFAULT_SOURCE_NAME: &str = "nuget.org";

/// Service index of the public feed
pub const DEFAULT_SOURCE_URL: &str = "https://api.nuget.org/v3/index.json";

/// File names recognised while walking up from the working directory
pub const CONFIG_FILE_NAMES: &[&str] = &["nuget.config", "NuGet.config", "NuGet.Config"];

static ENCODED_CHAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_x([0-9A-Fa-f]{4})_").expect("valid encoded char regex"));

/// Credentials for an authenticated feed
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// A configured package source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    /// Source key from the configuration
    pub name: String,

    /// Feed URL or local directory
    pub location: String,

    /// Declared protocol version, if any
    pub protocol_version: Option<u32>,

    pub credentials: Option<Credentials>,
}

impl PackageSource {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            protocol_version: None,
            credentials: None,
        }
    }

    pub fn with_protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = Some(version);
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Whether the source is reached over HTTP
    pub fn is_http(&self) -> bool {
        let lower = self.location.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// Local directory of a non-HTTP source
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.is_http() {
            return None;
        }
        if self.location.to_ascii_lowercase().starts_with("file:") {
            return url::Url::parse(&self.location)
                .ok()
                .and_then(|url| url.to_file_path().ok());
        }
        Some(PathBuf::from(&self.location))
    }

    /// The public feed
    pub fn default_source() -> Self {
        Self::new(DEFAULT_SOURCE_NAME, DEFAULT_SOURCE_URL).with_protocol_version(3)
    }
}

/// Resolves the enabled package sources
pub trait SourceProvider: Send + Sync {
    /// Enabled sources, from `config_file` when given or the default chain otherwise
    fn enabled_sources(&self, config_file: Option<&Path>) -> FeedResult<Vec<PackageSource>>;
}

/// Source provider reading `nuget.config` files
#[derive(Debug, Clone)]
pub struct NuGetConfigSources {
    start_dir: Option<PathBuf>,
    user_config: Option<PathBuf>,
}

impl Default for NuGetConfigSources {
    fn default() -> Self {
        Self::new()
    }
}

impl NuGetConfigSources {
    /// Provider starting at the current directory with the user-level config
    pub fn new() -> Self {
        Self {
            start_dir: std::env::current_dir().ok(),
            user_config: default_user_config(),
        }
    }

    /// Directory the upward config search starts from
    pub fn with_start_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(dir.into());
        self
    }

    /// User-level config file, or `None` to skip it
    pub fn with_user_config(mut self, path: Option<PathBuf>) -> Self {
        self.user_config = path;
        self
    }

    /// Config files in order of increasing priority
    fn config_chain(&self) -> Vec<PathBuf> {
        let mut nearest_first = Vec::new();
        if let Some(start) = &self.start_dir {
            for dir in start.ancestors() {
                if let Some(file) = CONFIG_FILE_NAMES
                    .iter()
                    .map(|name| dir.join(name))
                    .find(|path| path.is_file())
                {
                    nearest_first.push(file);
                }
            }
        }

        let mut chain: Vec<PathBuf> = self
            .user_config
            .iter()
            .filter(|path| path.is_file())
            .cloned()
            .collect();
        chain.extend(nearest_first.into_iter().rev());
        chain.dedup();
        chain
    }
}

impl SourceProvider for NuGetConfigSources {
    fn enabled_sources(&self, config_file: Option<&Path>) -> FeedResult<Vec<PackageSource>> {
        let chain = match config_file {
            Some(file) => {
                if !file.is_file() {
                    return Err(FeedError::ConfigNotFound(file.to_path_buf()));
                }
                vec![file.to_path_buf()]
            }
            None => self.config_chain(),
        };

        if chain.is_empty() {
            debug!("No package source configuration found, using the default source");
            return Ok(vec![PackageSource::default_source()]);
        }

        let mut layered = LayeredSources::default();
        for path in &chain {
            debug!(path = %path.display(), "Reading package source configuration");
            let xml = std::fs::read_to_string(path)?;
            layered
                .apply(&xml, path.parent().unwrap_or(Path::new(".")))
                .map_err(|e| FeedError::InvalidConfig {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
        }

        Ok(layered.into_enabled())
    }
}

/// Parse the sources of a single config document
///
/// Relative local sources are resolved against `base_dir`.
pub fn parse_sources(xml: &str, base_dir: &Path) -> Result<Vec<PackageSource>, roxmltree::Error> {
    let mut layered = LayeredSources::default();
    layered.apply(xml, base_dir)?;
    Ok(layered.into_enabled())
}

#[derive(Default)]
struct LayeredSources {
    sources: Vec<PackageSource>,
    disabled: HashMap<String, bool>,
    credentials: HashMap<String, Credentials>,
}

impl LayeredSources {
    fn apply(&mut self, xml: &str, base_dir: &Path) -> Result<(), roxmltree::Error> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();

        for section in sections(root, "packageSources") {
            for element in section.children().filter(|n| n.is_element()) {
                match element.tag_name().name() {
                    "clear" => self.sources.clear(),
                    "add" => {
                        let (Some(key), Some(value)) = (attr(element, "key"), attr(element, "value"))
                        else {
                            continue;
                        };
                        let mut source = PackageSource::new(key, resolve_location(value, base_dir));
                        source.protocol_version =
                            attr(element, "protocolVersion").and_then(|version| version.trim().parse().ok());

                        match self
                            .sources
                            .iter_mut()
                            .find(|existing| existing.name.eq_ignore_ascii_case(key))
                        {
                            Some(existing) => *existing = source,
                            None => self.sources.push(source),
                        }
                    }
                    _ => {}
                }
            }
        }

        for section in sections(root, "disabledPackageSources") {
            for element in section.children().filter(|n| n.is_element()) {
                match element.tag_name().name() {
                    "clear" => self.disabled.clear(),
                    "add" => {
                        if let (Some(key), Some(value)) = (attr(element, "key"), attr(element, "value")) {
                            self.disabled
                                .insert(key.to_ascii_lowercase(), value.trim().eq_ignore_ascii_case("true"));
                        }
                    }
                    _ => {}
                }
            }
        }

        for section in sections(root, "packageSourceCredentials") {
            for block in section.children().filter(|n| n.is_element()) {
                let name = decode_element_name(block.tag_name().name());
                let mut username = None;
                let mut password = None;
                for element in block
                    .children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "add")
                {
                    match (attr(element, "key"), attr(element, "value")) {
                        (Some(key), Some(value)) if key.eq_ignore_ascii_case("Username") => {
                            username = Some(value.to_string());
                        }
                        (Some(key), Some(value)) if key.eq_ignore_ascii_case("ClearTextPassword") => {
                            password = Some(value.to_string());
                        }
                        (Some(key), _) if key.eq_ignore_ascii_case("Password") => {
                            debug!(source = %name, "Ignoring encrypted password");
                        }
                        _ => {}
                    }
                }
                if let (Some(username), Some(password)) = (username, password) {
                    self.credentials
                        .insert(name.to_ascii_lowercase(), Credentials { username, password });
                }
            }
        }

        Ok(())
    }

    fn into_enabled(self) -> Vec<PackageSource> {
        let Self {
            sources,
            disabled,
            credentials,
        } = self;

        sources
            .into_iter()
            .filter(|source| {
                !disabled
                    .get(&source.name.to_ascii_lowercase())
                    .copied()
                    .unwrap_or(false)
            })
            .map(|mut source| {
                source.credentials = credentials.get(&source.name.to_ascii_lowercase()).cloned();
                source
            })
            .collect()
    }
}

/// Every top-level section with the given name, in document order
fn sections<'a, 'input>(
    root: roxmltree::Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
    root.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Attribute lookup ignoring the case of the attribute name
fn attr<'a>(element: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    element
        .attributes()
        .find(|a| a.name().eq_ignore_ascii_case(name))
        .map(|a| a.value())
}

fn decode_element_name(name: &str) -> String {
    ENCODED_CHAR_RE
        .replace_all(name, |caps: &regex::Captures<'_>| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn resolve_location(value: &str, base_dir: &Path) -> String {
    let lower = value.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("file:") {
        return value.to_string();
    }

    let path = Path::new(value);
    if path.is_absolute() {
        value.to_string()
    } else {
        base_dir.join(path).display().to_string()
    }
}

fn default_user_config() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        dirs::config_dir().map(|dir| dir.join("NuGet").join("NuGet.Config"))
    }
    #[cfg(not(windows))]
    {
        pkgfetch_core::get_home_dir()
            .ok()
            .map(|home| home.join(".nuget").join("NuGet").join("NuGet.Config"))
    }
}
