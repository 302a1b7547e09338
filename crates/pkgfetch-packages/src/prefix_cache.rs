//! Memoized search prefixes per (config file, source)

use dashmap::DashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix narrowing a legacy search index to exact id matches
pub const DEFAULT_PREFIX: &str = "packageid:";

/// Identifies one configured source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub config_file: Option<PathBuf>,
    pub source: Option<String>,
}

impl SourceKey {
    pub fn new(config_file: Option<&Path>, source: Option<&str>) -> Self {
        Self {
            config_file: config_file.map(Path::to_path_buf),
            source: source.map(str::to_string),
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_$$$_{}",
            self.config_file
                .as_deref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            self.source.as_deref().unwrap_or_default()
        )
    }
}

/// Last prefix that produced results for a source; an empty string means no prefix
///
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct PrefixCache {
    entries: DashMap<SourceKey, String>,
}

impl PrefixCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SourceKey) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn remember(&self, key: SourceKey, prefix: impl Into<String>) {
        self.entries.insert(key, prefix.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_overwrites() {
        let cache = PrefixCache::new();
        let key = SourceKey::new(Some(Path::new("/repo/nuget.config")), Some("internal"));
        assert_eq!(cache.get(&key), None);

        cache.remember(key.clone(), DEFAULT_PREFIX);
        assert_eq!(cache.get(&key).as_deref(), Some(DEFAULT_PREFIX));

        cache.remember(key.clone(), "");
        assert_eq!(cache.get(&key).as_deref(), Some(""));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_distinct_per_source() {
        let cache = PrefixCache::new();
        cache.remember(SourceKey::new(None, Some("a")), "");
        assert_eq!(cache.get(&SourceKey::new(None, Some("b"))), None);
        assert_eq!(cache.get(&SourceKey::new(None, None)), None);
    }

    #[test]
    fn test_key_display() {
        let key = SourceKey::new(Some(Path::new("cfg")), Some("feed"));
        assert_eq!(key.to_string(), "cfg_$$$_feed");
        assert_eq!(SourceKey::new(None, None).to_string(), "_$$$_");
    }
}
