use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::Deserialize;

/// Feeds swept when no configuration file is present.
const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("TechCrunch", "http://feeds.feedburner.com/TechCrunch/"),
    ("Wired", "https://www.wired.com/feed/rss"),
    ("The Verge", "https://www.theverge.com/rss/index.xml"),
    ("Ars Technica", "http://feeds.arstechnica.com/arstechnica/index/"),
    ("Mashable", "http://feeds.mashable.com/Mashable"),
    ("Hacker News", "https://news.ycombinator.com/rss"),
    ("Product Hunt", "https://www.producthunt.com/feed"),
    ("Engadget", "https://www.engadget.com/rss.xml"),
    ("VentureBeat", "https://venturebeat.com/feed/"),
    ("Gizmodo", "https://gizmodo.com/rss"),
    ("Themeisle News", "https://themeisle.com/blog/rss-feeds-list/#news"),
];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Refresh interval in minutes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Upper bound on simultaneous fetches; unbounded when absent
    #[serde(default)]
    pub max_concurrent_fetches: Option<usize>,
    #[serde(default = "default_max_articles_per_source")]
    pub max_articles_per_source: usize,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    pub sources: Vec<SourceConfig>,
}

fn default_refresh_interval() -> u64 {
    15
}

fn default_report_path() -> PathBuf {
    PathBuf::from("report_manually_update.json")
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "TinMoi/1.0 (RSS Aggregator)".to_string()
}

fn default_max_articles_per_source() -> usize {
    5
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            report_path: default_report_path(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            max_concurrent_fetches: None,
            max_articles_per_source: default_max_articles_per_source(),
            bind_address: default_bind_address(),
            sources: BUILTIN_SOURCES
                .iter()
                .map(|(name, url)| SourceConfig {
                    name: name.to_string(),
                    url: url.to_string(),
                })
                .collect(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in sources.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn registry(&self) -> anyhow::Result<SourceRegistry> {
        SourceRegistry::new(self.sources.clone())
    }
}

/// Fixed, validated mapping from source name to feed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistry {
    sources: Vec<SourceConfig>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<SourceConfig>) -> anyhow::Result<Self> {
        let mut seen = HashSet::new();
        for source in &sources {
            if source.name.trim().is_empty() {
                bail!("source with url '{}' has an empty name", source.url);
            }
            if !seen.insert(source.name.as_str()) {
                bail!("duplicate source name '{}'", source.name);
            }
        }
        Ok(Self { sources })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_refresh_interval() {
        assert_eq!(default_refresh_interval(), 15);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            refresh_interval = 30
            report_path = "out/manual.json"
            max_concurrent_fetches = 4

            [[sources]]
            name = "Test Feed"
            url = "https://example.com/feed.xml"

            [[sources]]
            name = "Another Feed"
            url = "https://example.org/rss"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.refresh_interval, 30);
        assert_eq!(config.report_path, PathBuf::from("out/manual.json"));
        assert_eq!(config.max_concurrent_fetches, Some(4));
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].name, "Test Feed");
        assert_eq!(config.sources[0].url, "https://example.com/feed.xml");
        assert_eq!(config.sources[1].name, "Another Feed");
    }

    #[test]
    fn test_defaults_when_only_sources_given() {
        let content = r#"
            [[sources]]
            name = "Test Feed"
            url = "https://example.com/feed.xml"
        "#;

        let config = Config::from_str(content).unwrap();

        assert_eq!(config.refresh_interval, 15);
        assert_eq!(config.report_path, PathBuf::from("report_manually_update.json"));
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.max_concurrent_fetches, None);
        assert_eq!(config.max_articles_per_source, 5);
        assert_eq!(config.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file_uses_builtin() {
        let config = Config::load_or_default("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config.sources.len(), BUILTIN_SOURCES.len());
        assert_eq!(config.sources[0].name, "TechCrunch");
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_required_fields() {
        let content = r#"
            [[sources]]
            name = "Test Feed"
            # Missing url field
        "#;

        let result = Config::from_str(content);
        assert!(result.is_err());
    }

    mod registry_tests {
        use super::*;

        fn source(name: &str, url: &str) -> SourceConfig {
            SourceConfig {
                name: name.to_string(),
                url: url.to_string(),
            }
        }

        #[test]
        fn test_builtin_registry() {
            let registry = Config::default().registry().unwrap();
            assert_eq!(registry.len(), 11);
            assert!(registry.names().any(|n| n == "Hacker News"));
        }

        #[test]
        fn test_duplicate_names_rejected() {
            let result = SourceRegistry::new(vec![
                source("HN", "https://news.ycombinator.com/rss"),
                source("HN", "https://example.com/rss"),
            ]);
            assert!(result.is_err());
        }

        #[test]
        fn test_empty_name_rejected() {
            let result = SourceRegistry::new(vec![source("  ", "https://example.com/rss")]);
            assert!(result.is_err());
        }

        #[test]
        fn test_registry_preserves_order() {
            let registry = SourceRegistry::new(vec![
                source("B", "https://b.example.com"),
                source("A", "https://a.example.com"),
            ])
            .unwrap();
            let names: Vec<_> = registry.names().collect();
            assert_eq!(names, vec!["B", "A"]);
        }

        #[test]
        fn test_empty_sources_list() {
            let config = Config::from_str("sources = []").unwrap();
            let registry = config.registry().unwrap();
            assert!(registry.is_empty());
        }
    }
}
